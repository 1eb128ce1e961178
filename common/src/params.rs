//! Builder configuration and protocol constants for Stoa

use crate::plutus::{CostModel, CostModels, ScriptLanguage};
use anyhow::Result;
use config::Config;

/// Execution unit prices, as rationals
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ExUnitPrices {
    /// Price per memory unit (numerator, denominator)
    pub mem_price: (u64, u64),

    /// Price per step unit (numerator, denominator)
    pub step_price: (u64, u64),
}

/// Parameters driving fee, size and deposit arithmetic.
///
/// These are protocol configuration, not business logic: callers inject
/// them per network, or load them from a config section. Defaults are
/// the preprod values.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BuilderConfig {
    /// Linear fee coefficient (per byte of serialized transaction)
    pub fee_coefficient: u64,

    /// Linear fee constant
    pub fee_constant: u64,

    /// Lovelace per UTXO word, for the minimum-UTXO rule
    pub coins_per_utxo_word: u64,

    /// Stake pool registration deposit
    pub pool_deposit: u64,

    /// Stake key registration deposit
    pub key_deposit: u64,

    /// Execution unit prices
    pub ex_unit_prices: ExUnitPrices,

    /// Maximum serialized size of a single output value
    pub max_value_size: u32,

    /// Maximum serialized transaction size
    pub max_tx_size: u32,

    /// Cost models per script language, fed verbatim to the script-data
    /// hash
    pub cost_models: CostModels,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        let mut cost_models = CostModels::new();
        cost_models
            .insert(ScriptLanguage::PlutusV2, CostModel(PLUTUS_V2_COST_MODEL.to_vec()));
        Self {
            fee_coefficient: 44,
            fee_constant: 155381,
            coins_per_utxo_word: 34482,
            pool_deposit: 500_000_000,
            key_deposit: 2_000_000,
            ex_unit_prices: ExUnitPrices {
                mem_price: (577, 10_000),
                step_price: (721, 10_000_000),
            },
            max_value_size: 5000,
            max_tx_size: 16384,
            cost_models,
        }
    }
}

impl BuilderConfig {
    /// Parse from a config section, falling back to defaults field by
    /// field
    pub fn from_config(config: &Config) -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            fee_coefficient: config.get("fee-coefficient").unwrap_or(defaults.fee_coefficient),
            fee_constant: config.get("fee-constant").unwrap_or(defaults.fee_constant),
            coins_per_utxo_word: config
                .get("coins-per-utxo-word")
                .unwrap_or(defaults.coins_per_utxo_word),
            pool_deposit: config.get("pool-deposit").unwrap_or(defaults.pool_deposit),
            key_deposit: config.get("key-deposit").unwrap_or(defaults.key_deposit),
            ex_unit_prices: ExUnitPrices {
                mem_price: (
                    config.get("mem-price-numerator").unwrap_or(defaults.ex_unit_prices.mem_price.0),
                    config.get("mem-price-denominator").unwrap_or(defaults.ex_unit_prices.mem_price.1),
                ),
                step_price: (
                    config.get("step-price-numerator").unwrap_or(defaults.ex_unit_prices.step_price.0),
                    config
                        .get("step-price-denominator")
                        .unwrap_or(defaults.ex_unit_prices.step_price.1),
                ),
            },
            max_value_size: config.get("max-value-size").unwrap_or(defaults.max_value_size),
            max_tx_size: config.get("max-tx-size").unwrap_or(defaults.max_tx_size),
            cost_models: defaults.cost_models,
        })
    }
}

/// Plutus V2 cost model table, in parameter order
pub const PLUTUS_V2_COST_MODEL: &[i64] = &[
    205665, 812, 1, 1, 1000, 571, 0, 1, 1000, 24177, 4, 1, 1000, 32, 117366, 10475, 4, 23000, 100,
    23000, 100, 23000, 100, 23000, 100, 23000, 100, 23000, 100, 100, 100, 23000, 100, 19537, 32,
    175354, 32, 46417, 4, 221973, 511, 0, 1, 89141, 32, 497525, 14068, 4, 2, 196500, 453240, 220,
    0, 1, 1, 1000, 28662, 4, 2, 245000, 216773, 62, 1, 1060367, 12586, 1, 208512, 421, 1, 187000,
    1000, 52998, 1, 80436, 32, 43249, 32, 1000, 32, 80556, 1, 57667, 4, 1000, 10, 197145, 156, 1,
    197145, 156, 1, 204924, 473, 1, 208896, 511, 1, 52467, 32, 64832, 32, 65493, 32, 22558, 32,
    16563, 32, 76511, 32, 196500, 453240, 220, 0, 1, 1, 69522, 11687, 0, 1, 60091, 32, 196500,
    453240, 220, 0, 1, 1, 196500, 453240, 220, 0, 1, 1, 1159724, 392670, 0, 2, 806990, 30482, 4,
    1927926, 82523, 4, 265318, 0, 4, 0, 85931, 32, 205665, 812, 1, 1, 41182, 32, 212342, 32,
    31220, 32, 32696, 32, 43357, 32, 32247, 32, 38314, 32, 20000000000, 20000000000, 9462713,
    1021, 10, 20000000000, 0, 20000000000,
];
