//! Fee and minimum-UTXO arithmetic

use stoa_common::{BuilderConfig, Redeemer, TxOutput};

/// Size of a UTXO ledger entry, in words, excluding its value
const UTXO_ENTRY_SIZE_WITHOUT_VAL: u64 = 27;

/// Deterministic linear fee: `coefficient * size + constant`
pub fn linear_fee(config: &BuilderConfig, tx_size: usize) -> u64 {
    config.fee_coefficient * tx_size as u64 + config.fee_constant
}

/// Fee for declared execution budgets, priced per the configured
/// rationals and rounded up
pub fn ex_unit_fee(config: &BuilderConfig, redeemers: &[Redeemer]) -> u64 {
    let mem: u64 = redeemers.iter().map(|r| r.ex_units.mem).sum();
    let steps: u64 = redeemers.iter().map(|r| r.ex_units.steps).sum();
    ceil_price(mem, config.ex_unit_prices.mem_price)
        + ceil_price(steps, config.ex_unit_prices.step_price)
}

fn ceil_price(units: u64, (numerator, denominator): (u64, u64)) -> u64 {
    ((units as u128 * numerator as u128).div_ceil(denominator as u128)) as u64
}

/// Minimum lovelace an output must carry, per the coins-per-UTXO-word
/// rule: entry size in 8-byte words, value included, times the
/// configured rate
pub fn min_utxo_lovelace(config: &BuilderConfig, output: &TxOutput) -> u64 {
    let value_size = minicbor::to_vec(&output.value).expect("infallible write to Vec").len();
    let value_words = (value_size as u64).div_ceil(8);
    (UTXO_ENTRY_SIZE_WITHOUT_VAL + value_words) * config.coins_per_utxo_word
}
