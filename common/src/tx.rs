use crate::{Address, PlutusData, TxHash, Value};

/// Transaction input (UTXO reference)
///
/// Ordering is lexicographic by (tx hash, index) - the order inputs take
/// in the encoded transaction body, and the order spend redeemer indexes
/// refer to.
#[derive(
    Debug,
    Default,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
    minicbor::Encode,
    minicbor::Decode,
)]
#[cbor(array)]
pub struct TxInput {
    /// Tx hash of referenced UTXO
    #[n(0)]
    pub tx_hash: TxHash,

    /// Index of UTXO in referenced tx
    #[n(1)]
    pub index: u64,
}

impl TxInput {
    pub fn new(tx_hash: TxHash, index: u64) -> Self {
        Self { tx_hash, index }
    }
}

/// Transaction output under construction
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TxOutput {
    /// Destination address
    pub address: Address,

    /// Output value (lovelace + native assets)
    pub value: Value,

    /// Inline datum, attached when sending to a script address
    pub datum: Option<PlutusData>,
}

impl TxOutput {
    pub fn new(address: Address, value: Value) -> Self {
        Self {
            address,
            value,
            datum: None,
        }
    }

    pub fn with_datum(mut self, datum: PlutusData) -> Self {
        self.datum = Some(datum);
        self
    }
}

/// A wallet-held UTXO resolved from its opaque byte encoding:
/// the outpoint plus the address and value it locks
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ResolvedInput {
    pub input: TxInput,
    pub address: Address,
    pub value: Value,
}
