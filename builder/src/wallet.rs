//! Wallet collaborator boundary
//!
//! Everything the assembler cannot decide alone crosses this trait:
//! which UTXOs to spend, which to reserve as collateral, where change
//! goes, signing, and submission. Each call is an awaited suspension
//! point; the assembler never reorders them and never retries.

use async_trait::async_trait;
use stoa_common::{BuildError, Value};

/// What to ask the wallet's coin selection for: either a full value
/// (lovelace plus native assets) or a bare minimum of lovelace for fee
/// coverage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UtxoQuery {
    Target(Value),
    MinLovelace(u64),
}

/// The wallet-side collaborator contract.
///
/// Implementations may fail with wallet-defined diagnostics; failures
/// are surfaced to the caller verbatim and terminate the attempt.
#[async_trait]
pub trait WalletApi: Send + Sync {
    /// Select UTXOs covering the query; each entry is an opaque
    /// CBOR-encoded unspent output
    async fn select_utxos(&self, query: &UtxoQuery) -> Result<Vec<Vec<u8>>, BuildError>;

    /// Select a disjoint UTXO set for collateral coverage
    async fn select_collateral(&self, min_lovelace: u64) -> Result<Vec<Vec<u8>>, BuildError>;

    /// The address change outputs should be sent to, in raw header-byte
    /// form
    async fn change_address(&self) -> Result<Vec<u8>, BuildError>;

    /// Sign an unsigned transaction, returning witness-set CBOR
    async fn sign_transaction(&self, unsigned_tx: &[u8]) -> Result<Vec<u8>, BuildError>;

    /// Submit a signed transaction, returning the provider's
    /// transaction id
    async fn submit_transaction(&self, signed_tx: &[u8]) -> Result<String, BuildError>;
}
