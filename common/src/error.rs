//! Error taxonomy for Stoa transaction building

use thiserror::Error;

/// Datum description errors.
///
/// A description that fails here never yields a partially built value;
/// the whole build aborts.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize, Error)]
pub enum DatumError {
    /// **Cause:** empty string or empty/non-object description
    #[error("Empty datum description")]
    EmptyDescription,

    /// **Cause:** no recognized shape key in the description
    #[error("Unknown datum shape: no recognized key in {{{keys}}}")]
    UnknownShape { keys: String },

    /// **Cause:** more than one conflicting shape key present
    #[error("Ambiguous datum shape: conflicting keys {{{keys}}}")]
    AmbiguousShape { keys: String },

    /// **Cause:** a shape key present without its required companion,
    /// e.g. `fields` without `constructor`
    #[error("Datum shape '{shape}' is missing required key '{missing}'")]
    MissingKey { shape: String, missing: String },

    /// **Cause:** a shape key holds the wrong kind of value
    #[error("Invalid value for datum shape '{shape}': {reason}")]
    InvalidValue { shape: String, reason: String },

    /// **Cause:** a `map` element is neither a k/v object nor part of a
    /// k/v sequence
    #[error("Invalid map entry: expected an object with 'k' and 'v'")]
    InvalidMapEntry,

    /// **Cause:** an `int` literal that is not a decimal integer
    #[error("Invalid integer literal: {0}")]
    InvalidInteger(String),

    /// **Cause:** a `bytes` literal that is not a hex string
    #[error("Invalid hex bytes: {0}")]
    InvalidBytes(String),
}

/// Transaction build errors.
///
/// Nothing here is retried automatically: every failure discards the
/// draft and returns control to the caller, which may rebuild from
/// scratch.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize, Error)]
pub enum BuildError {
    /// Malformed datum or redeemer description
    #[error("Invalid datum: {0}")]
    Datum(#[from] DatumError),

    /// Malformed bytes from a collaborator (UTXO, address or witness set)
    #[error("Failed to decode {what}: {reason}")]
    Codec { what: String, reason: String },

    /// The wallet could not satisfy a requested value
    #[error("Coin selection failed: {0}")]
    Selection(String),

    /// An output fell below the minimum-UTXO requirement
    #[error("Output of {got} lovelace is below the minimum of {required}")]
    OutputTooSmall { got: u64, required: u64 },

    /// The draft breaks a configured limit
    #[error("Transaction limit exceeded: {0}")]
    LimitExceeded(String),

    /// Stage ordering violation or inconsistent draft state
    #[error("Invalid draft state: {0}")]
    InvalidState(String),

    /// Signer rejection or fault, surfaced verbatim
    #[error("Signing failed: {0}")]
    Signing(String),

    /// Network rejection, surfaced with the provider diagnostic
    #[error("Submission failed: {0}")]
    Submission(String),

    /// Invalid injected configuration
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl BuildError {
    pub fn codec(what: &str, reason: impl std::fmt::Display) -> Self {
        Self::Codec {
            what: what.to_string(),
            reason: reason.to_string(),
        }
    }
}
