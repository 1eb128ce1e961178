//! Blake2b helper functions for Stoa

use crate::hash::{Hash, KeyHash};
use blake2::{
    digest::{consts::U32, Update, VariableOutput},
    Blake2b, Blake2bVar, Digest,
};

/// Blake2b-256 hash of arbitrary bytes
pub fn hash_256(data: &[u8]) -> Hash<32> {
    let mut hasher = Blake2b::<U32>::new();
    Digest::update(&mut hasher, data);
    Hash::new(hasher.finalize().into())
}

/// Blake2b-224 hash of arbitrary bytes
pub fn keyhash_224(data: &[u8]) -> KeyHash {
    let mut hasher = Blake2bVar::new(28).expect("Blake2bVar accepts 28-byte output");
    hasher.update(data);

    let mut out = [0u8; 28];
    hasher.finalize_variable(&mut out).expect("output length matches");
    Hash::new(out)
}

/// Blake2b-224 hash with a single-byte language tag prefix, as used for
/// Plutus script hashes
pub fn keyhash_224_tagged(tag: u8, data: &[u8]) -> KeyHash {
    let mut prefixed = Vec::with_capacity(data.len() + 1);
    prefixed.push(tag);
    prefixed.extend_from_slice(data);
    keyhash_224(&prefixed)
}
