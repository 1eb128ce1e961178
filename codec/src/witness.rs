//! Witness-set parsing, construction and reconciliation
//!
//! Signers return a full witness set; scripts, redeemers and signatures
//! must be carried into the submitted transaction while datum entries
//! must not - a datum already inline in the spent output may not be
//! duplicated in the witness set. Entries are kept as raw CBOR spans so
//! signature bytes pass through untouched.

use minicbor::data::Type;
use stoa_common::{BuildError, PlutusData, PlutusScript, Redeemer, ScriptLanguage};

// Witness set map keys
const KEY_VKEY_WITNESSES: u8 = 0;
const KEY_NATIVE_SCRIPTS: u8 = 1;
const KEY_PLUTUS_V1_SCRIPTS: u8 = 3;
const KEY_PLUTUS_DATA: u8 = 4;
const KEY_REDEEMERS: u8 = 5;
const KEY_PLUTUS_V2_SCRIPTS: u8 = 6;
const KEY_PLUTUS_V3_SCRIPTS: u8 = 7;

/// A transaction witness set, with every entry held as raw CBOR
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WitnessSet {
    pub vkey_witnesses: Vec<Vec<u8>>,
    pub native_scripts: Vec<Vec<u8>>,
    pub plutus_v1_scripts: Vec<Vec<u8>>,
    pub datums: Vec<Vec<u8>>,
    pub redeemers: Vec<Vec<u8>>,
    pub plutus_v2_scripts: Vec<Vec<u8>>,
    pub plutus_v3_scripts: Vec<Vec<u8>>,
}

impl WitnessSet {
    /// The pre-sign witness set for a script transaction: scripts,
    /// datums and redeemers, no signatures yet
    pub fn pre_sign(
        scripts: &[PlutusScript],
        datums: &[PlutusData],
        redeemers: &[Redeemer],
    ) -> Self {
        let mut witness_set = WitnessSet::default();
        for script in scripts {
            let mut e = minicbor::Encoder::new(Vec::new());
            e.bytes(&script.bytes).expect("infallible write to Vec");
            let raw = e.into_writer();
            match script.language {
                ScriptLanguage::PlutusV1 => witness_set.plutus_v1_scripts.push(raw),
                ScriptLanguage::PlutusV2 => witness_set.plutus_v2_scripts.push(raw),
                ScriptLanguage::PlutusV3 => witness_set.plutus_v3_scripts.push(raw),
            }
        }
        for datum in datums {
            witness_set.datums.push(datum.to_bytes());
        }
        for redeemer in redeemers {
            witness_set
                .redeemers
                .push(minicbor::to_vec(redeemer).expect("infallible write to Vec"));
        }
        witness_set
    }

    /// Parse a witness set returned by a signer
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, BuildError> {
        Self::parse(bytes).map_err(|e| {
            tracing::error!("Invalid witness set from signer: {e}");
            BuildError::codec("witness set", e)
        })
    }

    fn parse(bytes: &[u8]) -> Result<Self, minicbor::decode::Error> {
        let mut d = minicbor::Decoder::new(bytes);
        let mut witness_set = WitnessSet::default();

        let size = d.map()?;
        let mut remaining = size;
        loop {
            match remaining {
                Some(0) => break,
                None if d.datatype()? == Type::Break => {
                    d.skip()?;
                    break;
                }
                _ => {}
            }
            let key = d.u8()?;
            match key {
                KEY_VKEY_WITNESSES => witness_set.vkey_witnesses = raw_items(bytes, &mut d)?,
                KEY_NATIVE_SCRIPTS => witness_set.native_scripts = raw_items(bytes, &mut d)?,
                KEY_PLUTUS_V1_SCRIPTS => witness_set.plutus_v1_scripts = raw_items(bytes, &mut d)?,
                KEY_PLUTUS_DATA => witness_set.datums = raw_items(bytes, &mut d)?,
                KEY_REDEEMERS => witness_set.redeemers = raw_items(bytes, &mut d)?,
                KEY_PLUTUS_V2_SCRIPTS => witness_set.plutus_v2_scripts = raw_items(bytes, &mut d)?,
                KEY_PLUTUS_V3_SCRIPTS => witness_set.plutus_v3_scripts = raw_items(bytes, &mut d)?,
                _ => d.skip()?,
            }
            remaining = remaining.map(|n| n - 1);
        }

        Ok(witness_set)
    }

    /// The witness set to submit: every signature, script and redeemer
    /// from this set, with datum entries dropped
    pub fn reconciled(&self) -> Self {
        let mut copy = self.clone();
        copy.datums = Vec::new();
        copy
    }

    pub fn has_datums(&self) -> bool {
        !self.datums.is_empty()
    }

    /// Canonical CBOR bytes; absent categories are omitted from the map
    pub fn to_bytes(&self) -> Vec<u8> {
        let categories: [(u8, &Vec<Vec<u8>>); 7] = [
            (KEY_VKEY_WITNESSES, &self.vkey_witnesses),
            (KEY_NATIVE_SCRIPTS, &self.native_scripts),
            (KEY_PLUTUS_V1_SCRIPTS, &self.plutus_v1_scripts),
            (KEY_PLUTUS_DATA, &self.datums),
            (KEY_REDEEMERS, &self.redeemers),
            (KEY_PLUTUS_V2_SCRIPTS, &self.plutus_v2_scripts),
            (KEY_PLUTUS_V3_SCRIPTS, &self.plutus_v3_scripts),
        ];

        let mut e = minicbor::Encoder::new(Vec::new());
        let present = categories.iter().filter(|(_, items)| !items.is_empty()).count();
        e.map(present as u64).expect("infallible write to Vec");
        for (key, items) in categories {
            if items.is_empty() {
                continue;
            }
            e.u8(key).expect("infallible write to Vec");
            e.array(items.len() as u64).expect("infallible write to Vec");
            for item in items {
                e.writer_mut().extend_from_slice(item);
            }
        }
        e.into_writer()
    }
}

// Capture each element of a CBOR array as its raw byte span
fn raw_items(
    input: &[u8],
    d: &mut minicbor::Decoder,
) -> Result<Vec<Vec<u8>>, minicbor::decode::Error> {
    let size = d.array()?;
    let mut items = Vec::new();
    let mut remaining = size;
    loop {
        match remaining {
            Some(0) => break,
            None if d.datatype()? == Type::Break => {
                d.skip()?;
                break;
            }
            _ => {}
        }
        let start = d.position();
        d.skip()?;
        items.push(input[start..d.position()].to_vec());
        remaining = remaining.map(|n| n - 1);
    }
    Ok(items)
}
