//! Transaction body and envelope encoding
//!
//! The body is the hashed, signed structure; the envelope wraps the body
//! with a witness set and auxiliary data. Assembly of the signed
//! transaction re-emits the unsigned body bytes untouched, so the
//! signature input and the submitted body are byte-identical.

use minicbor::Encode;
use minicbor::data::Tag;
use stoa_common::{
    PlutusData, ScriptIntegrityHash, TxHash, TxInput, TxOutput, crypto::hash_256,
};

// Body map keys (Babbage)
const KEY_INPUTS: u8 = 0;
const KEY_OUTPUTS: u8 = 1;
const KEY_FEE: u8 = 2;
const KEY_SCRIPT_DATA_HASH: u8 = 11;
const KEY_COLLATERAL: u8 = 13;

/// A finalized transaction body ready for encoding.
///
/// Inputs and collateral must already be sorted lexicographically; the
/// builder guarantees that before handing the body over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionBody {
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub fee: u64,
    pub collateral: Vec<TxInput>,
    pub script_data_hash: Option<ScriptIntegrityHash>,
}

impl TransactionBody {
    /// Canonical CBOR bytes of the body
    pub fn to_bytes(&self) -> Vec<u8> {
        minicbor::to_vec(self).expect("infallible write to Vec")
    }

    /// Transaction id: Blake2b-256 over the body bytes
    pub fn id(&self) -> TxHash {
        hash_256(&self.to_bytes())
    }
}

impl<C> minicbor::Encode<C> for TransactionBody {
    fn encode<W: minicbor::encode::Write>(
        &self,
        e: &mut minicbor::Encoder<W>,
        ctx: &mut C,
    ) -> Result<(), minicbor::encode::Error<W::Error>> {
        let mut entries = 3u64;
        if self.script_data_hash.is_some() {
            entries += 1;
        }
        if !self.collateral.is_empty() {
            entries += 1;
        }
        e.map(entries)?;

        e.u8(KEY_INPUTS)?;
        e.array(self.inputs.len() as u64)?;
        for input in &self.inputs {
            input.encode(e, ctx)?;
        }

        e.u8(KEY_OUTPUTS)?;
        e.array(self.outputs.len() as u64)?;
        for output in &self.outputs {
            encode_output(e, ctx, output)?;
        }

        e.u8(KEY_FEE)?;
        e.u64(self.fee)?;

        if let Some(hash) = &self.script_data_hash {
            e.u8(KEY_SCRIPT_DATA_HASH)?;
            hash.encode(e, ctx)?;
        }

        if !self.collateral.is_empty() {
            e.u8(KEY_COLLATERAL)?;
            e.array(self.collateral.len() as u64)?;
            for input in &self.collateral {
                input.encode(e, ctx)?;
            }
        }

        Ok(())
    }
}

// Outputs without a datum keep the legacy array form; an inline datum
// forces the post-Alonzo map form with datum option [1, #6.24(bytes)]
fn encode_output<C, W: minicbor::encode::Write>(
    e: &mut minicbor::Encoder<W>,
    ctx: &mut C,
    output: &TxOutput,
) -> Result<(), minicbor::encode::Error<W::Error>> {
    match &output.datum {
        None => {
            e.array(2)?;
            output.address.encode(e, ctx)?;
            output.value.encode(e, ctx)?;
        }
        Some(datum) => {
            e.map(3)?;
            e.u8(0)?;
            output.address.encode(e, ctx)?;
            e.u8(1)?;
            output.value.encode(e, ctx)?;
            e.u8(2)?;
            encode_inline_datum(e, datum)?;
        }
    }
    Ok(())
}

fn encode_inline_datum<W: minicbor::encode::Write>(
    e: &mut minicbor::Encoder<W>,
    datum: &PlutusData,
) -> Result<(), minicbor::encode::Error<W::Error>> {
    e.array(2)?;
    e.u8(1)?;
    e.tag(Tag::new(24))?;
    e.bytes(&datum.to_bytes())?;
    Ok(())
}

/// Assemble a full transaction envelope: `[body, witness_set, is_valid,
/// auxiliary_data]`. Body and witness set are spliced in as pre-encoded
/// CBOR so the body bytes the signer saw are reused verbatim.
pub fn encode_transaction(body: &[u8], witness_set: &[u8], is_valid: bool) -> Vec<u8> {
    let mut e = minicbor::Encoder::new(Vec::new());
    e.array(4).expect("infallible write to Vec");
    e.writer_mut().extend_from_slice(body);
    e.writer_mut().extend_from_slice(witness_set);
    e.bool(is_valid).expect("infallible write to Vec");
    e.null().expect("infallible write to Vec");
    e.into_writer()
}

/// Split a transaction envelope into its raw body and witness-set spans
pub fn decode_transaction(bytes: &[u8]) -> Result<(&[u8], &[u8]), minicbor::decode::Error> {
    let mut d = minicbor::Decoder::new(bytes);
    let size = d.array()?;
    if size.is_some_and(|s| s != 4) {
        return Err(minicbor::decode::Error::message(
            "transaction must be [body, witnesses, is_valid, auxiliary_data]",
        ));
    }
    let body_start = d.position();
    d.skip()?;
    let body = &bytes[body_start..d.position()];

    let witness_start = d.position();
    d.skip()?;
    let witness_set = &bytes[witness_start..d.position()];

    Ok((body, witness_set))
}
