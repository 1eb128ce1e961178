//! Wallet UTXO decoding
//!
//! Wallets hand back selected UTXOs as opaque CBOR: `[input, output]`
//! with the output in either the legacy array form or the post-Alonzo
//! map form. Only the outpoint, address and value are material to
//! assembly; datum options and reference scripts are skipped.

use minicbor::data::Type;
use minicbor::{Decode, Decoder};
use stoa_common::{Address, BuildError, ResolvedInput, TxHash, TxInput, Value};

/// Decode one wallet-provided `TransactionUnspentOutput`
pub fn decode_unspent_output(bytes: &[u8]) -> Result<ResolvedInput, BuildError> {
    decode_inner(&mut Decoder::new(bytes)).map_err(|e| {
        tracing::error!("Invalid UTXO from wallet: {e}");
        BuildError::codec("UTXO", e)
    })
}

fn decode_inner(d: &mut Decoder) -> Result<ResolvedInput, minicbor::decode::Error> {
    let outer = d.array()?;
    if outer.is_some_and(|s| s != 2) {
        return Err(minicbor::decode::Error::message(
            "unspent output must be [input, output]",
        ));
    }

    let input = decode_input(d)?;
    let (address, value) = decode_output(d)?;

    if outer.is_none() {
        expect_break(d)?;
    }

    Ok(ResolvedInput {
        input,
        address,
        value,
    })
}

fn decode_input(d: &mut Decoder) -> Result<TxInput, minicbor::decode::Error> {
    let size = d.array()?;
    if size.is_some_and(|s| s != 2) {
        return Err(minicbor::decode::Error::message(
            "input must be [tx_hash, index]",
        ));
    }
    let tx_hash = TxHash::decode(d, &mut ())?;
    let index = d.u64()?;
    if size.is_none() {
        expect_break(d)?;
    }
    Ok(TxInput::new(tx_hash, index))
}

fn decode_output(d: &mut Decoder) -> Result<(Address, Value), minicbor::decode::Error> {
    match d.datatype()? {
        // Post-Alonzo form: {0: address, 1: value, ?2: datum, ?3: script}
        Type::Map | Type::MapIndef => {
            let size = d.map()?;
            let mut address = None;
            let mut value = None;
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
                match d.u8()? {
                    0 => address = Some(Address::decode(d, &mut ())?),
                    1 => value = Some(Value::decode(d, &mut ())?),
                    _ => d.skip()?,
                }
                remaining = remaining.map(|n| n - 1);
            }
            let address = address
                .ok_or_else(|| minicbor::decode::Error::message("output missing address"))?;
            let value =
                value.ok_or_else(|| minicbor::decode::Error::message("output missing value"))?;
            Ok((address, value))
        }

        // Legacy form: [address, value, ?datum_hash]
        Type::Array | Type::ArrayIndef => {
            let size = d.array()?;
            let address = Address::decode(d, &mut ())?;
            let value = Value::decode(d, &mut ())?;
            match size {
                Some(fields) => {
                    for _ in 2..fields {
                        d.skip()?;
                    }
                }
                None => {
                    while d.datatype()? != Type::Break {
                        d.skip()?;
                    }
                    d.skip()?;
                }
            }
            Ok((address, value))
        }

        other => Err(minicbor::decode::Error::message(format!(
            "unexpected type {other} for output"
        ))),
    }
}

fn expect_break(d: &mut Decoder) -> Result<(), minicbor::decode::Error> {
    if d.datatype()? != Type::Break {
        return Err(minicbor::decode::Error::message("expected break"));
    }
    d.skip()?;
    Ok(())
}
