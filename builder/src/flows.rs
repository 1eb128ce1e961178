//! The two transaction archetypes
//!
//! `send_to_script` locks value at a script address under an inline
//! datum; `redeem_from_script` spends a script-locked UTXO whose datum
//! is already inline. Both are strict four-suspension pipelines: select
//! inputs, (select collateral,) sign, submit - in that order, each
//! awaited to completion, every failure terminating the attempt.

use crate::builder::{ScriptWitness, TransactionBuilder};
use crate::wallet::{UtxoQuery, WalletApi};
use serde_json::Value as Json;
use stoa_codec::{decode_unspent_output, encode_datum};
use stoa_common::{
    Address, BuildError, BuilderConfig, ExUnits, PlutusScript, Redeemer, RedeemerTag, TxInput,
    TxOutput, Value,
};

/// Parameters for a send into a script address
#[derive(Debug, Clone)]
pub struct SendParams {
    /// Destination (normally a script address)
    pub to: Address,

    /// Value carried by the destination output
    pub amount: Value,

    /// Value the wallet selection should cover: the output plus
    /// headroom for fees
    pub selection_target: Value,

    /// Datum description attached inline to the output
    pub datum: Json,
}

/// Parameters for spending a script-locked UTXO with an inline datum
#[derive(Debug, Clone)]
pub struct RedeemParams {
    /// The validator being run
    pub script: PlutusScript,

    /// Outpoint of the script-locked UTXO
    pub script_input: TxInput,

    /// Value locked at that outpoint (tracked off-chain by the caller)
    pub script_value: Value,

    /// Redeemer description handed to the validator
    pub redeemer: Json,

    /// Declared execution budget for the redeemer
    pub ex_units: ExUnits,

    /// The datum under which the value is locked. Required to compose
    /// the script witness even though the chain already holds it inline.
    pub datum: Json,

    /// Output sent back to the script, with its own inline datum
    pub continuing_output: ContinuingOutput,

    /// Minimum lovelace to request for fee coverage
    pub fee_selection_lovelace: u64,

    /// Minimum lovelace to request as collateral
    pub collateral_lovelace: u64,
}

/// The output a redeeming transaction pays back to the script
#[derive(Debug, Clone)]
pub struct ContinuingOutput {
    pub address: Address,
    pub value: Value,
    pub datum: Json,
}

/// Build, sign and submit a transaction locking `amount` at a script
/// address under an inline datum. Returns the provider's transaction id.
pub async fn send_to_script(
    wallet: &dyn WalletApi,
    config: &BuilderConfig,
    params: SendParams,
) -> Result<String, BuildError> {
    let datum = encode_datum(&params.datum)?;
    let mut builder = TransactionBuilder::new(config.clone());

    // Stage A: wallet performs selection against the target value
    let query = UtxoQuery::Target(params.selection_target.clone());
    let selected = wallet.select_utxos(&query).await?;
    tracing::debug!(utxos = selected.len(), "Selected inputs");
    for bytes in &selected {
        builder.add_input(decode_unspent_output(bytes)?)?;
    }

    // Stage C: the destination output with its inline datum
    builder.add_output(TxOutput::new(params.to, params.amount).with_datum(datum))?;

    // Stage D: change and fee settlement
    let change_bytes = wallet.change_address().await?;
    let change_address =
        Address::from_binary(&change_bytes).map_err(|e| BuildError::codec("change address", e))?;
    let unsigned = builder.finalize(change_address)?;
    tracing::debug!(id = %unsigned.id(), fee = unsigned.fee, "Unsigned send transaction ready");

    // Sign and submit; no datum was witnessed, so the returned witness
    // set is spliced in unchanged
    let witness_set = wallet.sign_transaction(&unsigned.tx_bytes).await?;
    let signed = unsigned.signed_with(&witness_set);
    wallet.submit_transaction(&signed).await
}

/// Build, sign and submit a transaction spending a script-locked UTXO
/// whose datum is inline. Returns the provider's transaction id.
pub async fn redeem_from_script(
    wallet: &dyn WalletApi,
    config: &BuilderConfig,
    params: RedeemParams,
) -> Result<String, BuildError> {
    let redeemer_data = encode_datum(&params.redeemer)?;
    let witness_datum = encode_datum(&params.datum)?;
    let continuing_datum = encode_datum(&params.continuing_output.datum)?;

    let mut builder = TransactionBuilder::new(config.clone());

    // Stage A: the script input carries the full witness; the datum is
    // needed to compose it even though the chain holds it inline
    let redeemer = Redeemer {
        tag: RedeemerTag::Spend,
        index: 0,
        data: redeemer_data,
        ex_units: params.ex_units,
    };
    builder.add_script_input(
        params.script_input,
        params.script_value,
        ScriptWitness {
            script: params.script,
            datum: Some(witness_datum),
            redeemer,
        },
    )?;

    // plus plain inputs for fees and the continuing output
    let query = UtxoQuery::MinLovelace(params.fee_selection_lovelace);
    let selected = wallet.select_utxos(&query).await?;
    tracing::debug!(utxos = selected.len(), "Selected fee inputs");
    for bytes in &selected {
        builder.add_input(decode_unspent_output(bytes)?)?;
    }

    // Stage B: collateral, a disjoint set
    let collateral = wallet.select_collateral(params.collateral_lovelace).await?;
    tracing::debug!(utxos = collateral.len(), "Selected collateral");
    for bytes in &collateral {
        builder.add_collateral(decode_unspent_output(bytes)?)?;
    }

    // Stage C: the continuing output, then the script-data hash. The
    // witnessed datum is inline in the spent output, so the hash is
    // computed with the datum set absent.
    builder.add_output(
        TxOutput::new(params.continuing_output.address, params.continuing_output.value)
            .with_datum(continuing_datum),
    )?;
    let hash = builder.seal_script_data(None)?;
    tracing::debug!(script_data_hash = %hash, "Sealed script data without witness datums");

    // Stage D: change and fee settlement
    let change_bytes = wallet.change_address().await?;
    let change_address =
        Address::from_binary(&change_bytes).map_err(|e| BuildError::codec("change address", e))?;
    let unsigned = builder.finalize(change_address)?;
    tracing::debug!(id = %unsigned.id(), fee = unsigned.fee, "Unsigned redeem transaction ready");

    // Sign, then rebuild the witness set without datum entries before
    // submission - the signer echoes the witness datum back and cannot
    // omit it itself
    let witness_set = wallet.sign_transaction(&unsigned.tx_bytes).await?;
    let signed = unsigned.signed_with_reconciled(&witness_set)?;
    wallet.submit_transaction(&signed).await
}
