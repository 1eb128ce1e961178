//! Transaction draft assembly
//!
//! A `TransactionBuilder` is created per attempt, populated in stage
//! order (inputs, collateral, outputs, script-data seal, change), turned
//! into an immutable unsigned encoding and discarded. Nothing is shared
//! between attempts and nothing is retried here.

use crate::fee::{ex_unit_fee, linear_fee, min_utxo_lovelace};
use stoa_codec::{TransactionBody, WitnessSet, encode_transaction, hash_script_data};
use stoa_common::{
    Address, BuildError, BuilderConfig, CostModels, PlutusData, PlutusScript, Redeemer,
    ResolvedInput, ScriptIntegrityHash, TxHash, TxInput, TxOutput, Value, crypto::hash_256,
};

const FEE_ITERATION_LIMIT: usize = 8;

/// Everything needed to witness one script-locked input.
///
/// The datum here is an implementation artifact of witness construction:
/// when the spent output carries the datum inline, the same datum must
/// NOT enter the script-data hash or the submitted witness set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptWitness {
    pub script: PlutusScript,
    pub datum: Option<PlutusData>,
    pub redeemer: Redeemer,
}

#[derive(Debug, Clone)]
struct ScriptInput {
    input: TxInput,
    value: Value,
    witness: ScriptWitness,
}

/// The finished, immutable unsigned transaction
#[derive(Debug, Clone)]
pub struct UnsignedTransaction {
    pub body_bytes: Vec<u8>,
    pub witness_bytes: Vec<u8>,
    pub tx_bytes: Vec<u8>,
    pub fee: u64,
    pub change: Option<Value>,
}

impl UnsignedTransaction {
    /// Transaction id: Blake2b-256 over the body bytes
    pub fn id(&self) -> TxHash {
        hash_256(&self.body_bytes)
    }

    /// Splice a signer-returned witness set in unchanged
    pub fn signed_with(&self, witness_set: &[u8]) -> Vec<u8> {
        encode_transaction(&self.body_bytes, witness_set, true)
    }

    /// Rebuild the signer-returned witness set keeping every signature,
    /// script and redeemer while dropping any datum entries, then splice
    /// it in. Required whenever the spent output carried its datum
    /// inline; signers echo the witness datum back and a duplicated
    /// datum changes the witness hash the chain recomputes.
    pub fn signed_with_reconciled(&self, witness_set: &[u8]) -> Result<Vec<u8>, BuildError> {
        let returned = WitnessSet::from_bytes(witness_set)?;
        let reconciled = returned.reconciled();
        if returned.has_datums() {
            tracing::debug!("Dropped {} datum(s) from signer witness set", returned.datums.len());
        }
        Ok(encode_transaction(&self.body_bytes, &reconciled.to_bytes(), true))
    }
}

/// Mutable draft state for one transaction attempt
pub struct TransactionBuilder {
    config: BuilderConfig,
    inputs: Vec<(TxInput, Value)>,
    script_inputs: Vec<ScriptInput>,
    collateral: Vec<(TxInput, Value)>,
    outputs: Vec<TxOutput>,
    script_data_hash: Option<ScriptIntegrityHash>,
    sealed: bool,
}

impl TransactionBuilder {
    pub fn new(config: BuilderConfig) -> Self {
        Self {
            config,
            inputs: Vec::new(),
            script_inputs: Vec::new(),
            collateral: Vec::new(),
            outputs: Vec::new(),
            script_data_hash: None,
            sealed: false,
        }
    }

    /// Add a plain input. Inputs are a set: an outpoint already present
    /// is ignored.
    pub fn add_input(&mut self, utxo: ResolvedInput) -> Result<(), BuildError> {
        self.ensure_unsealed("add_input")?;
        if self.contains_input(&utxo.input) {
            return Ok(());
        }
        self.inputs.push((utxo.input, utxo.value));
        Ok(())
    }

    /// Add a script-locked input with its witness. The redeemer inside
    /// the witness is the same logical value later fed to the
    /// script-data hash; its index is resolved against the sorted input
    /// set at seal time.
    pub fn add_script_input(
        &mut self,
        input: TxInput,
        value: Value,
        witness: ScriptWitness,
    ) -> Result<(), BuildError> {
        self.ensure_unsealed("add_script_input")?;
        if self.contains_input(&input) {
            return Err(BuildError::InvalidState(format!(
                "script input {}#{} already present",
                input.tx_hash, input.index
            )));
        }
        self.script_inputs.push(ScriptInput {
            input,
            value,
            witness,
        });
        Ok(())
    }

    /// Add a collateral input; a disjoint pool from spending inputs
    pub fn add_collateral(&mut self, utxo: ResolvedInput) -> Result<(), BuildError> {
        self.ensure_unsealed("add_collateral")?;
        if self.collateral.iter().any(|(input, _)| *input == utxo.input) {
            return Ok(());
        }
        self.collateral.push((utxo.input, utxo.value));
        Ok(())
    }

    /// Add an output, enforcing the minimum-UTXO rule and the output
    /// value size cap
    pub fn add_output(&mut self, output: TxOutput) -> Result<(), BuildError> {
        self.ensure_unsealed("add_output")?;
        let required = min_utxo_lovelace(&self.config, &output);
        if output.value.lovelace < required {
            return Err(BuildError::OutputTooSmall {
                got: output.value.lovelace,
                required,
            });
        }
        let value_size =
            minicbor::to_vec(&output.value).expect("infallible write to Vec").len() as u32;
        if value_size > self.config.max_value_size {
            return Err(BuildError::LimitExceeded(format!(
                "output value of {value_size} bytes exceeds the {} byte cap",
                self.config.max_value_size
            )));
        }
        self.outputs.push(output);
        Ok(())
    }

    pub fn has_script_inputs(&self) -> bool {
        !self.script_inputs.is_empty()
    }

    /// Seal the script data: freeze the input set, resolve spend
    /// redeemer indexes against the sorted inputs and compute the
    /// script-data hash.
    ///
    /// `witness_datums` is what enters the hash. Pass `None` when every
    /// witnessed datum is already inline in its spent output - the
    /// witness set will still carry the datum for sizing, but the hash
    /// must be computed as if no datum were supplied.
    pub fn seal_script_data(
        &mut self,
        witness_datums: Option<&[PlutusData]>,
    ) -> Result<ScriptIntegrityHash, BuildError> {
        self.ensure_unsealed("seal_script_data")?;
        if self.script_inputs.is_empty() {
            return Err(BuildError::InvalidState(
                "no script inputs to seal script data for".to_string(),
            ));
        }

        // Only the cost models for the languages actually in use feed
        // the hash
        let mut cost_models = CostModels::new();
        for script_input in &self.script_inputs {
            let language = script_input.witness.script.language;
            let model = self.config.cost_models.get(language).ok_or_else(|| {
                BuildError::Config(format!("no cost model configured for {language:?}"))
            })?;
            cost_models.insert(language, model.clone());
        }

        let redeemers = self.resolved_redeemers();
        for redeemer in &redeemers {
            tracing::debug!(
                index = redeemer.index,
                mem = redeemer.ex_units.mem,
                steps = redeemer.ex_units.steps,
                "Sealing redeemer"
            );
        }

        let hash = hash_script_data(&redeemers, &cost_models, witness_datums);
        self.script_data_hash = Some(hash);
        self.sealed = true;
        Ok(hash)
    }

    /// Stage D: compute change against the supplied address, settle the
    /// fee at its fixed point and produce the unsigned transaction
    pub fn finalize(&self, change_address: Address) -> Result<UnsignedTransaction, BuildError> {
        if !self.script_inputs.is_empty() && self.script_data_hash.is_none() {
            return Err(BuildError::InvalidState(
                "script inputs present but script data was never sealed".to_string(),
            ));
        }

        let witness_bytes = self.pre_sign_witnesses().to_bytes();
        let declared_fee = ex_unit_fee(&self.config, &self.resolved_redeemers());

        let total_in = self.total_input();
        let total_out = self.total_output();
        let leftover = total_in.checked_sub(&total_out).ok_or_else(|| {
            BuildError::Selection(format!(
                "inputs of {} lovelace do not cover outputs of {} lovelace",
                total_in.lovelace, total_out.lovelace
            ))
        })?;

        // Fixed point with a change output present: the change value and
        // the fee field both perturb the serialized size
        let mut fee = 0u64;
        let mut with_change = None;
        for _ in 0..FEE_ITERATION_LIMIT {
            let Some(change_value) = leftover.checked_sub(&Value::coin(fee)) else {
                with_change = None;
                break;
            };
            let change_output = TxOutput::new(change_address.clone(), change_value);
            let body = self.body(Some(&change_output), fee);
            let tx = encode_transaction(&body.to_bytes(), &witness_bytes, true);
            let required = linear_fee(&self.config, tx.len()) + declared_fee;
            if required == fee {
                with_change = Some((change_output, body, tx));
                break;
            }
            fee = required;
        }

        let (change, body, tx_bytes, fee) = match with_change {
            Some((change_output, body, tx))
                if change_output.value.lovelace
                    >= min_utxo_lovelace(&self.config, &change_output) =>
            {
                (Some(change_output.value.clone()), body, tx, fee)
            }
            // Leftover too small for a change output: absorb it into the
            // fee, which only works when no assets would be burned
            _ => {
                if !leftover.coin_only() {
                    return Err(BuildError::Selection(
                        "leftover native assets cannot be absorbed into the fee".to_string(),
                    ));
                }
                let fee = leftover.lovelace;
                let body = self.body(None, fee);
                let tx = encode_transaction(&body.to_bytes(), &witness_bytes, true);
                let required = linear_fee(&self.config, tx.len()) + declared_fee;
                if fee < required {
                    return Err(BuildError::Selection(format!(
                        "leftover of {fee} lovelace does not cover the {required} lovelace fee"
                    )));
                }
                (None, body, tx, fee)
            }
        };

        if tx_bytes.len() as u32 > self.config.max_tx_size {
            return Err(BuildError::LimitExceeded(format!(
                "transaction of {} bytes exceeds the {} byte cap",
                tx_bytes.len(),
                self.config.max_tx_size
            )));
        }

        let body_bytes = body.to_bytes();
        tracing::debug!(
            size = tx_bytes.len(),
            fee,
            change = change.as_ref().map(|c| c.lovelace),
            "Finalized transaction draft"
        );

        Ok(UnsignedTransaction {
            body_bytes,
            witness_bytes,
            tx_bytes,
            fee,
            change,
        })
    }

    fn ensure_unsealed(&self, operation: &str) -> Result<(), BuildError> {
        if self.sealed {
            return Err(BuildError::InvalidState(format!(
                "{operation} after script data was sealed"
            )));
        }
        Ok(())
    }

    fn contains_input(&self, input: &TxInput) -> bool {
        self.inputs.iter().any(|(existing, _)| existing == input)
            || self.script_inputs.iter().any(|script| script.input == *input)
    }

    /// All spending inputs, in the lexicographic order the body encodes
    fn sorted_inputs(&self) -> Vec<TxInput> {
        let mut inputs: Vec<TxInput> = self
            .inputs
            .iter()
            .map(|(input, _)| input.clone())
            .chain(self.script_inputs.iter().map(|script| script.input.clone()))
            .collect();
        inputs.sort();
        inputs
    }

    /// Redeemers with spend indexes resolved against the sorted inputs
    fn resolved_redeemers(&self) -> Vec<Redeemer> {
        let sorted = self.sorted_inputs();
        self.script_inputs
            .iter()
            .map(|script| {
                let index = sorted
                    .iter()
                    .position(|input| *input == script.input)
                    .expect("script input is part of the input set") as u32;
                Redeemer {
                    index,
                    ..script.witness.redeemer.clone()
                }
            })
            .collect()
    }

    // The witness set the signer will see: scripts, witness datums and
    // redeemers. Witness datums are carried here for fee sizing even
    // when the hash excludes them.
    fn pre_sign_witnesses(&self) -> WitnessSet {
        let scripts: Vec<PlutusScript> =
            self.script_inputs.iter().map(|script| script.witness.script.clone()).collect();
        let datums: Vec<PlutusData> = self
            .script_inputs
            .iter()
            .filter_map(|script| script.witness.datum.clone())
            .collect();
        let redeemers = self.resolved_redeemers();
        WitnessSet::pre_sign(&scripts, &datums, &redeemers)
    }

    fn total_input(&self) -> Value {
        let mut total = Value::default();
        for (_, value) in &self.inputs {
            total += value;
        }
        for script in &self.script_inputs {
            total += &script.value;
        }
        total
    }

    fn total_output(&self) -> Value {
        let mut total = Value::default();
        for output in &self.outputs {
            total += &output.value;
        }
        total
    }

    fn body(&self, change: Option<&TxOutput>, fee: u64) -> TransactionBody {
        let mut outputs = self.outputs.clone();
        if let Some(change) = change {
            outputs.push(change.clone());
        }

        let mut collateral: Vec<TxInput> =
            self.collateral.iter().map(|(input, _)| input.clone()).collect();
        collateral.sort();

        TransactionBody {
            inputs: self.sorted_inputs(),
            outputs,
            fee,
            collateral,
            script_data_hash: self.script_data_hash,
        }
    }
}
