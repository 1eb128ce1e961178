//! Shared mock wallet for flow tests

use async_trait::async_trait;
use std::sync::Mutex;
use stoa_builder::{UtxoQuery, WalletApi};
use stoa_common::{Address, BuildError, ResolvedInput};

/// A scripted wallet: hands out configured UTXOs, "signs" by echoing the
/// witness set it was shown plus fresh vkey witnesses (the behavior real
/// signers exhibit - including echoing back witness datums), and records
/// what it was asked to sign and submit.
pub struct MockWallet {
    pub utxos: Vec<Vec<u8>>,
    pub collateral: Vec<Vec<u8>>,
    pub change_address: Address,
    pub fail_selection: bool,
    pub fail_signing: bool,
    pub fail_submission: bool,
    pub queries: Mutex<Vec<UtxoQuery>>,
    pub sign_requests: Mutex<Vec<Vec<u8>>>,
    pub submitted: Mutex<Vec<Vec<u8>>>,
}

impl MockWallet {
    pub fn new(change_address: Address) -> Self {
        Self {
            utxos: Vec::new(),
            collateral: Vec::new(),
            change_address,
            fail_selection: false,
            fail_signing: false,
            fail_submission: false,
            queries: Mutex::new(Vec::new()),
            sign_requests: Mutex::new(Vec::new()),
            submitted: Mutex::new(Vec::new()),
        }
    }

    pub fn with_utxo(mut self, utxo: &ResolvedInput) -> Self {
        self.utxos.push(encode_unspent_output(utxo));
        self
    }

    pub fn with_collateral(mut self, utxo: &ResolvedInput) -> Self {
        self.collateral.push(encode_unspent_output(utxo));
        self
    }
}

#[async_trait]
impl WalletApi for MockWallet {
    async fn select_utxos(&self, query: &UtxoQuery) -> Result<Vec<Vec<u8>>, BuildError> {
        self.queries.lock().unwrap().push(query.clone());
        if self.fail_selection {
            return Err(BuildError::Selection("not enough funds".to_string()));
        }
        Ok(self.utxos.clone())
    }

    async fn select_collateral(&self, _min_lovelace: u64) -> Result<Vec<Vec<u8>>, BuildError> {
        if self.fail_selection {
            return Err(BuildError::Selection("no collateral available".to_string()));
        }
        Ok(self.collateral.clone())
    }

    async fn change_address(&self) -> Result<Vec<u8>, BuildError> {
        Ok(self.change_address.to_binary())
    }

    async fn sign_transaction(&self, unsigned_tx: &[u8]) -> Result<Vec<u8>, BuildError> {
        self.sign_requests.lock().unwrap().push(unsigned_tx.to_vec());
        if self.fail_signing {
            return Err(BuildError::Signing("user declined".to_string()));
        }

        // echo the witness set the transaction already carries, plus a
        // vkey witness per "signing key"
        let (_, witness_span) = stoa_codec::decode_transaction(unsigned_tx)
            .map_err(|e| BuildError::Signing(e.to_string()))?;
        let mut witness_set = stoa_codec::WitnessSet::from_bytes(witness_span)?;
        witness_set.vkey_witnesses.push(vkey_witness_raw(0x51));
        Ok(witness_set.to_bytes())
    }

    async fn submit_transaction(&self, signed_tx: &[u8]) -> Result<String, BuildError> {
        self.submitted.lock().unwrap().push(signed_tx.to_vec());
        if self.fail_submission {
            return Err(BuildError::Submission("mempool rejected".to_string()));
        }
        Ok("a0af4fd0".to_string())
    }
}

/// Encode a `ResolvedInput` the way wallets return UTXOs: legacy
/// `[[tx_hash, index], [address, value]]`
pub fn encode_unspent_output(utxo: &ResolvedInput) -> Vec<u8> {
    let mut e = minicbor::Encoder::new(Vec::new());
    e.array(2).unwrap();
    e.array(2).unwrap();
    e.bytes(utxo.input.tx_hash.as_ref()).unwrap();
    e.u64(utxo.input.index).unwrap();
    e.array(2).unwrap();
    e.encode(&utxo.address).unwrap();
    e.encode(&utxo.value).unwrap();
    e.into_writer()
}

pub fn vkey_witness_raw(seed: u8) -> Vec<u8> {
    let mut e = minicbor::Encoder::new(Vec::new());
    e.array(2).unwrap();
    e.bytes(&[seed; 32]).unwrap();
    e.bytes(&[seed; 64]).unwrap();
    e.into_writer()
}
