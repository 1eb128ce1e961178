//! End-to-end send flow over the mock wallet

mod common;

use common::MockWallet;
use serde_json::json;
use stoa_builder::{SendParams, UtxoQuery, send_to_script};
use stoa_codec::{WitnessSet, decode_transaction};
use stoa_common::{
    Address, AddressNetwork, AssetName, BuildError, BuilderConfig, KeyHash, NativeAsset, PolicyId,
    ResolvedInput, ShelleyAddress, ShelleyAddressDelegationPart, ShelleyAddressPaymentPart,
    TxHash, TxInput, Value,
};

const SCRIPT_ADDRESS: &str = "addr_test1wrh5pj6nlmdrmtv6uv69edjh5x3gx7px7zchxag47s23gtgu02rzy";

fn key_address(seed: u8) -> Address {
    Address::Shelley(ShelleyAddress {
        network: AddressNetwork::Test,
        payment: ShelleyAddressPaymentPart::PaymentKeyHash(
            KeyHash::try_from(vec![seed; 28]).unwrap(),
        ),
        delegation: ShelleyAddressDelegationPart::None,
    })
}

fn one_token() -> Value {
    Value::new(
        0,
        vec![(
            PolicyId::new([0x4b; 28]),
            vec![NativeAsset {
                name: AssetName::new(b"TNFT").unwrap(),
                amount: 1,
            }],
        )],
    )
}

fn wallet_utxo(lovelace: u64) -> ResolvedInput {
    ResolvedInput {
        input: TxInput::new(TxHash::new([0xaa; 32]), 0),
        address: key_address(0x11),
        value: Value::coin(lovelace) + one_token(),
    }
}

fn send_params() -> SendParams {
    SendParams {
        to: Address::from_string(SCRIPT_ADDRESS).unwrap(),
        amount: Value::coin(4_000_000) + one_token(),
        selection_target: Value::coin(4_000_000) + one_token(),
        datum: json!({"int": 1}),
    }
}

#[tokio::test]
async fn send_builds_signs_and_submits() {
    let wallet = MockWallet::new(key_address(0x33)).with_utxo(&wallet_utxo(10_000_000));
    let config = BuilderConfig::default();

    let tx_id = send_to_script(&wallet, &config, send_params()).await.unwrap();
    assert_eq!(tx_id, "a0af4fd0");

    // the wallet was queried with the full target value
    let queries = wallet.queries.lock().unwrap();
    assert_eq!(
        queries.as_slice(),
        &[UtxoQuery::Target(Value::coin(4_000_000) + one_token())]
    );

    // the signed body is byte-identical to the body that was signed
    let sign_requests = wallet.sign_requests.lock().unwrap();
    let submitted = wallet.submitted.lock().unwrap();
    let (unsigned_body, unsigned_witnesses) = decode_transaction(&sign_requests[0]).unwrap();
    let (submitted_body, submitted_witnesses) = decode_transaction(&submitted[0]).unwrap();
    assert_eq!(unsigned_body, submitted_body);

    // no datum was witnessed, so the signer's witness set went through
    // unchanged and gained the signature
    assert!(WitnessSet::from_bytes(unsigned_witnesses).unwrap().vkey_witnesses.is_empty());
    let final_witnesses = WitnessSet::from_bytes(submitted_witnesses).unwrap();
    assert_eq!(final_witnesses.vkey_witnesses.len(), 1);
    assert!(!final_witnesses.has_datums());

    // the inline datum rides in the body under tag 24
    assert!(submitted_body.windows(2).any(|w| w == [0xd8, 0x18]));
}

#[tokio::test]
async fn selection_failure_aborts_before_signing() {
    let mut wallet = MockWallet::new(key_address(0x33)).with_utxo(&wallet_utxo(10_000_000));
    wallet.fail_selection = true;
    let config = BuilderConfig::default();

    let result = send_to_script(&wallet, &config, send_params()).await;
    assert!(matches!(result, Err(BuildError::Selection(_))));
    assert!(wallet.sign_requests.lock().unwrap().is_empty());
    assert!(wallet.submitted.lock().unwrap().is_empty());
}

#[tokio::test]
async fn signing_rejection_aborts_before_submission() {
    let mut wallet = MockWallet::new(key_address(0x33)).with_utxo(&wallet_utxo(10_000_000));
    wallet.fail_signing = true;
    let config = BuilderConfig::default();

    let result = send_to_script(&wallet, &config, send_params()).await;
    assert!(matches!(result, Err(BuildError::Signing(_))));
    assert!(wallet.submitted.lock().unwrap().is_empty());
}

#[tokio::test]
async fn malformed_datum_aborts_before_any_wallet_call() {
    let wallet = MockWallet::new(key_address(0x33)).with_utxo(&wallet_utxo(10_000_000));
    let config = BuilderConfig::default();

    let mut params = send_params();
    params.datum = json!({"bogus": 1});
    let result = send_to_script(&wallet, &config, params).await;
    assert!(matches!(result, Err(BuildError::Datum(_))));
    assert!(wallet.queries.lock().unwrap().is_empty());
}

#[tokio::test]
async fn insufficient_funds_surface_as_selection_error() {
    // wallet returns a UTXO that cannot cover the output
    let wallet = MockWallet::new(key_address(0x33)).with_utxo(&ResolvedInput {
        input: TxInput::new(TxHash::new([0xaa; 32]), 0),
        address: key_address(0x11),
        value: Value::coin(1_000_000) + one_token(),
    });
    let config = BuilderConfig::default();

    let result = send_to_script(&wallet, &config, send_params()).await;
    assert!(matches!(result, Err(BuildError::Selection(_))));
}
