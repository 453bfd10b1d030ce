//! TFHE Integration Tests
//!
//! Runs the lending flow on real TFHE ciphertexts with the small test
//! parameters. Key generation is shared across tests.

use novalend::prelude::*;
use novalend_fhe::FHEConfig;
use once_cell::sync::Lazy;

const ETH: u128 = 1_000_000_000_000_000_000;

static CLIENT: Lazy<TfheClient> =
    Lazy::new(|| TfheClient::generate(&FHEConfig::testing()).expect("TFHE key generation"));

fn deploy() -> LocalChain<TfheClient> {
    LocalChain::deploy(CLIENT.clone(), ChainConfig::default()).unwrap()
}

#[test]
fn test_overborrow_is_clamped_on_tfhe() {
    let mut chain = deploy();
    let alice = Address::from_label("alice");

    let mut client = chain.as_user(alice);
    client.stake_eth("1").unwrap();
    client.borrow_usdt("1500").unwrap();

    let position = client.decrypt_position().unwrap();
    assert_eq!(position.collateral, 1_000_000);
    assert_eq!(position.debt, 1_000_000_000);
    assert_eq!(position.balance, 1_000_000_000);
    assert_eq!(position.available, 0);
}

#[test]
fn test_snapshot_restores_tfhe_ciphertexts() {
    let mut chain = deploy();
    let alice = Address::from_label("alice");
    chain.stake(alice, ETH).unwrap();

    let snapshot = chain.snapshot().unwrap();
    let restored = LocalChain::restore(CLIENT.clone(), snapshot).unwrap();

    let handle = restored.encrypted_collateral_of(&alice).handle();
    assert_eq!(
        restored.user_decrypt_u64(handle, restored.engine_address(), alice).unwrap(),
        1_000_000
    );
}

#[test]
fn test_mock_snapshot_does_not_load_on_tfhe() {
    let mut mock = LocalChain::deploy(MockClient, ChainConfig::default()).unwrap();
    mock.stake(Address::from_label("alice"), ETH).unwrap();

    let snapshot = mock.snapshot().unwrap();
    assert!(LocalChain::restore(CLIENT.clone(), snapshot).is_err());
}
