mod common;

use std::collections::HashSet;

use common::*;
use tenebra_account::{Address, UtxoKey};
use tenebra_core::{Destination, TransactionBuilder, WalletError, verify_transaction};
use tenebra_primitives::{Point, Primitives, Scalar};
use tenebra_privacy::{IDENTITY_MASK, RING_SIZE, commit};
use tenebra_transaction::{Transaction, TransactionVariant};

#[test]
fn pure_private_spend() {
    init_logger();
    let p = primitives();
    let chain = seeded_chain(p.as_ref());
    let (alice, alice_addr) = private_account(p.as_ref());
    let (bob_keys, bob_addr) = private_keys(p.as_ref());
    mine_reward(p.as_ref(), &chain, alice_addr, &[1000]);
    sync(p.as_ref(), chain.as_ref(), &alice);

    let builder = TransactionBuilder::new(p.as_ref(), chain.as_ref());
    let built = builder
        .build(&alice, &[Destination::new(Address::Stealth(bob_addr), 400)])
        .unwrap();
    let tx = &built.transaction;

    assert_eq!(tx.variant(), TransactionVariant::Private);
    assert_eq!(tx.private_outputs().len(), 2);
    assert_eq!(tx.num_outputs(), 2);
    assert_eq!(tx.pseudo_outputs().len(), 1);
    assert_eq!(tx.ring_signatures().len(), 1);
    assert!(tx.range_proof().is_some());
    assert!(tx.transparent_outputs().is_empty());
    assert!(!tx.uses_identity_mask());
    verify_transaction(p.as_ref(), chain.as_ref(), tx).unwrap();

    // The spent output stays reserved until the scanner sees the spend.
    assert_eq!(built.spent.len(), 1);
    assert!(alice.read().utxos().is_reserved(&built.spent[0]));

    chain.append(None, vec![tx.clone()]).unwrap();
    sync(p.as_ref(), chain.as_ref(), &alice);
    assert_eq!(alice.read().balance(), 600);

    let bob = account_for(p.as_ref(), bob_keys);
    sync(p.as_ref(), chain.as_ref(), &bob);
    assert_eq!(bob.read().balance(), 400);
}

#[test]
fn pure_transparent_spend() {
    let p = primitives();
    let chain = seeded_chain(p.as_ref());
    let (alice, alice_addr) = transparent_account(p.as_ref());
    let (_, bob_addr) = transparent_account(p.as_ref());
    chain
        .append(None, vec![transparent_funding(alice_addr, 500, 1)])
        .unwrap();
    sync(p.as_ref(), chain.as_ref(), &alice);
    assert_eq!(alice.read().balance(), 500);

    let builder = TransactionBuilder::new(p.as_ref(), chain.as_ref());
    let built = builder
        .build(&alice, &[Destination::new(Address::Transparent(bob_addr), 500)])
        .unwrap();
    let tx = &built.transaction;

    assert_eq!(tx.variant(), TransactionVariant::Transparent);
    assert_eq!(tx.transparent_outputs().len(), 1);
    assert_eq!(tx.transparent_outputs()[0].amount, 500);
    assert_eq!(tx.transparent_signatures().len(), 1);
    assert!(tx.private_outputs().is_empty());
    assert!(tx.range_proof().is_none());
    assert!(tx.tx_public_key().is_none());
    verify_transaction(p.as_ref(), chain.as_ref(), tx).unwrap();
}

#[test]
fn transparent_to_private_uses_identity_mask() {
    let p = primitives();
    let chain = seeded_chain(p.as_ref());
    let (alice, alice_addr) = transparent_account(p.as_ref());
    let (bob, bob_addr) = private_account(p.as_ref());
    chain
        .append(None, vec![transparent_funding(alice_addr, 300, 2)])
        .unwrap();
    sync(p.as_ref(), chain.as_ref(), &alice);

    let builder = TransactionBuilder::new(p.as_ref(), chain.as_ref());
    let built = builder
        .build(&alice, &[Destination::new(Address::Stealth(bob_addr), 300)])
        .unwrap();
    let tx = &built.transaction;

    assert_eq!(tx.variant(), TransactionVariant::Mixed);
    assert_eq!(tx.transparent_inputs().len(), 1);
    assert_eq!(tx.private_outputs().len(), 1);
    assert!(tx.range_proof().is_some());
    assert!(tx.uses_identity_mask());
    assert_eq!(
        tx.private_outputs()[0].commitment,
        commit(p.as_ref(), &IDENTITY_MASK, 300)
    );
    verify_transaction(p.as_ref(), chain.as_ref(), tx).unwrap();

    chain.append(None, vec![tx.clone()]).unwrap();
    sync(p.as_ref(), chain.as_ref(), &bob);
    let bob = bob.read();
    assert_eq!(bob.balance(), 300);
    let utxo = bob.utxos().iter().next().unwrap();
    assert_eq!(utxo.private_data().unwrap().mask, IDENTITY_MASK);
}

#[test]
fn private_to_transparent_keeps_private_change() {
    let p = primitives();
    let chain = seeded_chain(p.as_ref());
    let (alice, alice_addr) = private_account(p.as_ref());
    let (carol, carol_addr) = transparent_account(p.as_ref());
    mine_reward(p.as_ref(), &chain, alice_addr, &[1000]);
    sync(p.as_ref(), chain.as_ref(), &alice);

    let builder = TransactionBuilder::new(p.as_ref(), chain.as_ref());
    let built = builder
        .build(&alice, &[Destination::new(Address::Transparent(carol_addr), 250)])
        .unwrap();
    let tx = &built.transaction;

    assert_eq!(tx.variant(), TransactionVariant::Mixed);
    assert_eq!(tx.transparent_outputs().len(), 1);
    assert_eq!(tx.private_outputs().len(), 1, "change returns as a private output");
    verify_transaction(p.as_ref(), chain.as_ref(), tx).unwrap();

    chain.append(None, vec![tx.clone()]).unwrap();
    sync(p.as_ref(), chain.as_ref(), &alice);
    sync(p.as_ref(), chain.as_ref(), &carol);
    assert_eq!(alice.read().balance(), 750);
    assert_eq!(carol.read().balance(), 250);
}

#[test]
fn insufficient_funds_leaves_utxos_untouched() {
    let p = primitives();
    let chain = seeded_chain(p.as_ref());
    let (alice, alice_addr) = private_account(p.as_ref());
    let (_, bob_addr) = private_keys(p.as_ref());
    mine_reward(p.as_ref(), &chain, alice_addr, &[499, 500]);
    sync(p.as_ref(), chain.as_ref(), &alice);

    let builder = TransactionBuilder::new(p.as_ref(), chain.as_ref());
    let err = builder
        .build(&alice, &[Destination::new(Address::Stealth(bob_addr), 1000)])
        .unwrap_err();
    assert!(matches!(
        err,
        WalletError::InsufficientFunds {
            requested: 1000,
            available: 999
        }
    ));

    let alice = alice.read();
    assert_eq!(alice.utxos().len(), 2);
    assert_eq!(alice.utxos().available_total(), 999);
}

#[test]
fn pseudo_outputs_balance_output_commitments() {
    let p = primitives();
    let chain = seeded_chain(p.as_ref());
    let (alice, alice_addr) = private_account(p.as_ref());
    let (_, bob_addr) = private_keys(p.as_ref());
    mine_reward(p.as_ref(), &chain, alice_addr, &[300, 700]);
    sync(p.as_ref(), chain.as_ref(), &alice);

    let builder = TransactionBuilder::new(p.as_ref(), chain.as_ref());
    let built = builder
        .build(&alice, &[Destination::new(Address::Stealth(bob_addr), 900)])
        .unwrap();
    let tx = &built.transaction;
    assert_eq!(tx.private_inputs().len(), 2);

    let pseudo = point_sum(p.as_ref(), tx.pseudo_outputs());
    let outputs: Vec<Point> = tx.private_outputs().iter().map(|o| o.commitment).collect();
    let outputs = point_sum(p.as_ref(), &outputs);
    assert_eq!(p.point_sub(&pseudo, &outputs).unwrap(), Point::IDENTITY);
    verify_transaction(p.as_ref(), chain.as_ref(), tx).unwrap();
}

#[test]
fn rings_hold_distinct_members_and_the_real_output() {
    let p = primitives();
    let chain = seeded_chain(p.as_ref());
    let (alice, alice_addr) = private_account(p.as_ref());
    let (_, bob_addr) = private_keys(p.as_ref());
    mine_reward(p.as_ref(), &chain, alice_addr, &[1000]);
    sync(p.as_ref(), chain.as_ref(), &alice);
    let real = alice
        .read()
        .utxos()
        .iter()
        .next()
        .and_then(|u| u.private_data().map(|d| d.global_index))
        .unwrap();

    let builder = TransactionBuilder::new(p.as_ref(), chain.as_ref());
    let built = builder
        .build(&alice, &[Destination::new(Address::Stealth(bob_addr), 10)])
        .unwrap();
    let offsets = &built.transaction.private_inputs()[0].offsets;

    assert_eq!(offsets.len(), RING_SIZE);
    assert_eq!(offsets.iter().collect::<HashSet<_>>().len(), RING_SIZE);
    assert!(offsets.contains(&real));
}

#[test]
fn tampered_transaction_fails_verification() {
    let p = primitives();
    let chain = seeded_chain(p.as_ref());
    let (alice, alice_addr) = private_account(p.as_ref());
    let (_, bob_addr) = private_keys(p.as_ref());
    mine_reward(p.as_ref(), &chain, alice_addr, &[1000]);
    sync(p.as_ref(), chain.as_ref(), &alice);

    let builder = TransactionBuilder::new(p.as_ref(), chain.as_ref());
    let built = builder
        .build(&alice, &[Destination::new(Address::Stealth(bob_addr), 400)])
        .unwrap();

    // Inflate the payment: the prefix changes, so every signature goes stale.
    let mut prefix = built.transaction.prefix().clone();
    prefix.private_outputs[0].commitment = commit(p.as_ref(), &Scalar::ONE, 5000);
    let forged = Transaction::new(prefix, built.transaction.witness().clone()).unwrap();
    assert!(matches!(
        verify_transaction(p.as_ref(), chain.as_ref(), &forged),
        Err(WalletError::InvalidTransaction(_))
    ));
}

#[test]
fn concurrent_builds_never_share_inputs() {
    let p = primitives();
    let chain = seeded_chain(p.as_ref());
    let (alice, alice_addr) = private_account(p.as_ref());
    let (_, bob_addr) = private_keys(p.as_ref());
    mine_reward(p.as_ref(), &chain, alice_addr, &[600, 600]);
    sync(p.as_ref(), chain.as_ref(), &alice);

    let destination = [Destination::new(Address::Stealth(bob_addr), 500)];
    let spent: Vec<Vec<UtxoKey>> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..2)
            .map(|_| {
                s.spawn(|| {
                    TransactionBuilder::new(p.as_ref(), chain.as_ref())
                        .build(&alice, &destination)
                        .unwrap()
                        .spent
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert_eq!(spent[0].len(), 1);
    assert_eq!(spent[1].len(), 1);
    assert_ne!(spent[0][0], spent[1][0]);

    let third = TransactionBuilder::new(p.as_ref(), chain.as_ref()).build(&alice, &destination);
    assert!(matches!(
        third,
        Err(WalletError::InsufficientFunds { available: 0, .. })
    ));
}

#[test]
fn locked_account_cannot_build() {
    let p = primitives();
    let chain = seeded_chain(p.as_ref());
    let (alice, _) = private_account(p.as_ref());
    let (_, bob_addr) = private_keys(p.as_ref());
    alice.write().lock();

    let err = TransactionBuilder::new(p.as_ref(), chain.as_ref())
        .build(&alice, &[Destination::new(Address::Stealth(bob_addr), 1)])
        .unwrap_err();
    assert!(matches!(err, WalletError::AccountLocked(id) if id == alice.id()));
}
