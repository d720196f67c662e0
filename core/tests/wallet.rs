mod common;

use std::sync::Arc;

use common::*;
use tenebra_account::{AccountId, AccountSecrets, Address, Direction, RelayStatus};
use tenebra_config::TenebraConfig;
use tenebra_core::{
    Confirmation, Destination, MemoryChain, MemoryWalletStore, ScanState, Wallet, WalletBatch,
    WalletError, WalletStore,
};
use tenebra_primitives::RistrettoPrimitives;
use tokio_util::sync::CancellationToken;

fn test_config() -> TenebraConfig {
    let mut config = TenebraConfig::default();
    config.scan.follow = false;
    config.scan.poll_interval_ms = 10;
    config.relay.confirmation_timeout_secs = 5;
    config
}

fn memory_wallet(
    p: &Arc<RistrettoPrimitives>,
    chain: &Arc<MemoryChain>,
    verdict: Verdict,
    config: &TenebraConfig,
) -> (Wallet, Arc<TestRelay>) {
    let relay = TestRelay::new(chain.clone(), verdict);
    let wallet = Wallet::new(
        p.clone(),
        chain.clone(),
        Arc::new(MemoryWalletStore::new()),
        relay.clone(),
        config,
    );
    relay.connect(wallet.confirmations());
    (wallet, relay)
}

async fn rescan(wallet: &mut Wallet) {
    wallet.start_scan(CancellationToken::new()).unwrap();
    let state = wallet.wait_for_scan(ScanState::is_terminal).await.unwrap();
    assert_eq!(state, ScanState::Completed);
    wallet.stop_scan().await.unwrap();
}

/// A wallet holding one private account funded with `amount`.
async fn funded_wallet(verdict: Verdict, amount: u64) -> (Wallet, Arc<TestRelay>, AccountId) {
    let p = primitives();
    let chain = seeded_chain(p.as_ref());
    let (mut wallet, relay) = memory_wallet(&p, &chain, verdict, &test_config());
    let (keys, address) = private_keys(p.as_ref());
    let id = wallet.add_account(AccountSecrets::Private(keys)).unwrap();
    mine_reward(p.as_ref(), &chain, address, &[amount]);
    rescan(&mut wallet).await;
    assert_eq!(wallet.balance(&id).unwrap(), amount);
    (wallet, relay, id)
}

/// Pay `amount` to a fresh private address.
fn payment(p: &RistrettoPrimitives, amount: u64) -> [Destination; 1] {
    let (_, bob) = private_keys(p);
    [Destination::new(Address::Stealth(bob), amount)]
}

#[tokio::test]
async fn accepted_send_is_confirmed_and_scanned() {
    init_logger();
    let (mut wallet, relay, id) = funded_wallet(Verdict::Accept, 1000).await;
    let to_bob = payment(&primitives(), 400);

    let outcome = wallet
        .send(&id, &to_bob, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(outcome.confirmation, Confirmation::Accepted);
    assert_eq!(relay.sent().len(), 1);
    assert_eq!(wallet.confirmations().len(), 0);

    let history = wallet.history(&id).unwrap();
    let sent = history
        .iter()
        .find(|h| h.tx_id == outcome.transaction.id().0)
        .unwrap();
    assert_eq!(sent.direction, Direction::Sent);
    assert_eq!(sent.status, RelayStatus::Confirmed);
    assert_eq!(sent.amounts, vec![400]);

    // Until the scanner sees the spend the input stays reserved.
    assert_eq!(wallet.account(&id).unwrap().read().utxos().available_total(), 0);
    rescan(&mut wallet).await;
    assert_eq!(wallet.balance(&id).unwrap(), 600);
    assert_eq!(wallet.account(&id).unwrap().read().utxos().len(), 1);
}

#[tokio::test]
async fn rejected_send_releases_inputs() {
    let (wallet, _, id) = funded_wallet(Verdict::Reject, 1000).await;

    let outcome = wallet
        .send(&id, &payment(&primitives(), 400), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(outcome.confirmation, Confirmation::Rejected);

    let account = wallet.account(&id).unwrap().read();
    assert_eq!(account.utxos().available_total(), 1000);
    let history = wallet.history(&id).unwrap();
    assert!(
        history
            .iter()
            .any(|h| h.direction == Direction::Sent && h.status == RelayStatus::Rejected)
    );
}

#[tokio::test]
async fn cancelled_wait_still_returns_the_transaction() {
    let (wallet, relay, id) = funded_wallet(Verdict::Silent, 1000).await;
    let cancel = CancellationToken::new();
    cancel.cancel();

    let outcome = wallet
        .send(&id, &payment(&primitives(), 400), &cancel)
        .await
        .unwrap();
    assert_eq!(outcome.confirmation, Confirmation::Cancelled);
    assert_eq!(relay.sent()[0].id(), outcome.transaction.id());
    assert!(
        wallet
            .history(&id)
            .unwrap()
            .iter()
            .all(|h| h.direction == Direction::Received)
    );
    assert_eq!(wallet.confirmations().len(), 0);
}

#[tokio::test]
async fn unanswered_send_is_recorded_as_pending() {
    let p = primitives();
    let chain = seeded_chain(p.as_ref());
    let mut config = test_config();
    config.relay.confirmation_timeout_secs = 1;
    let (mut wallet, _) = memory_wallet(&p, &chain, Verdict::Silent, &config);
    let (keys, address) = private_keys(p.as_ref());
    let id = wallet.add_account(AccountSecrets::Private(keys)).unwrap();
    mine_reward(p.as_ref(), &chain, address, &[50]);
    rescan(&mut wallet).await;

    let outcome = wallet
        .send(&id, &payment(&p, 20), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(outcome.confirmation, Confirmation::TimedOut);
    let history = wallet.history(&id).unwrap();
    assert!(
        history
            .iter()
            .any(|h| h.direction == Direction::Sent && h.status == RelayStatus::Pending)
    );
}

#[tokio::test]
async fn failed_broadcast_releases_inputs() {
    let (wallet, relay, id) = funded_wallet(Verdict::Fail, 1000).await;

    let err = wallet
        .send(&id, &payment(&primitives(), 400), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, WalletError::Relay(_)));
    assert!(relay.sent().is_empty());
    assert_eq!(
        wallet.account(&id).unwrap().read().utxos().available_total(),
        1000
    );

    // The same funds can be sent once the relay is back.
    relay.set_verdict(Verdict::Accept);
    let outcome = wallet
        .send(&id, &payment(&primitives(), 1000), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(outcome.confirmation, Confirmation::Accepted);
}

#[tokio::test]
async fn second_scan_cannot_start_while_one_runs() {
    let p = primitives();
    let chain = seeded_chain(p.as_ref());
    let mut config = test_config();
    config.scan.follow = true;
    let (mut wallet, _) = memory_wallet(&p, &chain, Verdict::Accept, &config);
    let (keys, _) = private_keys(p.as_ref());
    wallet.add_account(AccountSecrets::Private(keys)).unwrap();

    wallet.start_scan(CancellationToken::new()).unwrap();
    assert!(matches!(
        wallet.start_scan(CancellationToken::new()),
        Err(WalletError::ScanRunning)
    ));
    wallet
        .wait_for_scan(|s| s == ScanState::Synced)
        .await
        .unwrap();
    wallet.pause_scan().await.unwrap();
    assert_eq!(wallet.scan_state(), Some(ScanState::Paused));
    wallet.resume_scan().await.unwrap();

    wallet.stop_scan().await.unwrap();
    assert_eq!(wallet.scan_state(), None);
    assert!(matches!(
        wallet.pause_scan().await,
        Err(WalletError::ServiceStopped)
    ));
}

#[tokio::test]
async fn lock_drops_utxos_and_unlock_reloads_them() {
    let p = primitives();
    let chain = seeded_chain(p.as_ref());
    let (mut wallet, _) = memory_wallet(&p, &chain, Verdict::Accept, &test_config());
    let (keys, address) = private_keys(p.as_ref());
    let id = wallet
        .add_account(AccountSecrets::Private(keys.clone()))
        .unwrap();
    mine_reward(p.as_ref(), &chain, address, &[70, 30]);
    rescan(&mut wallet).await;

    wallet.lock(&id).unwrap();
    assert_eq!(wallet.balance(&id).unwrap(), 0);
    assert!(matches!(
        wallet.build_transaction(&id, &payment(&p, 10)),
        Err(WalletError::AccountLocked(_))
    ));

    wallet.unlock(&id, AccountSecrets::Private(keys)).unwrap();
    assert_eq!(wallet.balance(&id).unwrap(), 100);
    let built = wallet.build_transaction(&id, &payment(&p, 90)).unwrap();
    assert_eq!(built.spent.len(), 2);
}

#[tokio::test]
async fn unlock_with_foreign_keys_fails() {
    let p = primitives();
    let chain = seeded_chain(p.as_ref());
    let (mut wallet, _) = memory_wallet(&p, &chain, Verdict::Accept, &test_config());
    let (keys, _) = private_keys(p.as_ref());
    let (other, _) = private_keys(p.as_ref());
    let id = wallet.add_account(AccountSecrets::Private(keys)).unwrap();

    wallet.lock(&id).unwrap();
    assert!(wallet.unlock(&id, AccountSecrets::Private(other)).is_err());
    assert!(wallet.account(&id).unwrap().read().is_locked());
}

#[tokio::test]
async fn corrupt_stored_output_is_skipped_on_unlock() {
    let (wallet, _, id) = funded_wallet(Verdict::Accept, 1000).await;
    let secrets = wallet.account(&id).unwrap().read().secrets().unwrap().clone();

    let mut corrupt = wallet.store().load_utxos(&id).unwrap().remove(0);
    corrupt.linking_tag = [7; 32];
    corrupt.tx_public_key = [0xff; 32];
    let mut batch = WalletBatch::default();
    batch.utxo_puts.push((id, corrupt));
    wallet.store().apply_batch(batch).unwrap();
    assert_eq!(wallet.store().load_utxos(&id).unwrap().len(), 2);

    wallet.lock(&id).unwrap();
    wallet.unlock(&id, secrets).unwrap();
    let account = wallet.account(&id).unwrap().read();
    assert!(!account.is_locked());
    assert_eq!(account.utxos().len(), 1);
    assert_eq!(account.balance(), 1000);
}

#[tokio::test]
async fn rocksdb_wallet_restores_after_reopen() {
    let p = primitives();
    let chain = seeded_chain(p.as_ref());
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config();
    config.wallet.db_path = dir.path().join("wallet").to_string_lossy().into_owned();
    let (keys, address) = private_keys(p.as_ref());
    mine_reward(p.as_ref(), &chain, address, &[250, 750]);

    let (before, tip) = {
        let relay = TestRelay::new(chain.clone(), Verdict::Accept);
        let mut wallet = Wallet::open(p.clone(), chain.clone(), relay, &config).unwrap();
        let id = wallet
            .add_account(AccountSecrets::Private(keys.clone()))
            .unwrap();
        rescan(&mut wallet).await;
        let account = wallet.account(&id).unwrap().read();
        (account.balance(), account.last_height())
    };
    assert_eq!(before, 1000);

    let relay = TestRelay::new(chain.clone(), Verdict::Accept);
    let mut wallet = Wallet::open(p.clone(), chain.clone(), relay, &config).unwrap();
    let id = wallet.add_account(AccountSecrets::Private(keys)).unwrap();
    {
        let account = wallet.account(&id).unwrap().read();
        assert_eq!(account.balance(), 1000);
        assert_eq!(account.last_height(), tip);
        assert_eq!(account.utxos().len(), 2);
    }
    assert_eq!(wallet.history(&id).unwrap().len(), 1);

    // Restored outputs are spendable.
    let built = wallet.build_transaction(&id, &payment(&p, 900)).unwrap();
    assert_eq!(built.spent.len(), 2);
}

#[tokio::test]
async fn wallet_opens_from_a_config_file() {
    let p = primitives();
    let chain = seeded_chain(p.as_ref());
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("wallet");
    let config_path = dir.path().join("wallet.toml");
    std::fs::write(
        &config_path,
        format!(
            "[wallet]\ndb_path = {:?}\n\n[scan]\nfollow = false\npoll_interval_ms = 10\n",
            db_path.to_string_lossy()
        ),
    )
    .unwrap();

    let relay = TestRelay::new(chain.clone(), Verdict::Accept);
    let mut wallet = Wallet::open_configured(p.clone(), chain.clone(), relay, Some(&config_path))
        .unwrap();
    let (keys, address) = private_keys(p.as_ref());
    let id = wallet.add_account(AccountSecrets::Private(keys)).unwrap();
    mine_reward(p.as_ref(), &chain, address, &[12]);
    rescan(&mut wallet).await;
    assert_eq!(wallet.balance(&id).unwrap(), 12);
    assert!(db_path.exists());

    let relay = TestRelay::new(chain.clone(), Verdict::Accept);
    let missing = dir.path().join("missing.toml");
    assert!(matches!(
        Wallet::open_configured(p, chain, relay, Some(&missing)),
        Err(WalletError::Config(_))
    ));
}

#[tokio::test]
async fn locked_account_added_by_address_scans_after_unlock() {
    let p = primitives();
    let chain = seeded_chain(p.as_ref());
    let (mut wallet, _) = memory_wallet(&p, &chain, Verdict::Accept, &test_config());
    let (keys, address) = private_keys(p.as_ref());
    let id = wallet.add_locked_account(Address::Stealth(address)).unwrap();
    mine_reward(p.as_ref(), &chain, address, &[5]);

    rescan(&mut wallet).await;
    assert_eq!(wallet.balance(&id).unwrap(), 0);
    assert_eq!(wallet.store().checkpoint(&id).unwrap(), None);

    wallet.unlock(&id, AccountSecrets::Private(keys)).unwrap();
    rescan(&mut wallet).await;
    assert_eq!(wallet.balance(&id).unwrap(), 5);
}
