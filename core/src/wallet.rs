//! The wallet: accounts plus the collaborators they are built and scanned
//! against.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};
use tenebra_account::{
    Account, AccountId, AccountSecrets, Address, HistoryTx, RelayStatus, UtxoKey,
};
use tenebra_config::TenebraConfig;
use tenebra_primitives::Primitives;
use tenebra_transaction::Transaction;
use tokio_util::sync::CancellationToken;

use crate::builder::{BuiltTransaction, Destination, TransactionBuilder};
use crate::chain::ChainView;
use crate::error::{Result, WalletError};
use crate::relay::{Confirmation, NetworkRelay, RelayConfirmations};
use crate::scan::{ScanConfig, ScanContext, ScanService, ScanState, ScanStatus};
use crate::shared::SharedAccount;
use crate::storage::{RocksDbWalletStore, WalletStore};

/// What [`Wallet::send`] observed after broadcasting.
#[derive(Debug, Clone)]
pub struct SendOutcome {
    pub transaction: Transaction,
    pub confirmation: Confirmation,
}

pub struct Wallet {
    primitives: Arc<dyn Primitives>,
    chain: Arc<dyn ChainView>,
    store: Arc<dyn WalletStore>,
    relay: Arc<dyn NetworkRelay>,
    confirmations: RelayConfirmations,
    accounts: Vec<SharedAccount>,
    scanner: Option<ScanService>,
    scan_config: ScanConfig,
    confirmation_timeout: Option<Duration>,
}

impl Wallet {
    pub fn new(
        primitives: Arc<dyn Primitives>,
        chain: Arc<dyn ChainView>,
        store: Arc<dyn WalletStore>,
        relay: Arc<dyn NetworkRelay>,
        config: &TenebraConfig,
    ) -> Self {
        let timeout = config.relay.confirmation_timeout_secs;
        Self {
            primitives,
            chain,
            store,
            relay,
            confirmations: RelayConfirmations::new(),
            accounts: Vec::new(),
            scanner: None,
            scan_config: ScanConfig::from(&config.scan),
            confirmation_timeout: (timeout > 0).then(|| Duration::from_secs(timeout)),
        }
    }

    /// A wallet persisted in RocksDB at `config.wallet.db_path`.
    pub fn open(
        primitives: Arc<dyn Primitives>,
        chain: Arc<dyn ChainView>,
        relay: Arc<dyn NetworkRelay>,
        config: &TenebraConfig,
    ) -> Result<Self> {
        let store = RocksDbWalletStore::open(&config.wallet.db_path)?;
        info!("opened wallet store at {}", config.wallet.db_path);
        Ok(Self::new(primitives, chain, Arc::new(store), relay, config))
    }

    /// [`Wallet::open`] with configuration read from `path`, or from the
    /// default locations when `None`. `TN_*` environment variables apply on top.
    pub fn open_configured(
        primitives: Arc<dyn Primitives>,
        chain: Arc<dyn ChainView>,
        relay: Arc<dyn NetworkRelay>,
        path: Option<&Path>,
    ) -> Result<Self> {
        let config = match path {
            Some(path) => TenebraConfig::load_from(path),
            None => TenebraConfig::load(),
        }
        .map_err(WalletError::Config)?;
        Self::open(primitives, chain, relay, &config)
    }

    pub fn primitives(&self) -> &dyn Primitives {
        self.primitives.as_ref()
    }

    pub fn store(&self) -> &Arc<dyn WalletStore> {
        &self.store
    }

    /// Relay events are delivered here with [`RelayConfirmations::notify`].
    pub fn confirmations(&self) -> &RelayConfirmations {
        &self.confirmations
    }

    // Accounts

    /// Add an unlocked account, restoring its checkpoint and UTXOs from the
    /// store. A running scan picks it up on its next start.
    pub fn add_account(&mut self, secrets: AccountSecrets) -> Result<AccountId> {
        let mut account = Account::new(self.primitives(), secrets);
        self.restore(&mut account)?;
        Ok(self.insert(account))
    }

    /// Add an account known only by address; unlock it to spend or scan.
    pub fn add_locked_account(&mut self, address: Address) -> Result<AccountId> {
        let mut account = Account::locked(address);
        self.restore(&mut account)?;
        Ok(self.insert(account))
    }

    fn insert(&mut self, account: Account) -> AccountId {
        let id = account.id();
        if self.accounts.iter().any(|a| a.id() == id) {
            warn!("account {} already present, keeping the existing entry", id);
            return id;
        }
        info!(
            "added account {} ({:?}), balance {}, next height {}",
            id,
            account.kind(),
            account.balance(),
            account.next_height()
        );
        self.accounts.push(SharedAccount::new(account));
        id
    }

    fn restore(&self, account: &mut Account) -> Result<()> {
        account.set_last_height(self.store.checkpoint(&account.id())?);
        account.utxos_mut().clear();
        let keys = match account.secrets() {
            Ok(AccountSecrets::Private(keys)) => Some(keys.clone()),
            Ok(AccountSecrets::Transparent(_)) => None,
            Err(_) => return Ok(()),
        };
        let records = self.store.load_utxos(&account.id())?;
        for record in &records {
            match record.restore(self.primitives(), keys.as_ref()) {
                Ok(utxo) => {
                    account.utxos_mut().insert(utxo);
                }
                Err(e) => warn!(
                    "account {}: skipping stored output {}:{}: {}",
                    account.id(),
                    hex::encode(record.tx_src),
                    record.index,
                    e
                ),
            }
        }
        Ok(())
    }

    pub fn accounts(&self) -> &[SharedAccount] {
        &self.accounts
    }

    pub fn account(&self, id: &AccountId) -> Result<&SharedAccount> {
        self.accounts
            .iter()
            .find(|a| a.id() == *id)
            .ok_or(WalletError::UnknownAccount(*id))
    }

    pub fn balance(&self, id: &AccountId) -> Result<u64> {
        Ok(self.account(id)?.read().balance())
    }

    pub fn history(&self, id: &AccountId) -> Result<Vec<HistoryTx>> {
        self.account(id)?;
        Ok(self.store.history(id)?)
    }

    /// Drop the account's secrets and in-memory UTXOs. The scanner skips it
    /// until it is unlocked.
    pub fn lock(&self, id: &AccountId) -> Result<()> {
        self.account(id)?.write().lock();
        Ok(())
    }

    /// Reinstall secrets and reload the persisted UTXOs.
    pub fn unlock(&self, id: &AccountId, secrets: AccountSecrets) -> Result<()> {
        let shared = self.account(id)?;
        let mut account = shared.write();
        account.unlock(self.primitives(), secrets)?;
        if let Err(e) = self.restore(&mut account) {
            account.lock();
            return Err(e);
        }
        Ok(())
    }

    // Sending

    pub fn build_transaction(
        &self,
        id: &AccountId,
        destinations: &[Destination],
    ) -> Result<BuiltTransaction> {
        let account = self.account(id)?;
        TransactionBuilder::new(self.primitives(), self.chain.as_ref()).build(account, destinations)
    }

    /// Return reserved inputs of a transaction that will not be mined.
    fn release(&self, id: &AccountId, keys: &[UtxoKey]) -> Result<()> {
        let mut account = self.account(id)?.write();
        for key in keys {
            account.utxos_mut().release(key);
        }
        Ok(())
    }

    /// Build, broadcast and wait for the relay's verdict.
    ///
    /// The listener is registered before the broadcast so a fast relay event
    /// is not lost. Cancelling `cancel` ends the wait without touching wallet
    /// state; the transaction is still returned.
    pub async fn send(
        &self,
        id: &AccountId,
        destinations: &[Destination],
        cancel: &CancellationToken,
    ) -> Result<SendOutcome> {
        let BuiltTransaction {
            transaction,
            spent,
            mut history,
        } = self.build_transaction(id, destinations)?;

        let pending = self.confirmations.register(transaction.id());
        if let Err(e) = self.relay.broadcast(&transaction) {
            self.release(id, &spent)?;
            return Err(WalletError::Relay(e));
        }
        info!("broadcast tx {}", transaction.id());

        let confirmation = pending.wait(cancel, self.confirmation_timeout).await;
        match confirmation {
            Confirmation::Accepted => {
                history.status = RelayStatus::Confirmed;
                self.store.put_history(*id, history)?;
                info!("tx {} accepted by the network", transaction.id());
            }
            Confirmation::Rejected => {
                self.release(id, &spent)?;
                history.status = RelayStatus::Rejected;
                self.store.put_history(*id, history)?;
                warn!("tx {} rejected by the network", transaction.id());
            }
            Confirmation::TimedOut => {
                self.store.put_history(*id, history)?;
                warn!("no relay verdict for tx {} yet, recorded as pending", transaction.id());
            }
            Confirmation::Cancelled => {
                info!("stopped waiting for tx {}", transaction.id());
            }
        }
        Ok(SendOutcome {
            transaction,
            confirmation,
        })
    }

    // Scanning

    /// Start scanning every account in the background, replacing a scan
    /// that already ended.
    pub fn start_scan(&mut self, cancel: CancellationToken) -> Result<()> {
        if self.scanner.as_ref().is_some_and(|s| !s.is_finished()) {
            return Err(WalletError::ScanRunning);
        }
        let ctx = ScanContext {
            primitives: self.primitives.clone(),
            chain: self.chain.clone(),
            store: self.store.clone(),
        };
        self.scanner = Some(ScanService::start(
            ctx,
            self.accounts.clone(),
            self.scan_config.clone(),
            cancel,
        ));
        Ok(())
    }

    fn scanner(&self) -> Result<&ScanService> {
        self.scanner.as_ref().ok_or(WalletError::ServiceStopped)
    }

    pub fn scan_state(&self) -> Option<ScanState> {
        self.scanner.as_ref().map(ScanService::state)
    }

    pub async fn scan_status(&self) -> Result<ScanStatus> {
        self.scanner()?.status().await
    }

    pub async fn pause_scan(&self) -> Result<()> {
        self.scanner()?.pause().await
    }

    pub async fn resume_scan(&self) -> Result<()> {
        self.scanner()?.resume().await
    }

    pub async fn pause_account(&self, id: &AccountId) -> Result<()> {
        self.scanner()?.pause_account(*id).await
    }

    pub async fn resume_account(&self, id: &AccountId) -> Result<()> {
        self.scanner()?.resume_account(*id).await
    }

    /// Wait for the scan to reach a state matching `pred`.
    pub async fn wait_for_scan(&self, pred: impl Fn(ScanState) -> bool) -> Result<ScanState> {
        Ok(self.scanner()?.wait_for(pred).await)
    }

    /// Cancel the scan and wait for it to stop.
    pub async fn stop_scan(&mut self) -> Result<()> {
        let Some(scanner) = self.scanner.take() else {
            return Ok(());
        };
        scanner.cancel();
        scanner.join().await
    }
}
