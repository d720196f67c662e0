//! Background fund scanning.
//!
//! ```text
//! ┌──────────────┐  get_blocks   ┌───────────────────────────────────────┐
//! │  ChainView   │──────────────▶│ ScanTask                              │
//! └──────────────┘               │  chunk ─┬─▶ account A (blocking) ─┐   │
//!                                │         ├─▶ account B (blocking) ─┼─▶ │ WalletBatch
//! ┌──────────────┐  commands     │         └─▶ account C (blocking) ─┘   │     │
//! │ ScanService  │──────────────▶│  pause / resume / status between steps │     ▼
//! └──────────────┘  watch state  └───────────────────────────────────────┘ WalletStore
//! ```
//!
//! Every step scans one block (sequential mode) or one chunk (parallel
//! mode) for every active account, persists all deltas and checkpoints in
//! one batch, and only then applies the deltas in memory.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use log::{error, info, warn};
use tenebra_account::{AccountError, AccountId, AccountSecrets, Address};
use tenebra_block::Block;
use tenebra_config::ScanTomlConfig;
use tenebra_primitives::Primitives;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::chain::ChainView;
use crate::error::{Result, WalletError};
use crate::scan::block::{AccountScanner, BlockScan, ScanKeys};
use crate::scan::state::ScanState;
use crate::shared::SharedAccount;
use crate::storage::{WalletBatch, WalletStore};

/// We log an info log with progress after this many blocks.
pub const INFO_LOG_INTERVAL: u64 = 1_000;

// Configuration

#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Blocks per step in parallel mode.
    pub chunk_size: u64,
    /// Tip polling delay once synced.
    pub poll_interval: Duration,
    /// Keep following the tip instead of completing.
    pub follow: bool,
    /// Fan each chunk out to all accounts on blocking threads.
    pub parallel: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::from(&ScanTomlConfig::default())
    }
}

impl From<&ScanTomlConfig> for ScanConfig {
    fn from(toml: &ScanTomlConfig) -> Self {
        Self {
            chunk_size: toml.chunk_size.max(1),
            poll_interval: Duration::from_millis(toml.poll_interval_ms),
            follow: toml.follow,
            parallel: toml.parallel,
        }
    }
}

/// Collaborators a scan reads from and writes to.
#[derive(Clone)]
pub struct ScanContext {
    pub primitives: Arc<dyn Primitives>,
    pub chain: Arc<dyn ChainView>,
    pub store: Arc<dyn WalletStore>,
}

// Commands

enum ScanCommand {
    /// Pause the whole service, or one account when given.
    Pause(Option<AccountId>, oneshot::Sender<Result<()>>),
    Resume(Option<AccountId>, oneshot::Sender<Result<()>>),
    Status(oneshot::Sender<ScanStatus>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountStatus {
    pub id: AccountId,
    pub last_height: Option<u64>,
    pub paused: bool,
    pub locked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanStatus {
    pub state: ScanState,
    pub accounts: Vec<AccountStatus>,
}

// Scan task

struct ScanTask {
    ctx: ScanContext,
    accounts: Vec<SharedAccount>,
    paused: HashSet<AccountId>,
    warned_locked: HashSet<AccountId>,
    config: ScanConfig,
    state: ScanState,
    state_tx: watch::Sender<ScanState>,
}

/// Outcome of one account's share of a step.
struct AccountStep {
    account: SharedAccount,
    last_height: u64,
    scan: BlockScan,
}

impl ScanTask {
    fn set_state(&mut self, next: ScanState) -> Result<()> {
        if self.state == next {
            return Ok(());
        }
        self.state.transition(next)?;
        self.state_tx.send_replace(next);
        info!("scan state -> {:?}", next);
        Ok(())
    }

    fn find(&self, id: &AccountId) -> Result<&SharedAccount> {
        self.accounts
            .iter()
            .find(|a| a.id() == *id)
            .ok_or(WalletError::UnknownAccount(*id))
    }

    fn handle(&mut self, command: ScanCommand) {
        match command {
            ScanCommand::Pause(None, reply) => {
                let result = match self.state {
                    ScanState::Paused => Ok(()),
                    _ => self.set_state(ScanState::Paused),
                };
                let _ = reply.send(result);
            }
            ScanCommand::Resume(None, reply) => {
                let result = match self.state {
                    ScanState::Paused => self.set_state(ScanState::Syncing),
                    ScanState::Syncing | ScanState::Synced => Ok(()),
                    other => Err(WalletError::IllegalTransition {
                        from: other,
                        to: ScanState::Syncing,
                    }),
                };
                let _ = reply.send(result);
            }
            ScanCommand::Pause(Some(id), reply) => {
                let result = self.find(&id).map(|_| ());
                if result.is_ok() && self.paused.insert(id) {
                    info!("account {} scan paused", id);
                }
                let _ = reply.send(result);
            }
            ScanCommand::Resume(Some(id), reply) => {
                let result = self.find(&id).map(|_| ());
                if self.paused.remove(&id) {
                    info!("account {} scan resumed", id);
                }
                let _ = reply.send(result);
            }
            ScanCommand::Status(reply) => {
                let accounts = self
                    .accounts
                    .iter()
                    .map(|shared| {
                        let account = shared.read();
                        AccountStatus {
                            id: shared.id(),
                            last_height: account.last_height(),
                            paused: self.paused.contains(&shared.id()),
                            locked: account.is_locked(),
                        }
                    })
                    .collect();
                let _ = reply.send(ScanStatus {
                    state: self.state,
                    accounts,
                });
            }
        }
    }

    /// Accounts taking part in the next step with their next height.
    fn active_accounts(&mut self) -> Vec<(SharedAccount, u64)> {
        let mut active = Vec::new();
        for shared in &self.accounts {
            if self.paused.contains(&shared.id()) {
                continue;
            }
            let account = shared.read();
            if account.is_locked() {
                if self.warned_locked.insert(shared.id()) {
                    warn!("account {} is locked, skipping it until unlocked", shared.id());
                }
                continue;
            }
            self.warned_locked.remove(&shared.id());
            active.push((shared.clone(), account.next_height()));
        }
        active
    }

    /// Scan the next block or chunk. Returns `false` when there is nothing
    /// to scan.
    async fn step(&mut self) -> Result<bool> {
        let chain = self.ctx.chain.clone();
        let tip = tokio::task::spawn_blocking(move || chain.chain_height())
            .await?
            .map_err(WalletError::Chain)?;

        let active = self.active_accounts();
        let Some(start) = active.iter().map(|(_, next)| *next).min() else {
            return Ok(false);
        };
        if start >= tip {
            return Ok(false);
        }
        if self.state == ScanState::Synced {
            self.set_state(ScanState::Syncing)?;
        }

        let limit = if self.config.parallel {
            self.config.chunk_size.min(tip - start)
        } else {
            1
        };
        let chain = self.ctx.chain.clone();
        let blocks = tokio::task::spawn_blocking(move || chain.get_blocks(start, limit))
            .await?
            .map_err(WalletError::Chain)?;
        check_contiguous(start, &blocks)?;
        let Some(last) = blocks.last().map(Block::height) else {
            return Err(WalletError::Chain(anyhow::anyhow!(
                "chain returned no blocks at {start} below its height {tip}"
            )));
        };
        let blocks = Arc::new(blocks);

        let steps = if self.config.parallel {
            self.scan_parallel(active, blocks).await?
        } else {
            self.scan_sequential(active, blocks).await?
        };
        self.commit(steps)?;

        if start / INFO_LOG_INTERVAL != (last + 1) / INFO_LOG_INTERVAL || last + 1 == tip {
            info!(
                "scanned blocks {}..={} of {} for {} account(s)",
                start,
                last,
                tip,
                self.accounts.len()
            );
        }
        Ok(true)
    }

    async fn scan_sequential(
        &self,
        active: Vec<(SharedAccount, u64)>,
        blocks: Arc<Vec<Block>>,
    ) -> Result<Vec<AccountStep>> {
        let mut steps = Vec::with_capacity(active.len());
        for (account, _) in active {
            let p = self.ctx.primitives.clone();
            let blocks = blocks.clone();
            let step =
                tokio::task::spawn_blocking(move || scan_account(p.as_ref(), account, &blocks))
                    .await??;
            steps.extend(step);
        }
        Ok(steps)
    }

    /// Same chunk, every account, independent blocking tasks.
    async fn scan_parallel(
        &self,
        active: Vec<(SharedAccount, u64)>,
        blocks: Arc<Vec<Block>>,
    ) -> Result<Vec<AccountStep>> {
        let mut set = JoinSet::new();
        for (account, _) in active {
            let p = self.ctx.primitives.clone();
            let blocks = blocks.clone();
            set.spawn_blocking(move || scan_account(p.as_ref(), account, &blocks));
        }

        let mut steps = Vec::with_capacity(set.len());
        while let Some(joined) = set.join_next().await {
            steps.extend(joined??);
        }
        Ok(steps)
    }

    /// Persist every account's step in one batch, then apply in memory.
    fn commit(&self, steps: Vec<AccountStep>) -> Result<()> {
        let mut batch = WalletBatch::default();
        for step in &steps {
            let id = step.account.id();
            batch.record_delta(id, &step.scan.delta);
            batch.checkpoints.push((id, step.last_height));
            batch
                .history
                .extend(step.scan.received.iter().cloned().map(|tx| (id, tx)));
        }
        self.ctx.store.apply_batch(batch)?;

        for step in steps {
            let mut account = step.account.write();
            account.set_last_height(Some(step.last_height));
            // A lock between scan and commit cleared the set; reloading on
            // unlock picks the persisted delta up.
            if account.is_locked() {
                continue;
            }
            let (added, removed) = account.utxos_mut().apply(&step.scan.delta);
            if added + removed > 0 {
                info!(
                    "account {}: {} new, {} spent output(s) up to height {}, balance {}",
                    step.account.id(),
                    added,
                    removed,
                    step.last_height,
                    account.balance()
                );
            }
        }
        Ok(())
    }

    async fn run(
        mut self,
        mut commands: mpsc::Receiver<ScanCommand>,
        cancel: CancellationToken,
    ) -> Result<()> {
        info!(
            "starting scan task for {} account(s), parallel: {}, follow: {}",
            self.accounts.len(),
            self.config.parallel,
            self.config.follow
        );
        let result = self.run_loop(&mut commands, &cancel).await;
        if let Err(e) = &result {
            error!("scan task failed: {}", e);
            let _ = self.set_state(ScanState::Failed);
        }
        result
    }

    async fn run_loop(
        &mut self,
        commands: &mut mpsc::Receiver<ScanCommand>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        self.set_state(ScanState::Syncing)?;
        loop {
            // Commands only land between steps, never inside a block's apply
            while let Ok(command) = commands.try_recv() {
                self.handle(command);
            }
            if cancel.is_cancelled() {
                self.set_state(ScanState::Cancelled)?;
                info!("scan task cancelled");
                return Ok(());
            }

            if self.state == ScanState::Paused {
                tokio::select! {
                    _ = cancel.cancelled() => {}
                    command = commands.recv() => match command {
                        Some(command) => self.handle(command),
                        None => cancel.cancel(),
                    },
                }
                continue;
            }

            if self.step().await? {
                continue;
            }

            if !self.config.follow {
                self.set_state(ScanState::Completed)?;
                info!("scan completed");
                return Ok(());
            }
            self.set_state(ScanState::Synced)?;
            tokio::select! {
                _ = cancel.cancelled() => {}
                command = commands.recv() => match command {
                    Some(command) => self.handle(command),
                    None => cancel.cancel(),
                },
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }
    }
}

fn check_contiguous(start: u64, blocks: &[Block]) -> Result<()> {
    for (expected, block) in (start..).zip(blocks) {
        if block.height() != expected {
            return Err(WalletError::OutOfOrderBlock {
                expected,
                got: block.height(),
            });
        }
    }
    Ok(())
}

fn scan_keys<'a>(
    p: &dyn Primitives,
    address: &'a Address,
    secrets: &'a AccountSecrets,
) -> Result<ScanKeys<'a>> {
    match (address, secrets) {
        (Address::Transparent(address), AccountSecrets::Transparent(_)) => {
            Ok(ScanKeys::Transparent(address))
        }
        (Address::Stealth(_), AccountSecrets::Private(keys)) => Ok(ScanKeys::private(p, keys)),
        _ => Err(AccountError::KeyMismatch.into()),
    }
}

/// Scan the blocks this account has not seen yet. `None` if it is already
/// past the chunk or got locked meanwhile.
///
/// Works on a snapshot so the account lock is free while blocks are scanned.
fn scan_account(
    p: &dyn Primitives,
    shared: SharedAccount,
    blocks: &[Block],
) -> Result<Option<AccountStep>> {
    let (address, secrets, known, next) = {
        let account = shared.read();
        if account.is_locked() {
            return Ok(None);
        }
        (
            *account.address(),
            account.secrets()?.clone(),
            account.utxos().clone(),
            account.next_height(),
        )
    };

    let mut scanner = AccountScanner::new(p, scan_keys(p, &address, &secrets)?, &known);
    let mut scan = BlockScan::default();
    let mut last = None;
    for block in blocks.iter().skip_while(|b| b.height() < next) {
        scan.extend(scanner.scan_block(block)?);
        last = Some(block.height());
    }
    Ok(last.map(|last_height| AccountStep {
        account: shared,
        last_height,
        scan,
    }))
}

// Scan Service

/// Handle to a running scan task.
pub struct ScanService {
    command_tx: mpsc::Sender<ScanCommand>,
    state_rx: watch::Receiver<ScanState>,
    cancel: CancellationToken,
    handle: JoinHandle<Result<()>>,
}

impl ScanService {
    /// Spawn the scan task. Cancelling `cancel` stops it at the next step.
    pub fn start(
        ctx: ScanContext,
        accounts: Vec<SharedAccount>,
        config: ScanConfig,
        cancel: CancellationToken,
    ) -> Self {
        let (command_tx, command_rx) = mpsc::channel::<ScanCommand>(64);
        let (state_tx, state_rx) = watch::channel(ScanState::Instantiated);

        let task = ScanTask {
            ctx,
            accounts,
            paused: HashSet::new(),
            warned_locked: HashSet::new(),
            config,
            state: ScanState::Instantiated,
            state_tx,
        };
        let handle = tokio::spawn(task.run(command_rx, cancel.clone()));

        Self {
            command_tx,
            state_rx,
            cancel,
            handle,
        }
    }

    pub fn state(&self) -> ScanState {
        *self.state_rx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ScanState> {
        self.state_rx.clone()
    }

    /// Wait until the state satisfies `pred` or the task ends.
    pub async fn wait_for(&self, pred: impl Fn(ScanState) -> bool) -> ScanState {
        let mut rx = self.state_rx.clone();
        let result = rx.wait_for(|state| pred(*state)).await.map(|state| *state);
        match result {
            Ok(state) => state,
            Err(_) => *rx.borrow(),
        }
    }

    async fn request(
        &self,
        command: impl FnOnce(oneshot::Sender<Result<()>>) -> ScanCommand,
    ) -> Result<()> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.command_tx
            .send(command(reply_tx))
            .await
            .map_err(|_| WalletError::ServiceStopped)?;
        reply_rx.await.map_err(|_| WalletError::ServiceStopped)?
    }

    /// Pause the scan at the next block boundary.
    pub async fn pause(&self) -> Result<()> {
        self.request(|reply| ScanCommand::Pause(None, reply)).await
    }

    /// Resume from the persisted checkpoints.
    pub async fn resume(&self) -> Result<()> {
        self.request(|reply| ScanCommand::Resume(None, reply)).await
    }

    pub async fn pause_account(&self, id: AccountId) -> Result<()> {
        self.request(|reply| ScanCommand::Pause(Some(id), reply)).await
    }

    /// The account catches up from its own checkpoint.
    pub async fn resume_account(&self, id: AccountId) -> Result<()> {
        self.request(|reply| ScanCommand::Resume(Some(id), reply)).await
    }

    pub async fn status(&self) -> Result<ScanStatus> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.command_tx
            .send(ScanCommand::Status(reply_tx))
            .await
            .map_err(|_| WalletError::ServiceStopped)?;
        reply_rx.await.map_err(|_| WalletError::ServiceStopped)
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the task to end and surface its error, if any.
    pub async fn join(self) -> Result<()> {
        self.handle.await?
    }
}
