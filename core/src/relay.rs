//! Network relay and confirmation tracking.
//!
//! The relay raises `(tx id, success)` when the network accepts or rejects a
//! broadcast transaction. Waiters register a one-shot listener per tx id
//! before broadcasting; dropping the listener unregisters it.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use log::{debug, warn};
use tenebra_transaction::{Transaction, TxId};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

pub trait NetworkRelay: Send + Sync {
    fn broadcast(&self, tx: &Transaction) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Accepted,
    Rejected,
    /// The caller's token fired first; nothing was observed.
    Cancelled,
    /// No event within the configured confirmation timeout.
    TimedOut,
}

/// Listeners waiting on relay events, keyed by transaction id.
#[derive(Clone, Default)]
pub struct RelayConfirmations {
    pending: Arc<DashMap<TxId, oneshot::Sender<bool>>>,
}

impl RelayConfirmations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register interest in `id`. A second registration for the same id
    /// replaces the first, whose wait then ends as cancelled.
    pub fn register(&self, id: TxId) -> PendingConfirmation {
        let (tx, rx) = oneshot::channel();
        if self.pending.insert(id, tx).is_some() {
            warn!("replaced an existing confirmation listener for {}", id);
        }
        PendingConfirmation {
            id,
            rx,
            pending: self.pending.clone(),
        }
    }

    /// Deliver a relay event. Returns `false` if nobody was waiting.
    pub fn notify(&self, id: &TxId, success: bool) -> bool {
        match self.pending.remove(id) {
            Some((_, tx)) => {
                debug!("relay reported {} for {}", if success { "accept" } else { "reject" }, id);
                tx.send(success).is_ok()
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

pub struct PendingConfirmation {
    id: TxId,
    rx: oneshot::Receiver<bool>,
    pending: Arc<DashMap<TxId, oneshot::Sender<bool>>>,
}

impl PendingConfirmation {
    pub fn id(&self) -> TxId {
        self.id
    }

    /// Wait for the relay event, the token, or `timeout`, whichever comes
    /// first.
    pub async fn wait(
        mut self,
        cancel: &CancellationToken,
        timeout: Option<Duration>,
    ) -> Confirmation {
        let expiry = async {
            match timeout {
                Some(timeout) => tokio::time::sleep(timeout).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::select! {
            result = &mut self.rx => match result {
                Ok(true) => Confirmation::Accepted,
                Ok(false) => Confirmation::Rejected,
                Err(_) => Confirmation::Cancelled,
            },
            _ = cancel.cancelled() => Confirmation::Cancelled,
            _ = expiry => Confirmation::TimedOut,
        }
    }
}

impl Drop for PendingConfirmation {
    fn drop(&mut self) {
        // A newer registration may own the slot; only a closed sender is ours.
        self.rx.close();
        self.pending.remove_if(&self.id, |_, tx| tx.is_closed());
    }
}
