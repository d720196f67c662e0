//! Scan service lifecycle.
//!
//! ```text
//!  Instantiated ──▶ Syncing ◀──▶ Paused
//!                    │  ▲
//!                    ▼  │
//!                   Synced ──▶ Completed
//!
//!  any non-terminal ──▶ Cancelled | Failed
//! ```

use serde::Serialize;

use crate::error::WalletError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ScanState {
    Instantiated,
    Syncing,
    Paused,
    /// Caught up with the tip and waiting for new blocks.
    Synced,
    /// Caught up and not following the tip; the task has ended.
    Completed,
    Cancelled,
    /// Stopped on a fatal error; the last checkpoint is intact.
    Failed,
}

impl ScanState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ScanState::Completed | ScanState::Cancelled | ScanState::Failed
        )
    }

    pub fn can_transition_to(self, next: ScanState) -> bool {
        use ScanState::*;
        if self.is_terminal() {
            return false;
        }
        match (self, next) {
            (_, Cancelled | Failed) => true,
            (Instantiated, Syncing) => true,
            (Syncing, Paused | Synced | Completed) => true,
            (Paused, Syncing) => true,
            (Synced, Syncing | Paused | Completed) => true,
            _ => false,
        }
    }

    /// Move to `next`, refusing transitions the lifecycle does not allow.
    pub fn transition(&mut self, next: ScanState) -> Result<(), WalletError> {
        if !self.can_transition_to(next) {
            return Err(WalletError::IllegalTransition {
                from: *self,
                to: next,
            });
        }
        *self = next;
        Ok(())
    }
}
