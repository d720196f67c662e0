use serde::{Deserialize, Serialize};

use crate::address::Address;

/// Network verdict on a transaction this wallet sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelayStatus {
    Pending,
    Confirmed,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Sent,
    Received,
}

/// Wallet-local record of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryTx {
    #[serde(with = "hex::serde")]
    pub tx_id: [u8; 32],
    /// Unix seconds.
    pub timestamp: u64,
    pub direction: Direction,
    /// Recipients for sent transactions; empty when the sender is hidden.
    pub counterparties: Vec<Address>,
    pub amounts: Vec<u64>,
    pub status: RelayStatus,
}

impl HistoryTx {
    pub fn total(&self) -> u64 {
        self.amounts.iter().fold(0u64, |acc, a| acc.saturating_add(*a))
    }
}
