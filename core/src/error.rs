use tenebra_account::{AccountError, AccountId};
use tenebra_primitives::PrimitiveError;
use tenebra_privacy::PrivacyError;
use tenebra_transaction::TransactionError;
use thiserror::Error;

use crate::scan::ScanState;

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds { requested: u64, available: u64 },

    #[error("output {index} of tx {tx} does not open to its decoded amount")]
    MalformedCommitment { tx: String, index: u32 },

    #[error("block source out of order: expected height {expected}, got {got}")]
    OutOfOrderBlock { expected: u64, got: u64 },

    #[error("cannot determine a transaction type for this request")]
    UnknownTransactionType,

    #[error("destination amounts must be non-zero and fit in u64")]
    InvalidAmount,

    #[error("account {0} is locked")]
    AccountLocked(AccountId),

    #[error("unknown account {0}")]
    UnknownAccount(AccountId),

    #[error("invalid transaction: {0}")]
    InvalidTransaction(&'static str),

    #[error("illegal scan transition {from:?} -> {to:?}")]
    IllegalTransition { from: ScanState, to: ScanState },

    #[error("scan service stopped")]
    ServiceStopped,

    #[error("a scan is already running")]
    ScanRunning,

    #[error(transparent)]
    Join(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Primitive(#[from] PrimitiveError),

    #[error(transparent)]
    Privacy(#[from] PrivacyError),

    #[error(transparent)]
    Transaction(#[from] TransactionError),

    #[error(transparent)]
    Account(#[from] AccountError),

    #[error("chain view: {0:#}")]
    Chain(anyhow::Error),

    #[error("network relay: {0:#}")]
    Relay(anyhow::Error),

    #[error("configuration: {0:#}")]
    Config(anyhow::Error),

    #[error("wallet storage: {0:#}")]
    Storage(#[from] anyhow::Error),
}

pub type Result<T, E = WalletError> = std::result::Result<T, E>;
