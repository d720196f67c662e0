use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransactionError {
    #[error("truncated or unreadable encoding: {0}")]
    Io(#[from] std::io::Error),

    #[error("unsupported transaction version {0}")]
    UnsupportedVersion(u8),

    #[error("unknown transaction variant {0}")]
    UnknownVariant(u8),

    #[error("{0} trailing bytes after transaction")]
    TrailingBytes(usize),

    #[error("too many {what}: {count}")]
    TooMany { what: &'static str, count: usize },

    #[error("inconsistent transaction: {0}")]
    Inconsistent(&'static str),
}
