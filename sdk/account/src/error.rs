use thiserror::Error;

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("address checksum mismatch")]
    Checksum,

    #[error("unknown address version {0:#04x}")]
    UnknownVersion(u8),

    #[error("account is locked")]
    Locked,

    #[error("secrets do not derive the account address")]
    KeyMismatch,

    #[error("keyfile: {0}")]
    Keyfile(String),

    #[error("keyfile decryption failed (wrong passphrase or corrupted file)")]
    Decryption,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
