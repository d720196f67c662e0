//! Tenebra wallet engine.
//!
//! # Architecture
//!
//! ```text
//!                 ┌──────────────────────────── Wallet ───────────────────────────┐
//!  destinations ─▶│ TransactionBuilder ─▶ Transaction ─▶ NetworkRelay ─┐           │
//!                 │        │ reserve                                   │ verdict   │
//!                 │        ▼                                           ▼           │
//!                 │  SharedAccount (UtxoSet) ◀── apply ── ScanService ◀─ ChainView │
//!                 │                                  │                             │
//!                 │                                  └── WalletBatch ─▶ WalletStore│
//!                 └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! Building is synchronous. Scanning runs as a background tokio task that
//! checkpoints per block (sequential) or per chunk (parallel), and relay
//! confirmation is a cancellable one-shot wait per transaction id.

pub mod builder;
pub mod chain;
pub mod error;
pub mod relay;
pub mod scan;
pub mod shared;
pub mod storage;
pub mod verify;
pub mod wallet;

pub use builder::{BuiltTransaction, Destination, TransactionBuilder, coinbase_transaction};
pub use chain::{ChainView, MemoryChain};
pub use error::{Result, WalletError};
pub use relay::{Confirmation, NetworkRelay, RelayConfirmations};
pub use scan::{ScanConfig, ScanContext, ScanService, ScanState, ScanStatus, scan_block};
pub use shared::SharedAccount;
pub use storage::{MemoryWalletStore, RocksDbWalletStore, WalletBatch, WalletStore};
pub use verify::verify_transaction;
pub use wallet::{SendOutcome, Wallet};
