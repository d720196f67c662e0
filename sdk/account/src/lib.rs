//! Tenebra accounts: addresses, key material and the per-account UTXO table.

pub mod account;
pub mod address;
pub mod error;
pub mod history;
pub mod keyfile;
pub mod keys;
pub mod utxo;
pub mod utxo_set;

pub use account::{Account, AccountId};
pub use address::{Address, AddressKind, StealthAddress, TransparentAddress};
pub use error::AccountError;
pub use history::{Direction, HistoryTx, RelayStatus};
pub use keyfile::SealedKeyfile;
pub use keys::{AccountSecrets, PrivateKeys, TransparentKeys};
pub use utxo::{PrivateUtxoData, Utxo, UtxoKey, UtxoKind};
pub use utxo_set::{UtxoDelta, UtxoSet};
