use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use rocksdb::{ColumnFamilyDescriptor, DB, Direction, IteratorMode, Options, WriteBatch};
use tenebra_account::{AccountId, HistoryTx};

use super::{UtxoRecord, WalletBatch, WalletStore, utxo_key_bytes};

const CF_UTXOS: &str = "utxos";
const CF_CHECKPOINTS: &str = "checkpoints";
const CF_HISTORY: &str = "history";

/// A thread-safe wrapper around RocksDB.
///
/// Keys are prefixed with the 32-byte account id:
/// `utxos: id ‖ utxo key`, `checkpoints: id`, `history: id ‖ tx id`.
#[derive(Clone)]
pub struct RocksDbWalletStore {
    db: Arc<DB>,
}

impl RocksDbWalletStore {
    /// Opens the database at the specified path, creating it if missing.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let families = vec![
            ColumnFamilyDescriptor::new(CF_UTXOS, Options::default()),
            ColumnFamilyDescriptor::new(CF_CHECKPOINTS, Options::default()),
            ColumnFamilyDescriptor::new(CF_HISTORY, Options::default()),
        ];

        let db = DB::open_cf_descriptors(&opts, path, families)
            .map_err(|e| anyhow::anyhow!("Failed to open RocksDB: {}", e))?;

        Ok(Self { db: Arc::new(db) })
    }

    /// All values under an account prefix, in key order.
    fn scan_prefix(&self, cf_name: &str, account: &AccountId) -> Result<Vec<Box<[u8]>>> {
        let cf = self
            .db
            .cf_handle(cf_name)
            .with_context(|| format!("{cf_name} CF missing"))?;

        let prefix = account.as_bytes();
        let mut values = Vec::new();
        let iter = self
            .db
            .iterator_cf(cf, IteratorMode::From(&prefix[..], Direction::Forward));
        for item in iter {
            let (key, value) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            values.push(value);
        }
        Ok(values)
    }
}

fn prefixed(account: &AccountId, suffix: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(32 + suffix.len());
    key.extend_from_slice(account.as_bytes());
    key.extend_from_slice(suffix);
    key
}

impl WalletStore for RocksDbWalletStore {
    fn load_utxos(&self, account: &AccountId) -> Result<Vec<UtxoRecord>> {
        self.scan_prefix(CF_UTXOS, account)?
            .iter()
            .map(|bytes| {
                wincode::deserialize::<UtxoRecord>(&bytes[..]).context("corrupt utxo record")
            })
            .collect()
    }

    fn checkpoint(&self, account: &AccountId) -> Result<Option<u64>> {
        let cf = self
            .db
            .cf_handle(CF_CHECKPOINTS)
            .context("checkpoints CF missing")?;

        match self.db.get_cf(cf, account.as_bytes())? {
            Some(bytes) => {
                let height: [u8; 8] = bytes
                    .as_slice()
                    .try_into()
                    .context("invalid checkpoint length")?;
                Ok(Some(u64::from_be_bytes(height)))
            }
            None => Ok(None),
        }
    }

    fn history(&self, account: &AccountId) -> Result<Vec<HistoryTx>> {
        // Use serde_json for HistoryTx (it carries addresses, not a fixed layout)
        let mut history = self
            .scan_prefix(CF_HISTORY, account)?
            .iter()
            .map(|bytes| serde_json::from_slice::<HistoryTx>(&bytes[..]).context("corrupt history entry"))
            .collect::<Result<Vec<_>>>()?;
        history.sort_by_key(|tx| tx.timestamp);
        Ok(history)
    }

    fn apply_batch(&self, operations: WalletBatch) -> Result<()> {
        let mut batch = WriteBatch::default();

        let cf_utxos = self.db.cf_handle(CF_UTXOS).context("utxos CF missing")?;
        let cf_checkpoints = self
            .db
            .cf_handle(CF_CHECKPOINTS)
            .context("checkpoints CF missing")?;
        let cf_history = self
            .db
            .cf_handle(CF_HISTORY)
            .context("history CF missing")?;

        // New outputs first so a same-chunk spend deletes them again
        for (account, record) in &operations.utxo_puts {
            let key = prefixed(account, &utxo_key_bytes(&record.key()));
            batch.put_cf(cf_utxos, key, wincode::serialize(record)?);
        }

        for (account, key) in &operations.utxo_deletes {
            batch.delete_cf(cf_utxos, prefixed(account, &utxo_key_bytes(key)));
        }

        for (account, height) in &operations.checkpoints {
            batch.put_cf(cf_checkpoints, account.as_bytes(), height.to_be_bytes());
        }

        for (account, tx) in &operations.history {
            batch.put_cf(cf_history, prefixed(account, &tx.tx_id), serde_json::to_vec(tx)?);
        }

        self.db.write(batch)?;
        Ok(())
    }
}
