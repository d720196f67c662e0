use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use anyhow::Result;
use tenebra_account::{AccountId, HistoryTx, UtxoKey};

use super::{UtxoRecord, WalletBatch, WalletStore};

#[derive(Default)]
struct AccountEntry {
    utxos: HashMap<UtxoKey, UtxoRecord>,
    checkpoint: Option<u64>,
    history: HashMap<[u8; 32], HistoryTx>,
}

/// Volatile store for tests and throwaway wallets.
#[derive(Default)]
pub struct MemoryWalletStore {
    accounts: RwLock<HashMap<AccountId, AccountEntry>>,
}

impl MemoryWalletStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WalletStore for MemoryWalletStore {
    fn load_utxos(&self, account: &AccountId) -> Result<Vec<UtxoRecord>> {
        let accounts = self.accounts.read().unwrap_or_else(PoisonError::into_inner);
        Ok(accounts
            .get(account)
            .map(|entry| entry.utxos.values().cloned().collect())
            .unwrap_or_default())
    }

    fn checkpoint(&self, account: &AccountId) -> Result<Option<u64>> {
        let accounts = self.accounts.read().unwrap_or_else(PoisonError::into_inner);
        Ok(accounts.get(account).and_then(|entry| entry.checkpoint))
    }

    fn history(&self, account: &AccountId) -> Result<Vec<HistoryTx>> {
        let accounts = self.accounts.read().unwrap_or_else(PoisonError::into_inner);
        let mut history: Vec<HistoryTx> = accounts
            .get(account)
            .map(|entry| entry.history.values().cloned().collect())
            .unwrap_or_default();
        history.sort_by_key(|tx| tx.timestamp);
        Ok(history)
    }

    fn apply_batch(&self, batch: WalletBatch) -> Result<()> {
        let mut accounts = self.accounts.write().unwrap_or_else(PoisonError::into_inner);
        for (account, record) in batch.utxo_puts {
            accounts
                .entry(account)
                .or_default()
                .utxos
                .insert(record.key(), record);
        }
        for (account, key) in batch.utxo_deletes {
            if let Some(entry) = accounts.get_mut(&account) {
                entry.utxos.remove(&key);
            }
        }
        for (account, height) in batch.checkpoints {
            accounts.entry(account).or_default().checkpoint = Some(height);
        }
        for (account, tx) in batch.history {
            accounts
                .entry(account)
                .or_default()
                .history
                .insert(tx.tx_id, tx);
        }
        Ok(())
    }
}
