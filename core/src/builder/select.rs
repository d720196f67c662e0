//! Greedy UTXO selection with reservation.

use log::debug;
use tenebra_account::{Utxo, UtxoKey};

use crate::error::{Result, WalletError};
use crate::shared::SharedAccount;

/// UTXOs held for one build. Released on drop unless [`Reservation::keep`]
/// hands them over to the built transaction.
#[must_use]
pub struct Reservation {
    account: SharedAccount,
    keys: Vec<UtxoKey>,
}

impl Reservation {
    pub fn keys(&self) -> &[UtxoKey] {
        &self.keys
    }

    /// Leave the UTXOs reserved past this guard.
    pub fn keep(mut self) -> Vec<UtxoKey> {
        std::mem::take(&mut self.keys)
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        if self.keys.is_empty() {
            return;
        }
        let mut account = self.account.write();
        for key in &self.keys {
            account.utxos_mut().release(key);
        }
        debug!(
            "released {} reserved output(s) of account {}",
            self.keys.len(),
            self.account.id()
        );
    }
}

/// Reserve the largest available UTXOs until they cover `amount`.
///
/// Selection and reservation happen under one write lock, so two concurrent
/// builds never pick the same output. On failure nothing is reserved.
pub fn select_utxos(account: &SharedAccount, amount: u64) -> Result<(Reservation, Vec<Utxo>)> {
    let mut guard = account.write();

    let mut candidates: Vec<&Utxo> = guard.utxos().available().collect();
    candidates.sort_by(|a, b| b.amount().cmp(&a.amount()));

    let mut selected = Vec::new();
    let mut covered = 0u64;
    for utxo in candidates {
        if covered >= amount {
            break;
        }
        covered = covered.saturating_add(utxo.amount());
        selected.push(utxo.clone());
    }
    if covered < amount {
        return Err(WalletError::InsufficientFunds {
            requested: amount,
            available: guard.utxos().available_total(),
        });
    }

    let keys: Vec<UtxoKey> = selected.iter().map(Utxo::key).collect();
    for key in &keys {
        guard.utxos_mut().reserve(key);
    }
    drop(guard);

    Ok((
        Reservation {
            account: account.clone(),
            keys,
        },
        selected,
    ))
}
