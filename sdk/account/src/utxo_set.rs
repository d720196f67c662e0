//! Indexed UTXO table.
//!
//! Slots live in an arena addressed by position; a key index maps
//! [`UtxoKey`]s to slots and freed slots are reused. Scanning never mutates
//! the table while iterating it: it produces a [`UtxoDelta`] which is then
//! applied in one step.

use std::collections::HashMap;

use crate::utxo::{Utxo, UtxoKey};

/// Changes one block (or chunk) makes to an account's UTXOs.
#[derive(Debug, Clone, Default)]
pub struct UtxoDelta {
    pub added: Vec<Utxo>,
    pub spent: Vec<UtxoKey>,
}

impl UtxoDelta {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.spent.is_empty()
    }

    /// Append a later delta.
    pub fn extend(&mut self, later: UtxoDelta) {
        self.added.extend(later.added);
        self.spent.extend(later.spent);
    }
}

#[derive(Clone)]
struct Slot {
    utxo: Utxo,
    reserved: bool,
}

#[derive(Clone, Default)]
pub struct UtxoSet {
    slots: Vec<Option<Slot>>,
    index: HashMap<UtxoKey, usize>,
    free: Vec<usize>,
}

impl UtxoSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn contains(&self, key: &UtxoKey) -> bool {
        self.index.contains_key(key)
    }

    pub fn get(&self, key: &UtxoKey) -> Option<&Utxo> {
        let slot = *self.index.get(key)?;
        self.slots[slot].as_ref().map(|s| &s.utxo)
    }

    /// Insert unless the key is already present. Returns whether it was new.
    pub fn insert(&mut self, utxo: Utxo) -> bool {
        let key = utxo.key();
        if self.index.contains_key(&key) {
            return false;
        }
        let entry = Some(Slot {
            utxo,
            reserved: false,
        });
        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = entry;
                slot
            }
            None => {
                self.slots.push(entry);
                self.slots.len() - 1
            }
        };
        self.index.insert(key, slot);
        true
    }

    pub fn remove(&mut self, key: &UtxoKey) -> Option<Utxo> {
        let slot = self.index.remove(key)?;
        self.free.push(slot);
        self.slots[slot].take().map(|s| s.utxo)
    }

    /// Adds first, then spends, so an output created and spent in the same
    /// block ends up removed. Re-applying the same delta is a no-op.
    pub fn apply(&mut self, delta: &UtxoDelta) -> (usize, usize) {
        let added = delta
            .added
            .iter()
            .filter(|utxo| self.insert((*utxo).clone()))
            .count();
        let removed = delta
            .spent
            .iter()
            .filter(|key| self.remove(key).is_some())
            .count();
        (added, removed)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Utxo> {
        self.slots.iter().flatten().map(|s| &s.utxo)
    }

    /// UTXOs not held by an in-flight build.
    pub fn available(&self) -> impl Iterator<Item = &Utxo> {
        self.slots
            .iter()
            .flatten()
            .filter(|s| !s.reserved)
            .map(|s| &s.utxo)
    }

    /// Mark as held by a build. Fails if missing or already held.
    pub fn reserve(&mut self, key: &UtxoKey) -> bool {
        match self.slot_mut(key) {
            Some(slot) if !slot.reserved => {
                slot.reserved = true;
                true
            }
            _ => false,
        }
    }

    pub fn release(&mut self, key: &UtxoKey) {
        if let Some(slot) = self.slot_mut(key) {
            slot.reserved = false;
        }
    }

    pub fn is_reserved(&self, key: &UtxoKey) -> bool {
        self.index
            .get(key)
            .and_then(|&slot| self.slots[slot].as_ref())
            .is_some_and(|s| s.reserved)
    }

    pub fn total(&self) -> u64 {
        self.iter().fold(0u64, |acc, u| acc.saturating_add(u.amount()))
    }

    pub fn available_total(&self) -> u64 {
        self.available()
            .fold(0u64, |acc, u| acc.saturating_add(u.amount()))
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.index.clear();
        self.free.clear();
    }

    fn slot_mut(&mut self, key: &UtxoKey) -> Option<&mut Slot> {
        let slot = *self.index.get(key)?;
        self.slots[slot].as_mut()
    }
}
