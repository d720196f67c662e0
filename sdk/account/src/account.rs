use std::fmt;

use log::info;
use serde::{Deserialize, Serialize};
use tenebra_primitives::Primitives;

use crate::{
    address::{Address, AddressKind},
    error::AccountError,
    keys::AccountSecrets,
    utxo_set::UtxoSet,
};

/// Stable identifier of an account: BLAKE3 of its address bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId(pub [u8; 32]);

impl AccountId {
    pub fn of(address: &Address) -> Self {
        Self(*blake3::hash(&address.to_bytes()).as_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({self})")
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0[..6]))
    }
}

/// One wallet entry: its address, its secrets while unlocked, and the
/// outputs the scanner has attributed to it.
pub struct Account {
    id: AccountId,
    address: Address,
    secrets: Option<AccountSecrets>,
    utxos: UtxoSet,
    /// Highest fully scanned block.
    last_height: Option<u64>,
}

impl Account {
    /// An unlocked account for the given secrets.
    pub fn new(p: &dyn Primitives, secrets: AccountSecrets) -> Self {
        let address = secrets.address(p);
        Self {
            id: AccountId::of(&address),
            address,
            secrets: Some(secrets),
            utxos: UtxoSet::new(),
            last_height: None,
        }
    }

    /// A locked account known only by address.
    pub fn locked(address: Address) -> Self {
        Self {
            id: AccountId::of(&address),
            address,
            secrets: None,
            utxos: UtxoSet::new(),
            last_height: None,
        }
    }

    pub fn id(&self) -> AccountId {
        self.id
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn kind(&self) -> AddressKind {
        self.address.kind()
    }

    pub fn is_locked(&self) -> bool {
        self.secrets.is_none()
    }

    pub fn secrets(&self) -> Result<&AccountSecrets, AccountError> {
        self.secrets.as_ref().ok_or(AccountError::Locked)
    }

    /// Install secrets; they must derive this account's address.
    pub fn unlock(&mut self, p: &dyn Primitives, secrets: AccountSecrets) -> Result<(), AccountError> {
        if secrets.address(p) != self.address {
            return Err(AccountError::KeyMismatch);
        }
        self.secrets = Some(secrets);
        info!("account {} unlocked", self.id);
        Ok(())
    }

    /// Drop secrets and every recovered one-time secret with them. The
    /// persisted UTXOs are reloaded on the next unlock.
    pub fn lock(&mut self) {
        self.secrets = None;
        self.utxos.clear();
        info!("account {} locked", self.id);
    }

    pub fn balance(&self) -> u64 {
        self.utxos.total()
    }

    pub fn utxos(&self) -> &UtxoSet {
        &self.utxos
    }

    pub fn utxos_mut(&mut self) -> &mut UtxoSet {
        &mut self.utxos
    }

    pub fn last_height(&self) -> Option<u64> {
        self.last_height
    }

    pub fn set_last_height(&mut self, height: Option<u64>) {
        self.last_height = height;
    }

    /// First block this account has not scanned yet.
    pub fn next_height(&self) -> u64 {
        self.last_height.map_or(0, |h| h + 1)
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("kind", &self.kind())
            .field("locked", &self.is_locked())
            .field("utxos", &self.utxos.len())
            .field("last_height", &self.last_height)
            .finish()
    }
}
