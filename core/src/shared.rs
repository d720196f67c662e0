use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tenebra_account::{Account, AccountId};

/// An account shared between the builder and the scan service.
///
/// Builders take the write lock only to reserve UTXOs. The scanner copies
/// what it needs under the read lock and takes the write lock to apply a delta.
#[derive(Clone)]
pub struct SharedAccount {
    id: AccountId,
    inner: Arc<RwLock<Account>>,
}

impl SharedAccount {
    pub fn new(account: Account) -> Self {
        Self {
            id: account.id(),
            inner: Arc::new(RwLock::new(account)),
        }
    }

    pub fn id(&self) -> AccountId {
        self.id
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Account> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn write(&self) -> RwLockWriteGuard<'_, Account> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for SharedAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SharedAccount").field(&self.id).finish()
    }
}
