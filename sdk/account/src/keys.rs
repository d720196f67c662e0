use std::fmt;

use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use tenebra_primitives::{Primitives, Scalar};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::address::{Address, AddressKind, StealthAddress, TransparentAddress};

/// View/spend secret pair of a private account.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PrivateKeys {
    pub view_secret: Scalar,
    pub spend_secret: Scalar,
}

impl PrivateKeys {
    pub fn generate(p: &dyn Primitives) -> Self {
        Self {
            view_secret: p.random_scalar(),
            spend_secret: p.random_scalar(),
        }
    }

    pub fn address(&self, p: &dyn Primitives) -> StealthAddress {
        StealthAddress {
            view_key: p.scalar_base_mul(&self.view_secret),
            spend_key: p.scalar_base_mul(&self.spend_secret),
        }
    }
}

impl fmt::Debug for PrivateKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKeys").finish_non_exhaustive()
    }
}

/// Ed25519 signing key of a transparent account.
#[derive(Clone)]
pub struct TransparentKeys {
    signing_key: SigningKey,
}

impl TransparentKeys {
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    pub fn from_bytes(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    pub fn address(&self) -> TransparentAddress {
        TransparentAddress::from_verifying_key(&self.verifying_key())
    }

    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }
}

impl fmt::Debug for TransparentKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransparentKeys")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

/// Secret half of an account, present only while unlocked.
#[derive(Debug, Clone)]
pub enum AccountSecrets {
    Private(PrivateKeys),
    Transparent(TransparentKeys),
}

impl AccountSecrets {
    pub fn kind(&self) -> AddressKind {
        match self {
            AccountSecrets::Private(_) => AddressKind::Stealth,
            AccountSecrets::Transparent(_) => AddressKind::Transparent,
        }
    }

    pub fn address(&self, p: &dyn Primitives) -> Address {
        match self {
            AccountSecrets::Private(keys) => Address::Stealth(keys.address(p)),
            AccountSecrets::Transparent(keys) => Address::Transparent(keys.address()),
        }
    }
}
