//! Sealed key files.
//!
//! ```text
//! key        = Argon2id(passphrase, salt)    default parameters, 32 bytes
//! ciphertext = ChaCha20-Poly1305(key, nonce, kind ‖ secret bytes)
//! ```
//!
//! The address travels in the clear so a locked wallet can still list and
//! scan-match its accounts.

use std::{fs, path::Path};

use chacha20poly1305::{
    ChaCha20Poly1305, Key, Nonce,
    aead::{Aead, KeyInit},
};
use argon2::Argon2;
use rand::{RngCore, rngs::OsRng};
use serde::{Deserialize, Serialize};
use tenebra_primitives::{Primitives, Scalar};
use zeroize::Zeroizing;

use crate::{
    address::Address,
    error::AccountError,
    keys::{AccountSecrets, PrivateKeys, TransparentKeys},
};

/// Version 1 files used a plain HKDF and are no longer opened.
const KEYFILE_VERSION: u8 = 2;
const KIND_PRIVATE: u8 = 1;
const KIND_TRANSPARENT: u8 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedKeyfile {
    pub version: u8,
    pub address: Address,
    #[serde(with = "hex::serde")]
    salt: [u8; 32],
    #[serde(with = "hex::serde")]
    nonce: [u8; 12],
    #[serde(with = "hex::serde")]
    ciphertext: Vec<u8>,
}

impl SealedKeyfile {
    pub fn seal(
        p: &dyn Primitives,
        secrets: &AccountSecrets,
        passphrase: &[u8],
    ) -> Result<Self, AccountError> {
        let mut salt = [0u8; 32];
        let mut nonce = [0u8; 12];
        OsRng.fill_bytes(&mut salt);
        OsRng.fill_bytes(&mut nonce);

        let plaintext = encode_secrets(secrets);
        let ciphertext = cipher(passphrase, &salt)?
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_slice())
            .map_err(|_| AccountError::Keyfile("encryption failure".into()))?;

        Ok(Self {
            version: KEYFILE_VERSION,
            address: secrets.address(p),
            salt,
            nonce,
            ciphertext,
        })
    }

    /// Decrypt and check the secrets still derive the recorded address.
    pub fn open(&self, p: &dyn Primitives, passphrase: &[u8]) -> Result<AccountSecrets, AccountError> {
        if self.version != KEYFILE_VERSION {
            return Err(AccountError::Keyfile(format!(
                "unsupported version {}",
                self.version
            )));
        }
        let plaintext = Zeroizing::new(
            cipher(passphrase, &self.salt)?
                .decrypt(Nonce::from_slice(&self.nonce), self.ciphertext.as_slice())
                .map_err(|_| AccountError::Decryption)?,
        );
        let secrets = decode_secrets(&plaintext)?;
        if secrets.address(p) != self.address {
            return Err(AccountError::KeyMismatch);
        }
        Ok(secrets)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), AccountError> {
        fs::write(path, serde_json::to_vec_pretty(self)?)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, AccountError> {
        Ok(serde_json::from_slice(&fs::read(path)?)?)
    }
}

fn cipher(passphrase: &[u8], salt: &[u8; 32]) -> Result<ChaCha20Poly1305, AccountError> {
    let mut key = Zeroizing::new([0u8; 32]);
    Argon2::default()
        .hash_password_into(passphrase, salt, &mut key[..])
        .map_err(|e| AccountError::Keyfile(format!("key derivation failed: {e}")))?;
    Ok(ChaCha20Poly1305::new(Key::from_slice(&key[..])))
}

fn encode_secrets(secrets: &AccountSecrets) -> Zeroizing<Vec<u8>> {
    let mut out = Zeroizing::new(Vec::with_capacity(65));
    match secrets {
        AccountSecrets::Private(keys) => {
            out.push(KIND_PRIVATE);
            out.extend_from_slice(keys.view_secret.as_bytes());
            out.extend_from_slice(keys.spend_secret.as_bytes());
        }
        AccountSecrets::Transparent(keys) => {
            let seed = Zeroizing::new(keys.to_bytes());
            out.push(KIND_TRANSPARENT);
            out.extend_from_slice(&seed[..]);
        }
    }
    out
}

fn decode_secrets(bytes: &[u8]) -> Result<AccountSecrets, AccountError> {
    let malformed = || AccountError::Keyfile("malformed secret payload".into());
    match bytes.split_first() {
        Some((&KIND_PRIVATE, rest)) if rest.len() == 64 => {
            let mut view = [0u8; 32];
            let mut spend = [0u8; 32];
            view.copy_from_slice(&rest[..32]);
            spend.copy_from_slice(&rest[32..]);
            Ok(AccountSecrets::Private(PrivateKeys {
                view_secret: Scalar(view),
                spend_secret: Scalar(spend),
            }))
        }
        Some((&KIND_TRANSPARENT, rest)) => {
            let seed: Zeroizing<[u8; 32]> =
                Zeroizing::new(rest.try_into().map_err(|_| malformed())?);
            Ok(AccountSecrets::Transparent(TransparentKeys::from_bytes(&seed)))
        }
        _ => Err(malformed()),
    }
}
