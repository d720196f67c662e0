//! Public addresses.
//!
//! String form is base58 of `version ‖ payload ‖ checksum`, where the
//! checksum is the first four bytes of BLAKE3(version ‖ payload).

use std::{fmt, str::FromStr};

use ed25519_dalek::VerifyingKey;
use serde::{Deserialize, Serialize};
use tenebra_primitives::Point;

use crate::error::AccountError;

const STEALTH_VERSION: u8 = 0x01;
const TRANSPARENT_VERSION: u8 = 0x02;
const CHECKSUM_LEN: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressKind {
    Stealth,
    Transparent,
}

/// Public view and spend keys of a private account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StealthAddress {
    pub view_key: Point,
    pub spend_key: Point,
}

/// BLAKE3 hash of an Ed25519 verifying key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TransparentAddress(pub [u8; 32]);

impl TransparentAddress {
    pub fn from_verifying_key(key: &VerifyingKey) -> Self {
        Self(*blake3::hash(key.as_bytes()).as_bytes())
    }

    /// Whether `key` hashes to this address.
    pub fn matches(&self, key: &VerifyingKey) -> bool {
        Self::from_verifying_key(key) == *self
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Address {
    Stealth(StealthAddress),
    Transparent(TransparentAddress),
}

impl Address {
    pub fn kind(&self) -> AddressKind {
        match self {
            Address::Stealth(_) => AddressKind::Stealth,
            Address::Transparent(_) => AddressKind::Transparent,
        }
    }

    pub fn as_stealth(&self) -> Option<&StealthAddress> {
        match self {
            Address::Stealth(addr) => Some(addr),
            Address::Transparent(_) => None,
        }
    }

    pub fn as_transparent(&self) -> Option<&TransparentAddress> {
        match self {
            Address::Transparent(addr) => Some(addr),
            Address::Stealth(_) => None,
        }
    }

    /// `version ‖ payload`, without checksum.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Address::Stealth(addr) => {
                let mut out = Vec::with_capacity(65);
                out.push(STEALTH_VERSION);
                out.extend_from_slice(addr.view_key.as_bytes());
                out.extend_from_slice(addr.spend_key.as_bytes());
                out
            }
            Address::Transparent(addr) => {
                let mut out = Vec::with_capacity(33);
                out.push(TRANSPARENT_VERSION);
                out.extend_from_slice(&addr.0);
                out
            }
        }
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, AccountError> {
        let (&version, payload) = bytes
            .split_first()
            .ok_or_else(|| AccountError::InvalidAddress("empty".into()))?;
        match version {
            STEALTH_VERSION => {
                if payload.len() != 64 {
                    return Err(AccountError::InvalidAddress(format!(
                        "stealth payload is {} bytes",
                        payload.len()
                    )));
                }
                let mut view = [0u8; 32];
                let mut spend = [0u8; 32];
                view.copy_from_slice(&payload[..32]);
                spend.copy_from_slice(&payload[32..]);
                Ok(Address::Stealth(StealthAddress {
                    view_key: Point(view),
                    spend_key: Point(spend),
                }))
            }
            TRANSPARENT_VERSION => {
                let hash: [u8; 32] = payload.try_into().map_err(|_| {
                    AccountError::InvalidAddress(format!(
                        "transparent payload is {} bytes",
                        payload.len()
                    ))
                })?;
                Ok(Address::Transparent(TransparentAddress(hash)))
            }
            other => Err(AccountError::UnknownVersion(other)),
        }
    }
}

fn checksum(body: &[u8]) -> [u8; CHECKSUM_LEN] {
    let mut out = [0u8; CHECKSUM_LEN];
    out.copy_from_slice(&blake3::hash(body).as_bytes()[..CHECKSUM_LEN]);
    out
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut body = self.to_bytes();
        let check = checksum(&body);
        body.extend_from_slice(&check);
        f.write_str(&bs58::encode(body).into_string())
    }
}

impl FromStr for Address {
    type Err = AccountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = bs58::decode(s)
            .into_vec()
            .map_err(|e| AccountError::InvalidAddress(e.to_string()))?;
        if raw.len() <= CHECKSUM_LEN {
            return Err(AccountError::InvalidAddress("too short".into()));
        }
        let (body, check) = raw.split_at(raw.len() - CHECKSUM_LEN);
        if checksum(body) != check {
            return Err(AccountError::Checksum);
        }
        Address::from_bytes(body)
    }
}

impl TryFrom<String> for Address {
    type Error = AccountError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Address> for String {
    fn from(value: Address) -> Self {
        value.to_string()
    }
}

impl From<StealthAddress> for Address {
    fn from(value: StealthAddress) -> Self {
        Address::Stealth(value)
    }
}

impl From<TransparentAddress> for Address {
    fn from(value: TransparentAddress) -> Self {
        Address::Transparent(value)
    }
}
