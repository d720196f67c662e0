use std::fmt;

use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

/// A scalar modulo the group order (32 bytes, little-endian).
///
/// Used for secret keys, blinding factors and hash outputs alike, so the
/// `Debug` impl never prints the value.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Zeroize)]
pub struct Scalar(pub [u8; 32]);

impl Scalar {
    pub const ZERO: Self = Self([0u8; 32]);

    /// The identity mask used for unblinded (coinbase / converted) outputs.
    pub const ONE: Self = {
        let mut bytes = [0u8; 32];
        bytes[0] = 1;
        Self(bytes)
    };

    pub fn from_u64(value: u64) -> Self {
        let mut bytes = [0u8; 32];
        bytes[..8].copy_from_slice(&value.to_le_bytes());
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Scalar(..)")
    }
}

impl AsRef<[u8]> for Scalar {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// A compressed group element (32 bytes).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord, Serialize, Deserialize, Zeroize)]
pub struct Point(pub [u8; 32]);

impl Point {
    /// Encoding of the group identity.
    pub const IDENTITY: Self = Self([0u8; 32]);

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Point({}..)", hex::encode(&self.0[..8]))
    }
}

impl AsRef<[u8]> for Point {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// A CLSAG signature together with the two tags it links to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RingSignature {
    /// Challenge entering ring member 0.
    pub challenge: Scalar,
    /// One response per ring member.
    pub responses: Vec<Scalar>,
    /// Key image of the real signer: `x·Hp(P_l)`.
    pub linking_tag: Point,
    /// Commitment-offset image: `z·Hp(P_l)`.
    pub commitment_tag: Point,
}

/// Serialized aggregated range proof.
#[derive(Clone, PartialEq, Eq)]
pub struct RangeProof(pub Vec<u8>);

impl RangeProof {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for RangeProof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RangeProof({} bytes)", self.0.len())
    }
}

/// Inputs to [`crate::Primitives::ring_prove`].
///
/// `keys[secret_index] == signing_key·G` and
/// `commitments[secret_index] - pseudo_output == blinding_difference·G`.
pub struct RingProveRequest<'a> {
    pub keys: &'a [Point],
    pub commitments: &'a [Point],
    pub pseudo_output: &'a Point,
    pub secret_index: usize,
    pub signing_key: &'a Scalar,
    pub blinding_difference: &'a Scalar,
    pub message: &'a [u8; 32],
}

/// Inputs to [`crate::Primitives::ring_verify`].
pub struct RingVerifyRequest<'a> {
    pub keys: &'a [Point],
    pub commitments: &'a [Point],
    pub pseudo_output: &'a Point,
    pub message: &'a [u8; 32],
}
