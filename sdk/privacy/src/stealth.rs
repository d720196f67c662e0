//! Dual-key stealth addresses
//!
//! ```text
//! sender:   c = r·V          receiver: c = v·R
//! h = Hs(c ‖ index_be32)
//! P = h·G + S                x = h + s        (P == x·G)
//! ```
//!
//! `(V, S)` is the recipient's public view/spend pair, `r` the transaction
//! private key and `R = r·G` its public half.

use tenebra_primitives::{Point, Primitives, Scalar};
use zeroize::Zeroize;

use crate::error::PrivacyError;

/// The per-output derivation scalar `h`.
///
/// Computed once per (transaction, output) and shared by the one-time key,
/// the amount keystream and the commitment mask.
pub struct OutputSecret(Scalar);

impl OutputSecret {
    /// Sender side, from the transaction private key.
    pub fn sender(
        p: &dyn Primitives,
        tx_secret: &Scalar,
        view_public: &Point,
        index: u32,
    ) -> Result<Self, PrivacyError> {
        let shared = p.scalar_mul(view_public, tx_secret)?;
        Ok(Self::from_shared(p, &shared, index))
    }

    /// Receiver side, from the private view key.
    pub fn receiver(
        p: &dyn Primitives,
        tx_public: &Point,
        view_secret: &Scalar,
        index: u32,
    ) -> Result<Self, PrivacyError> {
        let shared = p.scalar_mul(tx_public, view_secret)?;
        Ok(Self::from_shared(p, &shared, index))
    }

    fn from_shared(p: &dyn Primitives, shared: &Point, index: u32) -> Self {
        let mut buf = [0u8; 36];
        buf[..32].copy_from_slice(shared.as_bytes());
        buf[32..].copy_from_slice(&index.to_be_bytes());
        Self(p.hash_to_scalar(&buf))
    }

    pub fn scalar(&self) -> &Scalar {
        &self.0
    }

    /// `h·G + S`
    pub fn one_time_key(
        &self,
        p: &dyn Primitives,
        spend_public: &Point,
    ) -> Result<Point, PrivacyError> {
        Ok(p.point_add(&p.scalar_base_mul(&self.0), spend_public)?)
    }

    /// `h + s`
    pub fn one_time_secret(&self, p: &dyn Primitives, spend_secret: &Scalar) -> Scalar {
        p.scalar_add(&self.0, spend_secret)
    }
}

impl Drop for OutputSecret {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

pub fn derive_one_time_key(
    p: &dyn Primitives,
    tx_secret: &Scalar,
    view_public: &Point,
    spend_public: &Point,
    index: u32,
) -> Result<Point, PrivacyError> {
    OutputSecret::sender(p, tx_secret, view_public, index)?.one_time_key(p, spend_public)
}

pub fn recover_one_time_secret(
    p: &dyn Primitives,
    tx_public: &Point,
    view_secret: &Scalar,
    spend_secret: &Scalar,
    index: u32,
) -> Result<Scalar, PrivacyError> {
    Ok(OutputSecret::receiver(p, tx_public, view_secret, index)?.one_time_secret(p, spend_secret))
}

/// Ownership test that needs only the private view key.
pub fn check_for_balance(
    p: &dyn Primitives,
    tx_public: &Point,
    view_secret: &Scalar,
    spend_public: &Point,
    index: u32,
    candidate: &Point,
) -> Result<bool, PrivacyError> {
    let secret = OutputSecret::receiver(p, tx_public, view_secret, index)?;
    Ok(secret.one_time_key(p, spend_public)? == *candidate)
}
