//! Pedersen commitments
//!
//! ```text
//! C = mask·G + amount·H
//! ```
//!
//! Outputs with no private input behind them (coinbase, transparent funds
//! moving into private outputs) use [`IDENTITY_MASK`] so anyone can check the
//! claimed amount.

use tenebra_primitives::{Point, Primitives, Scalar};

use crate::error::PrivacyError;

/// Blinding factor of unblinded outputs.
pub const IDENTITY_MASK: Scalar = Scalar::ONE;

pub fn commit(p: &dyn Primitives, mask: &Scalar, amount: u64) -> Point {
    p.commit(mask, amount)
}

pub fn verify_commitment(p: &dyn Primitives, commitment: &Point, mask: &Scalar, amount: u64) -> bool {
    p.commit(mask, amount) == *commitment
}

/// Group sum of `points`; the identity for an empty iterator.
pub fn sum_points<'a>(
    p: &dyn Primitives,
    points: impl IntoIterator<Item = &'a Point>,
) -> Result<Point, PrivacyError> {
    let mut acc = Point::IDENTITY;
    for point in points {
        acc = p.point_add(&acc, point)?;
    }
    Ok(acc)
}

pub(crate) fn sum_scalars<'a>(
    p: &dyn Primitives,
    scalars: impl IntoIterator<Item = &'a Scalar>,
) -> Scalar {
    scalars
        .into_iter()
        .fold(Scalar::ZERO, |acc, s| p.scalar_add(&acc, s))
}
