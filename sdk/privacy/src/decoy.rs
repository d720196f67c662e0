//! Decoy selection
//!
//! A ring holds the real output plus 63 decoys drawn from the global output
//! index space in two phases:
//!
//! ```text
//! 32 × uniform     over [1, max)
//! 31 × triangular  floor(max · 3/4 · sqrt(u / 16)),  u ∈ [0, 1)
//! ```
//!
//! Duplicates are redrawn. The real index is then inserted and the whole set
//! shuffled, so its position carries no information.

use std::collections::HashSet;

use rand::{Rng, seq::SliceRandom};

use crate::error::PrivacyError;

/// Members per anonymity set.
pub const RING_SIZE: usize = 64;

const UNIFORM_DRAWS: usize = 32;
const TRIANGULAR_DRAWS: usize = RING_SIZE - 1 - UNIFORM_DRAWS;

/// Triangular draws give up after this many collisions and fall back to a
/// uniform draw; the triangular support is only `max · 3/16` wide.
const TRIANGULAR_ATTEMPTS: usize = 32;

/// Ring member indices in signing order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoySelection {
    pub indices: Vec<u64>,
    /// Position of the real output within `indices`.
    pub secret_position: usize,
}

impl DecoySelection {
    pub fn real_index(&self) -> u64 {
        self.indices[self.secret_position]
    }
}

pub fn select_decoys<R: Rng + ?Sized>(
    rng: &mut R,
    real_index: u64,
    max_index: u64,
) -> Result<DecoySelection, PrivacyError> {
    if max_index <= RING_SIZE as u64 {
        return Err(PrivacyError::NotEnoughOutputs {
            available: max_index,
            required: RING_SIZE as u64,
        });
    }
    if real_index >= max_index {
        return Err(PrivacyError::IndexOutOfRange {
            index: real_index,
            max: max_index,
        });
    }

    let mut seen = HashSet::with_capacity(RING_SIZE);
    seen.insert(real_index);
    let mut indices = Vec::with_capacity(RING_SIZE);

    for _ in 0..UNIFORM_DRAWS {
        indices.push(draw_uniform(rng, max_index, &mut seen));
    }
    for _ in 0..TRIANGULAR_DRAWS {
        let index = match draw_triangular(rng, max_index, &mut seen) {
            Some(index) => index,
            None => draw_uniform(rng, max_index, &mut seen),
        };
        indices.push(index);
    }

    indices.push(real_index);
    indices.shuffle(rng);
    let secret_position = indices
        .iter()
        .position(|&i| i == real_index)
        .ok_or(PrivacyError::IndexOutOfRange {
            index: real_index,
            max: max_index,
        })?;

    Ok(DecoySelection {
        indices,
        secret_position,
    })
}

/// `[1, max)` holds at least `RING_SIZE` values, so this always terminates.
fn draw_uniform<R: Rng + ?Sized>(rng: &mut R, max_index: u64, seen: &mut HashSet<u64>) -> u64 {
    loop {
        let index = rng.gen_range(1..max_index);
        if seen.insert(index) {
            return index;
        }
    }
}

fn draw_triangular<R: Rng + ?Sized>(
    rng: &mut R,
    max_index: u64,
    seen: &mut HashSet<u64>,
) -> Option<u64> {
    for _ in 0..TRIANGULAR_ATTEMPTS {
        let u: f64 = rng.gen_range(0.0..1.0);
        let index = (max_index as f64 * 0.75 * (u / 16.0).sqrt()).floor() as u64;
        if index != 0 && index < max_index && seen.insert(index) {
            return Some(index);
        }
    }
    None
}
