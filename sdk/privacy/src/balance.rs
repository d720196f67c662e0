//! Pseudo-output balancing
//!
//! ```text
//! b_1..b_{N-1} random
//! b_N = Σ m'_j − Σ_{i<N} b_i
//! Σ Commit(b_i, a_i) == Σ Commit(m'_j, a'_j)   when Σ a_i == Σ a'_j
//! ```
//!
//! The last input always carries the solved factor, so input order must be
//! final before balancing.

use tenebra_primitives::{Point, Primitives, Scalar};

use crate::{commitment::sum_scalars, error::PrivacyError};

/// Input-side commitment standing in for the real (hidden) ring member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PseudoOutput {
    pub commitment: Point,
    pub blinding: Scalar,
}

pub fn balance_pseudo_outputs(
    p: &dyn Primitives,
    input_amounts: &[u64],
    output_masks: &[Scalar],
) -> Result<Vec<PseudoOutput>, PrivacyError> {
    let Some((last_amount, leading)) = input_amounts.split_last() else {
        return Err(PrivacyError::NoInputs);
    };

    let target = sum_scalars(p, output_masks);
    let mut pseudo_outputs = Vec::with_capacity(input_amounts.len());
    let mut running = Scalar::ZERO;
    for amount in leading {
        let blinding = p.random_scalar();
        running = p.scalar_add(&running, &blinding);
        pseudo_outputs.push(PseudoOutput {
            commitment: p.commit(&blinding, *amount),
            blinding,
        });
    }

    let blinding = p.scalar_sub(&target, &running);
    pseudo_outputs.push(PseudoOutput {
        commitment: p.commit(&blinding, *last_amount),
        blinding,
    });
    Ok(pseudo_outputs)
}
