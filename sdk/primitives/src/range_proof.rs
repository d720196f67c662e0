//! Aggregated Bulletproofs range proofs over output commitments.

use bulletproofs::{BulletproofGens, PedersenGens, RangeProof as BpRangeProof};
use curve25519_dalek::{ristretto::CompressedRistretto, scalar::Scalar as DalekScalar};
use merlin::Transcript;

use crate::{
    error::PrimitiveError,
    ristretto::to_dalek,
    types::{Point, RangeProof, Scalar},
};

/// Bit width every amount is proven against.
pub const RANGE_BITS: usize = 64;

/// Largest number of outputs one aggregated proof may cover.
pub const MAX_RANGE_OUTPUTS: usize = 16;

const TRANSCRIPT_LABEL: &[u8] = b"tenebra_range_proof";

/// Aggregation requires a power-of-two party count; pad with zero-valued,
/// zero-blinded commitments (the identity).
fn padded_len(count: usize) -> Result<usize, PrimitiveError> {
    if count == 0 {
        return Err(PrimitiveError::EmptyRangeProof);
    }
    if count > MAX_RANGE_OUTPUTS {
        return Err(PrimitiveError::TooManyOutputs {
            got: count,
            max: MAX_RANGE_OUTPUTS,
        });
    }
    Ok(count.next_power_of_two())
}

pub(crate) fn prove(
    bp_gens: &BulletproofGens,
    pc_gens: &PedersenGens,
    amounts: &[u64],
    masks: &[Scalar],
) -> Result<RangeProof, PrimitiveError> {
    if amounts.len() != masks.len() {
        return Err(PrimitiveError::LengthMismatch {
            amounts: amounts.len(),
            masks: masks.len(),
        });
    }
    let padded = padded_len(amounts.len())?;

    let mut values = amounts.to_vec();
    values.resize(padded, 0);
    let mut blindings: Vec<DalekScalar> = masks.iter().map(to_dalek).collect();
    blindings.resize(padded, DalekScalar::ZERO);

    let mut transcript = Transcript::new(TRANSCRIPT_LABEL);
    let (proof, _) = BpRangeProof::prove_multiple(
        bp_gens,
        pc_gens,
        &mut transcript,
        &values,
        &blindings,
        RANGE_BITS,
    )
    .map_err(|e| PrimitiveError::RangeProof(format!("{e:?}")))?;

    Ok(RangeProof(proof.to_bytes()))
}

pub(crate) fn verify(
    bp_gens: &BulletproofGens,
    pc_gens: &PedersenGens,
    commitments: &[Point],
    proof: &RangeProof,
) -> Result<bool, PrimitiveError> {
    let padded = padded_len(commitments.len())?;

    let proof = match BpRangeProof::from_bytes(proof.as_bytes()) {
        Ok(proof) => proof,
        Err(_) => return Ok(false),
    };

    let mut compressed: Vec<CompressedRistretto> = commitments
        .iter()
        .map(|c| CompressedRistretto(c.0))
        .collect();
    compressed.resize(padded, CompressedRistretto([0u8; 32]));

    let mut transcript = Transcript::new(TRANSCRIPT_LABEL);
    Ok(proof
        .verify_multiple(bp_gens, pc_gens, &mut transcript, &compressed, RANGE_BITS)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use crate::{Primitives, RistrettoPrimitives};

    use super::*;

    #[test]
    fn proves_and_verifies_uneven_batches() {
        let p = RistrettoPrimitives::new();
        for count in [1usize, 2, 3, 5] {
            let amounts: Vec<u64> = (0..count as u64).map(|i| 1_000 * (i + 1)).collect();
            let masks: Vec<Scalar> = (0..count).map(|_| p.random_scalar()).collect();
            let commitments: Vec<Point> = amounts
                .iter()
                .zip(&masks)
                .map(|(a, m)| p.commit(m, *a))
                .collect();

            let proof = p.range_prove(&amounts, &masks).unwrap();
            assert!(p.range_verify(&commitments, &proof).unwrap(), "count {count}");
        }
    }

    #[test]
    fn covers_the_full_u64_range() {
        let p = RistrettoPrimitives::new();
        let mask = p.random_scalar();
        let proof = p.range_prove(&[u64::MAX], &[mask]).unwrap();
        assert!(p.range_verify(&[p.commit(&mask, u64::MAX)], &proof).unwrap());
    }

    #[test]
    fn rejects_foreign_commitment() {
        let p = RistrettoPrimitives::new();
        let mask = p.random_scalar();
        let proof = p.range_prove(&[10], &[mask]).unwrap();
        assert!(!p.range_verify(&[p.commit(&mask, 11)], &proof).unwrap());
    }

    #[test]
    fn garbage_bytes_do_not_verify() {
        let p = RistrettoPrimitives::new();
        let c = p.commit(&Scalar::ONE, 1);
        assert!(!p.range_verify(&[c], &RangeProof(vec![1, 2, 3])).unwrap());
    }

    #[test]
    fn enforces_output_limits() {
        let p = RistrettoPrimitives::new();
        assert_eq!(
            p.range_prove(&[], &[]).unwrap_err(),
            PrimitiveError::EmptyRangeProof
        );
        let amounts = vec![1u64; MAX_RANGE_OUTPUTS + 1];
        let masks = vec![Scalar::ONE; MAX_RANGE_OUTPUTS + 1];
        assert!(matches!(
            p.range_prove(&amounts, &masks),
            Err(PrimitiveError::TooManyOutputs { .. })
        ));
        assert!(matches!(
            p.range_prove(&[1, 2], &[Scalar::ONE]),
            Err(PrimitiveError::LengthMismatch { .. })
        ));
    }
}
