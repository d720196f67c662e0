use std::fmt;

use bulletproofs::{BulletproofGens, PedersenGens};
use curve25519_dalek::{
    constants::RISTRETTO_BASEPOINT_POINT,
    ristretto::{CompressedRistretto, RistrettoPoint},
    scalar::Scalar as DalekScalar,
};
use rand::rngs::OsRng;
use sha2::Sha512;

use crate::{
    Primitives, clsag,
    error::PrimitiveError,
    range_proof::{self, MAX_RANGE_OUTPUTS, RANGE_BITS},
    types::{Point, RangeProof, RingProveRequest, RingSignature, RingVerifyRequest, Scalar},
};

/// Ristretto255 backend: dalek arithmetic, CLSAG rings, Bulletproofs ranges.
///
/// Commitments are `mask·G + amount·H` where `G` is the Ristretto basepoint
/// and `H` is the Bulletproofs hash-derived generator, so nobody knows
/// `log_G(H)`.
#[derive(Clone)]
pub struct RistrettoPrimitives {
    pc_gens: PedersenGens,
    bp_gens: BulletproofGens,
}

impl RistrettoPrimitives {
    pub fn new() -> Self {
        // bulletproofs commits as `v·B + r·B_blinding`; swap roles so the
        // blinding factor rides on the basepoint.
        let amount_generator = PedersenGens::default().B_blinding;
        Self {
            pc_gens: PedersenGens {
                B: amount_generator,
                B_blinding: RISTRETTO_BASEPOINT_POINT,
            },
            bp_gens: BulletproofGens::new(RANGE_BITS, MAX_RANGE_OUTPUTS),
        }
    }

    /// The amount generator `H`.
    pub fn amount_generator(&self) -> Point {
        compress(&self.pc_gens.B)
    }
}

impl Default for RistrettoPrimitives {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RistrettoPrimitives {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RistrettoPrimitives")
            .field("range_bits", &RANGE_BITS)
            .field("max_range_outputs", &MAX_RANGE_OUTPUTS)
            .finish()
    }
}

impl Primitives for RistrettoPrimitives {
    fn scalar_base_mul(&self, scalar: &Scalar) -> Point {
        compress(&RistrettoPoint::mul_base(&to_dalek(scalar)))
    }

    fn scalar_mul(&self, point: &Point, scalar: &Scalar) -> Result<Point, PrimitiveError> {
        Ok(compress(&(decompress(point)? * to_dalek(scalar))))
    }

    fn scalar_add(&self, a: &Scalar, b: &Scalar) -> Scalar {
        from_dalek(&(to_dalek(a) + to_dalek(b)))
    }

    fn scalar_sub(&self, a: &Scalar, b: &Scalar) -> Scalar {
        from_dalek(&(to_dalek(a) - to_dalek(b)))
    }

    fn point_add(&self, a: &Point, b: &Point) -> Result<Point, PrimitiveError> {
        Ok(compress(&(decompress(a)? + decompress(b)?)))
    }

    fn point_sub(&self, a: &Point, b: &Point) -> Result<Point, PrimitiveError> {
        Ok(compress(&(decompress(a)? - decompress(b)?)))
    }

    fn commit(&self, mask: &Scalar, amount: u64) -> Point {
        compress(&self.pc_gens.commit(DalekScalar::from(amount), to_dalek(mask)))
    }

    fn hash_to_scalar(&self, bytes: &[u8]) -> Scalar {
        from_dalek(&hash_to_dalek_scalar(bytes))
    }

    fn hash(&self, bytes: &[u8]) -> [u8; 32] {
        *blake3::hash(bytes).as_bytes()
    }

    fn random_scalar(&self) -> Scalar {
        from_dalek(&DalekScalar::random(&mut OsRng))
    }

    fn linking_tag(&self, secret: &Scalar) -> Result<Point, PrimitiveError> {
        let x = to_dalek(secret);
        let public = compress(&RistrettoPoint::mul_base(&x));
        Ok(compress(&(x * hash_to_point(public.as_bytes()))))
    }

    fn ring_prove(&self, request: &RingProveRequest<'_>) -> Result<RingSignature, PrimitiveError> {
        clsag::sign(request)
    }

    fn ring_verify(
        &self,
        request: &RingVerifyRequest<'_>,
        signature: &RingSignature,
    ) -> Result<bool, PrimitiveError> {
        clsag::verify(request, signature)
    }

    fn range_prove(&self, amounts: &[u64], masks: &[Scalar]) -> Result<RangeProof, PrimitiveError> {
        range_proof::prove(&self.bp_gens, &self.pc_gens, amounts, masks)
    }

    fn range_verify(
        &self,
        commitments: &[Point],
        proof: &RangeProof,
    ) -> Result<bool, PrimitiveError> {
        range_proof::verify(&self.bp_gens, &self.pc_gens, commitments, proof)
    }
}

// ============================================================================
// Conversions
// ============================================================================

pub(crate) fn to_dalek(scalar: &Scalar) -> DalekScalar {
    DalekScalar::from_bytes_mod_order(scalar.0)
}

pub(crate) fn from_dalek(scalar: &DalekScalar) -> Scalar {
    Scalar(scalar.to_bytes())
}

pub(crate) fn compress(point: &RistrettoPoint) -> Point {
    Point(point.compress().to_bytes())
}

pub(crate) fn decompress(point: &Point) -> Result<RistrettoPoint, PrimitiveError> {
    CompressedRistretto(point.0)
        .decompress()
        .ok_or(PrimitiveError::InvalidPoint)
}

pub(crate) fn hash_to_dalek_scalar(bytes: &[u8]) -> DalekScalar {
    DalekScalar::hash_from_bytes::<Sha512>(bytes)
}

pub(crate) fn hash_to_point(bytes: &[u8]) -> RistrettoPoint {
    RistrettoPoint::hash_from_bytes::<Sha512>(bytes)
}
