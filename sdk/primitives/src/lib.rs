//! Tenebra Primitives
//!
//! The single seam through which every protocol in Tenebra touches curve
//! arithmetic, hashing, commitments, ring signatures and range proofs.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                     dyn Primitives                               │
//! │  scalar/point ops · commit · hash · linking tag · ring · range   │
//! └──────────────────────────────┬───────────────────────────────────┘
//!                                │
//!              ┌─────────────────┴──────────────────┐
//!              │        RistrettoPrimitives         │
//!              │  curve25519-dalek  (Ristretto255)  │
//!              │  CLSAG ring signatures             │
//!              │  Bulletproofs range proofs         │
//!              └────────────────────────────────────┘
//! ```
//!
//! Protocol code only sees [`Scalar`] and [`Point`], fixed 32-byte encodings,
//! so an alternative backend (for example FFI into an audited library) can be
//! swapped in without touching the wallet.

pub mod clsag;
pub mod error;
pub mod range_proof;
pub mod ristretto;
pub mod types;

pub use error::PrimitiveError;
pub use range_proof::{MAX_RANGE_OUTPUTS, RANGE_BITS};
pub use ristretto::RistrettoPrimitives;
pub use types::{Point, RangeProof, RingProveRequest, RingSignature, RingVerifyRequest, Scalar};

/// Curve and proof operations consumed by the protocol layers.
///
/// Scalars are reduced modulo the group order on input. Points are
/// compressed encodings; operations that decode a point fail with
/// [`PrimitiveError::InvalidPoint`] on a bad encoding.
pub trait Primitives: Send + Sync {
    /// `s·G`
    fn scalar_base_mul(&self, scalar: &Scalar) -> Point;

    /// `s·P`
    fn scalar_mul(&self, point: &Point, scalar: &Scalar) -> Result<Point, PrimitiveError>;

    fn scalar_add(&self, a: &Scalar, b: &Scalar) -> Scalar;

    fn scalar_sub(&self, a: &Scalar, b: &Scalar) -> Scalar;

    fn point_add(&self, a: &Point, b: &Point) -> Result<Point, PrimitiveError>;

    fn point_sub(&self, a: &Point, b: &Point) -> Result<Point, PrimitiveError>;

    /// Pedersen commitment `mask·G + amount·H`.
    fn commit(&self, mask: &Scalar, amount: u64) -> Point;

    /// Hash arbitrary bytes to a uniformly distributed scalar.
    fn hash_to_scalar(&self, bytes: &[u8]) -> Scalar;

    /// 32-byte content hash.
    fn hash(&self, bytes: &[u8]) -> [u8; 32];

    fn random_scalar(&self) -> Scalar;

    /// Fresh `(secret, public)` pair with `public = secret·G`.
    fn generate_keypair(&self) -> (Scalar, Point) {
        let secret = self.random_scalar();
        let public = self.scalar_base_mul(&secret);
        (secret, public)
    }

    /// Deterministic linking tag (key image) of a one-time secret key.
    fn linking_tag(&self, secret: &Scalar) -> Result<Point, PrimitiveError>;

    fn ring_prove(&self, request: &RingProveRequest<'_>) -> Result<RingSignature, PrimitiveError>;

    fn ring_verify(
        &self,
        request: &RingVerifyRequest<'_>,
        signature: &RingSignature,
    ) -> Result<bool, PrimitiveError>;

    /// Aggregated proof that every `amounts[i]` committed under `masks[i]`
    /// lies in `[0, 2^64)`.
    fn range_prove(&self, amounts: &[u64], masks: &[Scalar]) -> Result<RangeProof, PrimitiveError>;

    fn range_verify(&self, commitments: &[Point], proof: &RangeProof)
    -> Result<bool, PrimitiveError>;
}
