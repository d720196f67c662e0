//! Concise linkable ring signatures over Ristretto255.
//!
//! Proves knowledge of the one-time key of one ring member and of the
//! blinding difference between that member's commitment and the pseudo
//! output, without revealing which member. Both secrets are folded into a
//! single response per member via the aggregation coefficients `mu_P` and
//! `mu_C`.

use curve25519_dalek::{ristretto::RistrettoPoint, scalar::Scalar as DalekScalar};
use rand::rngs::OsRng;

use crate::{
    error::PrimitiveError,
    ristretto::{compress, decompress, from_dalek, hash_to_dalek_scalar, hash_to_point, to_dalek},
    types::{Point, RingProveRequest, RingSignature, RingVerifyRequest},
};

const DOMAIN_AGG_0: &[u8] = b"tenebra_clsag_agg_0";
const DOMAIN_AGG_1: &[u8] = b"tenebra_clsag_agg_1";
const DOMAIN_ROUND: &[u8] = b"tenebra_clsag_round";

/// Decoded ring plus the transcript prefix shared by every round hash.
struct Ring {
    keys: Vec<RistrettoPoint>,
    /// `C_i - C'` per member.
    offsets: Vec<RistrettoPoint>,
    /// `Hp(P_i)` per member.
    key_hashes: Vec<RistrettoPoint>,
    round_prefix: Vec<u8>,
}

impl Ring {
    fn load(
        keys: &[Point],
        commitments: &[Point],
        pseudo_output: &Point,
        message: &[u8; 32],
    ) -> Result<Self, PrimitiveError> {
        if keys.is_empty() {
            return Err(PrimitiveError::EmptyRing);
        }
        if keys.len() != commitments.len() {
            return Err(PrimitiveError::RingShape {
                keys: keys.len(),
                commitments: commitments.len(),
            });
        }

        let pseudo = decompress(pseudo_output)?;
        let mut decoded_keys = Vec::with_capacity(keys.len());
        let mut offsets = Vec::with_capacity(keys.len());
        let mut key_hashes = Vec::with_capacity(keys.len());
        for (key, commitment) in keys.iter().zip(commitments) {
            decoded_keys.push(decompress(key)?);
            offsets.push(decompress(commitment)? - pseudo);
            key_hashes.push(hash_to_point(key.as_bytes()));
        }

        let mut round_prefix = Vec::with_capacity(DOMAIN_ROUND.len() + 64 * keys.len() + 64);
        round_prefix.extend_from_slice(DOMAIN_ROUND);
        for key in keys {
            round_prefix.extend_from_slice(key.as_bytes());
        }
        for commitment in commitments {
            round_prefix.extend_from_slice(commitment.as_bytes());
        }
        round_prefix.extend_from_slice(pseudo_output.as_bytes());
        round_prefix.extend_from_slice(message);

        Ok(Self {
            keys: decoded_keys,
            offsets,
            key_hashes,
            round_prefix,
        })
    }

    fn len(&self) -> usize {
        self.keys.len()
    }

    fn round_hash(&self, l: &RistrettoPoint, r: &RistrettoPoint) -> DalekScalar {
        let mut buf = Vec::with_capacity(self.round_prefix.len() + 64);
        buf.extend_from_slice(&self.round_prefix);
        buf.extend_from_slice(l.compress().as_bytes());
        buf.extend_from_slice(r.compress().as_bytes());
        hash_to_dalek_scalar(&buf)
    }

    /// `(L, R)` for member `i` under challenge `c` and response `s`.
    fn round(
        &self,
        i: usize,
        c: &DalekScalar,
        s: &DalekScalar,
        mu: &Aggregation,
        aggregate_tag: &RistrettoPoint,
    ) -> (RistrettoPoint, RistrettoPoint) {
        let l = RistrettoPoint::mul_base(s) + c * (mu.key * self.keys[i] + mu.commitment * self.offsets[i]);
        let r = s * self.key_hashes[i] + c * aggregate_tag;
        (l, r)
    }
}

struct Aggregation {
    key: DalekScalar,
    commitment: DalekScalar,
}

impl Aggregation {
    fn new(
        keys: &[Point],
        commitments: &[Point],
        linking_tag: &Point,
        commitment_tag: &Point,
        pseudo_output: &Point,
    ) -> Self {
        let mut body = Vec::with_capacity(32 * (2 * keys.len() + 3));
        for key in keys {
            body.extend_from_slice(key.as_bytes());
        }
        for commitment in commitments {
            body.extend_from_slice(commitment.as_bytes());
        }
        body.extend_from_slice(linking_tag.as_bytes());
        body.extend_from_slice(commitment_tag.as_bytes());
        body.extend_from_slice(pseudo_output.as_bytes());

        let domain_hash = |domain: &[u8]| {
            let mut buf = Vec::with_capacity(domain.len() + body.len());
            buf.extend_from_slice(domain);
            buf.extend_from_slice(&body);
            hash_to_dalek_scalar(&buf)
        };

        Self {
            key: domain_hash(DOMAIN_AGG_0),
            commitment: domain_hash(DOMAIN_AGG_1),
        }
    }
}

pub(crate) fn sign(request: &RingProveRequest<'_>) -> Result<RingSignature, PrimitiveError> {
    let ring = Ring::load(
        request.keys,
        request.commitments,
        request.pseudo_output,
        request.message,
    )?;
    let n = ring.len();
    let l = request.secret_index;
    if l >= n {
        return Err(PrimitiveError::SecretIndex { index: l, size: n });
    }

    let p = to_dalek(request.signing_key);
    let z = to_dalek(request.blinding_difference);
    if RistrettoPoint::mul_base(&p) != ring.keys[l] {
        return Err(PrimitiveError::KeyMismatch(l));
    }
    if RistrettoPoint::mul_base(&z) != ring.offsets[l] {
        return Err(PrimitiveError::CommitmentMismatch(l));
    }

    let linking_tag = compress(&(p * ring.key_hashes[l]));
    let commitment_tag = compress(&(z * ring.key_hashes[l]));
    let mu = Aggregation::new(
        request.keys,
        request.commitments,
        &linking_tag,
        &commitment_tag,
        request.pseudo_output,
    );
    let aggregate_tag = mu.key * decompress(&linking_tag)? + mu.commitment * decompress(&commitment_tag)?;

    let alpha = DalekScalar::random(&mut OsRng);
    let mut responses = vec![DalekScalar::ZERO; n];
    let mut c = ring.round_hash(
        &RistrettoPoint::mul_base(&alpha),
        &(alpha * ring.key_hashes[l]),
    );
    let mut challenge_zero = DalekScalar::ZERO;

    let mut i = (l + 1) % n;
    if i == 0 {
        challenge_zero = c;
    }
    while i != l {
        let s = DalekScalar::random(&mut OsRng);
        responses[i] = s;
        let (lp, rp) = ring.round(i, &c, &s, &mu, &aggregate_tag);
        c = ring.round_hash(&lp, &rp);
        i = (i + 1) % n;
        if i == 0 {
            challenge_zero = c;
        }
    }
    responses[l] = alpha - c * (mu.key * p + mu.commitment * z);

    Ok(RingSignature {
        challenge: from_dalek(&challenge_zero),
        responses: responses.iter().map(from_dalek).collect(),
        linking_tag,
        commitment_tag,
    })
}

pub(crate) fn verify(
    request: &RingVerifyRequest<'_>,
    signature: &RingSignature,
) -> Result<bool, PrimitiveError> {
    let ring = Ring::load(
        request.keys,
        request.commitments,
        request.pseudo_output,
        request.message,
    )?;
    let n = ring.len();
    if signature.responses.len() != n {
        return Err(PrimitiveError::ResponseCount {
            got: signature.responses.len(),
            expected: n,
        });
    }

    let mu = Aggregation::new(
        request.keys,
        request.commitments,
        &signature.linking_tag,
        &signature.commitment_tag,
        request.pseudo_output,
    );
    let aggregate_tag = mu.key * decompress(&signature.linking_tag)?
        + mu.commitment * decompress(&signature.commitment_tag)?;

    let challenge_zero = to_dalek(&signature.challenge);
    let mut c = challenge_zero;
    for (i, response) in signature.responses.iter().enumerate() {
        let (lp, rp) = ring.round(i, &c, &to_dalek(response), &mu, &aggregate_tag);
        c = ring.round_hash(&lp, &rp);
    }

    Ok(c == challenge_zero)
}
