//! Ring assembly and signing
//!
//! An [`AnonymitySet`] is the ordered list of ring members an input signs
//! over. The real member sits at `secret_index`; the signature proves spend
//! authority over it and that the pseudo output commits to the same amount.

use log::debug;
use tenebra_primitives::{Point, Primitives, RingProveRequest, RingSignature, Scalar};

use crate::{
    balance::PseudoOutput, decoy::RING_SIZE, error::PrivacyError, linking_tag::LinkingTag,
};

/// One on-chain private output referenced by a ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingMember {
    /// Global private-output index.
    pub index: u64,
    pub one_time_key: Point,
    pub commitment: Point,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnonymitySet {
    members: Vec<RingMember>,
    secret_index: usize,
}

impl AnonymitySet {
    pub fn new(members: Vec<RingMember>, secret_index: usize) -> Result<Self, PrivacyError> {
        if members.len() != RING_SIZE {
            return Err(PrivacyError::RingSize {
                got: members.len(),
                expected: RING_SIZE,
            });
        }
        if secret_index >= members.len() {
            return Err(PrivacyError::SecretIndex {
                index: secret_index,
                size: members.len(),
            });
        }
        let mut seen = std::collections::HashSet::with_capacity(members.len());
        for member in &members {
            if !seen.insert(member.index) {
                return Err(PrivacyError::DuplicateMember(member.index));
            }
        }
        Ok(Self {
            members,
            secret_index,
        })
    }

    pub fn members(&self) -> &[RingMember] {
        &self.members
    }

    pub fn secret_index(&self) -> usize {
        self.secret_index
    }

    pub fn real(&self) -> &RingMember {
        &self.members[self.secret_index]
    }

    pub fn keys(&self) -> Vec<Point> {
        self.members.iter().map(|m| m.one_time_key).collect()
    }

    pub fn commitments(&self) -> Vec<Point> {
        self.members.iter().map(|m| m.commitment).collect()
    }

    /// Global indices as written into the transaction input.
    pub fn offsets(&self) -> Vec<u64> {
        self.members.iter().map(|m| m.index).collect()
    }
}

/// Sign one input over its anonymity set.
///
/// `input_mask` opens the real member's commitment; the blinding difference
/// handed to the ring primitive is `input_mask − pseudo.blinding`.
pub fn sign_ring(
    p: &dyn Primitives,
    set: &AnonymitySet,
    pseudo: &PseudoOutput,
    one_time_secret: &Scalar,
    input_mask: &Scalar,
    message: &[u8; 32],
) -> Result<RingSignature, PrivacyError> {
    let expected = LinkingTag::generate(p, one_time_secret)?;
    let difference = p.scalar_sub(input_mask, &pseudo.blinding);
    let keys = set.keys();
    let commitments = set.commitments();

    let signature = p.ring_prove(&RingProveRequest {
        keys: &keys,
        commitments: &commitments,
        pseudo_output: &pseudo.commitment,
        secret_index: set.secret_index(),
        signing_key: one_time_secret,
        blinding_difference: &difference,
        message,
    })?;

    if signature.linking_tag != expected.0 {
        return Err(PrivacyError::LinkingTagMismatch);
    }
    debug!(
        "signed ring input {} at position {}",
        expected,
        set.secret_index()
    );
    Ok(signature)
}

#[cfg(test)]
mod tests {
    use tenebra_primitives::{RingVerifyRequest, RistrettoPrimitives};

    use super::*;
    use crate::balance::balance_pseudo_outputs;

    struct Spend {
        set: AnonymitySet,
        secret: Scalar,
        mask: Scalar,
    }

    fn ring_with_real(p: &RistrettoPrimitives, secret_index: usize, amount: u64) -> Spend {
        let mut members: Vec<RingMember> = (0..RING_SIZE as u64)
            .map(|index| RingMember {
                index: index * 3 + 1,
                one_time_key: p.generate_keypair().1,
                commitment: p.commit(&p.random_scalar(), index),
            })
            .collect();
        let (secret, key) = p.generate_keypair();
        let mask = p.random_scalar();
        members[secret_index].one_time_key = key;
        members[secret_index].commitment = p.commit(&mask, amount);
        Spend {
            set: AnonymitySet::new(members, secret_index).unwrap(),
            secret,
            mask,
        }
    }

    #[test]
    fn test_signed_ring_verifies() {
        let p = RistrettoPrimitives::new();
        let spend = ring_with_real(&p, 17, 1000);
        let out_masks = [p.random_scalar(), p.random_scalar()];
        let pseudo = balance_pseudo_outputs(&p, &[1000], &out_masks).unwrap()[0];
        let message = [5u8; 32];

        let sig = sign_ring(&p, &spend.set, &pseudo, &spend.secret, &spend.mask, &message).unwrap();
        assert_eq!(
            sig.linking_tag,
            LinkingTag::generate(&p, &spend.secret).unwrap().0
        );

        let ok = p
            .ring_verify(
                &RingVerifyRequest {
                    keys: &spend.set.keys(),
                    commitments: &spend.set.commitments(),
                    pseudo_output: &pseudo.commitment,
                    message: &message,
                },
                &sig,
            )
            .unwrap();
        assert!(ok);
    }

    #[test]
    fn test_pseudo_output_must_match_amount() {
        let p = RistrettoPrimitives::new();
        let spend = ring_with_real(&p, 0, 1000);
        let pseudo = balance_pseudo_outputs(&p, &[999], &[p.random_scalar()]).unwrap()[0];

        let err = sign_ring(&p, &spend.set, &pseudo, &spend.secret, &spend.mask, &[0u8; 32]);
        assert!(matches!(err, Err(PrivacyError::Primitive(_))));
    }

    #[test]
    fn test_anonymity_set_shape_enforced() {
        let member = RingMember {
            index: 1,
            one_time_key: Point::IDENTITY,
            commitment: Point::IDENTITY,
        };
        assert_eq!(
            AnonymitySet::new(vec![member; 3], 0),
            Err(PrivacyError::RingSize {
                got: 3,
                expected: RING_SIZE
            })
        );
        assert_eq!(
            AnonymitySet::new(vec![member; RING_SIZE], 0),
            Err(PrivacyError::DuplicateMember(1))
        );

        let members: Vec<RingMember> = (0..RING_SIZE as u64)
            .map(|index| RingMember { index, ..member })
            .collect();
        let set = AnonymitySet::new(members.clone(), 9).unwrap();
        assert_eq!(set.offsets(), (0..RING_SIZE as u64).collect::<Vec<_>>());
        assert!(matches!(
            AnonymitySet::new(members, RING_SIZE),
            Err(PrivacyError::SecretIndex { .. })
        ));
    }
}
