//! Amount masking
//!
//! ```text
//! masked = amount XOR le_u64(H("amount" ‖ h)[..8])
//! mask   = Hs("commitment_mask" ‖ h)
//! ```
//!
//! Both derive from the per-output secret `h`, so the recipient can rebuild
//! the amount and the commitment blinding and check `Commit(mask, amount)`.

use tenebra_primitives::{Point, Primitives, Scalar};

use crate::{error::PrivacyError, stealth::OutputSecret};

const AMOUNT_DOMAIN: &[u8] = b"amount";
const COMMITMENT_MASK_DOMAIN: &[u8] = b"commitment_mask";

impl OutputSecret {
    fn domain_bytes(&self, domain: &[u8]) -> Vec<u8> {
        let mut buf = Vec::with_capacity(domain.len() + 32);
        buf.extend_from_slice(domain);
        buf.extend_from_slice(self.scalar().as_bytes());
        buf
    }

    /// XOR the amount with this output's keystream. Its own inverse.
    pub fn mask_amount(&self, p: &dyn Primitives, amount: u64) -> u64 {
        let digest = p.hash(&self.domain_bytes(AMOUNT_DOMAIN));
        let mut keystream = [0u8; 8];
        keystream.copy_from_slice(&digest[..8]);
        amount ^ u64::from_le_bytes(keystream)
    }

    pub fn commitment_mask(&self, p: &dyn Primitives) -> Scalar {
        p.hash_to_scalar(&self.domain_bytes(COMMITMENT_MASK_DOMAIN))
    }
}

pub fn gen_amount_mask(
    p: &dyn Primitives,
    tx_secret: &Scalar,
    view_public: &Point,
    index: u32,
    amount: u64,
) -> Result<u64, PrivacyError> {
    Ok(OutputSecret::sender(p, tx_secret, view_public, index)?.mask_amount(p, amount))
}

pub fn gen_amount_mask_recover(
    p: &dyn Primitives,
    tx_public: &Point,
    view_secret: &Scalar,
    index: u32,
    masked_amount: u64,
) -> Result<u64, PrivacyError> {
    Ok(OutputSecret::receiver(p, tx_public, view_secret, index)?.mask_amount(p, masked_amount))
}

pub fn gen_commitment_mask(
    p: &dyn Primitives,
    tx_secret: &Scalar,
    view_public: &Point,
    index: u32,
) -> Result<Scalar, PrivacyError> {
    Ok(OutputSecret::sender(p, tx_secret, view_public, index)?.commitment_mask(p))
}

pub fn recover_commitment_mask(
    p: &dyn Primitives,
    tx_public: &Point,
    view_secret: &Scalar,
    index: u32,
) -> Result<Scalar, PrivacyError> {
    Ok(OutputSecret::receiver(p, tx_public, view_secret, index)?.commitment_mask(p))
}
