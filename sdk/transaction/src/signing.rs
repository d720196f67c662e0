//! Transparent input signing message.
//!
//! ```text
//! msg = BLAKE3(signing_hash ‖ BLAKE3(tx_src ‖ offset_be32 ‖ address ‖ amount_be64))
//! ```
//!
//! Binding the spent output into the message keeps a signature from being
//! replayed against another transaction or another output.

use crate::{TransparentInput, TransparentOutput};

pub fn transparent_signing_message(
    signing_hash: &[u8; 32],
    input: &TransparentInput,
    spent: &TransparentOutput,
) -> [u8; 32] {
    let mut outpoint = blake3::Hasher::new();
    outpoint.update(&input.tx_src);
    outpoint.update(&input.offset.to_be_bytes());
    outpoint.update(spent.address.as_bytes());
    outpoint.update(&spent.amount.to_be_bytes());

    let mut hasher = blake3::Hasher::new();
    hasher.update(signing_hash);
    hasher.update(outpoint.finalize().as_bytes());
    *hasher.finalize().as_bytes()
}
