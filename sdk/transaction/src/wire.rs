//! Wire format (big-endian):
//!
//! ```text
//! prefix:
//!   version u8 · variant u8
//!   #t_in u32 · #p_in u32 · #t_out u32 · #p_out u32
//!   [tx_public_key 32]                       if #p_out > 0
//!   t_in  × (tx_src 32 · offset u32)
//!   p_in  × (#ring u32 · ring × u64 · linking_tag 32)
//!   t_out × (address 32 · amount u64)
//!   p_out × (one_time_key 32 · commitment 32 · masked_amount u64)
//!   [proof_len u32 · proof]                  if #p_out > 0
//! witness:
//!   p_in  × pseudo_output 32
//!   p_in  × (challenge 32 · #resp u32 · resp × 32 · linking_tag 32 · commitment_tag 32)
//!   t_in  × (public_key 32 · signature 64)
//! ```

use std::io::{Cursor, Read, Write};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use tenebra_account::TransparentAddress;
use tenebra_primitives::{Point, RangeProof, RingSignature, Scalar};
use tenebra_privacy::LinkingTag;

use crate::{
    PrivateInput, PrivateOutput, TX_VERSION, TransactionError, TransactionPrefix, TransactionVariant,
    TransparentInput, TransparentOutput, TransparentSignature, Witness,
};

/// Upper bound on any length field, to refuse absurd allocations.
pub const MAX_ITEMS: u32 = 1 << 16;
pub const MAX_PROOF_LEN: u32 = 1 << 16;

fn write_len<W: Write>(w: &mut W, what: &'static str, len: usize) -> Result<(), TransactionError> {
    let len = u32::try_from(len)
        .ok()
        .filter(|l| *l <= MAX_ITEMS)
        .ok_or(TransactionError::TooMany { what, count: len })?;
    w.write_u32::<BigEndian>(len)?;
    Ok(())
}

fn read_len<R: Read>(r: &mut R, what: &'static str, max: u32) -> Result<usize, TransactionError> {
    let len = r.read_u32::<BigEndian>()?;
    if len > max {
        return Err(TransactionError::TooMany {
            what,
            count: len as usize,
        });
    }
    Ok(len as usize)
}

fn read_array<R: Read, const N: usize>(r: &mut R) -> Result<[u8; N], TransactionError> {
    let mut out = [0u8; N];
    r.read_exact(&mut out)?;
    Ok(out)
}

pub(crate) fn write_prefix<W: Write>(w: &mut W, prefix: &TransactionPrefix) -> Result<(), TransactionError> {
    w.write_u8(TX_VERSION)?;
    w.write_u8(prefix.variant as u8)?;
    write_len(w, "transparent inputs", prefix.transparent_inputs.len())?;
    write_len(w, "private inputs", prefix.private_inputs.len())?;
    write_len(w, "transparent outputs", prefix.transparent_outputs.len())?;
    write_len(w, "private outputs", prefix.private_outputs.len())?;

    let has_private_outputs = !prefix.private_outputs.is_empty();
    if has_private_outputs {
        let key = prefix
            .tx_public_key
            .ok_or(TransactionError::Inconsistent("missing tx public key"))?;
        w.write_all(key.as_bytes())?;
    }

    for input in &prefix.transparent_inputs {
        w.write_all(&input.tx_src)?;
        w.write_u32::<BigEndian>(input.offset)?;
    }
    for input in &prefix.private_inputs {
        write_len(w, "ring members", input.offsets.len())?;
        for offset in &input.offsets {
            w.write_u64::<BigEndian>(*offset)?;
        }
        w.write_all(input.linking_tag.as_bytes())?;
    }
    for output in &prefix.transparent_outputs {
        w.write_all(output.address.as_bytes())?;
        w.write_u64::<BigEndian>(output.amount)?;
    }
    for output in &prefix.private_outputs {
        w.write_all(output.one_time_key.as_bytes())?;
        w.write_all(output.commitment.as_bytes())?;
        w.write_u64::<BigEndian>(output.masked_amount)?;
    }

    if has_private_outputs {
        let proof = prefix
            .range_proof
            .as_ref()
            .ok_or(TransactionError::Inconsistent("missing range proof"))?;
        if proof.len() > MAX_PROOF_LEN as usize {
            return Err(TransactionError::TooMany {
                what: "range proof bytes",
                count: proof.len(),
            });
        }
        w.write_u32::<BigEndian>(proof.len() as u32)?;
        w.write_all(proof.as_bytes())?;
    }
    Ok(())
}

pub(crate) fn write_witness<W: Write>(w: &mut W, witness: &Witness) -> Result<(), TransactionError> {
    for pseudo in &witness.pseudo_outputs {
        w.write_all(pseudo.as_bytes())?;
    }
    for sig in &witness.ring_signatures {
        w.write_all(sig.challenge.as_bytes())?;
        write_len(w, "ring responses", sig.responses.len())?;
        for response in &sig.responses {
            w.write_all(response.as_bytes())?;
        }
        w.write_all(sig.linking_tag.as_bytes())?;
        w.write_all(sig.commitment_tag.as_bytes())?;
    }
    for sig in &witness.transparent_signatures {
        w.write_all(&sig.public_key)?;
        w.write_all(&sig.signature)?;
    }
    Ok(())
}

pub(crate) fn decode(bytes: &[u8]) -> Result<(TransactionPrefix, Witness), TransactionError> {
    let mut r = Cursor::new(bytes);

    let version = r.read_u8()?;
    if version != TX_VERSION {
        return Err(TransactionError::UnsupportedVersion(version));
    }
    let variant = TransactionVariant::try_from(r.read_u8()?)?;
    let t_in = read_len(&mut r, "transparent inputs", MAX_ITEMS)?;
    let p_in = read_len(&mut r, "private inputs", MAX_ITEMS)?;
    let t_out = read_len(&mut r, "transparent outputs", MAX_ITEMS)?;
    let p_out = read_len(&mut r, "private outputs", MAX_ITEMS)?;

    let tx_public_key = if p_out > 0 {
        Some(Point(read_array(&mut r)?))
    } else {
        None
    };

    let mut transparent_inputs = Vec::with_capacity(t_in);
    for _ in 0..t_in {
        transparent_inputs.push(TransparentInput {
            tx_src: read_array(&mut r)?,
            offset: r.read_u32::<BigEndian>()?,
        });
    }

    let mut private_inputs = Vec::with_capacity(p_in);
    for _ in 0..p_in {
        let ring = read_len(&mut r, "ring members", MAX_ITEMS)?;
        let mut offsets = Vec::with_capacity(ring);
        for _ in 0..ring {
            offsets.push(r.read_u64::<BigEndian>()?);
        }
        private_inputs.push(PrivateInput {
            offsets,
            linking_tag: LinkingTag::from_bytes(read_array(&mut r)?),
        });
    }

    let mut transparent_outputs = Vec::with_capacity(t_out);
    for _ in 0..t_out {
        transparent_outputs.push(TransparentOutput {
            address: TransparentAddress(read_array(&mut r)?),
            amount: r.read_u64::<BigEndian>()?,
        });
    }

    let mut private_outputs = Vec::with_capacity(p_out);
    for _ in 0..p_out {
        private_outputs.push(PrivateOutput {
            one_time_key: Point(read_array(&mut r)?),
            commitment: Point(read_array(&mut r)?),
            masked_amount: r.read_u64::<BigEndian>()?,
        });
    }

    let range_proof = if p_out > 0 {
        let len = read_len(&mut r, "range proof bytes", MAX_PROOF_LEN)?;
        let mut proof = vec![0u8; len];
        r.read_exact(&mut proof)?;
        Some(RangeProof(proof))
    } else {
        None
    };

    let mut pseudo_outputs = Vec::with_capacity(p_in);
    for _ in 0..p_in {
        pseudo_outputs.push(Point(read_array(&mut r)?));
    }

    let mut ring_signatures = Vec::with_capacity(p_in);
    for _ in 0..p_in {
        let challenge = Scalar(read_array(&mut r)?);
        let count = read_len(&mut r, "ring responses", MAX_ITEMS)?;
        let mut responses = Vec::with_capacity(count);
        for _ in 0..count {
            responses.push(Scalar(read_array(&mut r)?));
        }
        ring_signatures.push(RingSignature {
            challenge,
            responses,
            linking_tag: Point(read_array(&mut r)?),
            commitment_tag: Point(read_array(&mut r)?),
        });
    }

    let mut transparent_signatures = Vec::with_capacity(t_in);
    for _ in 0..t_in {
        transparent_signatures.push(TransparentSignature {
            public_key: read_array(&mut r)?,
            signature: read_array(&mut r)?,
        });
    }

    let consumed = r.position() as usize;
    if consumed != bytes.len() {
        return Err(TransactionError::TrailingBytes(bytes.len() - consumed));
    }

    Ok((
        TransactionPrefix {
            variant,
            tx_public_key,
            transparent_inputs,
            private_inputs,
            transparent_outputs,
            private_outputs,
            range_proof,
        },
        Witness {
            pseudo_outputs,
            ring_signatures,
            transparent_signatures,
        },
    ))
}
