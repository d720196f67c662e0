//! Full check of a finalized transaction against the chain.
//!
//! ```text
//! no private inputs:  Σ C_out == n·G + (T_in − T_out)·H      (identity masks)
//! otherwise:          Σ P_in + T_in·H == Σ C_out + T_out·H
//! ```

use std::collections::HashSet;

use ed25519_dalek::{Signature, VerifyingKey};
use log::debug;
use tenebra_primitives::{Point, Primitives, RingVerifyRequest, Scalar};
use tenebra_privacy::{RING_SIZE, sum_points};
use tenebra_transaction::{Transaction, TransactionVariant, transparent_signing_message};

use crate::chain::ChainView;
use crate::error::{Result, WalletError};

fn invalid(reason: &'static str) -> WalletError {
    WalletError::InvalidTransaction(reason)
}

fn checked_sum(amounts: impl IntoIterator<Item = u64>) -> Result<u64> {
    amounts
        .into_iter()
        .try_fold(0u64, |acc, a| acc.checked_add(a))
        .ok_or(invalid("transparent amounts overflow"))
}

pub fn verify_transaction(
    p: &dyn Primitives,
    chain: &dyn ChainView,
    tx: &Transaction,
) -> Result<()> {
    tx.prefix().validate()?;
    if tx.prefix().signing_hash()? != *tx.signing_hash() {
        return Err(invalid("signing hash does not match the prefix"));
    }

    if let Some(proof) = tx.range_proof() {
        let commitments: Vec<Point> = tx.private_outputs().iter().map(|o| o.commitment).collect();
        if !p.range_verify(&commitments, proof)? {
            return Err(invalid("range proof"));
        }
    }

    verify_rings(p, chain, tx)?;
    let transparent_in = verify_transparent_inputs(chain, tx)?;
    let transparent_out = checked_sum(tx.transparent_outputs().iter().map(|o| o.amount))?;
    verify_balance(p, tx, transparent_in, transparent_out)?;

    debug!("verified tx {}", tx.id());
    Ok(())
}

fn verify_rings(p: &dyn Primitives, chain: &dyn ChainView, tx: &Transaction) -> Result<()> {
    let mut tags = HashSet::with_capacity(tx.private_inputs().len());
    let signed = tx
        .private_inputs()
        .iter()
        .zip(tx.ring_signatures())
        .zip(tx.pseudo_outputs());
    for ((input, signature), pseudo) in signed {
        if !tags.insert(input.linking_tag) {
            return Err(invalid("linking tag repeated within the transaction"));
        }
        if signature.linking_tag != input.linking_tag.0 {
            return Err(invalid("ring signature signs a different linking tag"));
        }
        if input.offsets.len() != RING_SIZE {
            return Err(invalid("ring has the wrong size"));
        }

        let members = chain
            .get_outputs(&input.offsets)
            .map_err(WalletError::Chain)?;
        let keys: Vec<Point> = members.iter().map(|m| m.one_time_key).collect();
        let commitments: Vec<Point> = members.iter().map(|m| m.commitment).collect();
        let request = RingVerifyRequest {
            keys: &keys,
            commitments: &commitments,
            pseudo_output: pseudo,
            message: tx.signing_hash(),
        };
        if !p.ring_verify(&request, signature)? {
            return Err(invalid("ring signature"));
        }
    }
    Ok(())
}

/// Check every transparent signature; returns the total spent.
fn verify_transparent_inputs(chain: &dyn ChainView, tx: &Transaction) -> Result<u64> {
    let mut total = 0u64;
    for (input, signed) in tx.transparent_inputs().iter().zip(tx.transparent_signatures()) {
        let spent = chain
            .get_transparent_output(&input.tx_src, input.offset)
            .map_err(WalletError::Chain)?
            .ok_or(invalid("transparent input spends an unknown output"))?;
        let key = VerifyingKey::from_bytes(&signed.public_key)
            .map_err(|_| invalid("malformed transparent public key"))?;
        if !spent.address.matches(&key) {
            return Err(invalid("transparent key does not own the spent output"));
        }

        let message = transparent_signing_message(tx.signing_hash(), input, &spent);
        key.verify_strict(&message, &Signature::from_bytes(&signed.signature))
            .map_err(|_| invalid("transparent signature"))?;
        total = total
            .checked_add(spent.amount)
            .ok_or(invalid("transparent amounts overflow"))?;
    }
    Ok(total)
}

fn verify_balance(
    p: &dyn Primitives,
    tx: &Transaction,
    transparent_in: u64,
    transparent_out: u64,
) -> Result<()> {
    if tx.variant() == TransactionVariant::Coinbase {
        return Ok(());
    }
    let outputs = sum_points(p, tx.private_outputs().iter().map(|o| &o.commitment))?;

    if tx.private_inputs().is_empty() {
        let private_out = transparent_in
            .checked_sub(transparent_out)
            .ok_or(invalid("transparent outputs exceed inputs"))?;
        let expected = if tx.private_outputs().is_empty() {
            if private_out != 0 {
                return Err(invalid("transparent amounts do not balance"));
            }
            Point::IDENTITY
        } else {
            let masks = Scalar::from_u64(tx.private_outputs().len() as u64);
            p.commit(&masks, private_out)
        };
        if outputs != expected {
            return Err(invalid("identity-masked outputs do not balance"));
        }
        return Ok(());
    }

    let pseudo = sum_points(p, tx.pseudo_outputs())?;
    let lhs = p.point_add(&pseudo, &p.commit(&Scalar::ZERO, transparent_in))?;
    let rhs = p.point_add(&outputs, &p.commit(&Scalar::ZERO, transparent_out))?;
    if lhs != rhs {
        return Err(invalid("commitments do not balance"));
    }
    Ok(())
}
