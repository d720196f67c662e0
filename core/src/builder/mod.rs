//! Confidential transaction builder.
//!
//! ```text
//! classify ─▶ select UTXOs ─▶ transparent parts ─▶ private outputs (one tx key)
//!          ─▶ rings for private inputs ─▶ change (last, source type)
//!          ─▶ range proof ─▶ signing hash ─▶ pseudo-outputs + signatures
//!          ─▶ Transaction (content-addressed id)
//! ```
//!
//! Any failing step drops the UTXO reservation and returns the error; no
//! partial transaction leaves this module.

pub mod classify;
pub mod coinbase;
pub mod select;

use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, info};
use tenebra_account::{
    AccountSecrets, Address, Direction, HistoryTx, PrivateUtxoData, RelayStatus, StealthAddress,
    TransparentKeys, Utxo, UtxoKey, UtxoKind,
};
use tenebra_primitives::{Primitives, Scalar};
use tenebra_privacy::{AnonymitySet, IDENTITY_MASK, OutputSecret, balance_pseudo_outputs, sign_ring};
use tenebra_transaction::{
    PrivateInput, PrivateOutput, Transaction, TransactionPrefix, TransactionVariant,
    TransparentInput, TransparentOutput, TransparentSignature, Witness, transparent_signing_message,
};

pub use classify::classify;
pub use coinbase::coinbase_transaction;
pub use select::{Reservation, select_utxos};

use crate::chain::ChainView;
use crate::error::{Result, WalletError};
use crate::shared::SharedAccount;

/// One requested payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Destination {
    pub address: Address,
    pub amount: u64,
}

impl Destination {
    pub fn new(address: Address, amount: u64) -> Self {
        Self { address, amount }
    }
}

/// A signed transaction plus what the wallet needs to track it.
#[derive(Debug, Clone)]
pub struct BuiltTransaction {
    pub transaction: Transaction,
    /// Inputs it consumes; they stay reserved until the scanner sees the
    /// spend or the relay rejects it.
    pub spent: Vec<UtxoKey>,
    pub history: HistoryTx,
}

/// Sum of destination amounts; zero amounts and overflow are refused.
pub fn requested_total(destinations: &[Destination]) -> Result<u64> {
    destinations.iter().try_fold(0u64, |acc, d| {
        if d.amount == 0 {
            return Err(WalletError::InvalidAmount);
        }
        acc.checked_add(d.amount).ok_or(WalletError::InvalidAmount)
    })
}

/// Private outputs of one transaction and the openings behind them.
pub(crate) struct StealthOutputs {
    pub outputs: Vec<PrivateOutput>,
    pub masks: Vec<Scalar>,
    pub amounts: Vec<u64>,
}

/// Derive every private output from one transaction secret. Outputs of a
/// transaction with no private inputs commit under [`IDENTITY_MASK`].
pub(crate) fn stealth_outputs(
    p: &dyn Primitives,
    tx_secret: &Scalar,
    recipients: &[(StealthAddress, u64)],
    identity_mask: bool,
) -> Result<StealthOutputs> {
    let mut built = StealthOutputs {
        outputs: Vec::with_capacity(recipients.len()),
        masks: Vec::with_capacity(recipients.len()),
        amounts: Vec::with_capacity(recipients.len()),
    };
    for (index, (address, amount)) in recipients.iter().enumerate() {
        let secret = OutputSecret::sender(p, tx_secret, &address.view_key, index as u32)?;
        let mask = if identity_mask {
            IDENTITY_MASK
        } else {
            secret.commitment_mask(p)
        };
        built.outputs.push(PrivateOutput {
            one_time_key: secret.one_time_key(p, &address.spend_key)?,
            commitment: p.commit(&mask, *amount),
            masked_amount: secret.mask_amount(p, *amount),
        });
        built.masks.push(mask);
        built.amounts.push(*amount);
    }
    Ok(built)
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// A private input waiting for its signature.
struct RingInput<'u> {
    set: AnonymitySet,
    data: &'u PrivateUtxoData,
}

pub struct TransactionBuilder<'a> {
    p: &'a dyn Primitives,
    chain: &'a dyn ChainView,
}

impl<'a> TransactionBuilder<'a> {
    pub fn new(p: &'a dyn Primitives, chain: &'a dyn ChainView) -> Self {
        Self { p, chain }
    }

    /// Build and sign a transaction paying `destinations` from `account`.
    ///
    /// Change goes back to the account's own address as the last output.
    /// On success the selected UTXOs remain reserved.
    pub fn build(
        &self,
        account: &SharedAccount,
        destinations: &[Destination],
    ) -> Result<BuiltTransaction> {
        let requested = requested_total(destinations)?;
        let (source, secrets) = {
            let guard = account.read();
            let secrets = guard
                .secrets()
                .map_err(|_| WalletError::AccountLocked(account.id()))?
                .clone();
            (*guard.address(), secrets)
        };

        let variant = classify(source.kind(), destinations)?;
        let (reservation, inputs) = select_utxos(account, requested)?;

        let input_total = inputs
            .iter()
            .try_fold(0u64, |acc, u| acc.checked_add(u.amount()))
            .ok_or(WalletError::InvalidAmount)?;
        let mut outputs: Vec<Destination> = destinations.to_vec();
        let change = input_total - requested;
        if change > 0 {
            outputs.push(Destination::new(source, change));
        }

        let transaction = self.assemble(variant, &source, &secrets, &inputs, &outputs)?;
        let spent = reservation.keep();
        info!(
            "built {:?} tx {}: {} input(s), {} output(s), change {}",
            variant,
            transaction.id(),
            transaction.num_inputs(),
            transaction.num_outputs(),
            change
        );

        let history = HistoryTx {
            tx_id: transaction.id().0,
            timestamp: unix_now(),
            direction: Direction::Sent,
            counterparties: destinations.iter().map(|d| d.address).collect(),
            amounts: destinations.iter().map(|d| d.amount).collect(),
            status: RelayStatus::Pending,
        };
        Ok(BuiltTransaction {
            transaction,
            spent,
            history,
        })
    }

    fn assemble(
        &self,
        variant: TransactionVariant,
        source: &Address,
        secrets: &AccountSecrets,
        inputs: &[Utxo],
        outputs: &[Destination],
    ) -> Result<Transaction> {
        let p = self.p;

        // Transparent parts carry no masking.
        let transparent_inputs: Vec<(TransparentInput, TransparentOutput)> = inputs
            .iter()
            .filter_map(|utxo| match (&utxo.kind, source) {
                (UtxoKind::Transparent { amount }, Address::Transparent(address)) => Some((
                    TransparentInput {
                        tx_src: utxo.tx_src,
                        offset: utxo.index,
                    },
                    TransparentOutput {
                        address: *address,
                        amount: *amount,
                    },
                )),
                _ => None,
            })
            .collect();
        let private_spends: Vec<&PrivateUtxoData> =
            inputs.iter().filter_map(Utxo::private_data).collect();
        if transparent_inputs.len() + private_spends.len() != inputs.len() {
            return Err(WalletError::InvalidTransaction(
                "selected outputs do not match the account type",
            ));
        }

        let transparent_outputs: Vec<TransparentOutput> = outputs
            .iter()
            .filter_map(|d| match d.address {
                Address::Transparent(address) => Some(TransparentOutput {
                    address,
                    amount: d.amount,
                }),
                Address::Stealth(_) => None,
            })
            .collect();
        let recipients: Vec<(StealthAddress, u64)> = outputs
            .iter()
            .filter_map(|d| match d.address {
                Address::Stealth(address) => Some((address, d.amount)),
                Address::Transparent(_) => None,
            })
            .collect();

        // One ephemeral keypair for every private output.
        let (tx_public_key, private) = if recipients.is_empty() {
            (None, None)
        } else {
            let (tx_secret, tx_public) = p.generate_keypair();
            let built = stealth_outputs(p, &tx_secret, &recipients, private_spends.is_empty())?;
            (Some(tx_public), Some(built))
        };

        let rings = private_spends
            .iter()
            .map(|data| self.ring_for(*data))
            .collect::<Result<Vec<_>>>()?;

        let range_proof = match &private {
            Some(built) => Some(p.range_prove(&built.amounts, &built.masks)?),
            None => None,
        };
        let (private_outputs, output_masks) = match private {
            Some(built) => (built.outputs, built.masks),
            None => (Vec::new(), Vec::new()),
        };

        let prefix = TransactionPrefix {
            variant,
            tx_public_key,
            transparent_inputs: transparent_inputs.iter().map(|(input, _)| *input).collect(),
            private_inputs: rings
                .iter()
                .map(|ring| PrivateInput {
                    offsets: ring.set.offsets(),
                    linking_tag: ring.data.linking_tag,
                })
                .collect(),
            transparent_outputs,
            private_outputs,
            range_proof,
        };
        let signing_hash = prefix.signing_hash()?;

        let mut witness = Witness::default();
        if !rings.is_empty() {
            let amounts: Vec<u64> = rings.iter().map(|ring| ring.data.amount).collect();
            let pseudo = balance_pseudo_outputs(p, &amounts, &output_masks)?;
            for (ring, pseudo) in rings.iter().zip(&pseudo) {
                witness.ring_signatures.push(sign_ring(
                    p,
                    &ring.set,
                    pseudo,
                    &ring.data.one_time_secret,
                    &ring.data.mask,
                    &signing_hash,
                )?);
                witness.pseudo_outputs.push(pseudo.commitment);
            }
        }
        if !transparent_inputs.is_empty() {
            let AccountSecrets::Transparent(keys) = secrets else {
                return Err(WalletError::InvalidTransaction(
                    "transparent inputs need transparent keys",
                ));
            };
            witness.transparent_signatures = transparent_inputs
                .iter()
                .map(|(input, spent)| sign_transparent(keys, &signing_hash, input, spent))
                .collect();
        }

        Ok(Transaction::new(prefix, witness)?)
    }

    /// Fetch decoys around the real output and check the chain still holds
    /// it where the UTXO says.
    fn ring_for<'u>(&self, data: &'u PrivateUtxoData) -> Result<RingInput<'u>> {
        let selection = self
            .chain
            .get_mixins(data.global_index)
            .map_err(WalletError::Chain)?;
        let members = self
            .chain
            .get_outputs(&selection.indices)
            .map_err(WalletError::Chain)?;
        let real = members
            .get(selection.secret_position)
            .ok_or(WalletError::InvalidTransaction("ring is missing its real member"))?;
        if real.one_time_key != data.one_time_key || real.commitment != data.commitment {
            return Err(WalletError::InvalidTransaction(
                "chain output does not match the spent utxo",
            ));
        }
        debug!(
            "ring for output #{} has the real member at position {}",
            data.global_index, selection.secret_position
        );
        let set = AnonymitySet::new(members, selection.secret_position)?;
        Ok(RingInput { set, data })
    }
}

fn sign_transparent(
    keys: &TransparentKeys,
    signing_hash: &[u8; 32],
    input: &TransparentInput,
    spent: &TransparentOutput,
) -> TransparentSignature {
    let message = transparent_signing_message(signing_hash, input, spent);
    TransparentSignature {
        public_key: keys.verifying_key().to_bytes(),
        signature: keys.sign(&message),
    }
}

#[cfg(test)]
mod tests {
    use tenebra_account::TransparentAddress;

    use super::*;

    fn dest(amount: u64) -> Destination {
        Destination::new(
            Address::Transparent(TransparentAddress([1; 32])),
            amount,
        )
    }

    #[test]
    fn test_requested_total() {
        assert_eq!(requested_total(&[dest(400), dest(600)]).unwrap(), 1000);
        assert!(matches!(
            requested_total(&[dest(1), dest(0)]),
            Err(WalletError::InvalidAmount)
        ));
        assert!(matches!(
            requested_total(&[dest(u64::MAX), dest(1)]),
            Err(WalletError::InvalidAmount)
        ));
    }
}
