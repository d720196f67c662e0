//! Per-account block scanning.
//!
//! Pure: reads a block and the account's current UTXOs, returns the delta.
//! Outputs are collected before inputs so an output created and spent in
//! the same block is seen as ours when its spend is checked.

use std::collections::HashSet;

use log::{debug, warn};
use tenebra_account::{
    Direction, HistoryTx, PrivateKeys, PrivateUtxoData, RelayStatus, TransparentAddress, Utxo,
    UtxoDelta, UtxoKey, UtxoKind, UtxoSet,
};
use tenebra_block::Block;
use tenebra_primitives::{Point, Primitives};
use tenebra_privacy::{IDENTITY_MASK, LinkingTag, OutputSecret, verify_commitment};
use tenebra_transaction::TxId;

use crate::error::WalletError;

/// Public facts about one private output.
pub(crate) struct OutputFacts {
    pub tx_src: [u8; 32],
    pub index: u32,
    pub global_index: u64,
    pub tx_public_key: Point,
    pub one_time_key: Point,
    pub commitment: Point,
    pub identity_mask: bool,
}

/// Turn an output known to be ours into spendable data, refusing it if the
/// commitment does not open to `amount`.
pub(crate) fn claim_output(
    p: &dyn Primitives,
    keys: &PrivateKeys,
    facts: &OutputFacts,
    secret: &OutputSecret,
    amount: u64,
) -> Result<PrivateUtxoData, WalletError> {
    let mask = if facts.identity_mask {
        IDENTITY_MASK
    } else {
        secret.commitment_mask(p)
    };
    if !verify_commitment(p, &facts.commitment, &mask, amount) {
        return Err(WalletError::MalformedCommitment {
            tx: hex::encode(facts.tx_src),
            index: facts.index,
        });
    }

    let one_time_secret = secret.one_time_secret(p, &keys.spend_secret);
    let linking_tag = LinkingTag::generate(p, &one_time_secret)?;
    Ok(PrivateUtxoData {
        one_time_secret,
        linking_tag,
        mask,
        amount,
        one_time_key: facts.one_time_key,
        commitment: facts.commitment,
        global_index: facts.global_index,
        tx_public_key: facts.tx_public_key,
    })
}

/// The key material an account scans with.
pub enum ScanKeys<'a> {
    Private {
        keys: &'a PrivateKeys,
        spend_public: Point,
    },
    Transparent(&'a TransparentAddress),
}

impl<'a> ScanKeys<'a> {
    pub fn private(p: &dyn Primitives, keys: &'a PrivateKeys) -> Self {
        ScanKeys::Private {
            keys,
            spend_public: p.scalar_base_mul(&keys.spend_secret),
        }
    }
}

/// What one account learned from a block (or a run of blocks).
#[derive(Debug, Default)]
pub struct BlockScan {
    pub delta: UtxoDelta,
    /// Incoming transactions that spent none of our outputs.
    pub received: Vec<HistoryTx>,
    /// Owned outputs refused for a bad commitment.
    pub rejected: usize,
}

impl BlockScan {
    pub fn extend(&mut self, later: BlockScan) {
        self.delta.extend(later.delta);
        self.received.extend(later.received);
        self.rejected += later.rejected;
    }
}

/// Scans consecutive blocks for one account, remembering outputs found in
/// earlier blocks of the same run.
pub struct AccountScanner<'a> {
    p: &'a dyn Primitives,
    keys: ScanKeys<'a>,
    known: &'a UtxoSet,
    pending: HashSet<UtxoKey>,
}

impl<'a> AccountScanner<'a> {
    pub fn new(p: &'a dyn Primitives, keys: ScanKeys<'a>, known: &'a UtxoSet) -> Self {
        Self {
            p,
            keys,
            known,
            pending: HashSet::new(),
        }
    }

    fn is_ours(&self, key: &UtxoKey) -> bool {
        self.known.contains(key) || self.pending.contains(key)
    }

    pub fn scan_block(&mut self, block: &Block) -> Result<BlockScan, WalletError> {
        let mut scan = BlockScan::default();
        let mut received: Vec<(TxId, Vec<u64>)> = Vec::new();
        let mut note_received = |tx: TxId, amount: u64| match received.last_mut() {
            Some((last, amounts)) if *last == tx => amounts.push(amount),
            _ => received.push((tx, vec![amount])),
        };

        match &self.keys {
            ScanKeys::Private { keys, spend_public } => {
                for indexed in block.private_outputs() {
                    let Some(tx_public_key) = indexed.tx.tx_public_key() else {
                        continue;
                    };
                    let derived = OutputSecret::receiver(
                        self.p,
                        tx_public_key,
                        &keys.view_secret,
                        indexed.index,
                    )
                    .and_then(|secret| {
                        let one_time_key = secret.one_time_key(self.p, spend_public)?;
                        Ok((secret, one_time_key))
                    });
                    let secret = match derived {
                        Ok((secret, one_time_key)) if one_time_key == indexed.output.one_time_key => {
                            secret
                        }
                        Ok(_) => continue,
                        Err(e) => {
                            warn!(
                                "block {}: skipping output #{} with undecodable keys: {}",
                                block.height(),
                                indexed.global_index,
                                e
                            );
                            continue;
                        }
                    };

                    let amount = secret.mask_amount(self.p, indexed.output.masked_amount);
                    let facts = OutputFacts {
                        tx_src: indexed.tx.id().0,
                        index: indexed.index,
                        global_index: indexed.global_index,
                        tx_public_key: *tx_public_key,
                        one_time_key: indexed.output.one_time_key,
                        commitment: indexed.output.commitment,
                        identity_mask: indexed.tx.uses_identity_mask(),
                    };
                    match claim_output(self.p, keys, &facts, &secret, amount) {
                        Ok(data) => {
                            debug!(
                                "block {}: private output #{} worth {}",
                                block.height(),
                                indexed.global_index,
                                amount
                            );
                            note_received(indexed.tx.id(), amount);
                            scan.delta.added.push(Utxo {
                                tx_src: facts.tx_src,
                                index: facts.index,
                                kind: UtxoKind::Private(data),
                            });
                        }
                        Err(e @ WalletError::MalformedCommitment { .. }) => {
                            warn!("block {}: rejected owned output: {}", block.height(), e);
                            scan.rejected += 1;
                        }
                        Err(e) => return Err(e),
                    }
                }
            }
            ScanKeys::Transparent(address) => {
                for tx in block.all_transactions() {
                    for (offset, output) in tx.transparent_outputs().iter().enumerate() {
                        if output.address != **address {
                            continue;
                        }
                        debug!(
                            "block {}: transparent output {}:{} worth {}",
                            block.height(),
                            tx.id(),
                            offset,
                            output.amount
                        );
                        note_received(tx.id(), output.amount);
                        scan.delta.added.push(Utxo {
                            tx_src: tx.id().0,
                            index: offset as u32,
                            kind: UtxoKind::Transparent {
                                amount: output.amount,
                            },
                        });
                    }
                }
            }
        }
        self.pending.extend(scan.delta.added.iter().map(Utxo::key));

        let mut spenders = HashSet::new();
        for tx in block.all_transactions() {
            let private = tx
                .private_inputs()
                .iter()
                .map(|input| UtxoKey::LinkingTag(input.linking_tag));
            let transparent = tx.transparent_inputs().iter().map(|input| UtxoKey::Outpoint {
                tx_src: input.tx_src,
                index: input.offset,
            });
            for key in private.chain(transparent) {
                if self.is_ours(&key) {
                    self.pending.remove(&key);
                    scan.delta.spent.push(key);
                    spenders.insert(tx.id());
                }
            }
        }

        scan.received = received
            .into_iter()
            .filter(|(tx, _)| !spenders.contains(tx))
            .map(|(tx, amounts)| HistoryTx {
                tx_id: tx.0,
                timestamp: block.header.timestamp,
                direction: Direction::Received,
                counterparties: Vec::new(),
                amounts,
                status: RelayStatus::Confirmed,
            })
            .collect();
        Ok(scan)
    }
}

/// Scan a single block against an account's current UTXOs.
pub fn scan_block(
    p: &dyn Primitives,
    keys: ScanKeys<'_>,
    known: &UtxoSet,
    block: &Block,
) -> Result<BlockScan, WalletError> {
    AccountScanner::new(p, keys, known).scan_block(block)
}
