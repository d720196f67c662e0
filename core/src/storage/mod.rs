//! Wallet persistence.
//!
//! A [`WalletStore`] keeps, per account, the UTXO records, the last fully
//! scanned height and the history. Every scan step lands as one
//! [`WalletBatch`] so a crash leaves either all of a block (or chunk) or
//! none of it.

pub mod db;
pub mod memory;

use anyhow::Result;
use tenebra_account::{AccountError, AccountId, HistoryTx, PrivateKeys, Utxo, UtxoDelta, UtxoKey, UtxoKind};
use tenebra_primitives::{Point, Primitives, Scalar};
use tenebra_privacy::{LinkingTag, OutputSecret};
use wincode::{SchemaRead, SchemaWrite};

pub use db::RocksDbWalletStore;
pub use memory::MemoryWalletStore;

use crate::error::WalletError;
use crate::scan::block::{OutputFacts, claim_output};

pub trait WalletStore: Send + Sync {
    fn load_utxos(&self, account: &AccountId) -> Result<Vec<UtxoRecord>>;

    /// Highest fully scanned height, if any.
    fn checkpoint(&self, account: &AccountId) -> Result<Option<u64>>;

    /// History ordered by timestamp.
    fn history(&self, account: &AccountId) -> Result<Vec<HistoryTx>>;

    /// Apply every write in `batch` atomically: puts, then deletes.
    fn apply_batch(&self, batch: WalletBatch) -> Result<()>;

    fn put_history(&self, account: AccountId, tx: HistoryTx) -> Result<()> {
        self.apply_batch(WalletBatch {
            history: vec![(account, tx)],
            ..WalletBatch::default()
        })
    }
}

/// Writes committed together.
#[derive(Debug, Default)]
pub struct WalletBatch {
    pub utxo_puts: Vec<(AccountId, UtxoRecord)>,
    pub utxo_deletes: Vec<(AccountId, UtxoKey)>,
    pub checkpoints: Vec<(AccountId, u64)>,
    pub history: Vec<(AccountId, HistoryTx)>,
}

impl WalletBatch {
    pub fn record_delta(&mut self, account: AccountId, delta: &UtxoDelta) {
        self.utxo_puts
            .extend(delta.added.iter().map(|u| (account, UtxoRecord::from_utxo(u))));
        self.utxo_deletes
            .extend(delta.spent.iter().map(|key| (account, *key)));
    }

    pub fn is_empty(&self) -> bool {
        self.utxo_puts.is_empty()
            && self.utxo_deletes.is_empty()
            && self.checkpoints.is_empty()
            && self.history.is_empty()
    }
}

const RECORD_PRIVATE: u8 = 1;
const RECORD_TRANSPARENT: u8 = 2;

/// Persisted form of a [`Utxo`].
///
/// One-time secrets and masks are not stored; [`UtxoRecord::restore`]
/// re-derives them from the account keys.
#[derive(Debug, Clone, PartialEq, Eq, SchemaRead, SchemaWrite)]
pub struct UtxoRecord {
    pub tx_src: [u8; 32],
    pub index: u32,
    pub kind: u8,
    pub amount: u64,
    pub global_index: u64,
    pub tx_public_key: [u8; 32],
    pub one_time_key: [u8; 32],
    pub commitment: [u8; 32],
    /// Public once spent; zero for transparent records.
    pub linking_tag: [u8; 32],
    pub identity_mask: u8,
}

impl UtxoRecord {
    pub fn from_utxo(utxo: &Utxo) -> Self {
        match &utxo.kind {
            UtxoKind::Private(data) => Self {
                tx_src: utxo.tx_src,
                index: utxo.index,
                kind: RECORD_PRIVATE,
                amount: data.amount,
                global_index: data.global_index,
                tx_public_key: data.tx_public_key.0,
                one_time_key: data.one_time_key.0,
                commitment: data.commitment.0,
                linking_tag: *data.linking_tag.as_bytes(),
                identity_mask: u8::from(data.mask == Scalar::ONE),
            },
            UtxoKind::Transparent { amount } => Self {
                tx_src: utxo.tx_src,
                index: utxo.index,
                kind: RECORD_TRANSPARENT,
                amount: *amount,
                global_index: 0,
                tx_public_key: [0; 32],
                one_time_key: [0; 32],
                commitment: [0; 32],
                linking_tag: [0; 32],
                identity_mask: 0,
            },
        }
    }

    /// Rebuild the spendable UTXO. Private records need the account keys.
    pub fn restore(
        &self,
        p: &dyn Primitives,
        keys: Option<&PrivateKeys>,
    ) -> Result<Utxo, WalletError> {
        let kind = match self.kind {
            RECORD_TRANSPARENT => UtxoKind::Transparent {
                amount: self.amount,
            },
            RECORD_PRIVATE => {
                let keys = keys.ok_or(AccountError::Locked)?;
                let facts = OutputFacts {
                    tx_src: self.tx_src,
                    index: self.index,
                    global_index: self.global_index,
                    tx_public_key: Point(self.tx_public_key),
                    one_time_key: Point(self.one_time_key),
                    commitment: Point(self.commitment),
                    identity_mask: self.identity_mask != 0,
                };
                let secret =
                    OutputSecret::receiver(p, &facts.tx_public_key, &keys.view_secret, self.index)?;
                let spend_public = p.scalar_base_mul(&keys.spend_secret);
                if secret.one_time_key(p, &spend_public)? != facts.one_time_key {
                    return Err(WalletError::Storage(anyhow::anyhow!(
                        "stored output {}:{} does not belong to this account",
                        hex::encode(self.tx_src),
                        self.index
                    )));
                }
                let data = claim_output(p, keys, &facts, &secret, self.amount)?;
                if data.linking_tag.as_bytes() != &self.linking_tag {
                    return Err(WalletError::Storage(anyhow::anyhow!(
                        "stored linking tag of {}:{} does not match its keys",
                        hex::encode(self.tx_src),
                        self.index
                    )));
                }
                UtxoKind::Private(data)
            }
            other => {
                return Err(WalletError::Storage(anyhow::anyhow!(
                    "unknown utxo record kind {other}"
                )));
            }
        };
        Ok(Utxo {
            tx_src: self.tx_src,
            index: self.index,
            kind,
        })
    }

    pub fn key(&self) -> UtxoKey {
        if self.kind == RECORD_PRIVATE {
            UtxoKey::LinkingTag(LinkingTag::from_bytes(self.linking_tag))
        } else {
            UtxoKey::Outpoint {
                tx_src: self.tx_src,
                index: self.index,
            }
        }
    }
}

/// Byte form of a [`UtxoKey`], prefixed by its kind.
pub(crate) fn utxo_key_bytes(key: &UtxoKey) -> Vec<u8> {
    match key {
        UtxoKey::LinkingTag(tag) => {
            let mut out = Vec::with_capacity(33);
            out.push(RECORD_PRIVATE);
            out.extend_from_slice(tag.as_bytes());
            out
        }
        UtxoKey::Outpoint { tx_src, index } => {
            let mut out = Vec::with_capacity(37);
            out.push(RECORD_TRANSPARENT);
            out.extend_from_slice(tx_src);
            out.extend_from_slice(&index.to_be_bytes());
            out
        }
    }
}
