use std::fmt;

use serde::{Deserialize, Serialize};
use tenebra_primitives::{Point, Scalar};
use tenebra_privacy::LinkingTag;
use zeroize::Zeroize;

/// Global identity of an unspent output.
///
/// Private outputs are keyed by their linking tag so a spend can be matched
/// without knowing which ring member was real; transparent ones by outpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UtxoKey {
    LinkingTag(LinkingTag),
    Outpoint { tx_src: [u8; 32], index: u32 },
}

/// Everything needed to spend a private output.
#[derive(Clone)]
pub struct PrivateUtxoData {
    pub one_time_secret: Scalar,
    pub linking_tag: LinkingTag,
    pub mask: Scalar,
    pub amount: u64,
    pub one_time_key: Point,
    pub commitment: Point,
    /// Position in the chain-wide private output sequence.
    pub global_index: u64,
    pub tx_public_key: Point,
}

impl Drop for PrivateUtxoData {
    fn drop(&mut self) {
        self.one_time_secret.zeroize();
        self.mask.zeroize();
    }
}

#[derive(Clone)]
pub enum UtxoKind {
    Private(PrivateUtxoData),
    Transparent { amount: u64 },
}

#[derive(Clone)]
pub struct Utxo {
    pub tx_src: [u8; 32],
    pub index: u32,
    pub kind: UtxoKind,
}

impl Utxo {
    pub fn amount(&self) -> u64 {
        match &self.kind {
            UtxoKind::Private(data) => data.amount,
            UtxoKind::Transparent { amount } => *amount,
        }
    }

    pub fn key(&self) -> UtxoKey {
        match &self.kind {
            UtxoKind::Private(data) => UtxoKey::LinkingTag(data.linking_tag),
            UtxoKind::Transparent { .. } => UtxoKey::Outpoint {
                tx_src: self.tx_src,
                index: self.index,
            },
        }
    }

    pub fn is_private(&self) -> bool {
        matches!(self.kind, UtxoKind::Private(_))
    }

    pub fn private_data(&self) -> Option<&PrivateUtxoData> {
        match &self.kind {
            UtxoKind::Private(data) => Some(data),
            UtxoKind::Transparent { .. } => None,
        }
    }
}

impl fmt::Debug for Utxo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Utxo")
            .field("tx_src", &hex::encode(&self.tx_src[..8]))
            .field("index", &self.index)
            .field("private", &self.is_private())
            .field("amount", &self.amount())
            .finish()
    }
}
