//! Tenebra transaction object.
//!
//! A transaction is a [`TransactionPrefix`] (everything that gets signed) and
//! a [`Witness`] (pseudo-outputs and signatures). The signing hash covers the
//! prefix only; the id covers the full encoding.

use std::fmt;

use serde::{Deserialize, Serialize};
use tenebra_account::TransparentAddress;
use tenebra_primitives::{Point, RangeProof, RingSignature};
use tenebra_privacy::LinkingTag;

pub mod error;
pub mod signing;
pub mod wire;

pub use error::TransactionError;
pub use signing::transparent_signing_message;

pub const TX_VERSION: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum TransactionVariant {
    Private = 1,
    Transparent = 2,
    Mixed = 3,
    /// Block reward; produced by the block producer, never by a wallet.
    Coinbase = 4,
}

impl TryFrom<u8> for TransactionVariant {
    type Error = TransactionError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Private),
            2 => Ok(Self::Transparent),
            3 => Ok(Self::Mixed),
            4 => Ok(Self::Coinbase),
            other => Err(TransactionError::UnknownVariant(other)),
        }
    }
}

/// Content-addressed transaction id.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TxId(#[serde(with = "hex::serde")] pub [u8; 32]);

impl TxId {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxId({})", &hex::encode(self.0)[..16])
    }
}

/// Reference to a transparent output being spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransparentInput {
    pub tx_src: [u8; 32],
    pub offset: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransparentOutput {
    pub address: TransparentAddress,
    pub amount: u64,
}

/// A ring input: global indices of the ring members plus the spender's tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivateInput {
    pub offsets: Vec<u64>,
    pub linking_tag: LinkingTag,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrivateOutput {
    pub one_time_key: Point,
    pub commitment: Point,
    pub masked_amount: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransparentSignature {
    /// Ed25519 verifying key; must hash to the spent output's address.
    pub public_key: [u8; 32],
    pub signature: [u8; 64],
}

/// The signed part of a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionPrefix {
    pub variant: TransactionVariant,
    /// `R = r·G`, present iff there are private outputs.
    pub tx_public_key: Option<Point>,
    pub transparent_inputs: Vec<TransparentInput>,
    pub private_inputs: Vec<PrivateInput>,
    pub transparent_outputs: Vec<TransparentOutput>,
    pub private_outputs: Vec<PrivateOutput>,
    /// Present iff there are private outputs.
    pub range_proof: Option<RangeProof>,
}

impl TransactionPrefix {
    /// BLAKE3 of the encoded prefix.
    pub fn signing_hash(&self) -> Result<[u8; 32], TransactionError> {
        let mut buf = Vec::new();
        wire::write_prefix(&mut buf, self)?;
        Ok(*blake3::hash(&buf).as_bytes())
    }

    pub fn num_inputs(&self) -> usize {
        self.transparent_inputs.len() + self.private_inputs.len()
    }

    pub fn num_outputs(&self) -> usize {
        self.transparent_outputs.len() + self.private_outputs.len()
    }

    /// Without private inputs there are no pseudo-outputs to balance against,
    /// so private outputs commit with the identity mask.
    pub fn uses_identity_mask(&self) -> bool {
        self.private_inputs.is_empty()
    }

    /// Shape rules every variant must satisfy.
    pub fn validate(&self) -> Result<(), TransactionError> {
        let has_private_outputs = !self.private_outputs.is_empty();
        if self.tx_public_key.is_some() != has_private_outputs {
            return Err(TransactionError::Inconsistent(
                "tx public key must be present iff there are private outputs",
            ));
        }
        if self.range_proof.is_some() != has_private_outputs {
            return Err(TransactionError::Inconsistent(
                "range proof must be present iff there are private outputs",
            ));
        }

        let has_transparent = !self.transparent_inputs.is_empty() || !self.transparent_outputs.is_empty();
        let has_private = !self.private_inputs.is_empty() || has_private_outputs;
        match self.variant {
            TransactionVariant::Private if has_transparent => Err(TransactionError::Inconsistent(
                "private transaction carries transparent parts",
            )),
            TransactionVariant::Transparent if has_private => Err(TransactionError::Inconsistent(
                "transparent transaction carries private parts",
            )),
            TransactionVariant::Coinbase
                if self.num_inputs() != 0 || has_transparent || !has_private_outputs =>
            {
                Err(TransactionError::Inconsistent(
                    "coinbase must only create private outputs",
                ))
            }
            TransactionVariant::Private | TransactionVariant::Transparent | TransactionVariant::Mixed
                if self.num_inputs() == 0 =>
            {
                Err(TransactionError::Inconsistent("transaction has no inputs"))
            }
            _ => Ok(()),
        }
    }
}

/// The unsigned-over part: one pseudo-output and ring signature per private
/// input, one signature per transparent input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Witness {
    pub pseudo_outputs: Vec<Point>,
    pub ring_signatures: Vec<RingSignature>,
    pub transparent_signatures: Vec<TransparentSignature>,
}

/// A finalized transaction with its signing hash and id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    prefix: TransactionPrefix,
    witness: Witness,
    signing_hash: [u8; 32],
    id: TxId,
}

impl Transaction {
    pub fn new(prefix: TransactionPrefix, witness: Witness) -> Result<Self, TransactionError> {
        prefix.validate()?;
        if witness.pseudo_outputs.len() != prefix.private_inputs.len()
            || witness.ring_signatures.len() != prefix.private_inputs.len()
        {
            return Err(TransactionError::Inconsistent(
                "one pseudo-output and ring signature per private input",
            ));
        }
        if witness.transparent_signatures.len() != prefix.transparent_inputs.len() {
            return Err(TransactionError::Inconsistent(
                "one signature per transparent input",
            ));
        }

        let mut buf = Vec::new();
        wire::write_prefix(&mut buf, &prefix)?;
        let signing_hash = *blake3::hash(&buf).as_bytes();
        wire::write_witness(&mut buf, &witness)?;
        let id = TxId(*blake3::hash(&buf).as_bytes());

        Ok(Self {
            prefix,
            witness,
            signing_hash,
            id,
        })
    }

    pub fn id(&self) -> TxId {
        self.id
    }

    pub fn signing_hash(&self) -> &[u8; 32] {
        &self.signing_hash
    }

    pub fn prefix(&self) -> &TransactionPrefix {
        &self.prefix
    }

    pub fn witness(&self) -> &Witness {
        &self.witness
    }

    pub fn variant(&self) -> TransactionVariant {
        self.prefix.variant
    }

    pub fn tx_public_key(&self) -> Option<&Point> {
        self.prefix.tx_public_key.as_ref()
    }

    pub fn transparent_inputs(&self) -> &[TransparentInput] {
        &self.prefix.transparent_inputs
    }

    pub fn private_inputs(&self) -> &[PrivateInput] {
        &self.prefix.private_inputs
    }

    pub fn transparent_outputs(&self) -> &[TransparentOutput] {
        &self.prefix.transparent_outputs
    }

    pub fn private_outputs(&self) -> &[PrivateOutput] {
        &self.prefix.private_outputs
    }

    pub fn range_proof(&self) -> Option<&RangeProof> {
        self.prefix.range_proof.as_ref()
    }

    pub fn pseudo_outputs(&self) -> &[Point] {
        &self.witness.pseudo_outputs
    }

    pub fn ring_signatures(&self) -> &[RingSignature] {
        &self.witness.ring_signatures
    }

    pub fn transparent_signatures(&self) -> &[TransparentSignature] {
        &self.witness.transparent_signatures
    }

    pub fn uses_identity_mask(&self) -> bool {
        self.prefix.uses_identity_mask()
    }

    pub fn num_inputs(&self) -> usize {
        self.prefix.num_inputs()
    }

    pub fn num_outputs(&self) -> usize {
        self.prefix.num_outputs()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, TransactionError> {
        let mut buf = Vec::new();
        wire::write_prefix(&mut buf, &self.prefix)?;
        wire::write_witness(&mut buf, &self.witness)?;
        Ok(buf)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TransactionError> {
        let (prefix, witness) = wire::decode(bytes)?;
        Self::new(prefix, witness)
    }
}
