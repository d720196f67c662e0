use thiserror::Error;

/// Faults raised by the primitive backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrimitiveError {
    #[error("invalid point encoding")]
    InvalidPoint,

    #[error("ring is empty")]
    EmptyRing,

    #[error("ring shape mismatch: {keys} keys, {commitments} commitments")]
    RingShape { keys: usize, commitments: usize },

    #[error("secret index {index} out of range for ring of {size}")]
    SecretIndex { index: usize, size: usize },

    #[error("signing key does not open ring member {0}")]
    KeyMismatch(usize),

    #[error("blinding difference does not open the commitment offset of ring member {0}")]
    CommitmentMismatch(usize),

    #[error("signature carries {got} responses for a ring of {expected}")]
    ResponseCount { got: usize, expected: usize },

    #[error("{amounts} amounts but {masks} masks")]
    LengthMismatch { amounts: usize, masks: usize },

    #[error("range proof needs at least one output")]
    EmptyRangeProof,

    #[error("range proof covers {got} outputs, at most {max} allowed")]
    TooManyOutputs { got: usize, max: usize },

    #[error("range proof: {0}")]
    RangeProof(String),
}
