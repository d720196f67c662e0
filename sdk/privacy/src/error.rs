use tenebra_primitives::PrimitiveError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrivacyError {
    #[error(transparent)]
    Primitive(#[from] PrimitiveError),

    #[error("pseudo-output balancing needs at least one input")]
    NoInputs,

    #[error("decoy selection needs more than {required} outputs on chain, found {available}")]
    NotEnoughOutputs { available: u64, required: u64 },

    #[error("real output index {index} is not below the chain output count {max}")]
    IndexOutOfRange { index: u64, max: u64 },

    #[error("anonymity set has {got} members, expected {expected}")]
    RingSize { got: usize, expected: usize },

    #[error("anonymity set repeats output index {0}")]
    DuplicateMember(u64),

    #[error("secret index {index} outside an anonymity set of {size}")]
    SecretIndex { index: usize, size: usize },

    #[error("ring signature linking tag does not match the spent output")]
    LinkingTagMismatch,
}
