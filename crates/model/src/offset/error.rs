use crate::offset::kind::OffsetType;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum OffsetError {
    #[error("Malformed {offset_type} offset '{token}': {reason}")]
    Malformed {
        offset_type: OffsetType,
        token: String,
        reason: String,
    },

    #[error("Invalid initial offset '{text}', expected a {offset_type} value: {reason}")]
    InvalidInitialOffset {
        offset_type: OffsetType,
        text: String,
        reason: String,
    },

    #[error("Unsupported offset type: {0}")]
    Unsupported(String),

    #[error("Expected a {expected} offset value, found {found}")]
    TypeMismatch { expected: OffsetType, found: String },

    #[error("Could only produce {produced} of {requested} distinct {offset_type} values")]
    Exhausted {
        offset_type: OffsetType,
        requested: usize,
        produced: usize,
    },
}

impl OffsetError {
    pub(crate) fn malformed(offset_type: OffsetType, token: &str, reason: impl ToString) -> Self {
        OffsetError::Malformed {
            offset_type,
            token: token.to_string(),
            reason: reason.to_string(),
        }
    }
}
