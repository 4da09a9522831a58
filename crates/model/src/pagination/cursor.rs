use crate::offset::token::OffsetToken;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Position of one scan: the last delivered token plus the batch bound.
///
/// Cursors are values. A poll reads one and yields its successor; nothing
/// mutates a cursor in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanCursor {
    pub token: OffsetToken,
    pub batch_size: usize,
}

impl ScanCursor {
    pub fn new(token: OffsetToken, batch_size: usize) -> Self {
        Self { token, batch_size }
    }

    pub fn advance(&self, token: OffsetToken) -> ScanCursor {
        ScanCursor {
            token,
            batch_size: self.batch_size,
        }
    }
}

/// How rows sharing the boundary offset value are handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TiePolicy {
    /// Strict `>` only. The offset column must be unique; rows sharing a
    /// value split across two batches are skipped.
    Exclusive,
    /// A full batch is extended with every row carrying its last value, so
    /// ties are never split across batches.
    #[default]
    CompleteGroup,
}

impl fmt::Display for TiePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TiePolicy::Exclusive => write!(f, "exclusive"),
            TiePolicy::CompleteGroup => write!(f, "complete_group"),
        }
    }
}

impl FromStr for TiePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "exclusive" => Ok(TiePolicy::Exclusive),
            "complete_group" => Ok(TiePolicy::CompleteGroup),
            other => Err(format!("Unknown tie policy: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_returns_a_new_cursor() {
        let cursor = ScanCursor::new(OffsetToken::Start, 10);
        let next = cursor.advance(OffsetToken::at("7"));
        assert!(cursor.token.is_start());
        assert_eq!(next, ScanCursor::new(OffsetToken::at("7"), 10));
    }

    #[test]
    fn test_tie_policy_names() {
        assert_eq!("complete-group".parse::<TiePolicy>().unwrap(), TiePolicy::CompleteGroup);
        assert_eq!(TiePolicy::Exclusive.to_string(), "exclusive");
        assert!("loose".parse::<TiePolicy>().is_err());
    }
}
