use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque watermark for "the last row already delivered".
///
/// `Start` is kept apart from `At("")` so a delivered empty string never
/// reads as "start of table" in memory. The textual form of `Start` is the
/// empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OffsetToken {
    #[default]
    Start,
    At(String),
}

impl OffsetToken {
    pub fn start() -> Self {
        OffsetToken::Start
    }

    pub fn at(raw: impl Into<String>) -> Self {
        OffsetToken::At(raw.into())
    }

    /// Reads a token back from its textual form. An empty string is the
    /// start token.
    pub fn from_persisted(raw: &str) -> Self {
        if raw.is_empty() {
            OffsetToken::Start
        } else {
            OffsetToken::At(raw.to_string())
        }
    }

    pub fn is_start(&self) -> bool {
        matches!(self, OffsetToken::Start)
    }

    pub fn as_str(&self) -> &str {
        match self {
            OffsetToken::Start => "",
            OffsetToken::At(raw) => raw,
        }
    }
}

impl fmt::Display for OffsetToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
