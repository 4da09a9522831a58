use std::fmt;

/// Where a scan handle is in its poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    Querying,
    Delivering,
    Closed,
}

impl ScanState {
    pub fn is_closed(self) -> bool {
        self == ScanState::Closed
    }
}

impl fmt::Display for ScanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanState::Idle => write!(f, "idle"),
            ScanState::Querying => write!(f, "querying"),
            ScanState::Delivering => write!(f, "delivering"),
            ScanState::Closed => write!(f, "closed"),
        }
    }
}
