use serde::{Deserialize, Serialize};

/// How the decrypt path treats a trailing pad byte that does not describe
/// valid padding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaddingPolicy {
    /// Reject with `PaddingAnomaly`; every pad byte must equal the pad length
    #[default]
    Strict,
    /// Check only the last byte; on anomaly warn and keep the buffer untruncated
    Lenient,
}

/// How a session integer was fitted into the 32-byte cipher key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFit {
    /// The integer occupied exactly 32 big-endian bytes
    Exact,
    /// Zero bytes were prepended to reach 32 bytes
    Padded { missing: usize },
    /// High-order bytes beyond 32 were discarded
    Truncated { dropped: usize },
}

impl KeyFit {
    pub fn is_lossy(&self) -> bool {
        matches!(self, KeyFit::Truncated { .. })
    }
}
