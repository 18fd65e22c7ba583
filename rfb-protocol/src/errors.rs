//! Decode error kinds shared by every stage of record decoding.

use thiserror::Error;

/// Errors produced while probing or applying a record.
///
/// There are exactly two kinds. `InsufficientData` means the byte range ended
/// before the record did; the caller should buffer more input and retry the
/// same call. `InvalidRecord` means the stream does not conform to the
/// protocol and is unrecoverable: the decoder never skips ahead looking for a
/// later record boundary.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// The record needs at least `needed` bytes in total.
    #[error("insufficient data: record needs at least {needed} bytes")]
    InsufficientData { needed: usize },

    /// The record is malformed.
    #[error("invalid record: {0}")]
    InvalidRecord(String),
}

impl DecodeError {
    /// Shorthand for building an `InvalidRecord` error.
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidRecord(reason.into())
    }

    /// Returns true if retrying with more bytes can succeed.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::InsufficientData { .. })
    }

    /// Number of bytes still missing given `available` buffered bytes.
    ///
    /// Always at least 1 for `InsufficientData`, and 0 for `InvalidRecord`.
    #[must_use]
    pub fn missing_bytes(&self, available: usize) -> usize {
        match self {
            Self::InsufficientData { needed } => needed.saturating_sub(available).max(1),
            Self::InvalidRecord(_) => 0,
        }
    }
}
