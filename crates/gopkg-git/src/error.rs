//! Git protocol error types.

use gopkg_types::Version;
use thiserror::Error;

/// Errors that can occur while reading or rewriting an advertisement.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GitError {
    /// The upstream data violates pkt-line framing.
    #[error("corrupt upstream data at offset {offset}: {reason}")]
    Corrupt {
        /// Byte offset of the offending line.
        offset: usize,
        /// What was wrong.
        reason: String,
    },

    /// No advertised reference satisfies the requested selector.
    #[error("no reference matches version {requested}")]
    NoMatchingVersion {
        /// The selector that could not be satisfied.
        requested: Version,
    },

    /// A line is too long to be framed.
    #[error("pkt-line payload of {0} bytes does not fit a length prefix")]
    LineTooLong(usize),
}

impl GitError {
    pub(crate) fn corrupt(offset: usize, reason: impl Into<String>) -> Self {
        Self::Corrupt {
            offset,
            reason: reason.into(),
        }
    }

    /// Returns true if the error means the upstream sent unusable data.
    pub fn is_corrupt(&self) -> bool {
        matches!(self, Self::Corrupt { .. } | Self::LineTooLong(_))
    }
}
