//! Git smart-HTTP plumbing for gopkg.
//!
//! This crate reads pkt-line framed reference advertisements and rewrites
//! them so that `HEAD` and `master` point at a selected version.

mod error;
mod pktline;
mod refs;

pub use error::GitError;
pub use pktline::{write_data, Frame, PktLine, PktLineCursor, MAX_PAYLOAD_LEN, PREFIX_LEN};
pub use refs::{rewrite_advertisement, RefRecord, Rewritten};

/// Result type for git protocol operations.
pub type Result<T> = std::result::Result<T, GitError>;
