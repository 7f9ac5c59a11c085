//! Core types for the gopkg import path redirector.
//!
//! This crate knows nothing about HTTP or git. It parses version selectors,
//! matches request paths onto repository identities and maps renamed
//! repositories to their new home.

mod error;
mod matcher;
mod redirect;
mod repo;
mod version;

pub use error::{SelectorError, VersionError};
pub use matcher::{match_path, MatchOutcome};
pub use redirect::RedirectTable;
pub use repo::{PathFormat, RepoBase, RepoIdentity, Site};
pub use version::{Version, VersionList, UNSTABLE_SUFFIX};
