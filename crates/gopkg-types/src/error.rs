//! Error types for version and import path parsing.

use thiserror::Error;

/// Errors produced while parsing a version selector.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    /// The input does not follow the `vMAJOR[.MINOR[.PATCH]][-unstable]` grammar.
    #[error("invalid version {input:?}: {reason}")]
    Syntax {
        /// The rejected input.
        input: String,
        /// What was wrong with it.
        reason: &'static str,
    },

    /// A component does not fit the numeric range.
    #[error("version {input:?} has a component out of range")]
    OutOfRange {
        /// The rejected input.
        input: String,
    },
}

impl VersionError {
    pub(crate) fn syntax(input: &str, reason: &'static str) -> Self {
        Self::Syntax {
            input: input.to_string(),
            reason,
        }
    }
}

/// A version selector was found in an import path but cannot be served.
///
/// These are always shown to the user and never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectorError {
    /// The selector carries more than a bare major component.
    #[error("Import paths take the major version only (.{major} instead of .{selector})")]
    ComponentCount {
        /// The selector as written in the path.
        selector: String,
        /// The major-only selector the client should have used.
        major: String,
    },

    /// The selector looks like a version but is not one.
    #[error("Version {selector:?} is not a valid version selector: {source}")]
    NotAVersion {
        /// The selector as written in the path.
        selector: String,
        /// Why it failed to parse.
        #[source]
        source: VersionError,
    },
}
