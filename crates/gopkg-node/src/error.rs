//! Request error types.
//!
//! Every failure is answered with a plain-text body. Problems with what the
//! client asked for are 404s; problems talking to the upstream host are 502s.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use gopkg_types::{SelectorError, Version, UNSTABLE_SUFFIX};
use thiserror::Error;

/// Errors from the upstream git host.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The upstream answered 401 or 404.
    #[error("repository not found at {0}")]
    RepoNotFound(String),

    /// Network failure or an unexpected status.
    #[error("{0}")]
    Transport(String),
}

/// API error type.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The path is not one this service serves.
    #[error("Unsupported URL pattern; see the documentation at {0} for details.")]
    UnsupportedPath(String),

    /// The path carries a selector that cannot be served.
    #[error("{0}")]
    Selector(#[from] SelectorError),

    /// The upstream repository does not exist.
    #[error("Repository not found at {0}")]
    RepoNotFound(String),

    /// The repository exists but has no matching branch or tag.
    #[error("{}", no_version_message(.url, .requested))]
    NoVersion {
        /// Upstream repository URL.
        url: String,
        /// The selector that was requested.
        requested: Version,
    },

    /// The upstream could not be reached or answered badly.
    #[error("Cannot obtain refs from {url}: {reason}")]
    Upstream {
        /// Upstream repository URL.
        url: String,
        /// What went wrong.
        reason: String,
    },

    /// The upstream sent an advertisement that does not parse.
    #[error("Cannot obtain refs from {url}: corrupt data received")]
    Corrupt {
        /// Upstream repository URL.
        url: String,
    },

    /// Proxying the pack transfer failed before any data was sent.
    #[error("Cannot obtain data pack from {url}: {reason}")]
    Bulk {
        /// Upstream repository URL.
        url: String,
        /// What went wrong.
        reason: String,
    },

    /// The client request body could not be read.
    #[error("Cannot read request body: {0}")]
    RequestBody(String),

    /// A page template failed to render.
    #[error("template error: {0}")]
    Template(#[from] askama::Error),
}

fn no_version_message(url: &str, requested: &Version) -> String {
    let suffix = if requested.unstable { UNSTABLE_SUFFIX } else { "" };
    let mut major = requested.major_selector();
    major.unstable = false;
    format!(
        "Repository at {url} has no branch or tag \"{major}{suffix}\", \"{major}.N{suffix}\" or \"{major}.N.M{suffix}\""
    )
}

impl ApiError {
    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::UnsupportedPath(_) => "unsupported_path",
            ApiError::Selector(_) => "bad_selector",
            ApiError::RepoNotFound(_) => "no_repo",
            ApiError::NoVersion { .. } => "no_version",
            ApiError::Upstream { .. } => "upstream",
            ApiError::Corrupt { .. } => "corrupt",
            ApiError::Bulk { .. } => "bulk",
            ApiError::RequestBody(_) => "request_body",
            ApiError::Template(_) => "template",
        }
    }

    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::UnsupportedPath(_)
            | ApiError::Selector(_)
            | ApiError::RepoNotFound(_)
            | ApiError::NoVersion { .. } => StatusCode::NOT_FOUND,
            ApiError::Upstream { .. } | ApiError::Corrupt { .. } | ApiError::Bulk { .. } => {
                StatusCode::BAD_GATEWAY
            }
            ApiError::RequestBody(_) => StatusCode::BAD_REQUEST,
            ApiError::Template(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}
