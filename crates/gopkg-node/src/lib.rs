//! # gopkg node
//!
//! Serves versioned Go import paths in front of a git smart-HTTP host.
//!
//! A request for `gopkg.in/yaml.v2` is answered with an advertisement of
//! `github.com/go-yaml/yaml` in which `HEAD` and `master` point at the
//! newest `v2` branch or tag, so `go get` and `git clone` check out the
//! right version without knowing about versions at all.
//!
//! ## Request flow
//!
//! ```text
//! path ──▶ match_path ──▶ RedirectTable ──▶ cache / upstream fetch
//!                                                  │
//!                                                  ▼
//!                                       rewrite_advertisement
//!                                                  │
//!              ┌──────────────┬───────────────────┼──────────────┐
//!              ▼              ▼                   ▼              ▼
//!         /info/refs   /git-upload-pack      ?go-get=1      landing page
//!                      (proxy/redirect)
//! ```
//!
//! ## Modules
//!
//! - [`api`] - Router and the import path handler
//! - [`cache`] - Advertisement cache
//! - [`config`] - Layered configuration
//! - [`docindex`] - Documentation index lookups for landing pages
//! - [`observability`] - Logging, metrics and request ids
//! - [`page`] - HTML pages
//! - [`proxy`] - Upload-pack forwarding
//! - [`upstream`] - Upstream advertisement client

pub mod api;
pub mod cache;
pub mod config;
pub mod docindex;
pub mod error;
pub mod observability;
pub mod page;
pub mod proxy;
pub mod upstream;

pub use api::{create_router, AppState};
pub use config::Config;
pub use error::{ApiError, UpstreamError};
