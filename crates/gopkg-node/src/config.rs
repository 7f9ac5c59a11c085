//! Node configuration.
//!
//! Values are layered: built-in defaults, then an optional YAML file, then
//! `GOPKG__` environment variables (`GOPKG__CACHE__TTL_SECS=120`), then
//! command line overrides applied by the binary.

use crate::observability::LogFormat;
use gopkg_types::{RedirectTable, RepoBase, Site};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use validator::Validate;

/// Prefix of environment variables read by [`Config::load`].
pub const ENV_PREFIX: &str = "GOPKG";

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A source could not be read or deserialized.
    #[error("failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    /// The merged configuration is invalid.
    #[error("invalid configuration: {0}")]
    Invalid(#[from] validator::ValidationErrors),
}

/// How `git-upload-pack` requests are served.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadPackMode {
    /// Stream the upstream response through this service.
    #[default]
    Proxy,
    /// Answer with a permanent redirect to the upstream URL.
    Redirect,
}

/// Configuration for the gopkg node.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(default)]
pub struct Config {
    /// HTTP listen address.
    pub listen_addr: SocketAddr,
    /// Host the import paths are served from.
    #[validate(length(min = 1))]
    pub public_host: String,
    /// Where `GET /` redirects to.
    #[validate(url)]
    pub home_url: String,
    /// Log level (trace, debug, info, warn, error).
    #[validate(length(min = 1))]
    pub log_level: String,
    /// Log output format.
    pub log_format: LogFormat,
    #[validate(nested)]
    pub upstream: UpstreamConfig,
    pub upload_pack: UploadPackMode,
    #[validate(nested)]
    pub cache: CacheConfig,
    #[validate(nested)]
    pub doc_index: DocIndexConfig,
    /// Extra redirects, merged over the built-in table.
    pub redirects: Vec<RedirectEntry>,
    /// Largest `git-upload-pack` request body accepted.
    #[validate(range(min = 1))]
    pub max_request_body_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            public_host: "gopkg.in".to_string(),
            home_url: "https://labix.org/gopkg.in".to_string(),
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            upstream: UpstreamConfig::default(),
            upload_pack: UploadPackMode::default(),
            cache: CacheConfig::default(),
            doc_index: DocIndexConfig::default(),
            redirects: Vec::new(),
            max_request_body_bytes: 16 * 1024 * 1024,
        }
    }
}

/// Upstream git host.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(default)]
pub struct UpstreamConfig {
    /// `https`, or `http` for local testing.
    #[validate(custom(function = "validate_scheme"))]
    pub scheme: String,
    /// Host, optionally with a port.
    #[validate(length(min = 1))]
    pub host: String,
    /// Organization prefix for paths without an organization.
    pub default_org_prefix: String,
    /// Timeout for reference advertisement requests.
    #[validate(range(min = 1))]
    pub refs_timeout_secs: u64,
    /// Timeout for proxied pack transfers.
    #[validate(range(min = 1))]
    pub bulk_timeout_secs: u64,
    /// Largest reference advertisement accepted from the upstream.
    #[validate(range(min = 1))]
    pub max_refs_bytes: usize,
    #[validate(length(min = 1))]
    pub user_agent: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            scheme: "https".to_string(),
            host: "github.com".to_string(),
            default_org_prefix: "go-".to_string(),
            refs_timeout_secs: 10,
            bulk_timeout_secs: 300,
            max_refs_bytes: 8 * 1024 * 1024,
            user_agent: concat!("gopkg-node/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl UpstreamConfig {
    /// Timeout for reference advertisement requests.
    pub fn refs_timeout(&self) -> Duration {
        Duration::from_secs(self.refs_timeout_secs)
    }

    /// Timeout for proxied pack transfers.
    pub fn bulk_timeout(&self) -> Duration {
        Duration::from_secs(self.bulk_timeout_secs)
    }

    /// Absolute URL for a repository root.
    pub fn url(&self, root: &str) -> String {
        format!("{}://{}", self.scheme, root)
    }
}

fn validate_scheme(scheme: &str) -> Result<(), validator::ValidationError> {
    match scheme {
        "http" | "https" => Ok(()),
        _ => {
            let mut err = validator::ValidationError::new("scheme");
            err.message = Some("scheme must be http or https".into());
            Err(err)
        }
    }
}

/// Advertisement cache.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(default)]
pub struct CacheConfig {
    /// How long an advertisement stays fresh.
    #[validate(range(min = 1, max = 3600))]
    pub ttl_secs: u64,
    /// Entry count above which stale entries are swept.
    #[validate(range(min = 1))]
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 60,
            max_entries: 10_000,
        }
    }
}

impl CacheConfig {
    /// Freshness window.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Documentation index used to enrich landing pages.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(default)]
pub struct DocIndexConfig {
    /// Package page base URL; the import path is appended.
    #[validate(url)]
    pub package_url: Option<String>,
    /// Search endpoint queried with `?q=<import path>`.
    #[validate(url)]
    pub search_url: Option<String>,
    /// How long a landing page waits for the index.
    #[validate(range(max = 60_000))]
    pub wait_ms: u64,
}

impl Default for DocIndexConfig {
    fn default() -> Self {
        Self {
            package_url: None,
            search_url: None,
            wait_ms: 3000,
        }
    }
}

impl DocIndexConfig {
    /// Bounded wait for both lookups.
    pub fn wait(&self) -> Duration {
        Duration::from_millis(self.wait_ms)
    }
}

/// One configured redirect.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RedirectEntry {
    pub from: RepoBase,
    pub to: RepoBase,
}

impl Config {
    /// Loads configuration from defaults, an optional file and the process
    /// environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(path, None)
    }

    /// Like [`Config::load`], reading variables from `env` instead of the
    /// process environment when given.
    pub fn load_with_env(
        path: Option<&Path>,
        env: Option<::config::Map<String, String>>,
    ) -> Result<Self, ConfigError> {
        let defaults = ::config::Config::try_from(&Self::default())?;
        let mut builder = ::config::Config::builder().add_source(defaults);
        if let Some(path) = path {
            builder = builder.add_source(::config::File::from(path).required(true));
        }
        let loaded: Self = builder
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .source(env),
            )
            .build()?
            .try_deserialize()?;

        loaded.validate()?;
        Ok(loaded)
    }

    /// Host conventions for building URLs.
    pub fn site(&self) -> Site {
        Site {
            public_host: self.public_host.clone(),
            upstream_host: self.upstream.host.clone(),
            default_org_prefix: self.upstream.default_org_prefix.clone(),
        }
    }

    /// Built-in redirects plus configured ones.
    pub fn redirect_table(&self) -> RedirectTable {
        let mut table = RedirectTable::builtin();
        table.extend(
            self.redirects
                .iter()
                .map(|r| (r.from.clone(), r.to.clone())),
        );
        table
    }
}
