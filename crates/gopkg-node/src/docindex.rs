//! Documentation index lookups for landing pages.
//!
//! Both lookups run concurrently and share one bounded wait. Whatever has
//! arrived when the wait ends is used; later answers are dropped.

use crate::config::DocIndexConfig;
use crate::error::UpstreamError;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

static PACKAGE_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<h2 id="pkg-overview">package ([\p{L}_][\p{L}\p{Nd}_]*)</h2>"#)
        .expect("package name pattern is valid")
});

/// What the index knows about a package.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageInfo {
    /// Go package name, which may differ from the repository name.
    pub package_name: Option<String>,
    /// One-line package description.
    pub synopsis: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResults {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    path: String,
    #[serde(default)]
    synopsis: String,
}

/// Client for the documentation index.
#[derive(Debug, Clone)]
pub struct DocIndex {
    client: Client,
    config: DocIndexConfig,
}

impl DocIndex {
    /// Creates a client. Requests time out no later than the page wait.
    pub fn new(config: &DocIndexConfig, user_agent: &str) -> Result<Self, UpstreamError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(config.wait().max(Duration::from_secs(1)))
            .build()
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// Returns true if at least one lookup is configured.
    pub fn is_enabled(&self) -> bool {
        self.config.package_url.is_some() || self.config.search_url.is_some()
    }

    async fn package_name(&self, import_path: &str) -> Option<String> {
        let base = self.config.package_url.as_deref()?;
        let url = format!("{}{}", base, import_path);
        let body = match self.client.get(&url).send().await {
            Ok(resp) => resp.text().await.ok()?,
            Err(e) => {
                debug!(url = %url, error = %e, "package page lookup failed");
                return None;
            }
        };
        PACKAGE_NAME
            .captures(&body)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    }

    async fn synopsis(&self, import_path: &str) -> Option<String> {
        let url = self.config.search_url.as_deref()?;
        let results: SearchResults = match self
            .client
            .get(url)
            .query(&[("q", import_path)])
            .send()
            .await
        {
            Ok(resp) => resp.json().await.ok()?,
            Err(e) => {
                debug!(url = %url, error = %e, "search lookup failed");
                return None;
            }
        };
        results
            .results
            .into_iter()
            .find(|r| r.path == import_path)
            .map(|r| r.synopsis)
    }
}

/// Looks up the package name and synopsis for `import_path`.
///
/// Never waits longer than the configured wait. Lookups still running when
/// it expires are left to finish on their own and their results discarded.
pub async fn gather_package_info(index: Arc<DocIndex>, import_path: String) -> PackageInfo {
    if !index.is_enabled() {
        return PackageInfo::default();
    }

    let info = Arc::new(Mutex::new(PackageInfo::default()));

    let name_task = {
        let (index, info, path) = (Arc::clone(&index), Arc::clone(&info), import_path.clone());
        tokio::spawn(async move {
            if let Some(name) = index.package_name(&path).await {
                info.lock().package_name = Some(name);
            }
        })
    };
    let synopsis_task = {
        let (index, info, path) = (Arc::clone(&index), Arc::clone(&info), import_path.clone());
        tokio::spawn(async move {
            if let Some(synopsis) = index.synopsis(&path).await {
                info.lock().synopsis = Some(synopsis);
            }
        })
    };

    let wait = index.config.wait();
    if tokio::time::timeout(wait, async {
        let _ = tokio::join!(name_task, synopsis_task);
    })
    .await
    .is_err()
    {
        warn!(import_path = %import_path, wait_ms = wait.as_millis() as u64, "documentation index lookup timed out");
    }

    let snapshot = info.lock().clone();
    snapshot
}
