//! Upstream git host client.

use crate::config::UpstreamConfig;
use crate::error::UpstreamError;
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use reqwest::{Client, StatusCode};
use tracing::{debug, instrument};

/// Path appended to a repository root to fetch its advertisement.
pub const REFS_SUFFIX: &str = ".git/info/refs?service=git-upload-pack";

/// Source of reference advertisements.
#[async_trait]
pub trait Upstream: Send + Sync {
    /// Fetches the raw `info/refs` advertisement for `repo_root`.
    async fn fetch_refs(&self, repo_root: &str) -> Result<Bytes, UpstreamError>;
}

/// [`Upstream`] backed by a smart-HTTP git host.
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    client: Client,
    config: UpstreamConfig,
}

impl HttpUpstream {
    /// Creates a client using the configured timeout and user agent.
    pub fn new(config: &UpstreamConfig) -> Result<Self, UpstreamError> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.refs_timeout())
            .build()
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    /// URL of the advertisement for `repo_root`.
    pub fn refs_url(&self, repo_root: &str) -> String {
        format!("{}{}", self.config.url(repo_root), REFS_SUFFIX)
    }
}

fn too_large(limit: usize) -> UpstreamError {
    UpstreamError::Transport(format!("advertisement larger than {limit} bytes"))
}

#[async_trait]
impl Upstream for HttpUpstream {
    #[instrument(skip(self))]
    async fn fetch_refs(&self, repo_root: &str) -> Result<Bytes, UpstreamError> {
        let url = self.refs_url(repo_root);
        let mut resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| UpstreamError::Transport(format!("cannot talk to upstream: {e}")))?;

        match resp.status() {
            StatusCode::OK => {}
            StatusCode::UNAUTHORIZED | StatusCode::NOT_FOUND => {
                return Err(UpstreamError::RepoNotFound(self.config.url(repo_root)));
            }
            status => {
                return Err(UpstreamError::Transport(format!(
                    "error from upstream: {status}"
                )));
            }
        }

        let limit = self.config.max_refs_bytes;
        if resp.content_length().is_some_and(|len| len > limit as u64) {
            return Err(too_large(limit));
        }

        let mut data = BytesMut::new();
        while let Some(chunk) = resp
            .chunk()
            .await
            .map_err(|e| UpstreamError::Transport(format!("error reading from upstream: {e}")))?
        {
            if data.len() + chunk.len() > limit {
                return Err(too_large(limit));
            }
            data.extend_from_slice(&chunk);
        }
        let data = data.freeze();
        debug!(bytes = data.len(), "fetched advertisement");
        Ok(data)
    }
}
