//! Upload-pack proxy.
//!
//! Pack negotiation is forwarded to the upstream host unchanged and the
//! response is streamed back without buffering it.

use crate::config::UpstreamConfig;
use crate::error::{ApiError, UpstreamError};
use axum::{
    body::Body,
    extract::Request,
    http::{header, HeaderMap, HeaderName, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use futures_util::Stream;
use reqwest::Client;
use std::fmt;
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use tracing::{debug, info, instrument, warn};

/// Headers that describe a single connection and must not be forwarded.
fn is_hop_by_hop(name: &HeaderName) -> bool {
    matches!(
        name.as_str(),
        "connection"
            | "keep-alive"
            | "proxy-authenticate"
            | "proxy-authorization"
            | "te"
            | "trailer"
            | "transfer-encoding"
            | "upgrade"
    )
}

fn copy_headers(from: &HeaderMap, to: &mut HeaderMap, skip: &[HeaderName]) {
    for (name, value) in from {
        if !is_hop_by_hop(name) && !skip.contains(name) {
            to.append(name.clone(), value.clone());
        }
    }
}

/// Pack response body relayed to the client.
///
/// Logs a warning when the copy ends early, either because the upstream
/// read failed or because the client dropped the response.
struct PackStream<S> {
    inner: S,
    url: String,
    sent: u64,
    done: bool,
}

impl<S> PackStream<S> {
    fn new(inner: S, url: String) -> Self {
        Self {
            inner,
            url,
            sent: 0,
            done: false,
        }
    }
}

impl<S, E> Stream for PackStream<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
    E: fmt::Display,
{
    type Item = Result<Bytes, E>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let item = ready!(Pin::new(&mut self.inner).poll_next(cx));
        match &item {
            Some(Ok(chunk)) => self.sent += chunk.len() as u64,
            Some(Err(e)) => {
                self.done = true;
                warn!(
                    url = %self.url,
                    sent = self.sent,
                    error = %e,
                    "upload-pack upstream read failed"
                );
            }
            None => {
                self.done = true;
                debug!(url = %self.url, sent = self.sent, "upload-pack response complete");
            }
        }
        Poll::Ready(item)
    }
}

impl<S> Drop for PackStream<S> {
    fn drop(&mut self) {
        if !self.done {
            warn!(url = %self.url, sent = self.sent, "upload-pack client disconnected mid-stream");
        }
    }
}

/// Forwards `git-upload-pack` requests to the upstream host.
#[derive(Debug, Clone)]
pub struct UploadPackProxy {
    client: Client,
    config: UpstreamConfig,
    body_limit: usize,
}

impl UploadPackProxy {
    /// Creates a proxy with the bulk transfer timeout.
    pub fn new(config: &UpstreamConfig, body_limit: usize) -> Result<Self, UpstreamError> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.bulk_timeout())
            .build()
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            config: config.clone(),
            body_limit,
        })
    }

    /// Upstream `git-upload-pack` URL for `repo_root`.
    pub fn upload_pack_url(&self, repo_root: &str) -> String {
        format!("{}/git-upload-pack", self.config.url(repo_root))
    }

    /// Permanent redirect to the upstream endpoint.
    pub fn redirect(&self, repo_root: &str) -> Response {
        (
            StatusCode::MOVED_PERMANENTLY,
            [(header::LOCATION, self.upload_pack_url(repo_root))],
        )
            .into_response()
    }

    /// Replays `request` against the upstream and streams the answer back
    /// with its status and headers.
    #[instrument(skip(self, request), fields(method = %request.method()))]
    pub async fn proxy_upload_pack(
        &self,
        repo_root: &str,
        request: Request,
    ) -> Result<Response, ApiError> {
        let url = self.upload_pack_url(repo_root);
        let (parts, body) = request.into_parts();
        let body = axum::body::to_bytes(body, self.body_limit)
            .await
            .map_err(|e| ApiError::RequestBody(e.to_string()))?;

        let mut headers = HeaderMap::new();
        copy_headers(
            &parts.headers,
            &mut headers,
            &[header::HOST, header::CONTENT_LENGTH],
        );

        let upstream_resp = self
            .client
            .request(parts.method, &url)
            .headers(headers)
            .body(body)
            .send()
            .await
            .map_err(|e| ApiError::Bulk {
                url: url.clone(),
                reason: e.to_string(),
            })?;

        let status = upstream_resp.status();
        info!(status = status.as_u16(), "proxying upload-pack response");

        let mut response_headers = HeaderMap::new();
        copy_headers(upstream_resp.headers(), &mut response_headers, &[]);

        let stream = PackStream::new(Box::pin(upstream_resp.bytes_stream()), url);

        let mut response = Response::new(Body::from_stream(stream));
        *response.status_mut() = status;
        *response.headers_mut() = response_headers;
        Ok(response)
    }
}
