//! HTTP API for the gopkg node.
//!
//! Every path that is not a fixed endpoint is treated as an import path:
//! it is matched, redirected if needed, resolved against the upstream
//! advertisement and then answered according to its subpath.

use axum::{
    extract::{Request, State},
    http::header,
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Router,
};
use bytes::Bytes;
use gopkg_git::{rewrite_advertisement, GitError, Rewritten};
use gopkg_types::{match_path, MatchOutcome, RedirectTable, RepoIdentity, Site};
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, instrument, warn};

use crate::cache::{AdvertisementCache, TtlCache};
use crate::config::{Config, UploadPackMode};
use crate::docindex::{gather_package_info, DocIndex};
use crate::error::{ApiError, UpstreamError};
use crate::observability::{metrics_handler, metrics_layer, request_id_layer, METRICS};
use crate::page::{render_go_get, render_package_page};
use crate::proxy::UploadPackProxy;
use crate::upstream::{HttpUpstream, Upstream};

/// Content type of a smart-HTTP reference advertisement.
pub const ADVERTISEMENT_CONTENT_TYPE: &str = "application/x-git-upload-pack-advertisement";

const UPLOAD_PACK_SUBPATH: &str = "/git-upload-pack";
const INFO_REFS_SUBPATH: &str = "/info/refs";

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Loaded configuration.
    pub config: Arc<Config>,
    /// Host conventions.
    pub site: Arc<Site>,
    /// Renamed repositories.
    pub redirects: Arc<RedirectTable>,
    /// Raw upstream advertisements.
    pub cache: Arc<dyn AdvertisementCache>,
    /// Source of advertisements on a cache miss.
    pub upstream: Arc<dyn Upstream>,
    /// Pack transfer forwarding.
    pub proxy: Arc<UploadPackProxy>,
    /// Landing page enrichment.
    pub docs: Arc<DocIndex>,
}

impl AppState {
    /// Builds the state with HTTP-backed collaborators.
    pub fn from_config(config: Config) -> Result<Self, UpstreamError> {
        let upstream = HttpUpstream::new(&config.upstream)?;
        let proxy = UploadPackProxy::new(&config.upstream, config.max_request_body_bytes)?;
        let docs = DocIndex::new(&config.doc_index, &config.upstream.user_agent)?;
        let cache = TtlCache::new(config.cache.ttl(), config.cache.max_entries);

        Ok(Self {
            site: Arc::new(config.site()),
            redirects: Arc::new(config.redirect_table()),
            cache: Arc::new(cache),
            upstream: Arc::new(upstream),
            proxy: Arc::new(proxy),
            docs: Arc::new(docs),
            config: Arc::new(config),
        })
    }

    fn upstream_url(&self, root: &str) -> String {
        self.config.upstream.url(root)
    }
}

/// Creates the API router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health-check", get(health_check))
        .route("/metrics", get(metrics_handler))
        .route("/", get(home))
        .fallback(handle_package)
        .layer(TraceLayer::new_for_http())
        .layer(metrics_layer())
        .layer(request_id_layer())
        .with_state(state)
}

/// Liveness probe.
async fn health_check() -> &'static str {
    "ok"
}

/// Sends visitors of the bare host to the documentation.
async fn home(State(state): State<AppState>) -> Redirect {
    Redirect::temporary(&state.config.home_url)
}

fn wants_go_get(request: &Request) -> bool {
    request
        .uri()
        .query()
        .is_some_and(|q| q.split('&').any(|pair| pair == "go-get=1"))
}

/// Serves an import path.
pub async fn handle_package(State(state): State<AppState>, request: Request) -> Response {
    match serve_package(&state, request).await {
        Ok(response) => {
            METRICS.record_resolution("ok");
            response
        }
        Err(err) => {
            METRICS.record_resolution(err.kind());
            if err.status().is_server_error() {
                warn!(kind = err.kind(), error = %err, "request failed");
            } else {
                debug!(kind = err.kind(), error = %err, "request rejected");
            }
            err.into_response()
        }
    }
}

#[instrument(name = "package", skip_all)]
async fn serve_package(state: &AppState, request: Request) -> Result<Response, ApiError> {
    let mut repo = match match_path(request.uri().path())? {
        MatchOutcome::Package(repo) => repo,
        MatchOutcome::NotPackagePath => {
            return Err(ApiError::UnsupportedPath(state.site.public_host.clone()));
        }
    };

    if state.redirects.apply(&mut repo) {
        debug!(org = ?repo.org, name = %repo.name, "repository redirected");
    }

    let go_get = wants_go_get(&request);
    let root = state.site.upstream_root(&repo);
    let data = advertisement(state, &root).await?;
    let rewritten = resolve(state, &mut repo, &root, &data)?;

    match repo.subpath.as_str() {
        UPLOAD_PACK_SUBPATH => match state.config.upload_pack {
            UploadPackMode::Proxy => state.proxy.proxy_upload_pack(&root, request).await,
            UploadPackMode::Redirect => Ok(state.proxy.redirect(&root)),
        },
        INFO_REFS_SUBPATH => Ok((
            [(header::CONTENT_TYPE, ADVERTISEMENT_CONTENT_TYPE)],
            rewritten.advertisement,
        )
            .into_response()),
        _ if go_get => Ok(Html(render_go_get(&state.site, &repo)?).into_response()),
        _ => {
            let import_path = state.site.import_path(&repo.original());
            let info = gather_package_info(Arc::clone(&state.docs), import_path).await;
            let html = render_package_page(
                &state.site,
                &repo,
                &rewritten.versions,
                &info,
                state.config.doc_index.package_url.as_deref(),
            )?;
            Ok(Html(html).into_response())
        }
    }
}

/// Returns the raw advertisement for `root`, from the cache when fresh.
async fn advertisement(state: &AppState, root: &str) -> Result<Bytes, ApiError> {
    if let Some(data) = state.cache.get(root) {
        METRICS.record_cache_lookup(true);
        debug!(root, "advertisement cache hit");
        return Ok(data);
    }
    METRICS.record_cache_lookup(false);

    let start = Instant::now();
    let result = state.upstream.fetch_refs(root).await;
    let outcome = match &result {
        Ok(_) => "ok",
        Err(UpstreamError::RepoNotFound(_)) => "not_found",
        Err(UpstreamError::Transport(_)) => "error",
    };
    METRICS.record_upstream_fetch(outcome, start.elapsed().as_secs_f64());

    let data = result.map_err(|e| match e {
        UpstreamError::RepoNotFound(url) => ApiError::RepoNotFound(url),
        UpstreamError::Transport(reason) => ApiError::Upstream {
            url: state.upstream_url(root),
            reason,
        },
    })?;

    info!(root, bytes = data.len(), "fetched advertisement");
    state.cache.put(root, data.clone());
    Ok(data)
}

/// Rewrites the advertisement for the requested version and records the
/// resolved version on `repo`.
fn resolve(
    state: &AppState,
    repo: &mut RepoIdentity,
    root: &str,
    data: &[u8],
) -> Result<Rewritten, ApiError> {
    let rewritten = rewrite_advertisement(data, &repo.requested).map_err(|e| match e {
        GitError::NoMatchingVersion { requested } => ApiError::NoVersion {
            url: state.upstream_url(root),
            requested,
        },
        other => {
            error!(root, error = %other, "corrupt advertisement from upstream");
            ApiError::Corrupt {
                url: state.upstream_url(root),
            }
        }
    })?;

    repo.resolved = rewritten.resolved;
    debug!(
        requested = %repo.requested,
        resolved = %repo.upstream_tree(),
        versions = rewritten.versions.len(),
        "resolved version"
    );
    Ok(rewritten)
}
