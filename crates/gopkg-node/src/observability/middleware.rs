//! Request id and metrics middleware.

use axum::{
    body::Body,
    extract::Request,
    http::{header, HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::future::Future;
use std::pin::Pin;
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

use super::metrics::{route_kind, METRICS};

/// Header carrying the request id in both directions.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

type MiddlewareFuture = Pin<Box<dyn Future<Output = Response> + Send>>;
type MiddlewareFn = fn(Request, Next) -> MiddlewareFuture;

/// Layer type returned by the constructors in this module.
pub type MiddlewareLayer = axum::middleware::FromFnLayer<MiddlewareFn, (), (Request,)>;

/// Id of the request being served, available as a request extension.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestId(pub String);

impl RequestId {
    /// Takes the id sent by the client, or makes a new one.
    fn from_request(request: &Request) -> Self {
        let id = request
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map_or_else(|| Uuid::new_v4().to_string(), str::to_string);
        Self(id)
    }
}

/// Tags every request with an id.
///
/// The id is stored as a [`RequestId`] extension, recorded on a span that
/// wraps the whole request and echoed on the response.
pub fn request_id_layer() -> MiddlewareLayer {
    axum::middleware::from_fn(tag_request as MiddlewareFn)
}

fn tag_request(mut request: Request, next: Next) -> MiddlewareFuture {
    Box::pin(async move {
        let id = RequestId::from_request(&request);
        let span = tracing::info_span!(
            "request",
            request_id = %id.0,
            method = %request.method(),
            path = %request.uri().path(),
        );
        let echoed = HeaderValue::from_str(&id.0).ok();
        request.extensions_mut().insert(id);

        let mut response = next.run(request).instrument(span).await;
        if let Some(value) = echoed {
            response
                .headers_mut()
                .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
        }
        response
    })
}

/// Keeps the in-flight gauge accurate even when a request future is dropped.
struct InFlight;

impl InFlight {
    fn enter() -> Self {
        METRICS.requests_in_flight.inc();
        InFlight
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        METRICS.requests_in_flight.dec();
    }
}

/// Counts and times requests by route kind.
pub fn metrics_layer() -> MiddlewareLayer {
    axum::middleware::from_fn(observe_request as MiddlewareFn)
}

fn observe_request(request: Request, next: Next) -> MiddlewareFuture {
    Box::pin(async move {
        let method = request.method().clone();
        let route = route_kind(request.uri().path());
        let start = Instant::now();

        let response = {
            let _in_flight = InFlight::enter();
            next.run(request).await
        };

        let elapsed = start.elapsed();
        let status = response.status();
        METRICS.record_http_request(method.as_str(), route, status.as_u16(), elapsed.as_secs_f64());
        tracing::debug!(
            route,
            status = status.as_u16(),
            elapsed_ms = elapsed.as_millis() as u64,
            "request completed"
        );
        response
    })
}

/// Prometheus scrape endpoint.
pub async fn metrics_handler() -> Response<Body> {
    (
        StatusCode::OK,
        [(
            header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        METRICS.encode(),
    )
        .into_response()
}
