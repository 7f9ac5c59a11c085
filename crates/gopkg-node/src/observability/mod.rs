//! # Observability
//!
//! - **Structured logging**: pretty or JSON output filtered by `RUST_LOG`
//! - **Prometheus metrics**: HTTP traffic, cache and upstream outcomes
//! - **Request tracing**: a request id on every span and response
//!
//! ## Usage
//!
//! ```rust,ignore
//! use axum::Router;
//! use gopkg_node::observability::{init_logging, request_id_layer, LogFormat};
//!
//! init_logging("info", LogFormat::Json);
//!
//! let app: Router<()> = Router::new().layer(request_id_layer());
//! ```

mod logging;
mod metrics;
pub mod middleware;

pub use logging::{init_logging, LogFormat};
pub use metrics::{route_kind, MetricsState, METRICS};
pub use middleware::{
    metrics_handler, metrics_layer, request_id_layer, MiddlewareLayer, RequestId, REQUEST_ID_HEADER,
};
