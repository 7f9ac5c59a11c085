//! Shared fixtures for the end-to-end tests.

#![allow(dead_code)]

use axum::{body::Body, http::Request, response::Response, Router};
use gopkg_node::config::{Config, UpstreamConfig};
use gopkg_node::{create_router, AppState};
use tower::ServiceExt;
use wiremock::MockServer;

pub const HASH_A: &str = "1111111111111111111111111111111111111111";
pub const HASH_B: &str = "2222222222222222222222222222222222222222";
pub const HASH_C: &str = "3333333333333333333333333333333333333333";
pub const HASH_D: &str = "4444444444444444444444444444444444444444";

pub const SERVICE: &str = "001e# service=git-upload-pack\n0000";

pub fn pkt(line: &str) -> String {
    format!("{:04x}{}", line.len() + 4, line)
}

/// Builds an advertisement from ref lines.
pub fn advert(lines: &[String]) -> Vec<u8> {
    let mut s = SERVICE.to_string();
    for line in lines {
        s.push_str(&pkt(line));
    }
    s.push_str("0000");
    s.into_bytes()
}

/// A repository with `v1` and `v2` branches and a couple of tags.
pub fn yaml_advert() -> Vec<u8> {
    advert(&[
        format!("{HASH_A} HEAD\0multi_ack side-band-64k symref=HEAD:refs/heads/master\n"),
        format!("{HASH_A} refs/heads/master\n"),
        format!("{HASH_B} refs/heads/v1\n"),
        format!("{HASH_C} refs/heads/v2\n"),
        format!("{HASH_D} refs/tags/v2.1.0\n"),
    ])
}

/// Configuration pointing the upstream at `server`.
pub fn config_for(server: &MockServer) -> Config {
    Config {
        upstream: UpstreamConfig {
            scheme: "http".to_string(),
            host: server.address().to_string(),
            refs_timeout_secs: 2,
            ..UpstreamConfig::default()
        },
        ..Config::default()
    }
}

pub fn app(config: Config) -> Router {
    create_router(AppState::from_config(config).unwrap())
}

pub async fn get(app: &Router, uri: &str) -> Response {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    app.clone().oneshot(request).await.unwrap()
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn body_string(response: Response) -> String {
    String::from_utf8(body_bytes(response).await).unwrap()
}
