//! End-to-end tests for the `git-upload-pack` phase.

mod common;

use axum::{body::Body, http::Request};
use common::*;
use gopkg_node::config::UploadPackMode;
use tower::ServiceExt;
use wiremock::matchers::{body_string as body_matches, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const WANT: &str = "0032want 2222222222222222222222222222222222222222\n00000009done\n";

async fn mount_yaml_refs(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/go-yaml/yaml.git/info/refs"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(yaml_advert()))
        .mount(server)
        .await;
}

fn upload_pack_request(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/x-git-upload-pack-request")
        .header("connection", "keep-alive")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_upload_pack_proxied() {
    let server = MockServer::start().await;
    mount_yaml_refs(&server).await;
    Mock::given(method("POST"))
        .and(path("/go-yaml/yaml/git-upload-pack"))
        .and(header("content-type", "application/x-git-upload-pack-request"))
        .and(body_matches(WANT))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/x-git-upload-pack-result")
                .set_body_bytes(b"0008NAK\nPACK-DATA".to_vec()),
        )
        .expect(1)
        .mount(&server)
        .await;
    let app = app(config_for(&server));

    let response = app
        .oneshot(upload_pack_request("/yaml.v1/git-upload-pack", WANT))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(
        response.headers()["content-type"],
        "application/x-git-upload-pack-result"
    );
    assert_eq!(body_bytes(response).await, b"0008NAK\nPACK-DATA");
}

#[tokio::test]
async fn test_upstream_status_passed_through() {
    let server = MockServer::start().await;
    mount_yaml_refs(&server).await;
    Mock::given(method("POST"))
        .and(path("/go-yaml/yaml/git-upload-pack"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream broke"))
        .mount(&server)
        .await;
    let app = app(config_for(&server));

    let response = app
        .oneshot(upload_pack_request("/yaml.v1/git-upload-pack", WANT))
        .await
        .unwrap();
    assert_eq!(response.status(), 500);
    assert_eq!(body_string(response).await, "upstream broke");
}

#[tokio::test]
async fn test_unknown_repository_not_proxied() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let app = app(config_for(&server));

    let response = app
        .oneshot(upload_pack_request("/missing.v1/git-upload-pack", WANT))
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_oversized_request_body_rejected() {
    let server = MockServer::start().await;
    mount_yaml_refs(&server).await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = config_for(&server);
    config.max_request_body_bytes = 16;
    let app = app(config);

    let response = app
        .oneshot(upload_pack_request("/yaml.v1/git-upload-pack", WANT))
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_redirect_mode() {
    let server = MockServer::start().await;
    mount_yaml_refs(&server).await;

    let mut config = config_for(&server);
    config.upload_pack = UploadPackMode::Redirect;
    let app = app(config);

    let response = app
        .oneshot(upload_pack_request("/yaml.v1/git-upload-pack", WANT))
        .await
        .unwrap();
    assert_eq!(response.status(), 301);
    assert_eq!(
        response.headers()["location"],
        format!("http://{}/go-yaml/yaml/git-upload-pack", server.address()).as_str()
    );
}
