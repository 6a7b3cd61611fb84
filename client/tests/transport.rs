//! reqwest transport against a local HTTP server

use std::sync::Arc;

use axum::{
    http::{header, HeaderMap, StatusCode},
    routing::{delete, get, post},
    Json, Router,
};
use reqwest::Method;
use serde_json::{json, Value};

use inpawdia_client::{
    ApiClient, ApiRequest, ClientError, MemoryTokenStore, ReqwestTransport, Transport,
};

fn authorization(headers: &HeaderMap) -> Value {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map_or(Value::Null, |v| json!(v))
}

async fn whoami(headers: HeaderMap) -> Json<Value> {
    Json(json!({ "authorization": authorization(&headers) }))
}

async fn echo(headers: HeaderMap, Json(body): Json<Value>) -> Json<Value> {
    Json(json!({ "authorization": authorization(&headers), "body": body }))
}

/// Serve a small API under `/api` and return the base URL, trailing slash
/// included
async fn spawn_api() -> String {
    let api = Router::new()
        .route("/whoami", get(whoami))
        .route("/echo", post(echo))
        .route("/pets/gone", delete(|| async { StatusCode::NO_CONTENT }))
        .route(
            "/upstream",
            get(|| async { (StatusCode::BAD_GATEWAY, "upstream unavailable") }),
        );
    let app = Router::new().nest("/api", api);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{}/api/", addr)
}

#[tokio::test]
async fn bearer_and_json_body_reach_the_server() {
    let transport = ReqwestTransport::new(&spawn_api().await).unwrap();

    let mut request =
        ApiRequest::new(Method::POST, "/echo").with_body(json!({ "name": "Beagle" }));
    request.bearer = Some("access-1".to_string());
    let response = transport.execute(&request).await.unwrap();

    assert_eq!(response.status, 200);
    assert!(response.is_success());
    assert_eq!(response.body["authorization"], "Bearer access-1");
    assert_eq!(response.body["body"]["name"], "Beagle");
}

#[tokio::test]
async fn anonymous_request_sends_no_authorization() {
    let transport = ReqwestTransport::new(&spawn_api().await).unwrap();

    let response = transport
        .execute(&ApiRequest::new(Method::GET, "/whoami"))
        .await
        .unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.body["authorization"], Value::Null);
}

#[tokio::test]
async fn empty_body_decodes_as_null() {
    let transport = ReqwestTransport::new(&spawn_api().await).unwrap();

    let response = transport
        .execute(&ApiRequest::new(Method::DELETE, "/pets/gone"))
        .await
        .unwrap();

    assert_eq!(response.status, 204);
    assert_eq!(response.body, Value::Null);
}

#[tokio::test]
async fn non_json_body_is_kept_as_text() {
    let base_url = spawn_api().await;
    let transport = ReqwestTransport::new(&base_url).unwrap();

    let response = transport
        .execute(&ApiRequest::new(Method::GET, "/upstream"))
        .await
        .unwrap();
    assert_eq!(response.status, 502);
    assert_eq!(response.body, Value::String("upstream unavailable".to_string()));

    // The text becomes the error message once it reaches the client
    let client = ApiClient::new(
        Arc::new(transport),
        Arc::new(MemoryTokenStore::new()),
    );
    let err = client.get::<Value>("/upstream").await.unwrap_err();
    assert_eq!(
        err,
        ClientError::Api {
            status: 502,
            message: "upstream unavailable".to_string(),
        }
    );
}

#[tokio::test]
async fn unreachable_server_is_a_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let transport = ReqwestTransport::new(&format!("http://{}", addr)).unwrap();
    let err = transport
        .execute(&ApiRequest::new(Method::GET, "/whoami"))
        .await
        .unwrap_err();

    assert!(matches!(err, ClientError::Transport(_)));
}
