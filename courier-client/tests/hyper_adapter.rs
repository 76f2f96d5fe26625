//! Integration tests for the hyper adapter against an embedded axum server.

use std::collections::HashMap;
use std::time::Duration;

use axum::extract::{Path, Query};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};

use courier_client::{
    AdapterErrorKind, CancelToken, CancellationToken, Client, Data, Interceptor, RequestConfig,
    Transitional,
};

async fn get_user(Path(id): Path<u32>) -> Json<Value> {
    Json(json!({"id": id, "name": format!("user-{id}")}))
}

async fn echo(Json(body): Json<Value>) -> Json<Value> {
    Json(body)
}

async fn query(Query(params): Query<HashMap<String, String>>) -> Json<HashMap<String, String>> {
    Json(params)
}

async fn headers(headers: HeaderMap) -> String {
    headers
        .get("x-trace")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("none")
        .to_string()
}

async fn missing() -> (StatusCode, Json<Value>) {
    (StatusCode::NOT_FOUND, Json(json!({"error": "missing"})))
}

async fn slow() -> &'static str {
    tokio::time::sleep(Duration::from_secs(5)).await;
    "late"
}

async fn spawn_server() -> String {
    let app = Router::new()
        .route("/users/{id}", get(get_user))
        .route("/echo", post(echo))
        .route("/query", get(query))
        .route("/headers", get(headers))
        .route("/missing", get(missing))
        .route("/slow", get(slow));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

async fn client() -> Client {
    Client::builder().base_url(spawn_server().await).build()
}

#[tokio::test]
async fn test_get_json() {
    let client = client().await;

    let response = client.get("/users/7", None).await.unwrap();

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.data,
        Some(Data::Json(json!({"id": 7, "name": "user-7"})))
    );
    let request = response.request.unwrap();
    assert_eq!(request.method, http::Method::GET);
    assert_eq!(request.uri.path(), "/users/7");
}

#[tokio::test]
async fn test_post_json_round_trip() {
    let client = client().await;

    let response = client
        .post("/echo", json!({"name": "ada", "tags": ["a", "b"]}), None)
        .await
        .unwrap();

    assert_eq!(
        response.data,
        Some(Data::Json(json!({"name": "ada", "tags": ["a", "b"]})))
    );
}

#[tokio::test]
async fn test_query_params() {
    let client = client().await;

    let response = client
        .get("/query", RequestConfig::new().param("q", "rust").param("page", 2))
        .await
        .unwrap();

    assert_eq!(
        response.data,
        Some(Data::Json(json!({"q": "rust", "page": "2"})))
    );
}

#[tokio::test]
async fn test_interceptors_end_to_end() {
    let client = client().await;
    client.interceptors().request.add(
        Interceptor::sync(|config: RequestConfig| Ok(config.header("x-trace", "abc")))
            .synchronous(true),
    );
    client
        .interceptors()
        .response
        .add(Interceptor::new(|mut response: courier_client::Response| async move {
            let text = response.text().unwrap_or_default().to_uppercase();
            response.data = Some(Data::Text(text));
            Ok(response)
        }));

    let response = client
        .get(
            "/headers",
            RequestConfig::new().transitional(Transitional::new().forced_json_parsing(false)),
        )
        .await
        .unwrap();

    assert_eq!(response.text(), Some("ABC"));
}

#[tokio::test]
async fn test_bad_status_carries_transformed_response() {
    let client = client().await;

    let err = client.get("/missing", None).await.unwrap_err();

    assert_eq!(err.kind(), Some(AdapterErrorKind::BadRequest));
    let response = err.response().unwrap();
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.data, Some(Data::Json(json!({"error": "missing"}))));
}

#[tokio::test]
async fn test_custom_validate_status() {
    let client = client().await;

    let response = client
        .get(
            "/missing",
            RequestConfig::new().validate_status(|status| status.as_u16() < 500),
        )
        .await
        .unwrap();

    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_timeout() {
    let client = client().await;

    let err = client
        .get("/slow", RequestConfig::new().timeout(Duration::from_millis(50)))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), Some(AdapterErrorKind::ConnectionAborted));
    assert!(err.to_string().contains("timeout of 50ms exceeded"));

    let err = client
        .get(
            "/slow",
            RequestConfig::new()
                .timeout(Duration::from_millis(50))
                .transitional(Transitional::new().clarify_timeout_error(true)),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), Some(AdapterErrorKind::TimedOut));
}

#[tokio::test]
async fn test_cancel_token_in_flight() {
    let client = client().await;
    let source = CancelToken::source();

    let cancel = source.cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel("user aborted");
    });

    let err = client
        .get("/slow", RequestConfig::new().cancel_token(source.token.clone()))
        .await
        .unwrap_err();

    assert!(err.is_cancel());
    assert_eq!(err.to_string(), "user aborted");
}

#[tokio::test]
async fn test_abort_signal_in_flight() {
    let client = client().await;
    let signal = CancellationToken::new();

    let trigger = signal.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let err = client
        .get("/slow", RequestConfig::new().signal(signal))
        .await
        .unwrap_err();

    assert!(err.is_cancel());
    assert_eq!(err.to_string(), "canceled");
    let canceled = err.as_canceled().unwrap();
    assert_eq!(canceled.config.as_ref().unwrap().url.as_deref(), Some("/slow"));
}

#[tokio::test]
async fn test_connection_refused_is_network_error() {
    let client = Client::builder().base_url("http://127.0.0.1:1").build();

    let err = client.get("/", None).await.unwrap_err();

    assert_eq!(err.kind(), Some(AdapterErrorKind::Network));
}
