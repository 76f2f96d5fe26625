//! Shared demo server for the courier examples.
//!
//! Each example binary starts this server on an ephemeral port and talks to
//! it with `courier-client`.

use std::net::SocketAddr;
use std::time::Duration;

use axum::extract::Path;
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::Value;

#[derive(Serialize)]
pub struct User {
    pub id: u32,
    pub name: String,
}

async fn get_user(Path(id): Path<u32>) -> Json<User> {
    Json(User {
        id,
        name: format!("user-{id}"),
    })
}

async fn create_user(Json(body): Json<Value>) -> Json<Value> {
    Json(body)
}

async fn whoami(headers: HeaderMap) -> String {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("anonymous")
        .to_string()
}

async fn slow() -> &'static str {
    tokio::time::sleep(Duration::from_secs(10)).await;
    "finally"
}

pub fn router() -> Router {
    Router::new()
        .route("/users/{id}", get(get_user))
        .route("/users", post(create_user))
        .route("/whoami", get(whoami))
        .route("/slow", get(slow))
}

/// Start the demo server, returning its base URL.
pub async fn serve() -> anyhow::Result<String> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr: SocketAddr = listener.local_addr()?;
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router()).await {
            tracing::error!(error = %e, "demo server failed");
        }
    });
    Ok(format!("http://{addr}"))
}
