//! Example: interceptors
//!
//! Demonstrates:
//! - request interceptors running newest first, response interceptors in order
//! - eager dispatch when every request interceptor is synchronous
//! - `run_when` to skip an interceptor for some calls
//! - ejecting an interceptor
//!
//! Run with: cargo run --bin interceptor-client

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use courier_client::{Client, Interceptor, RequestConfig, Response};
use serde_json::json;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let base_url = courier_examples::serve().await?;
    println!("=== Example: interceptors ===");
    println!("Server listening on {}", base_url);
    println!();

    let client = Client::builder()
        .base_url(&base_url)
        .common_header("accept", "application/json")
        .build();

    // Test 1: ordering
    println!("Test 1: request interceptors run newest first...");
    {
        let first = client.interceptors().request.add(
            Interceptor::sync(|config: RequestConfig| {
                println!("  request interceptor A");
                Ok(config)
            })
            .synchronous(true),
        );
        let second = client.interceptors().request.add(
            Interceptor::sync(|config: RequestConfig| {
                println!("  request interceptor B");
                Ok(config.header("authorization", "Bearer demo"))
            })
            .synchronous(true),
        );

        let response = client.get("/whoami", None).await?;
        assert_eq!(response.text(), Some("Bearer demo"));
        println!("  PASS: server saw {:?}", response.text());

        client.interceptors().request.eject(first);
        client.interceptors().request.eject(second);
    }

    // Test 2: eager dispatch
    println!("Test 2: synchronous chain sends before the future is awaited...");
    {
        let sent = Arc::new(AtomicUsize::new(0));
        let counter = sent.clone();
        let id = client.interceptors().request.add(
            Interceptor::sync(move |config: RequestConfig| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(config)
            })
            .synchronous(true),
        );

        let pending = client.get("/users/1", None);
        assert_eq!(sent.load(Ordering::SeqCst), 1);
        let response = pending.await?;
        println!("  PASS: got {:?}", response.data);

        client.interceptors().request.eject(id);
    }

    // Test 3: run_when
    println!("Test 3: run_when skips interceptors per call...");
    {
        let id = client.interceptors().request.add(
            Interceptor::new(|config: RequestConfig| async move {
                Ok(config.header("authorization", "Bearer admin"))
            })
            .run_when(|config| config.url.as_deref() == Some("/whoami")),
        );

        let admin = client.get("/whoami", None).await?;
        assert_eq!(admin.text(), Some("Bearer admin"));

        let user = client.post("/users", json!({"name": "ada"}), None).await?;
        let created: serde_json::Value = user.json()?;
        assert_eq!(created["name"], "ada");
        println!("  PASS: admin header only on /whoami");

        client.interceptors().request.eject(id);
    }

    // Test 4: response interceptors
    println!("Test 4: response interceptors run in registration order...");
    {
        client.interceptors().response.add(Interceptor::new(|response: Response| async move {
            println!("  response interceptor 1: status {}", response.status);
            Ok(response)
        }));
        client.interceptors().response.add(Interceptor::sync(|response: Response| {
            println!("  response interceptor 2");
            Ok(response)
        }));

        client.get("/users/2", None).await?;
        println!("  PASS");
    }

    println!();
    println!("=== All tests passed! ===");
    Ok(())
}
