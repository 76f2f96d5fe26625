//! Example: cancellation
//!
//! Demonstrates:
//! - cancelling an in-flight call through a `CancelToken`
//! - the same through a `CancellationToken` abort signal
//! - listeners notified once, newest first
//! - calls made with an already-cancelled token never reach the server
//!
//! Run with: cargo run --bin cancel-client

use std::time::Duration;

use courier_client::{CancelToken, CancellationToken, Client, RequestConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let base_url = courier_examples::serve().await?;
    println!("=== Example: cancellation ===");
    println!("Server listening on {}", base_url);
    println!();

    let client = Client::builder().base_url(&base_url).build();

    // Test 1: CancelToken in flight
    println!("Test 1: cancel a slow call with a CancelToken...");
    {
        let source = CancelToken::source();
        source.token.subscribe(|reason| println!("  listener A saw: {reason}"));
        source.token.subscribe(|reason| println!("  listener B saw: {reason}"));

        let cancel = source.cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            cancel.cancel("user navigated away");
        });

        let result = client
            .get("/slow", RequestConfig::new().cancel_token(source.token.clone()))
            .await;
        match result {
            Err(err) if err.is_cancel() => println!("  PASS: cancelled with {:?}", err.to_string()),
            other => anyhow::bail!("expected cancellation, got {:?}", other.map(|r| r.status)),
        }

        // Second cancel is a no-op.
        assert!(!source.cancel.cancel("again"));
    }

    // Test 2: abort signal
    println!("Test 2: cancel a slow call with an abort signal...");
    {
        let signal = CancellationToken::new();
        let trigger = signal.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let err = client
            .get("/slow", RequestConfig::new().signal(signal))
            .await
            .err()
            .ok_or_else(|| anyhow::anyhow!("expected an error"))?;
        assert!(err.is_cancel());
        println!("  PASS: {}", err);
    }

    // Test 3: already cancelled
    println!("Test 3: a cancelled token stops the call before dispatch...");
    {
        let token = CancelToken::new(|cancel| {
            cancel.cancel("cancelled up front");
        });

        let err = client
            .get("/users/1", RequestConfig::new().cancel_token(token))
            .await
            .err()
            .ok_or_else(|| anyhow::anyhow!("expected an error"))?;
        assert!(err.is_cancel());
        println!("  PASS: {}", err);
    }

    println!();
    println!("=== All tests passed! ===");
    Ok(())
}
