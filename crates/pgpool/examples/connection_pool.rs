//! Connection pool example.
//!
//! This example builds a pool from functional options, routes lifecycle
//! events into `tracing`, and runs a handful of concurrent queries
//! through the pool handle.
//!
//! # Running
//!
//! ```bash
//! export PG_HOST=127.0.0.1
//! export PG_USER=postgres
//! export PG_PASSWORD=postgres
//!
//! RUST_LOG=debug cargo run --example connection_pool
//! ```

// Allow common patterns in example code
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::time::Duration;

use chrono::TimeDelta;
use pgpool::{Pool, is_no_rows};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let host = std::env::var("PG_HOST").unwrap_or_else(|_| "127.0.0.1".into());
    let user = std::env::var("PG_USER").unwrap_or_else(|_| "postgres".into());
    let password = std::env::var("PG_PASSWORD").unwrap_or_else(|_| "postgres".into());

    println!("=== Connection Pool Example ===\n");

    // Ctrl-C aborts construction while connections are being established.
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_signal.cancel();
        }
    });

    let builder = Pool::builder()
        .host(host)
        .user(user)
        .password(password)
        .min_conns(2)
        .max_conns(10)
        .max_conn_idle_time(TimeDelta::minutes(5))
        .max_conn_lifetime(TimeDelta::minutes(30))
        .max_conn_lifetime_jitter(TimeDelta::minutes(2))
        .health_check_period(TimeDelta::seconds(30))
        .tracing_logger(tracing::dispatcher::get_default(Clone::clone), "debug");

    let config = builder.config()?;
    println!("Pool configuration:");
    println!("  Descriptor: {}", config.descriptor);
    println!("  Min connections: {:?}", config.min_connections);
    println!("  Max connections: {:?}", config.max_connections);
    println!("  Idle timeout: {:?}", config.idle_timeout);
    println!();

    let pool = builder.build(&cancel).await?;
    print_pool_status(&pool);

    // Example 1: Basic pool usage
    println!("\n1. Basic pool usage:");
    let (version,): (String,) = sqlx::query_as("SELECT version()")
        .fetch_one(&*pool)
        .await?;
    println!("  Connected to: {}...", &version[..50.min(version.len())]);

    // Example 2: Concurrent usage
    println!("\n2. Concurrent pool usage (10 parallel queries):");
    let start = Instant::now();
    let mut handles = vec![];

    for i in 0..10_i32 {
        let pool = pool.clone();
        handles.push(tokio::spawn(async move {
            sqlx::query("SELECT $1, pg_sleep(0.05)")
                .bind(i)
                .execute(&*pool)
                .await
        }));
    }

    let mut completed = 0;
    for handle in handles {
        if handle.await?.is_ok() {
            completed += 1;
        }
    }
    println!("  Completed {} queries in {:?}", completed, start.elapsed());
    print_pool_status(&pool);

    // Example 3: No rows
    println!("\n3. Empty result:");
    match sqlx::query("SELECT 1 WHERE false").fetch_one(&*pool).await {
        Err(e) if is_no_rows(&e) => println!("  No rows, as expected"),
        Err(e) => return Err(e.into()),
        Ok(_) => println!("  Unexpected row"),
    }

    // Graceful shutdown
    println!("\n4. Graceful shutdown:");
    tokio::time::sleep(Duration::from_millis(100)).await;
    pool.close().await;
    println!("  Pool closed: {}", pool.is_closed());

    Ok(())
}

fn print_pool_status(pool: &Pool) {
    let status = pool.status();
    println!(
        "  Status: {} in use, {} idle, {}/{} connections",
        status.in_use, status.available, status.total, status.max
    );
}
