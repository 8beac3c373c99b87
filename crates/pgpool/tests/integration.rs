//! Connection pool integration tests.
//!
//! These tests require a running PostgreSQL instance. They are ignored by
//! default and can be run with:
//!
//! ```bash
//! # Set connection details via environment variables
//! export PG_HOST=127.0.0.1
//! export PG_PORT=5432
//! export PG_USER=postgres
//! export PG_PASSWORD=postgres
//!
//! # Run integration tests
//! cargo test -p pgpool --test integration -- --ignored
//! ```

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::{Arc, Mutex};

use chrono::TimeDelta;
use pgpool::{
    NoRows, Pool, PoolError, PoolOption, is_no_rows, with_database, with_health_check_period,
    with_host, with_log_logger, with_max_conns, with_password, with_port, with_user,
};
use tokio_util::sync::CancellationToken;

/// Helper to get test options from environment variables.
fn get_test_options() -> Vec<PoolOption> {
    let host = std::env::var("PG_HOST").unwrap_or_default();
    let port = std::env::var("PG_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(0);
    let user = std::env::var("PG_USER").unwrap_or_default();
    let password = std::env::var("PG_PASSWORD").unwrap_or_default();
    let database = std::env::var("PG_DATABASE").unwrap_or_default();

    vec![
        with_host(host),
        with_port(port),
        with_user(user),
        with_password(password),
        with_database(database),
    ]
}

// =============================================================================
// Basic Pool Tests
// =============================================================================

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_pool_create_and_close() {
    let pool = Pool::new(&CancellationToken::new(), get_test_options())
        .await
        .expect("Failed to create pool");

    assert!(!pool.is_closed());
    assert!(pool.status().total >= 1);

    pool.close().await;
    assert!(pool.is_closed());
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_pool_queries_through_handle() {
    let pool = Pool::builder()
        .options(get_test_options())
        .max_conns(4)
        .build(&CancellationToken::new())
        .await
        .expect("Failed to create pool");

    let (value,): (i32,) = sqlx::query_as("SELECT $1::int4")
        .bind(7_i32)
        .fetch_one(&*pool)
        .await
        .expect("Query failed");
    assert_eq!(value, 7);
    assert_eq!(pool.status().max, 4);

    pool.close().await;
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_no_rows_sentinel() {
    let pool = Pool::new(&CancellationToken::new(), get_test_options())
        .await
        .expect("Failed to create pool");

    let err = sqlx::query("SELECT 1 WHERE false")
        .fetch_one(&*pool)
        .await
        .unwrap_err();
    assert!(is_no_rows(&err));
    assert!(matches!(err, NoRows));

    pool.close().await;
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_transaction_through_handle() {
    let pool = Pool::new(&CancellationToken::new(), get_test_options())
        .await
        .expect("Failed to create pool");

    let mut tx = pool.begin().await.expect("Failed to begin");
    sqlx::query("CREATE TEMP TABLE pgpool_tx (id int)")
        .execute(&mut *tx)
        .await
        .unwrap();
    tx.rollback().await.unwrap();

    pool.close().await;
}

// =============================================================================
// Lifecycle Logging
// =============================================================================

/// Records every lifecycle event passed through the `log` facade.
#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<(log::Level, String)>>,
}

impl log::Log for Recorder {
    fn enabled(&self, _: &log::Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &log::Record<'_>) {
        self.events
            .lock()
            .unwrap()
            .push((record.level(), record.args().to_string()));
    }

    fn flush(&self) {}
}

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_connect_is_logged() {
    let recorder = Arc::new(Recorder::default());

    let mut options = get_test_options();
    options.push(with_health_check_period(TimeDelta::seconds(1)));
    options.push(with_log_logger(Some(recorder.clone()), "info"));

    let pool = Pool::new(&CancellationToken::new(), options)
        .await
        .expect("Failed to create pool");
    sqlx::query("SELECT 1").execute(&*pool).await.unwrap();

    let events = recorder.events.lock().unwrap().clone();
    assert!(
        events
            .iter()
            .any(|(level, msg)| *level == log::Level::Info && msg == "connect"),
        "{events:?}"
    );
    assert!(events.iter().all(|(level, _)| *level <= log::Level::Info));

    pool.close().await;
}

// =============================================================================
// Failure Modes
// =============================================================================

#[tokio::test]
#[ignore = "Requires PostgreSQL"]
async fn test_wrong_password_fails_construction() {
    let mut options = get_test_options();
    options.push(with_password("definitely-not-the-password"));
    options.push(with_max_conns(1));

    let err = Pool::new(&CancellationToken::new(), options)
        .await
        .unwrap_err();
    assert!(matches!(err, PoolError::Construction(_)), "{err}");
}

#[tokio::test]
async fn test_negative_port_fails_without_network() {
    let err = Pool::new(&CancellationToken::new(), [with_port(-1)])
        .await
        .unwrap_err();
    assert!(matches!(err, PoolError::Negative { setting: "port" }));
}
