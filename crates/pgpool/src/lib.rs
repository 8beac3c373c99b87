//! # pgpool
//!
//! Validated construction of PostgreSQL connection pools.
//!
//! A pool is described by a list of functional options. Each option
//! validates its own input when applied, unset settings fall back to
//! defaults, and every new physical connection is pinged before it joins
//! the pool. The returned [`Pool`] dereferences to [`sqlx::PgPool`].
//!
//! ## Features
//!
//! - Functional options with last-write-wins semantics
//! - Defaults: `127.0.0.1:5432`, database and user `postgres`,
//!   `sslmode=disable`
//! - Post-connect ping, idle health checks and lifetime jitter
//! - Lifecycle logging through `tracing`, `log` or OpenTelemetry, with
//!   driver statement logging following the same level
//! - Cancellable construction
//!
//! ## Example
//!
//! ```rust,ignore
//! use chrono::TimeDelta;
//! use pgpool::{Pool, with_database, with_health_check_period, with_max_conns};
//! use tokio_util::sync::CancellationToken;
//!
//! let pool = Pool::new(
//!     &CancellationToken::new(),
//!     [
//!         with_database("orders"),
//!         with_max_conns(20),
//!         with_health_check_period(TimeDelta::seconds(30)),
//!     ],
//! )
//! .await?;
//!
//! let row: (i64,) = sqlx::query_as("SELECT $1")
//!     .bind(1_i64)
//!     .fetch_one(&*pool)
//!     .await?;
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod logger;
pub mod options;
pub mod pool;
pub mod settings;

pub use config::{ConnectionDescriptor, PoolConfig, StatementLogging};
pub use error::{PoolError, Result};
pub use logger::{LogLevel, LoggerBackend, LoggerBinding, OtelHandle, OtelLogger, PoolLogger};
pub use options::{
    Options, PoolOption, with_database, with_health_check_period, with_host, with_log_logger,
    with_max_conn_idle_time, with_max_conn_lifetime, with_max_conn_lifetime_jitter,
    with_max_conns, with_min_conns, with_otel_logger, with_password, with_port, with_ssl_mode,
    with_tracing_logger, with_user,
};
pub use pool::{Pool, PoolBuilder, PoolStatus, is_no_rows};
pub use settings::PoolSettings;

/// The driver's "no rows" error, for comparing query results directly.
pub use sqlx::Error::RowNotFound as NoRows;

pub use sqlx;
