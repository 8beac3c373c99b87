//! # pgpool-testing
//!
//! Test infrastructure for pgpool development.
//!
//! This crate provides utilities for integration testing against
//! PostgreSQL, either in a disposable container or on a server named by
//! environment variables.
//!
//! ## Features
//!
//! - PostgreSQL container management via testcontainers
//! - Environment-driven connection settings
//! - Scratch table fixtures
//!
//! ## Container Example
//!
//! ```rust,ignore
//! use pgpool::Pool;
//! use pgpool_testing::{POSTGRES_PORT, PostgresContainer};
//! use testcontainers::runners::AsyncRunner;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::test]
//! async fn test_with_real_server() {
//!     let image = PostgresContainer::default();
//!     let container = image.clone().start().await.unwrap();
//!     let port = container.get_host_port_ipv4(POSTGRES_PORT).await.unwrap();
//!     let pool = Pool::new(&CancellationToken::new(), image.options(port))
//!         .await
//!         .unwrap();
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod container;
pub mod fixtures;

pub use container::{POSTGRES_PORT, PostgresContainer};
pub use fixtures::{TestSettings, TestTable};
