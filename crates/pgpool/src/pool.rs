//! Pool construction and the pool handle.

use std::ops::Deref;
use std::sync::Arc;

use chrono::TimeDelta;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

use crate::config::PoolConfig;
use crate::error::{PoolError, Result};
use crate::options::{self, Options, PoolOption};

/// A PostgreSQL connection pool.
///
/// Dereferences to [`sqlx::PgPool`], so the driver's full query and
/// transaction surface is available unchanged. Cloning is cheap and shares
/// the same underlying pool.
#[derive(Clone)]
pub struct Pool {
    inner: PgPool,
    config: Arc<PoolConfig>,
}

impl Pool {
    /// Create a pool from options, verifying every new connection with a
    /// ping.
    ///
    /// Without options the defaults apply: `127.0.0.1:5432`, database and
    /// user `postgres`, empty password, `sslmode=disable`. Invalid options
    /// fail before any connection is attempted. If `cancel` fires before
    /// the pool is ready, construction is abandoned and
    /// [`PoolError::Cancelled`] is returned.
    pub async fn new<I>(cancel: &CancellationToken, options: I) -> Result<Self>
    where
        I: IntoIterator<Item = PoolOption>,
    {
        let options = Options::from_options(options)?;
        let config = PoolConfig::from_options(options)?;
        Self::connect_with(cancel, config).await
    }

    /// Create a new pool builder.
    #[must_use]
    pub fn builder() -> PoolBuilder {
        PoolBuilder::new()
    }

    /// Create a pool from an already resolved configuration.
    pub async fn connect_with(cancel: &CancellationToken, config: PoolConfig) -> Result<Self> {
        if cancel.is_cancelled() {
            return Err(PoolError::Cancelled);
        }

        let pool_options = config.pool_options();
        let connect_options = config.connect_options.clone();

        tracing::debug!(
            descriptor = %config.descriptor,
            max_connections = ?config.max_connections,
            min_connections = ?config.min_connections,
            "creating connection pool"
        );

        let inner = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(PoolError::Cancelled),
            result = pool_options.connect_with(connect_options) => {
                result.map_err(PoolError::Construction)?
            }
        };

        tracing::info!(
            host = %config.host,
            port = config.port,
            database = %config.database,
            "connection pool created"
        );

        Ok(Self {
            inner,
            config: Arc::new(config),
        })
    }

    /// Get the resolved pool configuration.
    #[must_use]
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Get the current pool status.
    #[must_use]
    pub fn status(&self) -> PoolStatus {
        let total = self.inner.size();
        let available = u32::try_from(self.inner.num_idle()).unwrap_or(u32::MAX);
        PoolStatus {
            available,
            in_use: total.saturating_sub(available),
            total,
            max: self.inner.options().get_max_connections(),
        }
    }

    /// Close the pool, waiting for checked-out connections to be returned.
    pub async fn close(&self) {
        self.inner.close().await;
        tracing::info!("connection pool closed");
    }

    /// Check if the pool is closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    /// Unwrap into the underlying driver pool.
    #[must_use]
    pub fn into_inner(self) -> PgPool {
        self.inner
    }
}

impl Deref for Pool {
    type Target = PgPool;

    fn deref(&self) -> &PgPool {
        &self.inner
    }
}

impl AsRef<PgPool> for Pool {
    fn as_ref(&self) -> &PgPool {
        &self.inner
    }
}

impl std::fmt::Debug for Pool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool")
            .field("config", &self.config)
            .field("status", &self.status())
            .finish()
    }
}

/// Status information about the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    /// Number of idle connections available.
    pub available: u32,
    /// Number of connections currently in use.
    pub in_use: u32,
    /// Total number of connections.
    pub total: u32,
    /// Maximum allowed connections.
    pub max: u32,
}

/// Chained alternative to passing a list of options to [`Pool::new`].
///
/// Each method records one option; nothing is validated until
/// [`PoolBuilder::config`] or [`PoolBuilder::build`] runs.
///
/// ```rust,ignore
/// let pool = Pool::builder()
///     .host("10.0.0.7")
///     .database("orders")
///     .max_conns(20)
///     .build(&CancellationToken::new())
///     .await?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct PoolBuilder {
    options: Vec<PoolOption>,
}

impl PoolBuilder {
    /// Create an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an arbitrary option.
    #[must_use]
    pub fn option(mut self, option: PoolOption) -> Self {
        self.options.push(option);
        self
    }

    /// Append several options in order.
    #[must_use]
    pub fn options<I>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = PoolOption>,
    {
        self.options.extend(options);
        self
    }

    /// Set the server IP address.
    #[must_use]
    pub fn host(self, host: impl Into<String>) -> Self {
        self.option(options::with_host(host))
    }

    /// Set the server port.
    #[must_use]
    pub fn port(self, port: i32) -> Self {
        self.option(options::with_port(port))
    }

    /// Set the database name.
    #[must_use]
    pub fn database(self, database: impl Into<String>) -> Self {
        self.option(options::with_database(database))
    }

    /// Set the user name.
    #[must_use]
    pub fn user(self, user: impl Into<String>) -> Self {
        self.option(options::with_user(user))
    }

    /// Set the password.
    #[must_use]
    pub fn password(self, password: impl Into<String>) -> Self {
        self.option(options::with_password(password))
    }

    /// Set the SSL mode.
    #[must_use]
    pub fn ssl_mode(self, mode: impl Into<String>) -> Self {
        self.option(options::with_ssl_mode(mode))
    }

    /// Set the maximum pool size.
    #[must_use]
    pub fn max_conns(self, conns: i32) -> Self {
        self.option(options::with_max_conns(conns))
    }

    /// Set the minimum pool size.
    #[must_use]
    pub fn min_conns(self, conns: i32) -> Self {
        self.option(options::with_min_conns(conns))
    }

    /// Set the maximum connection lifetime.
    #[must_use]
    pub fn max_conn_lifetime(self, lifetime: TimeDelta) -> Self {
        self.option(options::with_max_conn_lifetime(lifetime))
    }

    /// Set the maximum connection idle time.
    #[must_use]
    pub fn max_conn_idle_time(self, idle: TimeDelta) -> Self {
        self.option(options::with_max_conn_idle_time(idle))
    }

    /// Set the health-check period.
    #[must_use]
    pub fn health_check_period(self, period: TimeDelta) -> Self {
        self.option(options::with_health_check_period(period))
    }

    /// Set the lifetime jitter.
    #[must_use]
    pub fn max_conn_lifetime_jitter(self, jitter: TimeDelta) -> Self {
        self.option(options::with_max_conn_lifetime_jitter(jitter))
    }

    /// Log lifecycle events through a `tracing` dispatcher.
    #[must_use]
    pub fn tracing_logger(self, dispatch: tracing::Dispatch, level: impl Into<String>) -> Self {
        self.option(options::with_tracing_logger(Some(dispatch), level))
    }

    /// Log lifecycle events through a `log` implementation.
    #[must_use]
    pub fn log_logger(self, logger: Arc<dyn log::Log>, level: impl Into<String>) -> Self {
        self.option(options::with_log_logger(Some(logger), level))
    }

    /// Log lifecycle events through an OpenTelemetry logger.
    #[must_use]
    pub fn otel_logger<L>(self, logger: L, level: impl Into<String>) -> Self
    where
        L: opentelemetry::logs::Logger + Send + Sync + 'static,
    {
        self.option(options::with_otel_logger(Some(logger), level))
    }

    /// Resolve the configuration without connecting.
    pub fn config(&self) -> Result<PoolConfig> {
        let options = Options::from_options(self.options.iter().cloned())?;
        PoolConfig::from_options(options)
    }

    /// Build the pool.
    pub async fn build(self, cancel: &CancellationToken) -> Result<Pool> {
        Pool::new(cancel, self.options).await
    }
}

/// Check whether a driver error is the "no rows" sentinel.
#[must_use]
pub fn is_no_rows(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::RowNotFound)
}
