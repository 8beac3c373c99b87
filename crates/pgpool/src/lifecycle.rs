//! Connection lifecycle hooks.
//!
//! Hooks are installed on the driver's pool options and run inside the
//! driver's own pooling machinery:
//!
//! - after connect: every new physical connection is pinged. A failed ping
//!   fails that connection only; the driver decides whether to retry.
//! - before acquire: with a health-check period configured, a connection
//!   idle for at least that long is pinged before it is handed out, and
//!   discarded if the ping fails.
//! - after release: with lifetime jitter configured, a connection older
//!   than its randomised lifetime is closed instead of returned. With a
//!   zero idle time, every released connection is closed.
//!
//! Events are forwarded to the configured [`LoggerBinding`], if any.

use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::Rng;
use sqlx::Connection;
use sqlx::postgres::{PgConnection, PgPoolOptions};

use crate::config::PoolConfig;
use crate::logger::{LogField, LogLevel, LoggerBinding};

/// Maximum lifetime extended by a random amount per decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifetimeJitter {
    lifetime: Duration,
    jitter: Duration,
}

impl LifetimeJitter {
    /// Create a jittered lifetime.
    #[must_use]
    pub fn new(lifetime: Duration, jitter: Duration) -> Self {
        Self { lifetime, jitter }
    }

    /// Base lifetime.
    #[must_use]
    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Longest lifetime any connection can reach.
    #[must_use]
    pub fn upper_bound(&self) -> Duration {
        self.lifetime.saturating_add(self.jitter)
    }

    /// Draw a lifetime in `[lifetime, lifetime + jitter)`.
    #[must_use]
    pub fn sample(&self) -> Duration {
        let nanos = u64::try_from(self.jitter.as_nanos()).unwrap_or(u64::MAX);
        if nanos == 0 {
            return self.lifetime;
        }
        let offset = rand::thread_rng().gen_range(0..nanos);
        self.lifetime.saturating_add(Duration::from_nanos(offset))
    }

    /// Check whether a connection of the given age should be closed.
    #[must_use]
    pub fn is_expired(&self, age: Duration) -> bool {
        age >= self.sample()
    }
}

/// Health check result with timing information.
#[derive(Debug, Clone)]
pub struct HealthCheckResult {
    /// Whether the health check passed.
    pub healthy: bool,
    /// Time taken to complete the health check.
    pub latency: Duration,
    /// Error message if unhealthy.
    pub error: Option<String>,
}

impl HealthCheckResult {
    /// Create a successful health check result.
    pub fn healthy(latency: Duration) -> Self {
        Self {
            healthy: true,
            latency,
            error: None,
        }
    }

    /// Create a failed health check result.
    pub fn unhealthy(latency: Duration, error: impl Into<String>) -> Self {
        Self {
            healthy: false,
            latency,
            error: Some(error.into()),
        }
    }

    /// Ping a connection and time it.
    pub async fn ping(conn: &mut PgConnection) -> (Self, Result<(), sqlx::Error>) {
        let started = Instant::now();
        let outcome = conn.ping().await;
        let latency = started.elapsed();
        match &outcome {
            Ok(()) => (Self::healthy(latency), outcome),
            Err(e) => (Self::unhealthy(latency, e.to_string()), outcome),
        }
    }
}

/// Hook state shared by every callback of one pool.
pub(crate) struct LifecycleHooks {
    logger: Option<LoggerBinding>,
    health_check_period: Option<Duration>,
    jitter: Option<LifetimeJitter>,
    close_on_release: bool,
    host: String,
    port: u16,
    database: String,
}

impl LifecycleHooks {
    pub(crate) fn new(config: &PoolConfig, jitter: Option<LifetimeJitter>) -> Self {
        Self {
            logger: config.logger.clone(),
            health_check_period: config.health_check_period,
            jitter,
            close_on_release: config.idle_timeout == Some(Duration::ZERO),
            host: config.host.to_string(),
            port: config.port,
            database: config.database.clone(),
        }
    }

    /// Register the hooks on `pool`.
    pub(crate) fn install(self, pool: PgPoolOptions) -> PgPoolOptions {
        let hooks = Arc::new(self);

        let on_connect = Arc::clone(&hooks);
        let mut pool = pool.after_connect(move |conn, _meta| {
            let hooks = Arc::clone(&on_connect);
            Box::pin(async move { hooks.after_connect(conn).await })
        });

        if hooks.health_check_period.is_some() {
            let on_acquire = Arc::clone(&hooks);
            pool = pool.before_acquire(move |conn, meta| {
                let hooks = Arc::clone(&on_acquire);
                Box::pin(async move { hooks.before_acquire(conn, meta.idle_for).await })
            });
        }

        if hooks.jitter.is_some() || hooks.close_on_release {
            let on_release = Arc::clone(&hooks);
            pool = pool.after_release(move |_conn, meta| {
                let keep = on_release.keep_after_release(meta.age);
                Box::pin(async move { Ok(keep) })
            });
        }

        pool
    }

    fn emit<F>(&self, level: LogLevel, msg: &str, fields: F)
    where
        F: FnOnce() -> Vec<LogField<'static>>,
    {
        if let Some(logger) = &self.logger {
            if logger.enabled(level) {
                logger.log(level, msg, &fields());
            }
        }
    }

    fn target_fields(&self) -> Vec<LogField<'static>> {
        vec![
            ("host", self.host.clone()),
            ("port", self.port.to_string()),
            ("database", self.database.clone()),
        ]
    }

    async fn after_connect(&self, conn: &mut PgConnection) -> Result<(), sqlx::Error> {
        let (check, outcome) = HealthCheckResult::ping(conn).await;
        match &check.error {
            None => self.emit(LogLevel::Info, "connect", || {
                let mut fields = self.target_fields();
                fields.push(("time", format!("{:?}", check.latency)));
                fields
            }),
            Some(err) => {
                tracing::trace!(error = %err, "ping after connect failed");
                self.emit(LogLevel::Error, "ping after connect", || {
                    let mut fields = self.target_fields();
                    fields.push(("err", err.clone()));
                    fields
                });
            }
        }
        outcome
    }

    async fn before_acquire(
        &self,
        conn: &mut PgConnection,
        idle_for: Duration,
    ) -> Result<bool, sqlx::Error> {
        let Some(period) = self.health_check_period else {
            return Ok(true);
        };
        if idle_for < period {
            return Ok(true);
        }

        let (check, _) = HealthCheckResult::ping(conn).await;
        if check.healthy {
            self.emit(LogLevel::Debug, "health check", || {
                vec![
                    ("idle", format!("{idle_for:?}")),
                    ("time", format!("{:?}", check.latency)),
                ]
            });
        } else {
            self.emit(LogLevel::Warn, "health check failed, closing connection", || {
                let mut fields = self.target_fields();
                fields.push(("idle", format!("{idle_for:?}")));
                fields.push(("err", check.error.clone().unwrap_or_default()));
                fields
            });
        }
        Ok(check.healthy)
    }

    fn keep_after_release(&self, age: Duration) -> bool {
        if self.close_on_release {
            self.emit(LogLevel::Debug, "closing idle connection", || {
                vec![("age", format!("{age:?}"))]
            });
            return false;
        }
        let Some(jitter) = self.jitter else {
            return true;
        };
        if !jitter.is_expired(age) {
            return true;
        }
        self.emit(LogLevel::Debug, "closing connection past jittered lifetime", || {
            vec![
                ("age", format!("{age:?}")),
                ("lifetime", format!("{:?}", jitter.lifetime())),
            ]
        });
        false
    }
}
