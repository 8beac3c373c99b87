//! Pool configuration.
//!
//! [`PoolConfig::from_options`] turns an [`Options`] record into the
//! structured configuration handed to the driver: defaults are resolved, a
//! connection descriptor is assembled and parsed, and the pool-level
//! settings are overlaid.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;
use std::time::Duration;

use log::LevelFilter;
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use sqlx::ConnectOptions;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode};
use url::Url;

use crate::error::{PoolError, Result};
use crate::lifecycle::{LifecycleHooks, LifetimeJitter};
use crate::logger::{LogLevel, LoggerBinding};
use crate::options::{
    DEFAULT_DATABASE, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_USER, DISABLE_SSL_MODE, Options,
};

/// URL scheme of the connection descriptor.
pub const SCHEME: &str = "postgres";

/// Maximum lifetime the driver applies when none is configured.
///
/// Used as the base for lifetime jitter when no explicit lifetime is set.
pub const DRIVER_DEFAULT_MAX_LIFETIME: Duration = Duration::from_secs(30 * 60);

/// Execution time above which a statement is reported as slow.
pub const SLOW_STATEMENT_THRESHOLD: Duration = Duration::from_secs(1);

/// Percent-encode one URL component so the driver decodes it back verbatim.
fn encode(part: &str) -> String {
    utf8_percent_encode(part, NON_ALPHANUMERIC).to_string()
}

/// A canonical `postgres://` URL describing how to reach the server.
///
/// The `Display` form hides the password.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    url: Url,
}

impl ConnectionDescriptor {
    /// Assemble a descriptor from resolved parts.
    ///
    /// User, password and database are percent-encoded, so `%` and other
    /// reserved characters reach the server unchanged. The query string
    /// carries `sslmode` only when `ssl_mode` is given.
    pub fn new(
        host: IpAddr,
        port: u32,
        database: &str,
        user: &str,
        password: &str,
        ssl_mode: Option<&str>,
    ) -> Result<Self> {
        let host = match host {
            IpAddr::V4(v4) => v4.to_string(),
            IpAddr::V6(v6) => format!("[{v6}]"),
        };
        let mut url = Url::parse(&format!("{SCHEME}://{host}:{port}"))?;
        url.set_path(&encode(database));
        url.set_username(&encode(user))
            .map_err(|()| PoolError::InvalidDescriptor(url::ParseError::EmptyHost))?;
        if !password.is_empty() {
            url.set_password(Some(&encode(password)))
                .map_err(|()| PoolError::InvalidDescriptor(url::ParseError::EmptyHost))?;
        }
        if let Some(mode) = ssl_mode {
            url.query_pairs_mut().append_pair("sslmode", mode);
        }
        Ok(Self { url })
    }

    /// The full URL, including the password.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    /// Parse the descriptor into driver connect options.
    pub fn parse(&self) -> Result<PgConnectOptions> {
        PgConnectOptions::from_str(self.as_str()).map_err(PoolError::ParseConfig)
    }
}

impl fmt::Display for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut redacted = self.url.clone();
        if redacted.password().is_some_and(|p| !p.is_empty()) {
            // Only fails for URLs without a host, which a descriptor never is.
            let _ = redacted.set_password(Some("xxxxx"));
        }
        f.write_str(redacted.as_str())
    }
}

impl fmt::Debug for ConnectionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ConnectionDescriptor")
            .field(&self.to_string())
            .finish()
    }
}

/// Driver statement logging derived from the logger binding.
///
/// Statements are reported at info and slow statements at warn, each only
/// when the binding's level lets that severity through. Without a binding
/// statement logging is off. The driver emits these events itself under the
/// `sqlx::query` target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatementLogging {
    /// Level for every executed statement.
    pub statements: LevelFilter,
    /// Level for statements slower than [`slow_threshold`](Self::slow_threshold).
    pub slow_statements: LevelFilter,
    /// Slow statement threshold.
    pub slow_threshold: Duration,
}

impl StatementLogging {
    /// Derive statement logging from an optional binding.
    #[must_use]
    pub fn for_binding(binding: Option<&LoggerBinding>) -> Self {
        let filter = |event: LogLevel, level: LevelFilter| match binding {
            Some(binding) if binding.enabled(event) => level,
            _ => LevelFilter::Off,
        };
        Self {
            statements: filter(LogLevel::Info, LevelFilter::Info),
            slow_statements: filter(LogLevel::Warn, LevelFilter::Warn),
            slow_threshold: SLOW_STATEMENT_THRESHOLD,
        }
    }

    fn apply(self, options: PgConnectOptions) -> PgConnectOptions {
        options
            .log_statements(self.statements)
            .log_slow_statements(self.slow_statements, self.slow_threshold)
    }
}

/// Structured configuration for one pool.
///
/// Pool-level settings are `None` when the driver's own default applies.
/// This struct is marked `#[non_exhaustive]`; build it with
/// [`PoolConfig::from_options`].
#[derive(Clone)]
#[non_exhaustive]
pub struct PoolConfig {
    /// Descriptor the connect options were parsed from.
    pub descriptor: ConnectionDescriptor,

    /// Driver connect options.
    pub connect_options: PgConnectOptions,

    /// Resolved server address.
    pub host: IpAddr,

    /// Resolved server port.
    pub port: u16,

    /// Resolved database name.
    pub database: String,

    /// Resolved user name.
    pub user: String,

    /// Resolved SSL mode name.
    pub ssl_mode: String,

    /// Maximum number of connections.
    pub max_connections: Option<u32>,

    /// Minimum number of connections.
    pub min_connections: Option<u32>,

    /// Maximum lifetime of a connection.
    pub max_lifetime: Option<Duration>,

    /// Time a connection can be idle before being closed.
    pub idle_timeout: Option<Duration>,

    /// Idle time after which a connection is pinged before checkout.
    pub health_check_period: Option<Duration>,

    /// Random extension of the maximum lifetime.
    pub max_lifetime_jitter: Option<Duration>,

    /// Lifecycle logger.
    pub logger: Option<LoggerBinding>,

    /// Driver statement logging applied to [`connect_options`](Self::connect_options).
    pub statement_logging: StatementLogging,
}

impl PoolConfig {
    /// Resolve defaults, build and parse the descriptor, and overlay the
    /// pool-level settings.
    ///
    /// Pool sizes and the maximum lifetime are only overlaid when non-zero;
    /// idle time, health-check period and jitter are taken as given.
    pub fn from_options(options: Options) -> Result<Self> {
        let host = options.host.unwrap_or(DEFAULT_HOST);
        let port = options.port.unwrap_or(u32::from(DEFAULT_PORT));
        let database = options
            .database
            .unwrap_or_else(|| DEFAULT_DATABASE.to_string());
        let user = options.user.unwrap_or_else(|| DEFAULT_USER.to_string());
        let password = options.password.unwrap_or_default();

        let descriptor = ConnectionDescriptor::new(
            host,
            port,
            &database,
            &user,
            &password,
            options.ssl_mode.as_deref(),
        )?;
        let mut connect_options = descriptor.parse()?;

        // Keep environment and driver defaults out of the resolved SSL mode.
        let ssl_mode = match options.ssl_mode {
            Some(mode) => mode,
            None => {
                connect_options = connect_options.ssl_mode(PgSslMode::Disable);
                DISABLE_SSL_MODE.to_string()
            }
        };

        let statement_logging = StatementLogging::for_binding(options.logger.as_ref());
        connect_options = statement_logging.apply(connect_options);

        tracing::debug!(descriptor = %descriptor, "parsed connection descriptor");

        Ok(Self {
            port: connect_options.get_port(),
            descriptor,
            connect_options,
            host,
            database,
            user,
            ssl_mode,
            max_connections: options.max_conns.filter(|&n| n != 0),
            min_connections: options.min_conns.filter(|&n| n != 0),
            max_lifetime: options.max_conn_lifetime.filter(|d| !d.is_zero()),
            idle_timeout: options.max_conn_idle_time,
            health_check_period: options.health_check_period,
            max_lifetime_jitter: options.max_conn_lifetime_jitter,
            logger: options.logger,
            statement_logging,
        })
    }

    /// Build driver pool options with the overlay and lifecycle hooks
    /// applied.
    ///
    /// A zero idle time is enforced by closing connections on release; the
    /// driver's idle reaper is left disabled so it never runs on a zero
    /// interval. With a health-check period the driver's own ping before
    /// every checkout is replaced by the periodic check.
    #[must_use]
    pub fn pool_options(&self) -> PgPoolOptions {
        let mut pool = PgPoolOptions::new();
        if let Some(max) = self.max_connections {
            pool = pool.max_connections(max);
        }
        if let Some(min) = self.min_connections {
            pool = pool.min_connections(min);
        }

        let jitter = self.lifetime_jitter();
        match (&jitter, self.max_lifetime) {
            (Some(jitter), _) => pool = pool.max_lifetime(jitter.upper_bound()),
            (None, Some(lifetime)) => pool = pool.max_lifetime(lifetime),
            (None, None) => {}
        }
        match self.idle_timeout {
            Some(idle) if idle.is_zero() => pool = pool.idle_timeout(None),
            Some(idle) => pool = pool.idle_timeout(idle),
            None => {}
        }
        if self.health_check_period.is_some() {
            pool = pool.test_before_acquire(false);
        }

        LifecycleHooks::new(self, jitter).install(pool)
    }

    fn lifetime_jitter(&self) -> Option<LifetimeJitter> {
        let jitter = self.max_lifetime_jitter.filter(|d| !d.is_zero())?;
        let lifetime = self.max_lifetime.unwrap_or(DRIVER_DEFAULT_MAX_LIFETIME);
        Some(LifetimeJitter::new(lifetime, jitter))
    }
}

impl fmt::Debug for PoolConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolConfig")
            .field("descriptor", &self.descriptor)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("ssl_mode", &self.ssl_mode)
            .field("max_connections", &self.max_connections)
            .field("min_connections", &self.min_connections)
            .field("max_lifetime", &self.max_lifetime)
            .field("idle_timeout", &self.idle_timeout)
            .field("health_check_period", &self.health_check_period)
            .field("max_lifetime_jitter", &self.max_lifetime_jitter)
            .field("logger", &self.logger)
            .field("statement_logging", &self.statement_logging)
            .finish()
    }
}
