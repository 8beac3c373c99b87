//! Functional options and the record they accumulate into.
//!
//! Every setter returns a [`PoolOption`] carrying the raw input. Validation
//! happens when the option is applied, one option at a time and in the
//! order supplied, so the first invalid option stops the build before any
//! connection is attempted. Later options overwrite earlier ones for the
//! same field.
//!
//! ```rust
//! use chrono::TimeDelta;
//! use pgpool::options::{Options, with_health_check_period, with_host, with_port};
//!
//! let options = Options::from_options([
//!     with_host("10.0.0.7"),
//!     with_port(6432),
//!     with_health_check_period(TimeDelta::seconds(30)),
//! ])
//! .unwrap();
//!
//! assert_eq!(options.port(), Some(6432));
//! ```

use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

use chrono::TimeDelta;

use crate::error::{PoolError, Result};
use crate::logger::{LoggerBackend, LoggerBinding, OtelHandle};

/// Default server address.
pub const DEFAULT_HOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

/// Default server port.
pub const DEFAULT_PORT: u16 = 5432;

/// Default database name.
pub const DEFAULT_DATABASE: &str = "postgres";

/// Default user name.
pub const DEFAULT_USER: &str = "postgres";

/// SSL mode used when none is given.
pub const DISABLE_SSL_MODE: &str = "disable";

/// Settings accumulated from options.
///
/// Every field starts unset. A field can be overwritten by a later option
/// but never cleared.
#[derive(Clone, Default)]
pub struct Options {
    pub(crate) host: Option<IpAddr>,
    pub(crate) port: Option<u32>,
    pub(crate) database: Option<String>,
    pub(crate) user: Option<String>,
    pub(crate) password: Option<String>,
    pub(crate) ssl_mode: Option<String>,
    pub(crate) max_conns: Option<u32>,
    pub(crate) min_conns: Option<u32>,
    pub(crate) max_conn_lifetime: Option<Duration>,
    pub(crate) max_conn_idle_time: Option<Duration>,
    pub(crate) health_check_period: Option<Duration>,
    pub(crate) max_conn_lifetime_jitter: Option<Duration>,
    pub(crate) logger: Option<LoggerBinding>,
}

impl Options {
    /// Create an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply options in order onto an empty record.
    ///
    /// Stops at the first option that fails validation and returns its
    /// error unchanged.
    pub fn from_options<I>(options: I) -> Result<Self>
    where
        I: IntoIterator<Item = PoolOption>,
    {
        let mut record = Self::new();
        for option in options {
            tracing::trace!(option = option.name(), "applying pool option");
            option.apply(&mut record)?;
        }
        Ok(record)
    }

    /// Server address, if set.
    #[must_use]
    pub fn host(&self) -> Option<IpAddr> {
        self.host
    }

    /// Server port, if set.
    #[must_use]
    pub fn port(&self) -> Option<u32> {
        self.port
    }

    /// Database name, if set.
    #[must_use]
    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    /// User name, if set.
    #[must_use]
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    /// Whether a password was supplied.
    #[must_use]
    pub fn has_password(&self) -> bool {
        self.password.is_some()
    }

    /// SSL mode, if set.
    #[must_use]
    pub fn ssl_mode(&self) -> Option<&str> {
        self.ssl_mode.as_deref()
    }

    /// Maximum pool size, if set.
    #[must_use]
    pub fn max_conns(&self) -> Option<u32> {
        self.max_conns
    }

    /// Minimum pool size, if set.
    #[must_use]
    pub fn min_conns(&self) -> Option<u32> {
        self.min_conns
    }

    /// Maximum connection lifetime, if set.
    #[must_use]
    pub fn max_conn_lifetime(&self) -> Option<Duration> {
        self.max_conn_lifetime
    }

    /// Maximum connection idle time, if set.
    #[must_use]
    pub fn max_conn_idle_time(&self) -> Option<Duration> {
        self.max_conn_idle_time
    }

    /// Health-check period, if set.
    #[must_use]
    pub fn health_check_period(&self) -> Option<Duration> {
        self.health_check_period
    }

    /// Lifetime jitter, if set.
    #[must_use]
    pub fn max_conn_lifetime_jitter(&self) -> Option<Duration> {
        self.max_conn_lifetime_jitter
    }

    /// Logger binding, if one was configured.
    #[must_use]
    pub fn logger(&self) -> Option<&LoggerBinding> {
        self.logger.as_ref()
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("ssl_mode", &self.ssl_mode)
            .field("max_conns", &self.max_conns)
            .field("min_conns", &self.min_conns)
            .field("max_conn_lifetime", &self.max_conn_lifetime)
            .field("max_conn_idle_time", &self.max_conn_idle_time)
            .field("health_check_period", &self.health_check_period)
            .field("max_conn_lifetime_jitter", &self.max_conn_lifetime_jitter)
            .field("logger", &self.logger)
            .finish()
    }
}

/// A single setting, validated when applied to an [`Options`] record.
///
/// Build values with the `with_*` functions in this module.
#[derive(Clone)]
#[non_exhaustive]
pub enum PoolOption {
    /// Server IP address; empty selects [`DEFAULT_HOST`].
    Host(String),
    /// Server port; zero selects [`DEFAULT_PORT`].
    Port(i32),
    /// Database name; empty selects [`DEFAULT_DATABASE`].
    Database(String),
    /// User name; empty selects [`DEFAULT_USER`].
    User(String),
    /// Password, taken as is.
    Password(String),
    /// SSL mode; empty selects [`DISABLE_SSL_MODE`].
    SslMode(String),
    /// Maximum pool size.
    MaxConns(i32),
    /// Minimum pool size.
    MinConns(i32),
    /// Maximum connection lifetime.
    MaxConnLifetime(TimeDelta),
    /// Maximum connection idle time.
    MaxConnIdleTime(TimeDelta),
    /// Period between health checks of idle connections.
    HealthCheckPeriod(TimeDelta),
    /// Random extension of the maximum lifetime.
    MaxConnLifetimeJitter(TimeDelta),
    /// Logger back end and minimum level name.
    Logger {
        /// Back end; `None` leaves logging unconfigured.
        backend: Option<LoggerBackend>,
        /// Minimum level name, parsed on apply.
        level: String,
    },
}

impl PoolOption {
    /// Validate this option and write it into `options`.
    pub fn apply(self, options: &mut Options) -> Result<()> {
        match self {
            Self::Host(host) => {
                let ip = if host.is_empty() {
                    DEFAULT_HOST
                } else {
                    match host.parse::<IpAddr>() {
                        Ok(ip) => ip,
                        Err(source) => return Err(PoolError::InvalidHost { host, source }),
                    }
                };
                options.host = Some(ip);
            }
            Self::Port(port) => {
                let port = match port {
                    0 => u32::from(DEFAULT_PORT),
                    p => non_negative(p, "port")?,
                };
                options.port = Some(port);
            }
            Self::Database(database) => {
                options.database = Some(or_default(database, DEFAULT_DATABASE));
            }
            Self::User(user) => {
                options.user = Some(or_default(user, DEFAULT_USER));
            }
            Self::Password(password) => {
                options.password = Some(password);
            }
            Self::SslMode(mode) => {
                options.ssl_mode = Some(or_default(mode, DISABLE_SSL_MODE));
            }
            Self::MaxConns(conns) => {
                options.max_conns = Some(non_negative(conns, "max connections")?);
            }
            Self::MinConns(conns) => {
                options.min_conns = Some(non_negative(conns, "min connections")?);
            }
            Self::MaxConnLifetime(lifetime) => {
                options.max_conn_lifetime =
                    Some(non_negative_duration(lifetime, "max connection life time")?);
            }
            Self::MaxConnIdleTime(idle) => {
                options.max_conn_idle_time =
                    Some(non_negative_duration(idle, "max connection idle time")?);
            }
            Self::HealthCheckPeriod(period) => {
                let period = period
                    .to_std()
                    .ok()
                    .filter(|period| !period.is_zero())
                    .ok_or(PoolError::NonPositive {
                        setting: "health check period",
                    })?;
                options.health_check_period = Some(period);
            }
            Self::MaxConnLifetimeJitter(jitter) => {
                options.max_conn_lifetime_jitter = Some(non_negative_duration(
                    jitter,
                    "max connection life time jitter",
                )?);
            }
            Self::Logger { backend, level } => {
                if let Some(backend) = backend {
                    options.logger = Some(LoggerBinding::new(backend, &level)?);
                }
            }
        }
        Ok(())
    }

    /// Name of the setting this option targets.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Host(_) => "host",
            Self::Port(_) => "port",
            Self::Database(_) => "database",
            Self::User(_) => "user",
            Self::Password(_) => "password",
            Self::SslMode(_) => "sslmode",
            Self::MaxConns(_) => "max_conns",
            Self::MinConns(_) => "min_conns",
            Self::MaxConnLifetime(_) => "max_conn_lifetime",
            Self::MaxConnIdleTime(_) => "max_conn_idle_time",
            Self::HealthCheckPeriod(_) => "health_check_period",
            Self::MaxConnLifetimeJitter(_) => "max_conn_lifetime_jitter",
            Self::Logger { .. } => "logger",
        }
    }
}

impl fmt::Debug for PoolOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Password(_) => f.write_str("Password(<redacted>)"),
            Self::Host(v) | Self::Database(v) | Self::User(v) | Self::SslMode(v) => {
                write!(f, "{}({v:?})", self.name())
            }
            Self::Port(v) | Self::MaxConns(v) | Self::MinConns(v) => {
                write!(f, "{}({v})", self.name())
            }
            Self::MaxConnLifetime(v)
            | Self::MaxConnIdleTime(v)
            | Self::HealthCheckPeriod(v)
            | Self::MaxConnLifetimeJitter(v) => write!(f, "{}({v})", self.name()),
            Self::Logger { backend, level } => f
                .debug_struct("Logger")
                .field("backend", backend)
                .field("level", level)
                .finish(),
        }
    }
}

fn or_default(value: String, default: &str) -> String {
    if value.is_empty() {
        default.to_string()
    } else {
        value
    }
}

fn non_negative(value: i32, setting: &'static str) -> Result<u32> {
    u32::try_from(value).map_err(|_| PoolError::Negative { setting })
}

fn non_negative_duration(value: TimeDelta, setting: &'static str) -> Result<Duration> {
    value.to_std().map_err(|_| PoolError::Negative { setting })
}

/// Server IP address. Default `127.0.0.1`.
pub fn with_host(host: impl Into<String>) -> PoolOption {
    PoolOption::Host(host.into())
}

/// Server port. Default `5432`.
pub fn with_port(port: i32) -> PoolOption {
    PoolOption::Port(port)
}

/// Database name. Default `postgres`.
pub fn with_database(database: impl Into<String>) -> PoolOption {
    PoolOption::Database(database.into())
}

/// User name. Default `postgres`.
pub fn with_user(user: impl Into<String>) -> PoolOption {
    PoolOption::User(user.into())
}

/// Password. Default empty.
pub fn with_password(password: impl Into<String>) -> PoolOption {
    PoolOption::Password(password.into())
}

/// SSL mode (`disable`, `allow`, `prefer`, `require`, `verify-ca`,
/// `verify-full`). Default `disable`.
pub fn with_ssl_mode(mode: impl Into<String>) -> PoolOption {
    PoolOption::SslMode(mode.into())
}

/// Maximum size of the pool. Zero leaves the driver default in place.
pub fn with_max_conns(conns: i32) -> PoolOption {
    PoolOption::MaxConns(conns)
}

/// Minimum size of the pool. Zero leaves the driver default in place.
///
/// After connections close the pool may dip below this size until new
/// connections are opened.
pub fn with_min_conns(conns: i32) -> PoolOption {
    PoolOption::MinConns(conns)
}

/// Duration since creation after which a connection is closed. Zero leaves
/// the driver default in place.
pub fn with_max_conn_lifetime(lifetime: TimeDelta) -> PoolOption {
    PoolOption::MaxConnLifetime(lifetime)
}

/// Duration after which an idle connection is closed.
pub fn with_max_conn_idle_time(idle: TimeDelta) -> PoolOption {
    PoolOption::MaxConnIdleTime(idle)
}

/// Duration between checks of the health of idle connections. Must be
/// positive.
pub fn with_health_check_period(period: TimeDelta) -> PoolOption {
    PoolOption::HealthCheckPeriod(period)
}

/// Duration past the maximum lifetime within which a connection is closed
/// at random, so connections opened together do not all expire together.
pub fn with_max_conn_lifetime_jitter(jitter: TimeDelta) -> PoolOption {
    PoolOption::MaxConnLifetimeJitter(jitter)
}

/// Log connection lifecycle events through a `tracing` dispatcher.
///
/// `None` is a no-op. `level` is one of `trace`, `debug`, `info`, `warn`,
/// `error` or `none`.
pub fn with_tracing_logger(
    dispatch: Option<tracing::Dispatch>,
    level: impl Into<String>,
) -> PoolOption {
    PoolOption::Logger {
        backend: dispatch.map(LoggerBackend::Tracing),
        level: level.into(),
    }
}

/// Log connection lifecycle events through a [`log::Log`] implementation.
///
/// `None` is a no-op.
pub fn with_log_logger(
    logger: Option<Arc<dyn log::Log>>,
    level: impl Into<String>,
) -> PoolOption {
    PoolOption::Logger {
        backend: logger.map(LoggerBackend::Log),
        level: level.into(),
    }
}

/// Log connection lifecycle events through an OpenTelemetry [`Logger`].
///
/// Each event becomes one log record with the event fields as attributes.
/// `None` is a no-op.
///
/// [`Logger`]: opentelemetry::logs::Logger
pub fn with_otel_logger<L>(logger: Option<L>, level: impl Into<String>) -> PoolOption
where
    L: opentelemetry::logs::Logger + Send + Sync + 'static,
{
    PoolOption::Logger {
        backend: logger.map(|l| LoggerBackend::OpenTelemetry(OtelHandle::new(l))),
        level: level.into(),
    }
}
