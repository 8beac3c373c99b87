//! Structured logger adapters for the pool's connection lifecycle.
//!
//! Three back ends are supported, each normalised into [`PoolLogger`]:
//!
//! - [`tracing`] via a [`tracing::Dispatch`] ([`TracingLogger`])
//! - the [`log`] facade via any [`log::Log`] implementation, with fields
//!   passed as key/values ([`LogLogger`])
//! - an OpenTelemetry [`Logger`](opentelemetry::logs::Logger), with fields
//!   passed as record attributes ([`OtelLogger`])
//!
//! A [`LoggerBinding`] pairs the adapter with the minimum [`LogLevel`] that
//! should reach it.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::SystemTime;

use opentelemetry::logs::{AnyValue, LogRecord as _, Logger, Severity};

use crate::error::PoolError;

/// Target used for every record emitted by the adapters.
pub const LOG_TARGET: &str = "pgpool";

/// A key/value pair attached to a lifecycle event.
pub type LogField<'a> = (&'a str, String);

/// Severity of a lifecycle event, ordered from least to most verbose.
///
/// A binding configured at `Info` receives `Error`, `Warn` and `Info`
/// events. `None` silences the binding entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    /// Nothing is logged.
    None,
    /// Failures.
    Error,
    /// Recoverable problems, such as a failed health check.
    Warn,
    /// Connection establishment.
    Info,
    /// Health checks and lifetime decisions.
    Debug,
    /// Everything.
    Trace,
}

impl LogLevel {
    /// All level names accepted by [`LogLevel::from_str`].
    pub const NAMES: [&'static str; 6] = ["trace", "debug", "info", "warn", "error", "none"];

    /// Check whether an event at `event` passes a binding set to `self`.
    #[must_use]
    pub fn enables(self, event: LogLevel) -> bool {
        event != LogLevel::None && event <= self
    }

    /// Lower-case name of the level.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::None => "none",
        }
    }

    fn to_severity(self) -> Option<Severity> {
        match self {
            Self::Trace => Some(Severity::Trace),
            Self::Debug => Some(Severity::Debug),
            Self::Info => Some(Severity::Info),
            Self::Warn => Some(Severity::Warn),
            Self::Error => Some(Severity::Error),
            Self::None => None,
        }
    }

    fn to_log(self) -> Option<log::Level> {
        match self {
            Self::Trace => Some(log::Level::Trace),
            Self::Debug => Some(log::Level::Debug),
            Self::Info => Some(log::Level::Info),
            Self::Warn => Some(log::Level::Warn),
            Self::Error => Some(log::Level::Error),
            Self::None => None,
        }
    }
}

impl FromStr for LogLevel {
    type Err = PoolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            "none" => Ok(Self::None),
            other => Err(PoolError::InvalidLogLevel(other.to_string())),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logging interface every back end is adapted to.
pub trait PoolLogger: Send + Sync {
    /// Record one lifecycle event.
    fn log(&self, level: LogLevel, msg: &str, data: &[LogField<'_>]);
}

/// Renders fields as `key=value` pairs separated by spaces.
fn render_fields(data: &[LogField<'_>]) -> String {
    let mut out = String::new();
    for (i, (key, value)) in data.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(key);
        out.push('=');
        out.push_str(value);
    }
    out
}

/// Adapter emitting events through a specific `tracing` dispatcher.
#[derive(Clone)]
pub struct TracingLogger {
    dispatch: tracing::Dispatch,
}

impl TracingLogger {
    /// Wrap a dispatcher.
    #[must_use]
    pub fn new(dispatch: tracing::Dispatch) -> Self {
        Self { dispatch }
    }
}

impl PoolLogger for TracingLogger {
    fn log(&self, level: LogLevel, msg: &str, data: &[LogField<'_>]) {
        let data = render_fields(data);
        tracing::dispatcher::with_default(&self.dispatch, || match level {
            LogLevel::Trace => tracing::trace!(target: LOG_TARGET, data = %data, "{msg}"),
            LogLevel::Debug => tracing::debug!(target: LOG_TARGET, data = %data, "{msg}"),
            LogLevel::Info => tracing::info!(target: LOG_TARGET, data = %data, "{msg}"),
            LogLevel::Warn => tracing::warn!(target: LOG_TARGET, data = %data, "{msg}"),
            LogLevel::Error => tracing::error!(target: LOG_TARGET, data = %data, "{msg}"),
            LogLevel::None => {}
        });
    }
}

/// Adapter handing records to a [`log::Log`] implementation.
#[derive(Clone)]
pub struct LogLogger {
    logger: Arc<dyn log::Log>,
}

impl LogLogger {
    /// Wrap a `log` implementation.
    #[must_use]
    pub fn new(logger: Arc<dyn log::Log>) -> Self {
        Self { logger }
    }
}

impl PoolLogger for LogLogger {
    fn log(&self, level: LogLevel, msg: &str, data: &[LogField<'_>]) {
        let Some(level) = level.to_log() else {
            return;
        };
        let metadata = log::Metadata::builder()
            .level(level)
            .target(LOG_TARGET)
            .build();
        if !self.logger.enabled(&metadata) {
            return;
        }
        let fields = KeyValues(data);
        self.logger.log(
            &log::Record::builder()
                .metadata(metadata)
                .args(format_args!("{msg}"))
                .key_values(&fields)
                .build(),
        );
    }
}

/// Exposes event fields as `log` key/values.
struct KeyValues<'a>(&'a [LogField<'a>]);

impl log::kv::Source for KeyValues<'_> {
    fn visit<'kvs>(
        &'kvs self,
        visitor: &mut dyn log::kv::VisitSource<'kvs>,
    ) -> Result<(), log::kv::Error> {
        for (key, value) in self.0 {
            visitor.visit_pair(
                log::kv::Key::from_str(key),
                log::kv::Value::from(value.as_str()),
            )?;
        }
        Ok(())
    }
}

/// Adapter emitting OpenTelemetry log records.
pub struct OtelLogger<L> {
    logger: L,
}

impl<L> OtelLogger<L>
where
    L: Logger + Send + Sync,
{
    /// Wrap an OpenTelemetry logger.
    pub fn new(logger: L) -> Self {
        Self { logger }
    }
}

impl<L> PoolLogger for OtelLogger<L>
where
    L: Logger + Send + Sync,
{
    fn log(&self, level: LogLevel, msg: &str, data: &[LogField<'_>]) {
        let Some(severity) = level.to_severity() else {
            return;
        };
        let mut record = self.logger.create_log_record();
        record.set_target(LOG_TARGET);
        record.set_timestamp(SystemTime::now());
        record.set_severity_number(severity);
        record.set_severity_text(severity.name());
        record.set_body(AnyValue::from(msg.to_string()));
        for (key, value) in data {
            record.add_attribute(key.to_string(), value.clone());
        }
        self.logger.emit(record);
    }
}

/// An OpenTelemetry logger, type-erased for storage in [`LoggerBackend`].
#[derive(Clone)]
pub struct OtelHandle(Arc<dyn PoolLogger>);

impl OtelHandle {
    /// Wrap an OpenTelemetry logger.
    pub fn new<L>(logger: L) -> Self
    where
        L: Logger + Send + Sync + 'static,
    {
        Self(Arc::new(OtelLogger::new(logger)))
    }
}

/// One of the supported logging back ends, before normalisation.
#[derive(Clone)]
pub enum LoggerBackend {
    /// A `tracing` dispatcher.
    Tracing(tracing::Dispatch),
    /// A `log` facade implementation.
    Log(Arc<dyn log::Log>),
    /// An OpenTelemetry logger.
    OpenTelemetry(OtelHandle),
}

impl LoggerBackend {
    /// Normalise the back end into the common logging interface.
    #[must_use]
    pub fn into_logger(self) -> Arc<dyn PoolLogger> {
        match self {
            Self::Tracing(dispatch) => Arc::new(TracingLogger::new(dispatch)),
            Self::Log(logger) => Arc::new(LogLogger::new(logger)),
            Self::OpenTelemetry(handle) => handle.0,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Tracing(_) => "tracing",
            Self::Log(_) => "log",
            Self::OpenTelemetry(_) => "opentelemetry",
        }
    }
}

impl fmt::Debug for LoggerBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("LoggerBackend").field(&self.kind()).finish()
    }
}

/// A normalised logger together with its minimum severity.
#[derive(Clone)]
pub struct LoggerBinding {
    logger: Arc<dyn PoolLogger>,
    level: LogLevel,
}

impl LoggerBinding {
    /// Bind a back end at the level named by `level`.
    pub fn new(backend: LoggerBackend, level: &str) -> Result<Self, PoolError> {
        let level = level.parse()?;
        Ok(Self::with_level(backend.into_logger(), level))
    }

    /// Bind an already normalised logger.
    #[must_use]
    pub fn with_level(logger: Arc<dyn PoolLogger>, level: LogLevel) -> Self {
        Self { logger, level }
    }

    /// The configured minimum severity.
    #[must_use]
    pub fn level(&self) -> LogLevel {
        self.level
    }

    /// Check whether an event at `level` would be forwarded.
    #[must_use]
    pub fn enabled(&self, level: LogLevel) -> bool {
        self.level.enables(level)
    }

    /// Forward an event if it passes the configured level.
    pub fn log(&self, level: LogLevel, msg: &str, data: &[LogField<'_>]) {
        if self.enabled(level) {
            self.logger.log(level, msg, data);
        }
    }
}

impl fmt::Debug for LoggerBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggerBinding")
            .field("level", &self.level)
            .finish_non_exhaustive()
    }
}
