//! Pool error types.

use thiserror::Error;

/// Errors that can occur while configuring or constructing a pool.
///
/// Validation errors are raised while options are applied, before any
/// network activity. Descriptor errors are raised while the connection
/// descriptor is parsed. Construction errors come from the underlying
/// pool and are passed through untouched.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PoolError {
    /// The host is neither empty nor a valid IP address literal.
    #[error("invalid host {host:?}: {source}")]
    InvalidHost {
        /// Host as supplied by the caller.
        host: String,
        /// Underlying parse failure.
        #[source]
        source: std::net::AddrParseError,
    },

    /// A setting that must not be negative was negative.
    #[error("{setting} cannot be less than zero")]
    Negative {
        /// Name of the rejected setting.
        setting: &'static str,
    },

    /// A setting that must be strictly positive was zero or negative.
    #[error("{setting} cannot be less than or equal to zero")]
    NonPositive {
        /// Name of the rejected setting.
        setting: &'static str,
    },

    /// The logger severity name is not recognised.
    #[error("invalid log level: {0:?}")]
    InvalidLogLevel(String),

    /// The connection descriptor could not be assembled as a URL.
    #[error("invalid connection descriptor: {0}")]
    InvalidDescriptor(#[from] url::ParseError),

    /// The connection descriptor was rejected by the driver.
    #[error("failed to parse connection descriptor: {0}")]
    ParseConfig(#[source] sqlx::Error),

    /// The underlying pool could not be constructed.
    #[error("failed to create pool: {0}")]
    Construction(#[source] sqlx::Error),

    /// Construction was cancelled by the caller.
    #[error("pool construction cancelled")]
    Cancelled,
}

impl PoolError {
    /// Check if this error was raised while applying an option.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidHost { .. }
                | Self::Negative { .. }
                | Self::NonPositive { .. }
                | Self::InvalidLogLevel(_)
        )
    }

    /// Check if this error came from building or parsing the descriptor.
    #[must_use]
    pub fn is_descriptor(&self) -> bool {
        matches!(self, Self::InvalidDescriptor(_) | Self::ParseConfig(_))
    }

    /// Get the underlying driver error, if any.
    #[must_use]
    pub fn driver_error(&self) -> Option<&sqlx::Error> {
        match self {
            Self::ParseConfig(e) | Self::Construction(e) => Some(e),
            _ => None,
        }
    }
}

/// Result type for pool operations.
pub type Result<T> = std::result::Result<T, PoolError>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_message() {
        let err = PoolError::Negative { setting: "port" };
        assert_eq!(err.to_string(), "port cannot be less than zero");
        assert!(err.is_validation());
        assert!(!err.is_descriptor());
    }

    #[test]
    fn test_invalid_host_keeps_source() {
        let source = "not-an-ip".parse::<std::net::IpAddr>().unwrap_err();
        let err = PoolError::InvalidHost {
            host: "not-an-ip".into(),
            source,
        };
        assert!(err.to_string().contains("not-an-ip"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_construction_exposes_driver_error() {
        let err = PoolError::Construction(sqlx::Error::PoolTimedOut);
        assert!(matches!(err.driver_error(), Some(sqlx::Error::PoolTimedOut)));
        assert!(!err.is_validation());
        assert!(PoolError::Cancelled.driver_error().is_none());
    }
}
