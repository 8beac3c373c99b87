//! Serializable pool settings.
//!
//! [`PoolSettings`] mirrors the option setters for use in configuration
//! files. Durations are whole seconds. Every field is optional and is
//! turned into the matching [`PoolOption`], so validation is the same as
//! for options built in code.

use std::fmt;

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use crate::options::{self, PoolOption};

/// Pool settings as they appear in a configuration file.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PoolSettings {
    /// Server IP address.
    pub host: Option<String>,
    /// Server port.
    pub port: Option<i32>,
    /// Database name.
    pub database: Option<String>,
    /// User name.
    pub user: Option<String>,
    /// Password.
    pub password: Option<String>,
    /// SSL mode.
    pub ssl_mode: Option<String>,
    /// Maximum pool size.
    pub max_conns: Option<i32>,
    /// Minimum pool size.
    pub min_conns: Option<i32>,
    /// Maximum connection lifetime in seconds.
    pub max_conn_lifetime_secs: Option<i64>,
    /// Maximum connection idle time in seconds.
    pub max_conn_idle_time_secs: Option<i64>,
    /// Health-check period in seconds.
    pub health_check_period_secs: Option<i64>,
    /// Lifetime jitter in seconds.
    pub max_conn_lifetime_jitter_secs: Option<i64>,
}

impl PoolSettings {
    /// Convert the settings into options, in field order.
    #[must_use]
    pub fn into_options(self) -> Vec<PoolOption> {
        let mut out = Vec::new();
        if let Some(host) = self.host {
            out.push(options::with_host(host));
        }
        if let Some(port) = self.port {
            out.push(options::with_port(port));
        }
        if let Some(database) = self.database {
            out.push(options::with_database(database));
        }
        if let Some(user) = self.user {
            out.push(options::with_user(user));
        }
        if let Some(password) = self.password {
            out.push(options::with_password(password));
        }
        if let Some(mode) = self.ssl_mode {
            out.push(options::with_ssl_mode(mode));
        }
        if let Some(conns) = self.max_conns {
            out.push(options::with_max_conns(conns));
        }
        if let Some(conns) = self.min_conns {
            out.push(options::with_min_conns(conns));
        }
        if let Some(secs) = self.max_conn_lifetime_secs {
            out.push(options::with_max_conn_lifetime(seconds(secs)));
        }
        if let Some(secs) = self.max_conn_idle_time_secs {
            out.push(options::with_max_conn_idle_time(seconds(secs)));
        }
        if let Some(secs) = self.health_check_period_secs {
            out.push(options::with_health_check_period(seconds(secs)));
        }
        if let Some(secs) = self.max_conn_lifetime_jitter_secs {
            out.push(options::with_max_conn_lifetime_jitter(seconds(secs)));
        }
        out
    }
}

impl IntoIterator for PoolSettings {
    type Item = PoolOption;
    type IntoIter = std::vec::IntoIter<PoolOption>;

    fn into_iter(self) -> Self::IntoIter {
        self.into_options().into_iter()
    }
}

impl fmt::Debug for PoolSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("ssl_mode", &self.ssl_mode)
            .field("max_conns", &self.max_conns)
            .field("min_conns", &self.min_conns)
            .field("max_conn_lifetime_secs", &self.max_conn_lifetime_secs)
            .field("max_conn_idle_time_secs", &self.max_conn_idle_time_secs)
            .field("health_check_period_secs", &self.health_check_period_secs)
            .field(
                "max_conn_lifetime_jitter_secs",
                &self.max_conn_lifetime_jitter_secs,
            )
            .finish()
    }
}

fn seconds(secs: i64) -> TimeDelta {
    TimeDelta::try_seconds(secs).unwrap_or(if secs < 0 {
        TimeDelta::MIN
    } else {
        TimeDelta::MAX
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::PoolError;
    use crate::options::Options;
    use std::time::Duration;

    #[test]
    fn test_empty_settings_produce_no_options() {
        let settings: PoolSettings = serde_json::from_str("{}").unwrap();
        assert!(settings.into_options().is_empty());
    }

    #[test]
    fn test_settings_from_json() {
        let settings: PoolSettings = serde_json::from_str(
            r#"{
                "host": "10.0.0.9",
                "port": 6432,
                "database": "ledger",
                "password": "pw",
                "max_conns": 16,
                "health_check_period_secs": 30,
                "max_conn_lifetime_jitter_secs": 0
            }"#,
        )
        .unwrap();

        let options = Options::from_options(settings).unwrap();
        assert_eq!(options.host(), Some("10.0.0.9".parse().unwrap()));
        assert_eq!(options.port(), Some(6432));
        assert_eq!(options.database(), Some("ledger"));
        assert_eq!(options.max_conns(), Some(16));
        assert_eq!(options.health_check_period(), Some(Duration::from_secs(30)));
        assert_eq!(options.max_conn_lifetime_jitter(), Some(Duration::ZERO));
    }

    #[test]
    fn test_settings_validation_matches_options() {
        let settings = PoolSettings {
            max_conn_idle_time_secs: Some(-1),
            ..PoolSettings::default()
        };
        let err = Options::from_options(settings).unwrap_err();
        assert!(matches!(err, PoolError::Negative { .. }));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result = serde_json::from_str::<PoolSettings>(r#"{"hostname": "x"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_debug_redacts_password() {
        let settings = PoolSettings {
            password: Some("letmein".into()),
            ..PoolSettings::default()
        };
        assert!(!format!("{settings:?}").contains("letmein"));
    }

    #[test]
    fn test_huge_seconds_saturate() {
        assert_eq!(seconds(i64::MAX), TimeDelta::MAX);
        assert_eq!(seconds(i64::MIN), TimeDelta::MIN);
        assert_eq!(seconds(5), TimeDelta::seconds(5));
    }
}
