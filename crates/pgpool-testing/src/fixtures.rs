//! Test fixture utilities.

use pgpool::{PoolOption, with_database, with_host, with_password, with_port, with_user};

/// Connection settings for an externally managed PostgreSQL server.
///
/// Read from `PG_HOST`, `PG_PORT`, `PG_USER`, `PG_PASSWORD` and
/// `PG_DATABASE`. Unset variables are left to the pool defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestSettings {
    /// Server IP address.
    pub host: Option<String>,
    /// Server port.
    pub port: Option<i32>,
    /// User name.
    pub user: Option<String>,
    /// Password.
    pub password: Option<String>,
    /// Database name.
    pub database: Option<String>,
}

impl TestSettings {
    /// Read settings from the environment.
    ///
    /// Returns `None` when `PG_HOST` is unset, which callers treat as
    /// "no server available".
    #[must_use]
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let host = lookup("PG_HOST")?;
        Some(Self {
            host: Some(host),
            port: lookup("PG_PORT").and_then(|p| p.parse().ok()),
            user: lookup("PG_USER"),
            password: lookup("PG_PASSWORD"),
            database: lookup("PG_DATABASE"),
        })
    }

    /// Convert the settings into pool options.
    #[must_use]
    pub fn options(&self) -> Vec<PoolOption> {
        let mut out = Vec::new();
        if let Some(host) = &self.host {
            out.push(with_host(host.clone()));
        }
        if let Some(port) = self.port {
            out.push(with_port(port));
        }
        if let Some(user) = &self.user {
            out.push(with_user(user.clone()));
        }
        if let Some(password) = &self.password {
            out.push(with_password(password.clone()));
        }
        if let Some(database) = &self.database {
            out.push(with_database(database.clone()));
        }
        out
    }
}

/// Scratch table fixture for setting up and tearing down test data.
#[derive(Debug, Clone)]
pub struct TestTable {
    /// Table name.
    pub name: String,
    /// Column definitions, e.g. `id int primary key`.
    pub columns: Vec<String>,
}

impl TestTable {
    /// Create a new table fixture.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    /// Add a column definition.
    #[must_use]
    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.columns.push(column.into());
        self
    }

    /// Generate SQL to create the table.
    #[must_use]
    pub fn create_sql(&self) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            self.name,
            self.columns.join(", ")
        )
    }

    /// Generate SQL to drop the table.
    #[must_use]
    pub fn drop_sql(&self) -> String {
        format!("DROP TABLE IF EXISTS {}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_host_means_no_server() {
        assert_eq!(TestSettings::from_lookup(|_| None), None);
    }

    #[test]
    fn test_lookup_builds_options() {
        let settings = TestSettings::from_lookup(|key| match key {
            "PG_HOST" => Some("10.1.2.3".into()),
            "PG_PORT" => Some("6543".into()),
            "PG_USER" => Some("ci".into()),
            _ => None,
        });
        let settings = settings.as_ref();
        assert_eq!(settings.and_then(|s| s.port), Some(6543));
        assert_eq!(settings.map(|s| s.options().len()), Some(3));
    }

    #[test]
    fn test_table_sql() {
        let table = TestTable::new("items")
            .with_column("id int primary key")
            .with_column("name text");
        assert_eq!(
            table.create_sql(),
            "CREATE TABLE IF NOT EXISTS items (id int primary key, name text)"
        );
        assert_eq!(table.drop_sql(), "DROP TABLE IF EXISTS items");
    }
}
