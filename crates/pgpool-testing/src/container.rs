//! PostgreSQL container support via testcontainers.

use pgpool::{PoolOption, with_database, with_host, with_password, with_port, with_user};
use testcontainers::Image;
use testcontainers::core::{ContainerPort, WaitFor};

/// Port PostgreSQL listens on inside the container.
pub const POSTGRES_PORT: ContainerPort = ContainerPort::Tcp(5432);

const READY_MESSAGE: &str = "database system is ready to accept connections";

/// PostgreSQL container image.
///
/// Uses the official `postgres` image from Docker Hub.
#[derive(Debug, Clone)]
pub struct PostgresContainer {
    /// Superuser name.
    pub user: String,
    /// Superuser password.
    pub password: String,
    /// Database created on first start.
    pub database: String,
    /// Container tag (version).
    pub tag: String,
}

impl Default for PostgresContainer {
    fn default() -> Self {
        Self {
            user: "postgres".to_string(),
            password: "postgres".to_string(),
            database: "postgres".to_string(),
            tag: "16-alpine".to_string(),
        }
    }
}

impl PostgresContainer {
    /// Create a new PostgreSQL container configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the superuser name.
    #[must_use]
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    /// Set the superuser password.
    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    /// Set the database created on first start.
    #[must_use]
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Set the container tag (PostgreSQL version).
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    /// Pool options that reach this container through `host_port` on the
    /// loopback interface.
    #[must_use]
    pub fn options(&self, host_port: u16) -> Vec<PoolOption> {
        tracing::debug!(host_port, tag = %self.tag, "postgres container options");
        vec![
            with_host("127.0.0.1"),
            with_port(i32::from(host_port)),
            with_user(self.user.clone()),
            with_password(self.password.clone()),
            with_database(self.database.clone()),
        ]
    }
}

impl Image for PostgresContainer {
    fn name(&self) -> &str {
        "postgres"
    }

    fn tag(&self) -> &str {
        &self.tag
    }

    fn ready_conditions(&self) -> Vec<WaitFor> {
        // Reported by both the init-time server and the final server.
        vec![
            WaitFor::message_on_stderr(READY_MESSAGE),
            WaitFor::message_on_stdout(READY_MESSAGE),
        ]
    }

    fn env_vars(
        &self,
    ) -> impl IntoIterator<
        Item = (
            impl Into<std::borrow::Cow<'_, str>>,
            impl Into<std::borrow::Cow<'_, str>>,
        ),
    > {
        vec![
            ("POSTGRES_USER", self.user.as_str()),
            ("POSTGRES_PASSWORD", self.password.as_str()),
            ("POSTGRES_DB", self.database.as_str()),
        ]
    }

    fn expose_ports(&self) -> &[ContainerPort] {
        &[POSTGRES_PORT]
    }
}
