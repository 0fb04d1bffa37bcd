//! Connection configuration for the store collaborator.

use std::fmt;

/// Connection parameters for a relational store.
///
/// A flat set of required keys - host, port, user, password, database -
/// with no defaults. Built explicitly and passed to whatever opens the
/// connection (see [`StoreScope::open`](crate::store::StoreScope::open));
/// there is no process-wide configuration state.
///
/// The password is held privately and redacted from `Debug` output; read
/// it through [`password`](StoreConfig::password).
///
/// With the `serde` feature enabled the struct (de)serializes under the
/// same five keys, all required.
///
/// # Example
///
/// ```rust
/// use weir::StoreConfig;
///
/// let config = StoreConfig::new("localhost", 5432, "postgres", "hunter2", "postgres");
/// assert_eq!(config.host, "localhost");
/// assert_eq!(config.password(), "hunter2");
/// assert!(!format!("{:?}", config).contains("hunter2"));
/// ```
#[derive(Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StoreConfig {
    /// Host name or address of the store.
    pub host: String,
    /// TCP port the store listens on.
    pub port: u16,
    /// User to authenticate as.
    pub user: String,
    password: String,
    /// Name of the database to open.
    pub database: String,
}

impl StoreConfig {
    /// Build a configuration from its five required parameters.
    pub fn new(
        host: impl Into<String>,
        port: u16,
        user: impl Into<String>,
        password: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        StoreConfig {
            host: host.into(),
            port,
            user: user.into(),
            password: password.into(),
            database: database.into(),
        }
    }

    /// The password to authenticate with.
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .finish()
    }
}
