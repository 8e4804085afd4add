use std::fmt;

use crate::config::DbConfig;
use crate::error::Result;
use crate::types::{Capabilities, DriverKind};

/// Everything a connector needs to open one connection.
#[derive(Clone, PartialEq)]
pub struct ConnectOptions {
    pub driver: DriverKind,
    /// Connection string, e.g. `mysql:host=127.0.0.1;dbname=app;charset=utf8mb4`.
    pub dsn: String,
    /// Server as configured (unescaped), or the driver default.
    pub server: String,
    pub database: String,
    pub username: String,
    pub password: String,
    pub charset: String,
    /// Return numeric columns as numbers instead of strings.
    pub fetch_numeric_types: bool,
    /// Skip TLS certificate validation (sqlsrv).
    pub trust_certificate: bool,
}

impl ConnectOptions {
    /// Resolve configuration into connection options.
    ///
    /// Fails with `UnsupportedDriver` for an unknown driver name; nothing is
    /// contacted here.
    pub fn resolve(
        config: &DbConfig,
        capabilities: impl Fn(DriverKind) -> Capabilities,
    ) -> Result<Self> {
        let driver = DriverKind::parse(&config.driver)?;
        Ok(Self {
            driver,
            dsn: driver.connection_string(config),
            server: config.server_or(driver.default_server()).to_string(),
            database: config.database.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
            charset: config.charset.clone(),
            fetch_numeric_types: driver.wants_numeric_fetch(capabilities(driver)),
            trust_certificate: config.trust_certificate,
        })
    }
}

impl fmt::Debug for ConnectOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectOptions")
            .field("driver", &self.driver)
            .field("dsn", &self.dsn)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("fetch_numeric_types", &self.fetch_numeric_types)
            .field("trust_certificate", &self.trust_certificate)
            .finish()
    }
}
