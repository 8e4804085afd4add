use std::fmt;

/// Environment variables read by [`DbConfig::from_env`].
pub const ENV_DRIVER: &str = "DB_DRIVER";
pub const ENV_DATABASE: &str = "DB_DATABASE";
pub const ENV_USERNAME: &str = "DB_USERNAME";
pub const ENV_PASSWORD: &str = "DB_PASSWORD";
pub const ENV_SERVER: &str = "DB_SERVER";
pub const ENV_CHARSET: &str = "DB_CHARSET";
pub const ENV_TRUST_CERTIFICATE: &str = "DB_TRUST_CERTIFICATE";

pub const DEFAULT_DRIVER: &str = "mysql";
pub const DEFAULT_CHARSET: &str = "utf8mb4";

/// Connection settings.
///
/// `driver` stays a plain string: it is only resolved when a connection is
/// opened, so a bad value is reported by the connection call rather than here.
#[derive(Clone, PartialEq)]
pub struct DbConfig {
    pub driver: String,
    pub database: String,
    pub username: String,
    pub password: String,
    /// `None` (or empty) means the driver's default server.
    pub server: Option<String>,
    /// Only used by mysql.
    pub charset: String,
    /// Accept the server's TLS certificate without validating it. Only used by
    /// sqlsrv; off by default.
    pub trust_certificate: bool,
}

impl DbConfig {
    pub fn new(driver: impl Into<String>) -> Self {
        Self {
            driver: driver.into(),
            ..Self::default()
        }
    }

    /// Read settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Apply a `.env` file from the current directory (if there is one), then
    /// read settings from the process environment.
    pub fn load() -> Self {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env file");
        }
        Self::from_env()
    }

    /// Build settings from an arbitrary key lookup. Missing keys take defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            driver: lookup(ENV_DRIVER).unwrap_or_else(|| DEFAULT_DRIVER.to_string()),
            database: lookup(ENV_DATABASE).unwrap_or_default(),
            username: lookup(ENV_USERNAME).unwrap_or_default(),
            password: lookup(ENV_PASSWORD).unwrap_or_default(),
            server: lookup(ENV_SERVER),
            charset: lookup(ENV_CHARSET).unwrap_or_else(|| DEFAULT_CHARSET.to_string()),
            trust_certificate: lookup(ENV_TRUST_CERTIFICATE)
                .map(|value| parse_flag(&value))
                .unwrap_or(false),
        }
    }

    pub fn with_driver(mut self, driver: impl Into<String>) -> Self {
        self.driver = driver.into();
        self
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    pub fn with_server(mut self, server: impl Into<String>) -> Self {
        self.server = Some(server.into());
        self
    }

    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = charset.into();
        self
    }

    pub fn with_trust_certificate(mut self, trust: bool) -> Self {
        self.trust_certificate = trust;
        self
    }

    /// The configured server, or `default` when none is set.
    pub fn server_or<'a>(&'a self, default: &'a str) -> &'a str {
        match self.server.as_deref() {
            Some(server) if !server.is_empty() => server,
            _ => default,
        }
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            driver: DEFAULT_DRIVER.to_string(),
            database: String::new(),
            username: String::new(),
            password: String::new(),
            server: None,
            charset: DEFAULT_CHARSET.to_string(),
            trust_certificate: false,
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("driver", &self.driver)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("server", &self.server)
            .field("charset", &self.charset)
            .field("trust_certificate", &self.trust_certificate)
            .finish()
    }
}
