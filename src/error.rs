use thiserror::Error;

/// Error reported by a database driver.
/// Carries the driver's own message so callers see the underlying cause.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct DriverError {
    message: String,
}

impl DriverError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<mysql_async::Error> for DriverError {
    fn from(err: mysql_async::Error) -> Self {
        Self::new(err.to_string())
    }
}

impl From<tiberius::error::Error> for DriverError {
    fn from(err: tiberius::error::Error) -> Self {
        Self::new(err.to_string())
    }
}

impl From<std::io::Error> for DriverError {
    fn from(err: std::io::Error) -> Self {
        Self::new(err.to_string())
    }
}

/// Error type for sqlhelpers operations
#[derive(Debug, Error)]
pub enum SqlHelpersError {
    #[error("Unsupported driver: {0}")]
    UnsupportedDriver(String),

    #[error("Connection failed: {0}")]
    Connection(#[source] DriverError),

    #[error("Error on statement: {0}")]
    Statement(#[source] DriverError),

    #[error("Error on {operation}: {source}")]
    Query {
        operation: &'static str,
        #[source]
        source: DriverError,
    },

    #[error("Column not found: {0}")]
    ColumnNotFound(String),
}

/// Result type alias for sqlhelpers operations
pub type Result<T> = std::result::Result<T, SqlHelpersError>;

/// Result type alias for driver-level operations
pub type DriverResult<T> = std::result::Result<T, DriverError>;
