use std::fmt;
use std::str::FromStr;

use crate::config::DbConfig;
use crate::error::SqlHelpersError;

/// Optional driver features a connector may or may not provide.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// Numeric columns can be returned as numbers instead of strings.
    pub numeric_fetch: bool,
}

/// The database backends a connection can be opened against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverKind {
    MySql,
    SqlSrv,
}

impl DriverKind {
    pub fn all() -> &'static [DriverKind] {
        &[DriverKind::MySql, DriverKind::SqlSrv]
    }

    /// Driver name as it appears in configuration and connection strings.
    pub fn name(&self) -> &'static str {
        match self {
            DriverKind::MySql => "mysql",
            DriverKind::SqlSrv => "sqlsrv",
        }
    }

    /// Resolve a configured driver name. Matching ignores ASCII case.
    pub fn parse(value: &str) -> Result<Self, SqlHelpersError> {
        Self::all()
            .iter()
            .copied()
            .find(|kind| kind.name().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| SqlHelpersError::UnsupportedDriver(value.to_string()))
    }

    pub fn default_server(&self) -> &'static str {
        match self {
            DriverKind::MySql => "127.0.0.1",
            DriverKind::SqlSrv => "localhost",
        }
    }

    /// Build the connection string for this driver.
    ///
    /// - mysql: `mysql:host=<server>;dbname=<database>;charset=<charset>`
    /// - sqlsrv: `sqlsrv:Server=<server>;Database=<database>`, with every
    ///   backslash in the server doubled, since that grammar treats `\` as an
    ///   escape before the instance name.
    pub fn connection_string(&self, config: &DbConfig) -> String {
        let server = config.server_or(self.default_server());
        match self {
            DriverKind::MySql => format!(
                "{}:host={};dbname={};charset={}",
                self.name(),
                server,
                config.database,
                config.charset
            ),
            DriverKind::SqlSrv => format!(
                "{}:Server={};Database={}",
                self.name(),
                server.replace('\\', "\\\\"),
                config.database
            ),
        }
    }

    /// Whether connections of this kind ask for numeric-typed results when
    /// the connector supports it.
    pub fn wants_numeric_fetch(&self, capabilities: Capabilities) -> bool {
        match self {
            DriverKind::MySql => false,
            DriverKind::SqlSrv => capabilities.numeric_fetch,
        }
    }
}

impl fmt::Display for DriverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DriverKind {
    type Err = SqlHelpersError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DriverKind::parse(s)
    }
}
