//! sqlhelpers - one lazily opened database connection and four query helpers
//!
//! Supports MySQL (`mysql_async`) and SQL Server (`tiberius`). Statements use
//! `?` positional placeholders, bound in order from a slice of [`SqlValue`].
//!
//! # Example
//! ```ignore
//! use sqlhelpers::{params, ConnectionManager, DbConfig};
//!
//! // Reads DB_DRIVER, DB_SERVER, DB_DATABASE, ... (and a .env file if present)
//! let db = ConnectionManager::new(DbConfig::load());
//!
//! // The first call opens the connection; later calls reuse it
//! db.statement("UPDATE users SET name = ? WHERE id = ?", &params!["John", 3])
//!     .await?;
//!
//! if let Some(user) = db.select_one("SELECT * FROM users WHERE id = ?", 3).await? {
//!     let name = user.get("name")?;
//! }
//!
//! let admins = db.select_all("SELECT * FROM users WHERE role = ?", &params!["admin"]).await?;
//! let everyone = db.query("SELECT * FROM users").await?;
//! ```

pub mod config;
pub mod drivers;
pub mod error;
pub mod traits;
pub mod types;

mod manager;

// Re-export main types for convenient access
pub use config::DbConfig;
pub use error::{DriverError, Result, SqlHelpersError};
pub use manager::ConnectionManager;
pub use traits::{Connector, DatabaseDriver};
pub use types::{
    Capabilities, ConnectOptions, DriverKind, QueryResult, RawQueryResult, RawRow, Row, SqlValue,
};
