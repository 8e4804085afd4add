use std::sync::Arc;

use tokio::sync::Mutex;

use crate::config::DbConfig;
use crate::drivers::NativeConnector;
use crate::error::{Result, SqlHelpersError};
use crate::traits::{Connector, DatabaseDriver};
use crate::types::{ConnectOptions, QueryResult, Row, SqlValue};

/// Main entry point for sqlhelpers.
///
/// Owns at most one open connection. The connection is opened by the first
/// query (or an explicit [`connection`](Self::connection) call) and then
/// reused by every later call. A failed open leaves the manager without a
/// connection, so the next call tries again.
///
/// Share one manager between tasks with an `Arc`.
///
/// # Example
/// ```ignore
/// use sqlhelpers::{params, ConnectionManager, DbConfig};
///
/// let db = ConnectionManager::new(DbConfig::load());
/// db.statement("UPDATE users SET name = ? WHERE id = ?", &params!["Ann", 3]).await?;
/// let user = db.select_one("SELECT * FROM users WHERE id = ?", 3).await?;
/// ```
pub struct ConnectionManager {
    config: DbConfig,
    connector: Arc<dyn Connector>,
    connection: Mutex<Option<Arc<dyn DatabaseDriver>>>,
}

impl ConnectionManager {
    /// Create a manager that opens real MySQL / SQL Server connections.
    pub fn new(config: DbConfig) -> Self {
        Self::with_connector(config, Arc::new(NativeConnector))
    }

    /// Create a manager with a custom connector.
    /// Useful for testing or using alternative database drivers.
    pub fn with_connector(config: DbConfig, connector: Arc<dyn Connector>) -> Self {
        Self {
            config,
            connector,
            connection: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &DbConfig {
        &self.config
    }

    /// Returns the shared connection, opening it on first use.
    ///
    /// The lock is held while opening, so concurrent first callers wait for a
    /// single attempt instead of racing to open their own.
    pub async fn connection(&self) -> Result<Arc<dyn DatabaseDriver>> {
        let mut slot = self.connection.lock().await;
        if let Some(driver) = slot.as_ref() {
            tracing::trace!("reusing open connection");
            return Ok(Arc::clone(driver));
        }

        let options =
            ConnectOptions::resolve(&self.config, |kind| self.connector.capabilities(kind))?;

        tracing::debug!(
            driver = %options.driver,
            dsn = %options.dsn,
            fetch_numeric_types = options.fetch_numeric_types,
            "opening database connection"
        );

        let driver = match self.connector.connect(&options).await {
            Ok(driver) => driver,
            Err(err) => {
                tracing::warn!(
                    driver = %options.driver,
                    error = %err,
                    "database connection failed"
                );
                return Err(SqlHelpersError::Connection(err));
            }
        };

        tracing::info!(
            driver = %options.driver,
            database = %options.database,
            "database connection opened"
        );
        *slot = Some(Arc::clone(&driver));
        Ok(driver)
    }

    /// Returns true once a connection has been opened and not closed.
    pub async fn is_connected(&self) -> bool {
        self.connection.lock().await.is_some()
    }

    /// Close the shared connection, if one is open.
    ///
    /// The manager goes back to having no connection; the next query opens a
    /// fresh one. The slot stays locked until the old session has finished
    /// closing, so a concurrent query cannot open a second connection meanwhile.
    pub async fn close(&self) -> Result<()> {
        let mut slot = self.connection.lock().await;
        if let Some(driver) = slot.take() {
            driver.close().await.map_err(SqlHelpersError::Connection)?;
            tracing::info!("database connection closed");
        }
        Ok(())
    }

    /// Execute a statement that returns no rows (INSERT, UPDATE, DELETE, DDL).
    ///
    /// `params` are bound to the `?` placeholders in order.
    pub async fn statement(&self, sql: &str, params: &[SqlValue]) -> Result<bool> {
        let driver = self.connection().await?;
        tracing::debug!(sql, params = params.len(), "statement");

        driver
            .execute(sql, params)
            .await
            .map_err(SqlHelpersError::Statement)?;
        Ok(true)
    }

    /// Fetch the first row of a query with a single `?` placeholder.
    ///
    /// Returns `None` when nothing matched.
    pub async fn select_one(&self, sql: &str, id: impl Into<SqlValue>) -> Result<Option<Row>> {
        let params = [id.into()];
        let driver = self.connection().await?;
        tracing::debug!(sql, "select one");

        let row = driver
            .fetch_one(sql, &params)
            .await
            .map_err(|source| SqlHelpersError::Query {
                operation: "select one",
                source,
            })?;
        Ok(row.map(Row::from))
    }

    /// Fetch every row of a query, binding `params` to the `?` placeholders in order.
    pub async fn select_all(&self, sql: &str, params: &[SqlValue]) -> Result<QueryResult> {
        let driver = self.connection().await?;
        tracing::debug!(sql, params = params.len(), "select all");

        let raw = driver
            .fetch_all(sql, params)
            .await
            .map_err(|source| SqlHelpersError::Query {
                operation: "select all",
                source,
            })?;
        Ok(QueryResult::from_raw(raw))
    }

    /// Fetch every row of a query that takes no parameters.
    pub async fn query(&self, sql: &str) -> Result<QueryResult> {
        let driver = self.connection().await?;
        tracing::debug!(sql, "select");

        let raw = driver
            .fetch_all(sql, &[])
            .await
            .map_err(|source| SqlHelpersError::Query {
                operation: "select",
                source,
            })?;
        Ok(QueryResult::from_raw(raw))
    }
}
