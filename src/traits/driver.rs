use async_trait::async_trait;

use crate::error::DriverResult;
use crate::types::{RawQueryResult, RawRow, SqlValue};

/// Trait for an open database session.
/// Drivers are responsible for:
/// - Preparing SQL with `?` positional placeholders
/// - Converting SqlValue parameters to native types
/// - Converting native rows to RawQueryResult
///
/// A session is used by many callers at once, so implementations must
/// serialize access to the underlying connection.
#[async_trait]
pub trait DatabaseDriver: Send + Sync {
    /// Execute a statement that returns no rows. Returns the affected row count.
    async fn execute(&self, sql: &str, params: &[SqlValue]) -> DriverResult<u64>;

    /// Execute a query and return every row.
    async fn fetch_all(&self, sql: &str, params: &[SqlValue]) -> DriverResult<RawQueryResult>;

    /// Execute a query and return only its first row.
    async fn fetch_one(&self, sql: &str, params: &[SqlValue]) -> DriverResult<Option<RawRow>> {
        Ok(self.fetch_all(sql, params).await?.into_first())
    }

    /// Close the session. Later calls fail.
    async fn close(&self) -> DriverResult<()>;
}
