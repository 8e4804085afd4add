use std::sync::Arc;

use async_trait::async_trait;

use crate::error::DriverResult;
use crate::traits::DatabaseDriver;
use crate::types::{Capabilities, ConnectOptions, DriverKind};

/// Opens sessions for a resolved set of connection options.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Optional features this connector supports for the given driver.
    fn capabilities(&self, driver: DriverKind) -> Capabilities;

    /// Open a new session.
    async fn connect(&self, options: &ConnectOptions) -> DriverResult<Arc<dyn DatabaseDriver>>;
}
