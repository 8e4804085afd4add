use std::sync::Arc;

use async_trait::async_trait;

use crate::drivers::{MySqlDriver, SqlSrvDriver};
use crate::error::DriverResult;
use crate::traits::{Connector, DatabaseDriver};
use crate::types::{Capabilities, ConnectOptions, DriverKind};

/// Connector backed by the real network drivers.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeConnector;

#[async_trait]
impl Connector for NativeConnector {
    fn capabilities(&self, driver: DriverKind) -> Capabilities {
        match driver {
            DriverKind::MySql => Capabilities::default(),
            // tiberius decodes numeric columns natively
            DriverKind::SqlSrv => Capabilities {
                numeric_fetch: true,
            },
        }
    }

    async fn connect(&self, options: &ConnectOptions) -> DriverResult<Arc<dyn DatabaseDriver>> {
        let driver: Arc<dyn DatabaseDriver> = match options.driver {
            DriverKind::MySql => Arc::new(MySqlDriver::connect(options).await?),
            DriverKind::SqlSrv => Arc::new(SqlSrvDriver::connect(options).await?),
        };
        Ok(driver)
    }
}
