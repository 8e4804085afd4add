mod mysql;
mod native;
mod placeholders;
mod sqlsrv;

pub use self::in_memory_test::{
    InMemoryTestConnector, InMemoryTestDriver, InMemoryTestResponseBuilder, QueryKind,
    RecordedQuery,
};
pub use self::mysql::MySqlDriver;
pub use self::native::NativeConnector;
pub use self::sqlsrv::{ServerAddress, SqlSrvDriver};
