mod connect_options;
mod driver_kind;
mod row;
mod sql_value;

pub use connect_options::ConnectOptions;
pub use driver_kind::{Capabilities, DriverKind};
pub use row::{QueryResult, RawQueryResult, RawRow, Row};
pub use sql_value::SqlValue;
