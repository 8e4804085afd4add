use async_trait::async_trait;
use chrono::NaiveDate;
use mysql_async::consts::ColumnType;
use mysql_async::prelude::Queryable;
use mysql_async::{Conn, OptsBuilder, Params, Value};
use tokio::sync::Mutex;

use crate::error::{DriverError, DriverResult};
use crate::traits::DatabaseDriver;
use crate::types::{ConnectOptions, RawQueryResult, RawRow, SqlValue};

/// MySQL driver implementation using mysql_async.
/// Holds a single session; statements run one at a time.
pub struct MySqlDriver {
    conn: Mutex<Option<Conn>>,
}

impl MySqlDriver {
    /// Connect to a MySQL server.
    pub async fn connect(options: &ConnectOptions) -> DriverResult<Self> {
        if !is_valid_charset(&options.charset) {
            return Err(DriverError::new(format!(
                "invalid charset: {}",
                options.charset
            )));
        }

        let opts = OptsBuilder::default()
            .ip_or_hostname(options.server.clone())
            .db_name(non_empty(&options.database))
            .user(non_empty(&options.username))
            .pass(non_empty(&options.password))
            .init(vec![format!("SET NAMES {}", options.charset)]);

        let conn = Conn::new(opts).await?;

        Ok(Self {
            conn: Mutex::new(Some(conn)),
        })
    }
}

#[async_trait]
impl DatabaseDriver for MySqlDriver {
    async fn execute(&self, sql: &str, params: &[SqlValue]) -> DriverResult<u64> {
        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or_else(closed)?;

        conn.exec_drop(sql, to_params(params)).await?;
        Ok(conn.affected_rows())
    }

    async fn fetch_all(&self, sql: &str, params: &[SqlValue]) -> DriverResult<RawQueryResult> {
        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or_else(closed)?;

        let rows: Vec<mysql_async::Row> = conn.exec(sql, to_params(params)).await?;

        // Column names come from the first row; an empty result has none.
        let columns = rows.first().map(column_names).unwrap_or_default();
        let rows = rows.iter().map(row_values).collect();

        Ok(RawQueryResult::new(columns, rows))
    }

    async fn fetch_one(&self, sql: &str, params: &[SqlValue]) -> DriverResult<Option<RawRow>> {
        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or_else(closed)?;

        let row: Option<mysql_async::Row> = conn.exec_first(sql, to_params(params)).await?;

        Ok(row.map(|row| RawRow {
            columns: column_names(&row),
            values: row_values(&row),
        }))
    }

    async fn close(&self) -> DriverResult<()> {
        if let Some(conn) = self.conn.lock().await.take() {
            conn.disconnect().await?;
        }
        Ok(())
    }
}

fn closed() -> DriverError {
    DriverError::new("connection is closed")
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Charset names end up in `SET NAMES`, so only plain identifiers are allowed.
fn is_valid_charset(charset: &str) -> bool {
    !charset.is_empty()
        && charset
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn to_params(params: &[SqlValue]) -> Params {
    if params.is_empty() {
        Params::Empty
    } else {
        Params::Positional(params.iter().map(to_mysql_value).collect())
    }
}

/// Convert a SqlValue to a mysql_async Value.
fn to_mysql_value(value: &SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::NULL,
        SqlValue::Text(s) => Value::Bytes(s.as_bytes().to_vec()),
        SqlValue::Int32(i) => Value::Int(i64::from(*i)),
        SqlValue::Int64(i) => Value::Int(*i),
        SqlValue::Float(f) => Value::Double(*f),
        SqlValue::Bool(b) => Value::Int(i64::from(*b)),
        SqlValue::Bytes(b) => Value::Bytes(b.clone()),
    }
}

/// Convert a mysql_async Value to a SqlValue.
///
/// The column type decides how temporal values are written: DATE columns
/// carry no time part.
fn from_mysql_value(value: &Value, column_type: ColumnType) -> SqlValue {
    match value {
        Value::NULL => SqlValue::Null,
        Value::Bytes(bytes) => match std::str::from_utf8(bytes) {
            Ok(s) => SqlValue::Text(s.to_string()),
            Err(_) => SqlValue::Bytes(bytes.clone()),
        },
        Value::Int(i) => SqlValue::Int64(*i),
        Value::UInt(u) => match i64::try_from(*u) {
            Ok(i) => SqlValue::Int64(i),
            Err(_) => SqlValue::Text(u.to_string()),
        },
        Value::Float(f) => SqlValue::Float(f64::from(*f)),
        Value::Double(d) => SqlValue::Float(*d),
        Value::Date(year, month, day, hour, minute, second, micros) => {
            let date = NaiveDate::from_ymd_opt(i32::from(*year), u32::from(*month), u32::from(*day));
            let text = match column_type {
                ColumnType::MYSQL_TYPE_DATE | ColumnType::MYSQL_TYPE_NEWDATE => date
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_else(|| format!("{:04}-{:02}-{:02}", year, month, day)),
                _ => {
                    let pattern = if *micros > 0 {
                        "%Y-%m-%d %H:%M:%S%.6f"
                    } else {
                        "%Y-%m-%d %H:%M:%S"
                    };
                    date.and_then(|d| {
                        d.and_hms_micro_opt(
                            u32::from(*hour),
                            u32::from(*minute),
                            u32::from(*second),
                            *micros,
                        )
                    })
                    .map(|dt| dt.format(pattern).to_string())
                    // Zero dates ("0000-00-00") have no calendar value.
                    .unwrap_or_else(|| {
                        format!(
                            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
                            year, month, day, hour, minute, second
                        )
                    })
                }
            };
            SqlValue::Text(text)
        }
        Value::Time(negative, days, hours, minutes, seconds, micros) => {
            let total_hours = u64::from(*days) * 24 + u64::from(*hours);
            let mut text = format!(
                "{}{:02}:{:02}:{:02}",
                if *negative { "-" } else { "" },
                total_hours,
                minutes,
                seconds
            );
            if *micros > 0 {
                text.push_str(&format!(".{:06}", micros));
            }
            SqlValue::Text(text)
        }
    }
}

fn column_names(row: &mysql_async::Row) -> Vec<String> {
    row.columns_ref()
        .iter()
        .map(|c| c.name_str().into_owned())
        .collect()
}

fn row_values(row: &mysql_async::Row) -> Vec<SqlValue> {
    row.columns_ref()
        .iter()
        .enumerate()
        .map(|(i, column)| {
            row.as_ref(i)
                .map(|value| from_mysql_value(value, column.column_type()))
                .unwrap_or(SqlValue::Null)
        })
        .collect()
}
