use std::borrow::Cow;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use tiberius::numeric::Numeric;
use tiberius::{AuthMethod, Client, ColumnData, ColumnType, Config, FromSql, SqlBrowser, ToSql};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

use crate::drivers::placeholders;
use crate::error::{DriverError, DriverResult};
use crate::traits::DatabaseDriver;
use crate::types::{ConnectOptions, RawQueryResult, RawRow, SqlValue};

type SqlSrvClient = Client<Compat<TcpStream>>;

/// Where to reach a SQL Server, parsed from `host`, `host,port`,
/// `host\INSTANCE` or `tcp:host,port`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerAddress {
    pub host: String,
    pub port: Option<u16>,
    pub instance: Option<String>,
}

impl ServerAddress {
    pub fn parse(server: &str) -> DriverResult<Self> {
        let server = server.trim();
        let server = server.strip_prefix("tcp:").unwrap_or(server);

        let (rest, port) = match server.rsplit_once(',') {
            Some((rest, port)) => {
                let port = port
                    .trim()
                    .parse::<u16>()
                    .map_err(|_| DriverError::new(format!("invalid port in server: {}", server)))?;
                (rest, Some(port))
            }
            None => (server, None),
        };

        let (host, instance) = match rest.split_once('\\') {
            Some((host, instance)) if !instance.is_empty() => (host, Some(instance.to_string())),
            Some((host, _)) => (host, None),
            None => (rest, None),
        };

        let host = match host.trim() {
            "" | "." | "(local)" => "localhost",
            host => host,
        };

        Ok(Self {
            host: host.to_string(),
            port,
            instance,
        })
    }
}

/// SQL Server driver implementation using tiberius.
/// Holds a single session; statements run one at a time.
pub struct SqlSrvDriver {
    client: Mutex<Option<SqlSrvClient>>,
    numeric_types: bool,
}

impl SqlSrvDriver {
    /// Connect to a SQL Server instance.
    pub async fn connect(options: &ConnectOptions) -> DriverResult<Self> {
        let address = ServerAddress::parse(&options.server)?;

        let mut config = Config::new();
        config.host(&address.host);
        if let Some(port) = address.port {
            config.port(port);
        }
        if let Some(instance) = &address.instance {
            config.instance_name(instance);
        }
        if !options.database.is_empty() {
            config.database(&options.database);
        }
        config.authentication(AuthMethod::sql_server(&options.username, &options.password));
        if options.trust_certificate {
            config.trust_cert();
        }

        // Named instances without a fixed port are resolved through the SQL Browser.
        let tcp = if address.instance.is_some() && address.port.is_none() {
            TcpStream::connect_named(&config).await?
        } else {
            TcpStream::connect(config.get_addr()).await?
        };
        tcp.set_nodelay(true)?;

        let client = Client::connect(config, tcp.compat_write()).await?;

        Ok(Self {
            client: Mutex::new(Some(client)),
            numeric_types: options.fetch_numeric_types,
        })
    }
}

#[async_trait]
impl DatabaseDriver for SqlSrvDriver {
    async fn execute(&self, sql: &str, params: &[SqlValue]) -> DriverResult<u64> {
        let sql = placeholders::number(sql, "@P");
        let params: Vec<&dyn ToSql> = params.iter().map(|p| p as &dyn ToSql).collect();

        let mut guard = self.client.lock().await;
        let client = guard.as_mut().ok_or_else(closed)?;

        let result = client.execute(sql.as_str(), &params).await?;
        Ok(result.total())
    }

    async fn fetch_all(&self, sql: &str, params: &[SqlValue]) -> DriverResult<RawQueryResult> {
        let sql = placeholders::number(sql, "@P");
        let params: Vec<&dyn ToSql> = params.iter().map(|p| p as &dyn ToSql).collect();

        let mut guard = self.client.lock().await;
        let client = guard.as_mut().ok_or_else(closed)?;

        let rows = client
            .query(sql.as_str(), &params)
            .await?
            .into_first_result()
            .await?;

        let columns = rows.first().map(column_names).unwrap_or_default();
        let rows = rows
            .iter()
            .map(|row| row_values(row, self.numeric_types))
            .collect();

        Ok(RawQueryResult::new(columns, rows))
    }

    async fn fetch_one(&self, sql: &str, params: &[SqlValue]) -> DriverResult<Option<RawRow>> {
        let sql = placeholders::number(sql, "@P");
        let params: Vec<&dyn ToSql> = params.iter().map(|p| p as &dyn ToSql).collect();

        let mut guard = self.client.lock().await;
        let client = guard.as_mut().ok_or_else(closed)?;

        let row = client.query(sql.as_str(), &params).await?.into_row().await?;

        Ok(row.map(|row| RawRow {
            columns: column_names(&row),
            values: row_values(&row, self.numeric_types),
        }))
    }

    async fn close(&self) -> DriverResult<()> {
        if let Some(client) = self.client.lock().await.take() {
            client.close().await?;
        }
        Ok(())
    }
}

impl ToSql for SqlValue {
    fn to_sql(&self) -> ColumnData<'_> {
        match self {
            SqlValue::Null => ColumnData::String(None),
            SqlValue::Text(s) => ColumnData::String(Some(Cow::Borrowed(s.as_str()))),
            SqlValue::Int32(i) => ColumnData::I32(Some(*i)),
            SqlValue::Int64(i) => ColumnData::I64(Some(*i)),
            SqlValue::Float(f) => ColumnData::F64(Some(*f)),
            SqlValue::Bool(b) => ColumnData::Bit(Some(*b)),
            SqlValue::Bytes(b) => ColumnData::Binary(Some(Cow::Borrowed(b.as_slice()))),
        }
    }
}

fn closed() -> DriverError {
    DriverError::new("connection is closed")
}

fn column_names(row: &tiberius::Row) -> Vec<String> {
    row.columns().iter().map(|c| c.name().to_string()).collect()
}

fn row_values(row: &tiberius::Row, numeric_types: bool) -> Vec<SqlValue> {
    row.columns()
        .iter()
        .enumerate()
        .map(|(idx, col)| cell_value(row, idx, col.column_type(), numeric_types))
        .collect()
}

fn get<'a, T: FromSql<'a>>(row: &'a tiberius::Row, idx: usize) -> Option<T> {
    row.try_get::<T, _>(idx).ok().flatten()
}

/// Numbers are returned as-is when numeric types were requested, otherwise as
/// their text form.
fn number(value: Option<SqlValue>, numeric_types: bool) -> SqlValue {
    match value {
        None => SqlValue::Null,
        Some(value) if numeric_types => value,
        Some(value) => SqlValue::Text(value.to_string()),
    }
}

fn decimal_value(value: Option<Numeric>) -> SqlValue {
    value
        .map(|n| SqlValue::Text(n.to_string()))
        .unwrap_or(SqlValue::Null)
}

/// Money has four fixed decimals on the server.
fn money_value(value: Option<f64>) -> SqlValue {
    value
        .map(|v| SqlValue::Text(format!("{:.4}", v)))
        .unwrap_or(SqlValue::Null)
}

/// Bits are integers 0/1, typed or as text.
fn bit_value(value: Option<bool>, numeric_types: bool) -> SqlValue {
    number(value.map(|b| SqlValue::Int64(i64::from(b))), numeric_types)
}

/// Extract one cell, keyed on the column's wire type.
fn cell_value(
    row: &tiberius::Row,
    idx: usize,
    col_type: ColumnType,
    numeric_types: bool,
) -> SqlValue {
    match col_type {
        ColumnType::Null => SqlValue::Null,

        // Integer types
        ColumnType::Int1 => {
            let value = get::<u8>(row, idx).map(|v| SqlValue::Int64(i64::from(v)));
            number(value, numeric_types)
        }
        ColumnType::Int2 => {
            let value = get::<i16>(row, idx).map(|v| SqlValue::Int64(i64::from(v)));
            number(value, numeric_types)
        }
        ColumnType::Int4 => {
            let value = get::<i32>(row, idx).map(|v| SqlValue::Int64(i64::from(v)));
            number(value, numeric_types)
        }
        ColumnType::Int8 => number(get::<i64>(row, idx).map(SqlValue::Int64), numeric_types),
        ColumnType::Intn => {
            let value = get::<i64>(row, idx)
                .or_else(|| get::<i32>(row, idx).map(i64::from))
                .or_else(|| get::<i16>(row, idx).map(i64::from))
                .or_else(|| get::<u8>(row, idx).map(i64::from))
                .map(SqlValue::Int64);
            number(value, numeric_types)
        }

        // Float types
        ColumnType::Float4 => {
            let value = get::<f32>(row, idx).map(|v| SqlValue::Float(f64::from(v)));
            number(value, numeric_types)
        }
        ColumnType::Float8 => number(get::<f64>(row, idx).map(SqlValue::Float), numeric_types),
        ColumnType::Floatn => {
            let value = get::<f64>(row, idx)
                .or_else(|| get::<f32>(row, idx).map(f64::from))
                .map(SqlValue::Float);
            number(value, numeric_types)
        }

        // Exact types stay text even when numeric types were requested
        ColumnType::Decimaln | ColumnType::Numericn => decimal_value(get::<Numeric>(row, idx)),
        ColumnType::Money | ColumnType::Money4 => money_value(get::<f64>(row, idx)),

        ColumnType::Bit | ColumnType::Bitn => bit_value(get::<bool>(row, idx), numeric_types),

        // String types
        ColumnType::BigVarChar
        | ColumnType::BigChar
        | ColumnType::NVarchar
        | ColumnType::NChar
        | ColumnType::Text
        | ColumnType::NText => get::<&str>(row, idx)
            .map(|s| SqlValue::Text(s.to_string()))
            .unwrap_or(SqlValue::Null),

        // Date/Time types
        ColumnType::Datetime
        | ColumnType::Datetime2
        | ColumnType::Datetimen
        | ColumnType::Datetime4 => get::<NaiveDateTime>(row, idx)
            .map(|dt| SqlValue::Text(dt.to_string()))
            .unwrap_or(SqlValue::Null),
        ColumnType::DatetimeOffsetn => get::<DateTime<Utc>>(row, idx)
            .map(|dt| SqlValue::Text(dt.to_rfc3339()))
            .unwrap_or(SqlValue::Null),
        ColumnType::Daten => get::<NaiveDate>(row, idx)
            .map(|d| SqlValue::Text(d.to_string()))
            .unwrap_or(SqlValue::Null),
        ColumnType::Timen => get::<NaiveTime>(row, idx)
            .map(|t| SqlValue::Text(t.to_string()))
            .unwrap_or(SqlValue::Null),

        // Binary types
        ColumnType::BigVarBin | ColumnType::BigBinary | ColumnType::Image => {
            get::<&[u8]>(row, idx)
                .map(|b| SqlValue::Bytes(b.to_vec()))
                .unwrap_or(SqlValue::Null)
        }

        ColumnType::Guid => get::<tiberius::Uuid>(row, idx)
            .map(|u| SqlValue::Text(u.to_string()))
            .unwrap_or(SqlValue::Null),

        ColumnType::Xml => get::<&tiberius::xml::XmlData>(row, idx)
            .map(|xml| SqlValue::Text(xml.to_owned().into_string()))
            .unwrap_or(SqlValue::Null),

        _ => get::<&str>(row, idx)
            .map(|s| SqlValue::Text(s.to_string()))
            .unwrap_or(SqlValue::Null),
    }
}
