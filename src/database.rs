use async_trait::async_trait;
use serde_json::{Map, Number, Value};
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlRow};
use sqlx::{Column, Connection, Executor, Row, TypeInfo, ValueRef};
use tracing::{debug, info, warn};

use crate::error::DatabaseError;

/// One result row: column name to scalar, in select-list order.
pub type ResultRow = Map<String, Value>;

/// Builds the row that stands in for a result set when a statement fails.
pub fn error_row(message: impl Into<String>) -> ResultRow {
    let mut row = ResultRow::new();
    row.insert("error".to_string(), Value::String(message.into()));
    row
}

/// Runs raw SQL and hands back fully materialized rows.
#[async_trait]
pub trait QueryBackend: Send {
    async fn fetch_rows(&mut self, sql: &str) -> Result<Vec<ResultRow>, DatabaseError>;

    async fn close(&mut self) {}
}

const READ_ONLY_SESSION: &str = "SET SESSION TRANSACTION READ ONLY";

/// What to do when the held connection is missing or fails a ping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ReconnectPolicy {
    /// Try once per operation; a failure leaves the next operation to try again.
    OnDemand,
    /// Keep whatever the startup connect produced.
    Never,
}

/// Owns the single MySQL connection used by the assistant.
pub struct ConnectionManager {
    options: MySqlConnectOptions,
    policy: ReconnectPolicy,
    read_only: bool,
    conn: Option<MySqlConnection>,
    attempts: u32,
}

impl ConnectionManager {
    /// Opens the connection straight away. A failure is reported and the
    /// manager starts out disconnected.
    pub async fn connect(
        options: MySqlConnectOptions,
        policy: ReconnectPolicy,
        read_only: bool,
    ) -> Self {
        let mut manager = ConnectionManager {
            options,
            policy,
            read_only,
            conn: None,
            attempts: 0,
        };
        // already reported inside open()
        let _ = manager.open().await;
        manager
    }

    async fn open(&mut self) -> Result<(), DatabaseError> {
        self.conn = None;
        self.attempts += 1;

        match Self::establish(&self.options, self.read_only).await {
            Ok(conn) => {
                println!("Successfully connected to the database!");
                info!(
                    host = self.options.get_host(),
                    database = ?self.options.get_database(),
                    read_only = self.read_only,
                    attempt = self.attempts,
                    "database connection established"
                );
                self.conn = Some(conn);
                Ok(())
            }
            Err(e) => {
                println!("Error connecting to MySQL: {}", e);
                warn!(error = %e, attempt = self.attempts, "database connection failed");
                Err(e.into())
            }
        }
    }

    async fn establish(
        options: &MySqlConnectOptions,
        read_only: bool,
    ) -> Result<MySqlConnection, sqlx::Error> {
        let mut conn = MySqlConnection::connect_with(options).await?;

        for statement in session_statements(read_only) {
            Executor::execute(&mut conn, *statement).await?;
        }

        Ok(conn)
    }

    pub async fn is_alive(&mut self) -> bool {
        match self.conn.as_mut() {
            Some(conn) => conn.ping().await.is_ok(),
            None => false,
        }
    }

    async fn ensure_connected(&mut self) -> Result<&mut MySqlConnection, DatabaseError> {
        if !self.is_alive().await {
            match self.policy {
                ReconnectPolicy::OnDemand => {
                    println!("Reconnecting to database...");
                    self.open().await?;
                }
                ReconnectPolicy::Never => {
                    self.conn = None;
                    return Err(DatabaseError::NotConnected);
                }
            }
        }

        self.conn.as_mut().ok_or(DatabaseError::NotConnected)
    }
}

#[async_trait]
impl QueryBackend for ConnectionManager {
    async fn fetch_rows(&mut self, sql: &str) -> Result<Vec<ResultRow>, DatabaseError> {
        let conn = self.ensure_connected().await?;

        // no arguments, so this goes over the text protocol and statements
        // that cannot be prepared (SHOW ...) still run
        let rows = Executor::fetch_all(conn, sql).await?;

        Ok(rows.iter().map(decode_row).collect())
    }

    async fn close(&mut self) {
        if let Some(conn) = self.conn.take() {
            if let Err(e) = conn.close().await {
                debug!(error = %e, "error while closing database connection");
            }
        }
    }
}

/// Statements run on every fresh connection before it is handed out.
fn session_statements(read_only: bool) -> &'static [&'static str] {
    if read_only {
        &[READ_ONLY_SESSION]
    } else {
        &[]
    }
}

fn decode_row(row: &MySqlRow) -> ResultRow {
    let mut out = ResultRow::new();

    for (index, column) in row.columns().iter().enumerate() {
        out.insert(column.name().to_string(), decode_value(row, index));
    }

    out
}

fn decode_value(row: &MySqlRow, index: usize) -> Value {
    let type_name = match row.try_get_raw(index) {
        Ok(raw) if raw.is_null() => return Value::Null,
        Ok(raw) => raw.type_info().name().to_ascii_uppercase(),
        Err(_) => return Value::Null,
    };

    match row.try_get_unchecked::<String, _>(index) {
        Ok(text) => scalar_from_text(&type_name, text),
        Err(_) => match row.try_get_unchecked::<Vec<u8>, _>(index) {
            Ok(bytes) => Value::String(to_hex(&bytes)),
            Err(_) => Value::Null,
        },
    }
}

/// Maps a text-protocol value onto a JSON scalar using the column's
/// declared type.
fn scalar_from_text(type_name: &str, text: String) -> Value {
    if type_name == "BOOLEAN" {
        return match text.as_str() {
            "0" => Value::Bool(false),
            "1" => Value::Bool(true),
            _ => Value::String(text),
        };
    }

    if type_name.contains("INT") {
        if let Ok(n) = text.parse::<i64>() {
            return Value::Number(n.into());
        }
        if let Ok(n) = text.parse::<u64>() {
            return Value::Number(n.into());
        }
        return Value::String(text);
    }

    if type_name == "FLOAT" || type_name == "DOUBLE" {
        if let Some(n) = text.parse::<f64>().ok().and_then(Number::from_f64) {
            return Value::Number(n);
        }
    }

    Value::String(text)
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
