//! Database client abstraction.
//!
//! The engine talks to VoltDB through two small traits:
//!
//! ```text
//! ┌──────────────────────┐  connect(settings)   ┌──────────────────────┐
//! │ GatherCoordinator    │ ───────────────────▶ │ StatsClient          │
//! │                      │                      └──────────┬───────────┘
//! │                      │  call_procedure(..)  ┌──────────▼───────────┐
//! │                      │ ───────────────────▶ │ StatsConnection      │
//! └──────────────────────┘                      └──────────┬───────────┘
//!                                                          │ callback on a
//!                                                          ▼ transport thread
//!                                               ┌──────────────────────┐
//!                                               │ HttpClient / Mock    │
//!                                               └──────────────────────┘
//! ```
//!
//! `call_procedure` is asynchronous: it returns as soon as the request is
//! queued and invokes the callback later, on a thread owned by the client.
//! If it returns an error the callback is dropped without being invoked.

pub mod http;
pub mod mock;

use serde::Serialize;

use crate::config::ConnectSettings;

/// System procedure used for every statistics category.
pub const STATISTICS_PROCEDURE: &str = "@Statistics";

/// Error type for client operations.
#[derive(Debug, Clone)]
pub enum ClientError {
    /// A server could not be reached or refused the login.
    Connect { server: String, message: String },
    /// The request could not be queued (queue full, thread spawn failure).
    Dispatch(String),
    /// The connection was already closed.
    Closed,
    /// The request was sent but no usable response came back.
    Transport(String),
    /// The server answered with something that is not a procedure response.
    Protocol(String),
    /// TLS material could not be loaded.
    Tls(String),
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::Connect { server, message } => {
                write!(f, "unable to connect to VoltDB server {}: {}", server, message)
            }
            ClientError::Dispatch(msg) => write!(f, "dispatch failed: {}", msg),
            ClientError::Closed => write!(f, "connection is closed"),
            ClientError::Transport(msg) => write!(f, "transport error: {}", msg),
            ClientError::Protocol(msg) => write!(f, "protocol error: {}", msg),
            ClientError::Tls(msg) => write!(f, "TLS setup failed: {}", msg),
        }
    }
}

impl std::error::Error for ClientError {}

/// VoltDB `ClientResponse` status codes.
pub mod status {
    pub const SUCCESS: i8 = 1;
    pub const USER_ABORT: i8 = -1;
    pub const GRACEFUL_FAILURE: i8 = -2;
    pub const UNEXPECTED_FAILURE: i8 = -3;
    pub const CONNECTION_LOST: i8 = -4;
    pub const SERVER_UNAVAILABLE: i8 = -5;
    pub const CONNECTION_TIMEOUT: i8 = -6;
    pub const RESPONSE_UNKNOWN: i8 = -7;
}

/// VoltDB column types, by wire type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    TinyInt,
    SmallInt,
    Integer,
    BigInt,
    Float,
    String,
    Timestamp,
    Decimal,
    VarBinary,
    Other(i8),
}

impl ColumnType {
    pub fn from_code(code: i8) -> Self {
        match code {
            3 => ColumnType::TinyInt,
            4 => ColumnType::SmallInt,
            5 => ColumnType::Integer,
            6 => ColumnType::BigInt,
            8 => ColumnType::Float,
            9 => ColumnType::String,
            11 => ColumnType::Timestamp,
            22 => ColumnType::Decimal,
            25 => ColumnType::VarBinary,
            other => ColumnType::Other(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub column_type: ColumnType,
}

/// One cell of a result table.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Float(f64),
    String(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Text form used for label values; `None` for nulls.
    pub fn as_label(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Integer(v) => Some(v.to_string()),
            Value::Float(v) => Some(v.to_string()),
            Value::String(s) => Some(s.clone()),
        }
    }
}

/// A result table (`VoltTable`): schema plus rows in schema order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatsTable {
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<Value>>,
}

impl StatsTable {
    pub fn new(columns: &[(&str, ColumnType)]) -> Self {
        Self {
            columns: columns
                .iter()
                .map(|(name, column_type)| Column {
                    name: name.to_string(),
                    column_type: *column_type,
                })
                .collect(),
            rows: Vec::new(),
        }
    }

    pub fn with_row(mut self, row: Vec<Value>) -> Self {
        self.rows.push(row);
        self
    }

    /// Position of a column, matched case-insensitively as VoltTable does.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
    }
}

/// Result of one procedure invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcedureResponse {
    pub status: i8,
    pub status_string: Option<String>,
    pub tables: Vec<StatsTable>,
}

impl ProcedureResponse {
    pub fn success(tables: Vec<StatsTable>) -> Self {
        Self {
            status: status::SUCCESS,
            status_string: None,
            tables,
        }
    }

    pub fn failure(status: i8, message: impl Into<String>) -> Self {
        Self {
            status,
            status_string: Some(message.into()),
            tables: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == status::SUCCESS
    }

    /// Statuses that say the link, not the procedure, is broken.
    pub fn is_connection_failure(&self) -> bool {
        matches!(
            self.status,
            status::CONNECTION_LOST
                | status::SERVER_UNAVAILABLE
                | status::CONNECTION_TIMEOUT
                | status::RESPONSE_UNKNOWN
        )
    }

    pub fn describe(&self) -> String {
        match &self.status_string {
            Some(msg) => format!("status {}: {}", self.status, msg),
            None => format!("status {}", self.status),
        }
    }
}

/// Positional procedure parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ProcedureParam {
    String(String),
    Integer(i64),
}

pub type ResponseCallback = Box<dyn FnOnce(Result<ProcedureResponse, ClientError>) + Send + 'static>;

/// Factory for connections.
pub trait StatsClient: Send {
    type Connection: StatsConnection;

    /// Opens a connection to every server in `settings`.
    fn connect(&self, settings: &ConnectSettings) -> Result<Self::Connection, ClientError>;
}

/// A live link to the cluster.
pub trait StatsConnection: Send {
    /// Queues a procedure call. The callback runs at most once, on a
    /// client-owned thread. On `Err` the callback has been dropped unrun.
    fn call_procedure(
        &self,
        procedure: &str,
        params: Vec<ProcedureParam>,
        callback: ResponseCallback,
    ) -> Result<(), ClientError>;

    /// Waits up to `timeout` for outstanding calls; returns `true` if none remain.
    fn drain(&self, timeout: std::time::Duration) -> bool;

    /// Closes the connection. Later calls fail with `ClientError::Closed`.
    fn close(&self);
}
