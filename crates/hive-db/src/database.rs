//! Statement execution facade.
//!
//! The data sources never talk to a driver directly. They go through the
//! [`Database`] trait, which offers exactly what they need: bound queries,
//! row streaming, identifier quoting, and prepared-statement execution in
//! one of two [`ExecMode`]s.
//!
//! Rows come back as text-rendered [`Field`]s, the same shape the stored
//! SQF columns already have, so the data sources can parse them with
//! [`hive_sqf::parse`] regardless of the backend's native column types.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::DbError;

/// A typed, bound statement parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    /// SQL `NULL` (bound as nullable text).
    Null,
    /// Boolean.
    Bool(bool),
    /// 32-bit integer.
    Int32(i32),
    /// 64-bit integer.
    Int64(i64),
    /// Double precision float.
    Double(f64),
    /// Text.
    Text(String),
    /// Text read as whatever type the server expects at the placeholder,
    /// as if it had been written into the query. Backends without type
    /// inference bind it as text.
    Untyped(String),
}

impl SqlParam {
    /// Build a text parameter.
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Whether the backend has to pick the type.
    pub const fn is_untyped(&self) -> bool {
        matches!(self, Self::Untyped(_))
    }
}

/// How a write is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecMode {
    /// Block until the statement has completed and report rows affected.
    Sync,
    /// Hand the statement to the backend's ordered writer and return
    /// immediately. Failures are logged by the backend.
    Deferred,
}

/// Outcome of [`Database::execute`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Execution {
    /// The statement ran to completion.
    Completed {
        /// Rows inserted, updated, or deleted.
        rows_affected: u64,
    },
    /// The statement was queued for deferred execution.
    Queued,
}

impl Execution {
    /// Rows affected, or zero when the statement has only been queued.
    pub const fn rows_affected(self) -> u64 {
        match self {
            Self::Completed { rows_affected } => rows_affected,
            Self::Queued => 0,
        }
    }
}

/// A prepared statement: SQL text plus the stable call-site key it is
/// cached under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    key: &'static str,
    sql: String,
}

impl Statement {
    /// Create a statement for `sql` under `key`.
    pub fn new(key: &'static str, sql: impl Into<String>) -> Self {
        Self {
            key,
            sql: sql.into(),
        }
    }

    /// The call-site key, used in logs and errors.
    pub const fn key(&self) -> &'static str {
        self.key
    }

    /// The SQL text.
    pub fn sql(&self) -> &str {
        &self.sql
    }
}

/// Per-data-source cache of prepared statements keyed by call site.
///
/// Each data source owns one cache, so statement lifetime follows the data
/// source rather than the process. Handles are shared via [`Arc`]; binding
/// happens per execution, so one handle can serve concurrent callers.
#[derive(Debug, Default)]
pub struct StatementCache {
    entries: Mutex<HashMap<&'static str, Arc<Statement>>>,
}

impl StatementCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the statement cached under `key`, preparing it with `sql`
    /// on first use.
    pub fn get_or_prepare(&self, key: &'static str, sql: impl FnOnce() -> String) -> Arc<Statement> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            entries
                .entry(key)
                .or_insert_with(|| Arc::new(Statement::new(key, sql()))),
        )
    }

    /// Number of cached statements.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether nothing has been prepared yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

static NULL_FIELD: Field = Field(None);

/// One column value rendered as text; `None` is SQL `NULL`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Field(Option<String>);

impl Field {
    /// Wrap a (possibly `NULL`) column value.
    pub const fn new(value: Option<String>) -> Self {
        Self(value)
    }

    /// Whether the column was `NULL`.
    pub const fn is_null(&self) -> bool {
        self.0.is_none()
    }

    /// The text, or `None` for `NULL`.
    pub fn as_str(&self) -> Option<&str> {
        self.0.as_deref()
    }

    /// The text, with `NULL` read as the empty string.
    pub fn text(&self) -> &str {
        self.0.as_deref().unwrap_or_default()
    }

    /// Read as a 32-bit integer; `None` for `NULL` or non-numeric text.
    pub fn parse_i32(&self) -> Option<i32> {
        self.as_str().and_then(|s| s.trim().parse().ok())
    }

    /// Read as a 32-bit integer; `NULL` reads as 0, and so does
    /// non-numeric text, with a warning.
    pub fn get_i32(&self) -> i32 {
        self.parse_i32().unwrap_or_else(|| self.non_numeric())
    }

    /// Read as a 64-bit integer; `NULL` reads as 0, and so does
    /// non-numeric text, with a warning.
    pub fn get_i64(&self) -> i64 {
        self.as_str()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or_else(|| self.non_numeric())
    }

    fn non_numeric<T: Default>(&self) -> T {
        if let Some(raw) = self.as_str() {
            tracing::warn!(raw, "Non-numeric column read as 0");
        }
        T::default()
    }

    /// Read as a double; `None` for `NULL` or non-numeric text.
    pub fn get_f64(&self) -> Option<f64> {
        self.as_str().and_then(|s| s.trim().parse().ok())
    }
}

impl From<Option<&str>> for Field {
    fn from(value: Option<&str>) -> Self {
        Self(value.map(ToOwned::to_owned))
    }
}

/// One result row.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Row {
    fields: Vec<Field>,
}

impl Row {
    /// Build a row from its fields, in column order.
    pub const fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// The field at `index`; a missing column reads as `NULL`.
    pub fn field(&self, index: usize) -> &Field {
        self.fields.get(index).unwrap_or(&NULL_FIELD)
    }

    /// All fields in column order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }
}

/// The statement execution contract the data sources depend on.
///
/// Async methods return `Send` futures so data-source calls can run on any
/// worker task. Implementations own connection management, per-use
/// execution context, and ordering of deferred writes.
pub trait Database: Send + Sync + 'static {
    /// Quote a table or column name taken from configuration.
    fn quote_identifier(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    /// Run a bound query and collect every row.
    fn fetch_all(
        &self,
        sql: &str,
        params: &[SqlParam],
    ) -> impl Future<Output = Result<Vec<Row>, DbError>> + Send;

    /// Run a bound query and hand each row to `sink` as it arrives.
    /// Returns the number of rows streamed.
    fn stream_rows<F>(
        &self,
        sql: &str,
        params: &[SqlParam],
        sink: F,
    ) -> impl Future<Output = Result<u64, DbError>> + Send
    where
        F: FnMut(Row) + Send;

    /// Execute a prepared statement.
    fn execute(
        &self,
        statement: Arc<Statement>,
        params: Vec<SqlParam>,
        mode: ExecMode,
    ) -> impl Future<Output = Result<Execution, DbError>> + Send;

    /// Wait until every deferred write queued so far has run.
    fn flush(&self) -> impl Future<Output = ()> + Send {
        async {}
    }
}
