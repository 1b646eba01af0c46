//! Plumbing shared by the three data sources.
//!
//! [`SqlDataSource`] owns the backend handle, the per-source statement
//! cache and the write policy. Data sources call it with a call-site key
//! and get [`DataSourceError`]s tagged with that key back.

use std::fmt;
use std::sync::Arc;

use hive_sqf::Value;

use crate::database::{Database, ExecMode, Row, SqlParam, Statement, StatementCache};
use crate::error::{DataSourceError, DbError};

/// Backend handle plus statement cache for one data source.
pub struct SqlDataSource<D> {
    db: Arc<D>,
    statements: StatementCache,
    strict: bool,
}

impl<D> fmt::Debug for SqlDataSource<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqlDataSource")
            .field("statements", &self.statements.len())
            .field("strict", &self.strict)
            .finish_non_exhaustive()
    }
}

impl<D: Database> SqlDataSource<D> {
    /// Wrap a backend. With `strict` set every write runs synchronously and
    /// a failed write is reported as [`DataSourceError::Invariant`].
    pub fn new(db: Arc<D>, strict: bool) -> Self {
        Self {
            db,
            statements: StatementCache::new(),
            strict,
        }
    }

    /// The backend.
    pub fn db(&self) -> &D {
        &self.db
    }

    /// Whether strict writes are enabled.
    pub const fn is_strict(&self) -> bool {
        self.strict
    }

    /// The statement cache, for inspection.
    pub const fn statements(&self) -> &StatementCache {
        &self.statements
    }

    /// Quote a configured table or column name.
    pub fn ident(&self, name: &str) -> String {
        self.db.quote_identifier(name)
    }

    /// Run a read and collect its rows.
    pub async fn fetch(
        &self,
        statement: &'static str,
        sql: &str,
        params: &[SqlParam],
    ) -> Result<Vec<Row>, DataSourceError> {
        self.db
            .fetch_all(sql, params)
            .await
            .map_err(|source| DataSourceError::Query { statement, source })
    }

    /// Run a read and hand each row to `sink`.
    pub async fn stream<F>(
        &self,
        statement: &'static str,
        sql: &str,
        params: &[SqlParam],
        sink: F,
    ) -> Result<u64, DataSourceError>
    where
        F: FnMut(Row) + Send,
    {
        self.db
            .stream_rows(sql, params, sink)
            .await
            .map_err(|source| DataSourceError::Query { statement, source })
    }

    /// Run a cached write whose outcome nobody waits for. It is deferred
    /// unless strict writes are enabled.
    pub async fn write(
        &self,
        key: &'static str,
        sql: impl FnOnce() -> String,
        params: Vec<SqlParam>,
    ) -> Result<(), DataSourceError> {
        let statement = self.statements.get_or_prepare(key, sql);
        let mode = if self.strict {
            ExecMode::Sync
        } else {
            ExecMode::Deferred
        };
        self.execute(statement, params, mode).await.map(drop)
    }

    /// Run a cached write to completion and return the rows it affected.
    /// Used where the next step reads what this write produced.
    pub async fn write_sync(
        &self,
        key: &'static str,
        sql: impl FnOnce() -> String,
        params: Vec<SqlParam>,
    ) -> Result<u64, DataSourceError> {
        let statement = self.statements.get_or_prepare(key, sql);
        self.execute(statement, params, ExecMode::Sync).await
    }

    /// Run a write whose SQL differs per call, so it is not cached.
    pub async fn write_adhoc(
        &self,
        key: &'static str,
        sql: String,
        params: Vec<SqlParam>,
    ) -> Result<(), DataSourceError> {
        let mode = if self.strict {
            ExecMode::Sync
        } else {
            ExecMode::Deferred
        };
        self.execute(Arc::new(Statement::new(key, sql)), params, mode)
            .await
            .map(drop)
    }

    async fn execute(
        &self,
        statement: Arc<Statement>,
        params: Vec<SqlParam>,
        mode: ExecMode,
    ) -> Result<u64, DataSourceError> {
        let key = statement.key();
        match self.db.execute(statement, params, mode).await {
            Ok(outcome) => Ok(outcome.rows_affected()),
            Err(source) => Err(self.write_failed(key, source)),
        }
    }

    fn write_failed(&self, statement: &'static str, source: DbError) -> DataSourceError {
        if self.strict {
            tracing::error!(statement, error = %source, "Write failed in strict mode");
            DataSourceError::Invariant { statement, source }
        } else {
            tracing::warn!(statement, error = %source, "Write failed");
            DataSourceError::Execution { statement, source }
        }
    }
}

/// Parse stored SQF text, falling back to `default` with a warning naming
/// the record and the raw text. `NULL` yields the default silently.
pub fn parse_or_default(record: &str, column: &'static str, raw: Option<&str>, default: Value) -> Value {
    let Some(text) = raw else {
        return default;
    };
    hive_sqf::parse(text).unwrap_or_else(|e| {
        tracing::warn!(record, column, raw = text, error = %e, "Unparsable stored value, using default");
        default
    })
}
