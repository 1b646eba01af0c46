//! Recording in-memory [`Database`] for unit tests.
//!
//! Reads are answered from scripted responses matched by a substring of the
//! SQL text. Several responses registered under the same pattern are
//! returned in order, and the last one keeps being returned. Writes are
//! recorded and succeed unless their statement key was marked as failing.

#![allow(clippy::unwrap_used)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use crate::database::{Database, ExecMode, Execution, Field, Row, SqlParam, Statement};
use crate::error::DbError;

/// A read the fake answered.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedQuery {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

/// A write the fake received.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedExecution {
    pub key: &'static str,
    pub sql: String,
    pub params: Vec<SqlParam>,
    pub mode: ExecMode,
}

#[derive(Debug, Default)]
pub struct FakeDatabase {
    responses: Mutex<Vec<(String, VecDeque<Vec<Row>>)>>,
    queries: Mutex<Vec<RecordedQuery>>,
    executions: Mutex<Vec<RecordedExecution>>,
    failing: Mutex<HashSet<&'static str>>,
    rows_affected: Mutex<HashMap<&'static str, u64>>,
}

/// Build a row from nullable column texts.
pub fn row(fields: &[Option<&str>]) -> Row {
    Row::new(fields.iter().map(|f| Field::from(*f)).collect())
}

impl FakeDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Answer reads whose SQL contains `pattern` with `rows`.
    pub fn respond(&self, pattern: &str, rows: Vec<Row>) {
        let mut responses = self.responses.lock().unwrap();
        if let Some((_, queue)) = responses.iter_mut().find(|(p, _)| p == pattern) {
            queue.push_back(rows);
        } else {
            responses.push((pattern.to_owned(), VecDeque::from([rows])));
        }
    }

    /// Make every execution of `key` fail.
    pub fn fail_statement(&self, key: &'static str) {
        self.failing.lock().unwrap().insert(key);
    }

    /// Report `rows` affected for synchronous executions of `key`
    /// (default 1).
    pub fn set_rows_affected(&self, key: &'static str, rows: u64) {
        self.rows_affected.lock().unwrap().insert(key, rows);
    }

    pub fn queries(&self) -> Vec<RecordedQuery> {
        self.queries.lock().unwrap().clone()
    }

    pub fn executions(&self) -> Vec<RecordedExecution> {
        self.executions.lock().unwrap().clone()
    }

    pub fn executed_keys(&self) -> Vec<&'static str> {
        self.executions().iter().map(|e| e.key).collect()
    }

    /// The single execution recorded under `key`.
    pub fn execution(&self, key: &str) -> RecordedExecution {
        let matching: Vec<_> = self.executions().into_iter().filter(|e| e.key == key).collect();
        assert_eq!(matching.len(), 1, "expected one `{key}` execution, got {matching:?}");
        matching.into_iter().next().unwrap()
    }

    fn answer(&self, sql: &str, params: &[SqlParam]) -> Vec<Row> {
        self.queries.lock().unwrap().push(RecordedQuery {
            sql: sql.to_owned(),
            params: params.to_vec(),
        });
        let mut responses = self.responses.lock().unwrap();
        let Some((_, queue)) = responses.iter_mut().find(|(p, _)| sql.contains(p.as_str())) else {
            return Vec::new();
        };
        if queue.len() > 1 {
            queue.pop_front().unwrap_or_default()
        } else {
            queue.front().cloned().unwrap_or_default()
        }
    }
}

impl Database for FakeDatabase {
    async fn fetch_all(&self, sql: &str, params: &[SqlParam]) -> Result<Vec<Row>, DbError> {
        Ok(self.answer(sql, params))
    }

    async fn stream_rows<F>(&self, sql: &str, params: &[SqlParam], mut sink: F) -> Result<u64, DbError>
    where
        F: FnMut(Row) + Send,
    {
        let rows = self.answer(sql, params);
        let count = u64::try_from(rows.len()).unwrap_or(u64::MAX);
        rows.into_iter().for_each(&mut sink);
        Ok(count)
    }

    async fn execute(
        &self,
        statement: Arc<Statement>,
        params: Vec<SqlParam>,
        mode: ExecMode,
    ) -> Result<Execution, DbError> {
        let key = statement.key();
        self.executions.lock().unwrap().push(RecordedExecution {
            key,
            sql: statement.sql().to_owned(),
            params,
            mode,
        });
        if self.failing.lock().unwrap().contains(key) {
            return Err(DbError::Config(format!("injected failure for `{key}`")));
        }
        Ok(match mode {
            ExecMode::Sync => Execution::Completed {
                rows_affected: self.rows_affected.lock().unwrap().get(key).copied().unwrap_or(1),
            },
            ExecMode::Deferred => Execution::Queued,
        })
    }
}
