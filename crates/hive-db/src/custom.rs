//! Custom data source: operator-authored queries.
//!
//! Queries use `?` placeholders, written bare (`id = ?`) or as a quoted
//! literal (`unique_id = '?'`). Each one becomes a bound positional
//! parameter, so parameter text never reaches the SQL. A `?` inside any
//! other quoted literal is left alone. Queries may use native `$n`
//! placeholders instead, but not both kinds at once.
//!
//! `populate_query` hands every parameter over as its display text and lets
//! the server read it as the type the placeholder needs. `custom_execute`
//! binds bare placeholders as integers when the value reads as one and as
//! text otherwise; quoted placeholders always bind as text.

use std::collections::VecDeque;
use std::sync::Arc;

use hive_sqf::Value;

use crate::database::{Database, SqlParam};
use crate::error::DataSourceError;
use crate::source::SqlDataSource;

/// Rows produced by a custom query, one array per row.
pub type CustomDataQueue = VecDeque<Value>;

/// How a `?` placeholder was written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// `?`
    Bare,
    /// `'?'`
    Quoted,
}

/// A query template with its placeholders rewritten as `$1`, `$2`, ...
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    /// SQL ready to prepare.
    pub sql: String,
    /// `?` placeholders in order.
    pub slots: Vec<Slot>,
    /// Highest native `$n` placeholder, 0 when there is none.
    pub native: usize,
}

impl Template {
    /// Scan `template` for placeholders.
    pub fn parse(template: &str) -> Self {
        let mut sql = String::with_capacity(template.len());
        let mut slots = Vec::new();
        let mut native: usize = 0;
        let mut quote: Option<char> = None;
        let mut prev: Option<char> = None;
        let mut chars = template.char_indices().peekable();

        while let Some((at, c)) = chars.next() {
            match (quote, c) {
                (None, '\'') if is_quoted_slot(template, at, prev) => {
                    chars.next();
                    chars.next();
                    slots.push(Slot::Quoted);
                    push_placeholder(&mut sql, slots.len());
                }
                (None, '\'' | '"') => {
                    quote = Some(c);
                    sql.push(c);
                }
                (Some(open), _) if c == open => {
                    quote = None;
                    sql.push(c);
                }
                (None, '?') => {
                    slots.push(Slot::Bare);
                    push_placeholder(&mut sql, slots.len());
                }
                (None, '$') if !prev.is_some_and(is_identifier_char) => {
                    sql.push(c);
                    let mut digits = String::new();
                    while let Some((_, d)) = chars.next_if(|(_, d)| d.is_ascii_digit()) {
                        digits.push(d);
                    }
                    sql.push_str(&digits);
                    native = native.max(digits.parse().unwrap_or(0));
                }
                _ => sql.push(c),
            }
            prev = Some(c);
        }

        Self { sql, slots, native }
    }

    /// Number of parameters the query expects.
    pub fn expected_params(&self) -> Result<usize, DataSourceError> {
        match (self.slots.len(), self.native) {
            (0, native) => Ok(native),
            (slots, 0) => Ok(slots),
            (placeholders, _) => Err(DataSourceError::MixedPlaceholders { placeholders }),
        }
    }
}

/// A `'?'` literal starting at `at`, not glued to a neighboring literal.
fn is_quoted_slot(template: &str, at: usize, prev: Option<char>) -> bool {
    prev != Some('\'')
        && template.get(at..).is_some_and(|rest| {
            rest.starts_with("'?'") && rest.get(3..).is_some_and(|after| !after.starts_with('\''))
        })
}

const fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

fn push_placeholder(sql: &mut String, n: usize) {
    sql.push('$');
    sql.push_str(&n.to_string());
}

/// Bind a value as an integer when it reads as one, as text otherwise.
pub fn bind_param(value: &Value) -> SqlParam {
    value.as_bind_integer().map_or_else(
        |_| SqlParam::Text(value.as_coerced_string()),
        |n| i32::try_from(n).map_or(SqlParam::Int64(n), SqlParam::Int32),
    )
}

/// Classify a result column the way the game expects.
///
/// The leading integer of the text is read (`"12abc"` reads as 12). A
/// column reads as that integer unless the result is 0 and the text is not
/// exactly `"0"`, in which case it stays a string. This is lossy: `"007"`
/// becomes 7, `"3.5"` becomes 3, and an integer too large for 32 bits stays
/// a string.
pub fn classify_column(text: &str) -> Value {
    match leading_integer(text) {
        Some(0) if text != "0" => Value::string(text),
        Some(n) => Value::Int32(n),
        None => Value::string(text),
    }
}

/// Leading optionally signed integer; no digits reads as 0, overflow as
/// `None`.
fn leading_integer(text: &str) -> Option<i32> {
    let trimmed = text.trim_start();
    let (negative, rest) = trimmed.strip_prefix('-').map_or_else(
        || (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
        |rest| (true, rest),
    );
    let end = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
    let digits = rest.get(..end)?;
    if digits.is_empty() {
        return Some(0);
    }
    let magnitude: i64 = digits.parse().ok()?;
    let value = if negative { magnitude.checked_neg()? } else { magnitude };
    i32::try_from(value).ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Binding {
    /// Display text, typed by the server.
    DisplayText,
    /// Integer first for bare placeholders.
    IntegerFirst,
}

/// Generic query execution for operator-defined queries.
#[derive(Debug)]
pub struct CustomDataSource<D> {
    source: SqlDataSource<D>,
}

impl<D: Database> CustomDataSource<D> {
    /// Create the data source over `db`.
    pub fn new(db: Arc<D>, strict: bool) -> Self {
        Self {
            source: SqlDataSource::new(db, strict),
        }
    }

    /// Shared plumbing, for inspection.
    pub const fn source(&self) -> &SqlDataSource<D> {
        &self.source
    }

    fn bind(
        template: &str,
        params: &[Value],
        binding: Binding,
    ) -> Result<(String, Vec<SqlParam>), DataSourceError> {
        let template = Template::parse(template);
        let placeholders = template.expected_params()?;
        if placeholders != params.len() {
            return Err(DataSourceError::ParameterCount {
                placeholders,
                supplied: params.len(),
            });
        }

        let binds = params
            .iter()
            .enumerate()
            .map(|(i, value)| {
                let slot = template.slots.get(i).copied().unwrap_or(Slot::Bare);
                match (binding, slot) {
                    (Binding::DisplayText, _) => SqlParam::Untyped(value.as_coerced_string()),
                    (Binding::IntegerFirst, Slot::Quoted) => SqlParam::Text(value.as_coerced_string()),
                    (Binding::IntegerFirst, Slot::Bare) => bind_param(value),
                }
            })
            .collect();
        Ok((template.sql, binds))
    }

    /// Run a query and stream each row into `queue` as an array of
    /// classified columns. Returns the number of rows queued.
    pub async fn populate_query(
        &self,
        template: &str,
        params: &[Value],
        queue: &mut CustomDataQueue,
    ) -> Result<u64, DataSourceError> {
        let (sql, binds) = Self::bind(template, params, Binding::DisplayText)?;
        let rows = self
            .source
            .stream("populate_query", &sql, &binds, |row| {
                let columns = row.fields().iter().map(|f| classify_column(f.text())).collect();
                queue.push_back(Value::Array(columns));
            })
            .await?;
        tracing::debug!(rows, "Custom query streamed");
        Ok(rows)
    }

    /// Execute a statement. Runs deferred unless strict writes are enabled.
    pub async fn custom_execute(&self, query: &str, params: &[Value]) -> Result<(), DataSourceError> {
        let (sql, binds) = Self::bind(query, params, Binding::IntegerFirst)?;
        self.source.write_adhoc("custom_execute", sql, binds).await
    }
}
