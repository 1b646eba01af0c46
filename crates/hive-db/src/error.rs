//! Error types for the persistence layer.
//!
//! [`DbError`] wraps the underlying [`sqlx`] errors raised by the
//! statement execution backend. [`DataSourceError`] is what the data
//! sources hand back to their caller, tagged with the statement that
//! failed.

/// Errors raised by a [`Database`](crate::database::Database) backend.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A `PostgreSQL` operation failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// A `PostgreSQL` migration failed.
    #[error("PostgreSQL migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A parameter's text cannot be read as the type the server expects at
    /// its placeholder.
    #[error("parameter ${position} expects {expected}, got {text:?}")]
    Parameter {
        /// One-based placeholder number.
        position: usize,
        /// Type the server inferred for the placeholder.
        expected: String,
        /// The parameter text.
        text: String,
    },

    /// The background writer has shut down and can no longer accept
    /// deferred writes.
    #[error("Deferred writer closed, dropped statement `{statement}`")]
    WriterClosed {
        /// Call-site key of the statement that could not be queued.
        statement: &'static str,
    },
}

/// Errors returned by the character, object, and custom data sources.
///
/// Lookup misses are not errors: they come back as an `ERROR` status in
/// the response value. Malformed stored values are not errors either:
/// they are replaced by defaults and logged.
#[derive(Debug, thiserror::Error)]
pub enum DataSourceError {
    /// A read failed.
    #[error("query `{statement}` failed: {source}")]
    Query {
        /// Call-site key of the query.
        statement: &'static str,
        /// The backend error.
        #[source]
        source: DbError,
    },

    /// A write failed. The request fails; the service keeps running.
    #[error("write `{statement}` failed: {source}")]
    Execution {
        /// Call-site key of the statement.
        statement: &'static str,
        /// The backend error.
        #[source]
        source: DbError,
    },

    /// A write failed while strict writes are enabled. The caller should
    /// stop serving requests.
    #[error("write `{statement}` failed in strict mode: {source}")]
    Invariant {
        /// Call-site key of the statement.
        statement: &'static str,
        /// The backend error.
        #[source]
        source: DbError,
    },

    /// A custom query's `?` placeholders do not match its parameters.
    #[error("query has {placeholders} placeholders but {supplied} parameters were supplied")]
    ParameterCount {
        /// Number of `?` placeholders found in the query text.
        placeholders: usize,
        /// Number of parameters the caller supplied.
        supplied: usize,
    },

    /// A custom query mixes `?` placeholders with native `$n` ones.
    #[error("query mixes {placeholders} `?` placeholders with native `$n` placeholders")]
    MixedPlaceholders {
        /// Number of `?` placeholders found in the query text.
        placeholders: usize,
    },
}

impl DataSourceError {
    /// Whether the caller should treat this as a fatal condition.
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Invariant { .. })
    }

    /// Call-site key of the failing statement, if any.
    pub const fn statement(&self) -> Option<&'static str> {
        match self {
            Self::Query { statement, .. }
            | Self::Execution { statement, .. }
            | Self::Invariant { statement, .. } => Some(*statement),
            Self::ParameterCount { .. } | Self::MixedPlaceholders { .. } => None,
        }
    }
}
