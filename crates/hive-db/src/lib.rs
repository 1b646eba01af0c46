//! Game-state persistence layer for the Hive (`PostgreSQL`).
//!
//! Three data sources translate game calls carrying SQF values into
//! relational reads and writes, and rows back into SQF values:
//!
//! ```text
//! game call (method + SQF params)
//!     |
//!     +-- CharacterDataSource --> profile, survivor, log_entry
//!     +-- ObjectDataSource -----> instance_vehicle, instance_deployable
//!     +-- CustomDataSource -----> operator-defined queries
//!             |
//!             +-- Database facade --> PgDatabase (sqlx pool + ordered writer)
//! ```
//!
//! Every response is an SQF array whose first element is a [`Status`].
//!
//! # Modules
//!
//! - [`database`] -- statement execution facade and prepared-statement cache
//! - [`postgres`] -- `PostgreSQL` backend, pool configuration, migrations
//! - [`character`] -- login, character details, updates, death, audit log
//! - [`object`] -- bulk object load, object updates, placement, deletion
//! - [`custom`] -- operator-defined queries
//! - [`response`] -- typed responses and their wire form
//! - [`worldspace`] -- out-of-bounds position reset
//! - [`config`] -- YAML configuration with environment overrides
//! - [`startup`] -- connecting the data sources
//! - [`error`] -- shared error types

pub mod character;
pub mod config;
pub mod custom;
pub mod database;
pub mod error;
pub mod object;
pub mod postgres;
pub mod response;
pub mod source;
pub mod startup;
pub mod worldspace;

#[cfg(test)]
mod fake;

// Re-export primary types for convenience.
pub use character::{CharacterDataSource, CharacterFields, LogCode};
pub use config::{ConfigError, HiveConfig, WorldBounds};
pub use custom::{CustomDataQueue, CustomDataSource};
pub use database::{Database, ExecMode, Execution, Field, Row, SqlParam, Statement, StatementCache};
pub use error::{DataSourceError, DbError};
pub use object::{NewObject, ObjectDataSource, ObjectQueue, ObjectTable};
pub use postgres::{PgDatabase, PostgresConfig};
pub use response::{
    CharacterDetails, DetailsResponse, KillStats, LoginResponse, PROTOCOL_VERSION, Status,
    SurvivalTimers,
};
pub use startup::Hive;
