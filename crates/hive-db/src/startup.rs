//! Wiring of the three data sources to their databases.
//!
//! The character data source always uses the main database. The object and
//! custom data sources use their own databases when configured, and share
//! the main one otherwise.
//!
//! # Usage
//!
//! ```rust,ignore
//! use hive_db::{Hive, HiveConfig};
//!
//! let config = HiveConfig::from_file("hive-config.yaml".as_ref())?;
//! let hive = Hive::connect(&config).await?;
//! hive.run_migrations().await?;
//! let login = hive.characters.login_player("76561198000000001", 1, "Bob").await?;
//! hive.shutdown().await;
//! ```

use std::sync::Arc;

use crate::character::CharacterDataSource;
use crate::config::{DatabaseConfig, HiveConfig};
use crate::custom::CustomDataSource;
use crate::database::Database;
use crate::error::DbError;
use crate::object::ObjectDataSource;
use crate::postgres::PgDatabase;

/// The three data sources, ready to serve requests.
#[derive(Debug)]
pub struct Hive<D = PgDatabase> {
    /// Profiles, characters, and the audit log.
    pub characters: CharacterDataSource<D>,
    /// Vehicles and deployables.
    pub objects: ObjectDataSource<D>,
    /// Operator-defined queries.
    pub custom: CustomDataSource<D>,
    databases: Vec<Arc<D>>,
}

impl<D: Database> Hive<D> {
    /// Build the data sources over already connected backends. Pass the
    /// same handle more than once to share a database.
    pub fn from_databases(main: &Arc<D>, object: &Arc<D>, custom: &Arc<D>, config: &HiveConfig) -> Self {
        let mut databases: Vec<Arc<D>> = Vec::with_capacity(3);
        for db in [main, object, custom] {
            if !databases.iter().any(|known| Arc::ptr_eq(known, db)) {
                databases.push(Arc::clone(db));
            }
        }

        Self {
            characters: CharacterDataSource::new(Arc::clone(main), &config.characters, config.strict_writes),
            objects: ObjectDataSource::new(Arc::clone(object), &config.objects, config.strict_writes),
            custom: CustomDataSource::new(Arc::clone(custom), config.strict_writes),
            databases,
        }
    }

    /// Distinct backends in use, main database first.
    pub fn databases(&self) -> &[Arc<D>] {
        &self.databases
    }

    /// Wait until every deferred write queued so far has run.
    pub async fn flush(&self) {
        for db in &self.databases {
            db.flush().await;
        }
    }
}

impl Hive<PgDatabase> {
    /// Connect every configured database. Any failure is fatal.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if a database cannot be reached or its URL is
    /// invalid.
    pub async fn connect(config: &HiveConfig) -> Result<Self, DbError> {
        let main = Arc::new(PgDatabase::connect(&config.database.to_postgres_config()).await?);
        let object = connect_or_share(config.object_database.as_ref(), &main, "object").await?;
        let custom = connect_or_share(config.custom_database.as_ref(), &main, "custom").await?;

        tracing::info!(
            strict_writes = config.strict_writes,
            separate_object_db = config.object_database.is_some(),
            separate_custom_db = config.custom_database.is_some(),
            "Hive data sources ready"
        );
        Ok(Self::from_databases(&main, &object, &custom, config))
    }

    /// Apply the schema migrations to every database in use.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Migration`] if a migration fails.
    pub async fn run_migrations(&self) -> Result<(), DbError> {
        for db in &self.databases {
            db.run_migrations().await?;
        }
        Ok(())
    }

    /// Drain deferred writes and close every pool.
    pub async fn shutdown(&self) {
        for db in &self.databases {
            db.close().await;
        }
    }
}

async fn connect_or_share(
    config: Option<&DatabaseConfig>,
    main: &Arc<PgDatabase>,
    role: &'static str,
) -> Result<Arc<PgDatabase>, DbError> {
    match config {
        Some(config) => {
            tracing::info!(role, "Connecting separate database");
            Ok(Arc::new(PgDatabase::connect(&config.to_postgres_config()).await?))
        }
        None => Ok(Arc::clone(main)),
    }
}
