//! Hive loader entry point.
//!
//! Connects every configured database, applies the schema migrations, then
//! loads the world objects of one instance and prints each record, one per
//! line, in the form the game server receives them.
//!
//! # Usage
//!
//! ```text
//! hive-loader [CONFIG] [INSTANCE_ID]
//! ```
//!
//! `CONFIG` defaults to `hive-config.yaml`; a missing file means defaults
//! plus environment overrides. `INSTANCE_ID` defaults to
//! `loader.instance_id` (or `HIVE_INSTANCE_ID`). Set `HIVE_LOG_FORMAT=json`
//! for JSON log lines.

use std::path::Path;

use anyhow::Context;
use hive_db::{Hive, HiveConfig, ObjectQueue};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Config file read when no path is given.
const DEFAULT_CONFIG_PATH: &str = "hive-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, a database cannot be
/// reached, a migration fails, or the object load fails.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    info!("hive-loader starting");

    let mut args = std::env::args().skip(1);
    let config_path = args.next().unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_owned());
    let config = load_config(Path::new(&config_path))?;
    let instance_id = match args.next() {
        Some(raw) => raw
            .parse::<i32>()
            .with_context(|| format!("invalid instance id {raw:?}"))?,
        None => config.loader.instance_id,
    };
    info!(
        config_path,
        instance_id,
        strict_writes = config.strict_writes,
        "Configuration loaded"
    );

    let hive = Hive::connect(&config)
        .await
        .context("failed to connect the Hive databases")?;
    hive.run_migrations()
        .await
        .context("failed to apply migrations")?;
    info!("Migrations applied");

    let mut queue = ObjectQueue::new();
    let loaded = hive
        .objects
        .populate_objects(instance_id, &mut queue)
        .await
        .with_context(|| format!("failed to load objects for instance {instance_id}"))?;
    for record in &queue {
        println!("{record}");
    }
    info!(instance_id, objects = loaded, "Objects loaded");

    hive.shutdown().await;
    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("HIVE_LOG_FORMAT").is_ok_and(|format| format.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Read the config file, or fall back to defaults when it does not exist.
fn load_config(path: &Path) -> anyhow::Result<HiveConfig> {
    if path.exists() {
        HiveConfig::from_file(path).with_context(|| format!("failed to load {}", path.display()))
    } else {
        info!(path = %path.display(), "Config file not found, using defaults");
        HiveConfig::parse("").context("failed to apply environment overrides")
    }
}
