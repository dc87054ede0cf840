//! CLI subcommand bodies. The `serve` path lives in [`crate::server`].

pub mod decay;
pub mod doctor;

use anyhow::Result;

use crate::config::ChronicleConfig;
use crate::db;

/// Apply the idempotent schema migration and report the resulting version.
pub async fn migrate(config: &ChronicleConfig) -> Result<()> {
    let pool = db::open_database(&config.storage).await?;
    let version = db::migrations::get_schema_version(&pool).await?;
    println!("schema up to date (version {version})");
    Ok(())
}
