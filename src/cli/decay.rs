//! CLI `decay` command — run one manual decay cycle and print the result.

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::config::ChronicleConfig;
use crate::db;
use crate::decay::scheduler::DecayScheduler;

/// Run a single decay cycle against the configured database.
pub async fn run_once(config: &ChronicleConfig) -> Result<()> {
    let pool = db::open_database(&config.storage)
        .await
        .context("could not reach the archive database")?;

    let scheduler = Arc::new(DecayScheduler::new(pool, config.decay.clone())?);
    let report = scheduler
        .run_cycle()
        .await
        .context("decay cycle failed")?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    if !report.errors.is_empty() {
        anyhow::bail!("cycle finished with {} batch error(s)", report.errors.len());
    }
    Ok(())
}
