//! Process wiring for `chronicle serve`.
//!
//! Builds the pool, brings the schema current, launches the decay scheduler,
//! and hands the tool handler to the MCP stdio transport. Stdout carries
//! nothing but the line-delimited JSON-RPC stream; everything diagnostic
//! goes through `tracing` to stderr.

use anyhow::Result;
use rmcp::ServiceExt;
use std::sync::Arc;

use crate::config::ChronicleConfig;
use crate::db;
use crate::decay::scheduler::DecayScheduler;
use crate::tools::ChronicleTools;

/// Serve the archive over stdio until the client hangs up, then drain the
/// decay scheduler before returning.
pub async fn serve_stdio(config: ChronicleConfig) -> Result<()> {
    let pool = db::open_database(&config.storage).await?;

    let scheduler = Arc::new(DecayScheduler::new(pool.clone(), config.decay.clone())?);
    scheduler.start();

    let handler = ChronicleTools::new(pool, config.storage.embedding_dim);
    tracing::info!("archive online, accepting MCP requests on stdio");

    let running = handler.serve(rmcp::transport::stdio()).await?;
    // Blocks until stdin closes or the client sends a shutdown.
    running.waiting().await?;
    tracing::info!("client gone, winding down");

    scheduler.stop().await;
    Ok(())
}
