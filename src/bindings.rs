//! Host API surface consumed by the UI and other collaborators.
//!
//! Thin wrappers over the store and the decay scheduler, preserving the
//! operation names and shapes the presentation layer binds against. All
//! business logic lives in [`crate::archive`] and [`crate::decay`];
//! bool-shaped operations log failures and report `false` instead of
//! propagating errors across the host boundary.

use serde::Serialize;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::error;

use crate::archive::facts;
use crate::archive::links;
use crate::archive::store;
use crate::archive::types::{ExtractedFact, Fact, Item, Link, MemoryType};
use crate::decay::scheduler::{CycleReport, DecayScheduler, ServiceMetrics};

/// Decay observability snapshot returned by [`Host::get_decay_metrics`].
#[derive(Debug, Serialize)]
pub struct DecayMetricsSnapshot {
    pub service_metrics: ServiceMetrics,
    pub recent_runs: Vec<crate::archive::types::DecayRunMetric>,
}

/// Outcome of a manually triggered decay cycle.
#[derive(Debug, Serialize)]
pub struct CycleTrigger {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<CycleReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Handle owning the store pool and the decay service, exposed to hosts.
#[derive(Clone)]
pub struct Host {
    pool: PgPool,
    embedding_dim: usize,
    decay: Arc<DecayScheduler>,
}

impl Host {
    pub fn new(pool: PgPool, embedding_dim: usize, decay: Arc<DecayScheduler>) -> Self {
        Self {
            pool,
            embedding_dim,
            decay,
        }
    }

    pub async fn load_database(&self) -> Result<Vec<Item>, String> {
        store::load_items(&self.pool).await.map_err(|e| e.to_string())
    }

    pub async fn save_database(&self, items: &[Item]) -> bool {
        match store::upsert_items(&self.pool, items, self.embedding_dim).await {
            Ok(()) => true,
            Err(e) => {
                error!(error = %e, "save_database failed");
                false
            }
        }
    }

    pub async fn save_facts(&self, chat_id: &str, extracted: &[ExtractedFact]) -> bool {
        match facts::save_facts(&self.pool, chat_id, extracted).await {
            Ok(_) => true,
            Err(e) => {
                error!(chat_id, error = %e, "save_facts failed");
                false
            }
        }
    }

    pub async fn load_facts(&self, chat_id: &str) -> Result<Vec<Fact>, String> {
        facts::load_facts(&self.pool, chat_id)
            .await
            .map_err(|e| e.to_string())
    }

    pub async fn boost_salience(&self, chat_id: &str) -> bool {
        match store::boost_salience(&self.pool, chat_id).await {
            Ok(()) => true,
            Err(e) => {
                error!(chat_id, error = %e, "boost_salience failed");
                false
            }
        }
    }

    pub async fn track_chat_view(&self, chat_id: &str) -> bool {
        match store::track_view(&self.pool, chat_id).await {
            Ok(()) => true,
            Err(e) => {
                error!(chat_id, error = %e, "track_chat_view failed");
                false
            }
        }
    }

    pub async fn update_memory_type(&self, chat_id: &str, memory_type: &str) -> bool {
        let memory_type: MemoryType = match memory_type.parse() {
            Ok(t) => t,
            Err(e) => {
                error!(chat_id, error = %e, "update_memory_type rejected");
                return false;
            }
        };
        match store::update_memory_type(&self.pool, chat_id, memory_type).await {
            Ok(()) => true,
            Err(e) => {
                error!(chat_id, error = %e, "update_memory_type failed");
                false
            }
        }
    }

    pub async fn add_link(&self, from: &str, to: &str, link_type: Option<&str>) -> bool {
        match links::add_link(&self.pool, from, to, link_type).await {
            Ok(()) => true,
            Err(e) => {
                error!(from, to, error = %e, "add_link failed");
                false
            }
        }
    }

    pub async fn remove_link(&self, from: &str, to: &str) -> bool {
        match links::remove_link(&self.pool, from, to).await {
            Ok(()) => true,
            Err(e) => {
                error!(from, to, error = %e, "remove_link failed");
                false
            }
        }
    }

    pub async fn load_links(&self) -> Result<Vec<Link>, String> {
        links::load_links(&self.pool).await.map_err(|e| e.to_string())
    }

    pub async fn get_decay_metrics(&self) -> Result<DecayMetricsSnapshot, String> {
        let recent_runs = self
            .decay
            .recent_runs(20)
            .await
            .map_err(|e| e.to_string())?;
        Ok(DecayMetricsSnapshot {
            service_metrics: self.decay.service_metrics(),
            recent_runs,
        })
    }

    pub async fn trigger_decay_cycle(&self) -> CycleTrigger {
        match self.decay.run_cycle().await {
            Ok(report) => CycleTrigger {
                success: true,
                result: Some(report),
                error: None,
            },
            Err(e) => CycleTrigger {
                success: false,
                result: None,
                error: Some(e.to_string()),
            },
        }
    }
}
