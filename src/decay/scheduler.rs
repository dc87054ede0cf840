//! Periodic decay worker.
//!
//! A single long-lived task applies the decay engine to eligible rows in
//! cursor-paged batches (chats first, then facts), persists the results, and
//! appends a run metric per cycle. An `is_running` latch guarantees at most
//! one cycle in flight; a start tick that lands during an active cycle is
//! logged at warn and skipped. Batches never abort the cycle: per-batch
//! errors are collected into the report and the metric row.

use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::archive::types::{
    DecayHistoryEntry, DecayMetadata, DecayRunMetric, MemoryType,
};
use crate::config::DecayConfig;
use crate::db::now_ms;
use crate::decay::engine::{decay_salience, EnvironmentalContext};
use crate::error::{Result, StoreError};
use crate::similarity;

/// Entropy samples retained in memory for the metrics endpoint.
const ENTROPY_HISTORY_CAP: usize = 100;

/// Result of a single decay cycle.
#[derive(Debug, Default, Clone, Serialize)]
pub struct CycleReport {
    pub processed: u64,
    pub decayed: u64,
    pub entropy: f64,
    pub duration_ms: u64,
    pub batches: u64,
    pub errors: Vec<String>,
}

/// In-memory service counters exposed through the host API.
#[derive(Debug, Default, Clone, Serialize)]
pub struct ServiceMetrics {
    pub cycles_completed: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_cycle_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_entropy: Option<f64>,
    /// Ring buffer of the most recent cycle entropies (newest last).
    pub entropy_history: VecDeque<f64>,
}

impl ServiceMetrics {
    fn record_cycle(&mut self, completed_at: i64, entropy: f64) {
        self.cycles_completed += 1;
        self.last_cycle_at = Some(completed_at);
        self.last_entropy = Some(entropy);
        self.entropy_history.push_back(entropy);
        while self.entropy_history.len() > ENTROPY_HISTORY_CAP {
            self.entropy_history.pop_front();
        }
    }
}

/// The two tables swept by each cycle, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SweepTable {
    Chats,
    Facts,
}

impl SweepTable {
    fn name(&self) -> &'static str {
        match self {
            Self::Chats => "chats",
            Self::Facts => "facts",
        }
    }
}

/// One row as seen by the sweep, table-agnostic.
struct SweepRow {
    id: String,
    salience: f64,
    memory_type: Option<String>,
    recall_count: i32,
    last_accessed_at: i64,
    decay_metadata: serde_json::Value,
}

/// A planned salience update for one row.
struct RowUpdate {
    new_salience: f64,
    decay_amount: f64,
    decay_metadata: serde_json::Value,
}

/// Apply the decay engine to one row. Returns `None` when the row keeps its
/// salience (fresh access, floor already reached, or guard hit).
fn plan_row_update(
    row: &SweepRow,
    now: i64,
    context: EnvironmentalContext,
) -> Result<Option<RowUpdate>> {
    let hours_since_access = (now - row.last_accessed_at).max(0) as f64 / 3_600_000.0;
    let memory_type = row
        .memory_type
        .as_deref()
        .and_then(|s| s.parse::<MemoryType>().ok())
        .unwrap_or(MemoryType::Default);

    let outcome = decay_salience(
        row.salience,
        hours_since_access,
        memory_type,
        row.recall_count,
        context,
    );

    if outcome.new_salience >= row.salience {
        return Ok(None);
    }

    let mut metadata: DecayMetadata =
        serde_json::from_value(row.decay_metadata.clone()).unwrap_or_default();
    metadata.record(
        now,
        DecayHistoryEntry {
            previous_salience: row.salience,
            new_salience: outcome.new_salience,
            hours_since_access,
            modifiers: outcome.modifiers,
        },
    );

    Ok(Some(RowUpdate {
        new_salience: outcome.new_salience,
        decay_amount: outcome.decay_amount,
        decay_metadata: serde_json::to_value(&metadata)?,
    }))
}

/// The long-lived decay service. Constructed once at process start and
/// shared behind an `Arc`.
pub struct DecayScheduler {
    pool: PgPool,
    config: DecayConfig,
    context_override: Option<EnvironmentalContext>,
    is_running: AtomicBool,
    shutdown_tx: watch::Sender<bool>,
    worker: Mutex<Option<JoinHandle<()>>>,
    metrics: Mutex<ServiceMetrics>,
}

impl DecayScheduler {
    pub fn new(pool: PgPool, config: DecayConfig) -> Result<Self> {
        let context_override = config
            .context_override
            .as_deref()
            .map(|s| {
                s.parse::<EnvironmentalContext>()
                    .map_err(|e| StoreError::validation("decay.context_override", e))
            })
            .transpose()?;

        let (shutdown_tx, _) = watch::channel(false);
        Ok(Self {
            pool,
            config,
            context_override,
            is_running: AtomicBool::new(false),
            shutdown_tx,
            worker: Mutex::new(None),
            metrics: Mutex::new(ServiceMetrics::default()),
        })
    }

    /// Launch the cycle runner: one cycle immediately, then one every
    /// `interval_ms`. Calling `start` twice is a logged no-op.
    pub fn start(self: &Arc<Self>) {
        let mut worker = self.worker.lock().expect("worker lock poisoned");
        if worker.is_some() {
            warn!("decay scheduler already started");
            return;
        }

        let service = Arc::clone(self);
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let handle = tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval(Duration::from_millis(service.config.interval_ms.max(1)));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match service.run_cycle().await {
                            Ok(report) => info!(
                                processed = report.processed,
                                decayed = report.decayed,
                                entropy = report.entropy,
                                duration_ms = report.duration_ms,
                                errors = report.errors.len(),
                                "decay cycle complete"
                            ),
                            Err(StoreError::Conflict(_)) => {
                                warn!("decay cycle still in flight, skipping tick")
                            }
                            Err(e) => error!(error = %e, "decay cycle failed"),
                        }
                    }
                    _ = shutdown_rx.changed() => break,
                }
            }
            debug!("decay scheduler worker stopped");
        });
        *worker = Some(handle);
        info!(interval_ms = self.config.interval_ms, "decay scheduler started");
    }

    /// Cancel the ticker and wait for any in-flight cycle to settle.
    pub async fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
        let handle = self
            .worker
            .lock()
            .expect("worker lock poisoned")
            .take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
        info!("decay scheduler stopped");
    }

    /// Run one decay cycle. Refused with [`StoreError::Conflict`] while
    /// another cycle holds the latch.
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        if self.is_running.swap(true, Ordering::SeqCst) {
            return Err(StoreError::Conflict(
                "a decay cycle is already in flight".into(),
            ));
        }
        let result = self.run_cycle_inner().await;
        self.is_running.store(false, Ordering::SeqCst);
        result
    }

    /// Read-path hook: refresh `last_accessed_at` and bump `recall_count`.
    pub async fn on_access(&self, id: &str) -> Result<()> {
        let result = sqlx::query(
            "UPDATE chats SET last_accessed_at = $2, recall_count = recall_count + 1 \
             WHERE id = $1",
        )
        .bind(id)
        .bind(now_ms())
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    /// Snapshot of the in-memory service counters.
    pub fn service_metrics(&self) -> ServiceMetrics {
        self.metrics.lock().expect("metrics lock poisoned").clone()
    }

    /// Most recent persisted run metrics, newest first.
    pub async fn recent_runs(&self, limit: i64) -> Result<Vec<DecayRunMetric>> {
        let rows = sqlx::query(
            "SELECT run_timestamp, items_processed, items_decayed, error_count, \
             average_decay_amount, memory_entropy, environmental_context, \
             processing_duration_ms \
             FROM salience_decay_metrics ORDER BY run_timestamp DESC LIMIT $1",
        )
        .bind(limit.max(1))
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(DecayRunMetric {
                    run_timestamp: row.try_get("run_timestamp")?,
                    items_processed: row.try_get("items_processed")?,
                    items_decayed: row.try_get("items_decayed")?,
                    error_count: row.try_get("error_count")?,
                    average_decay_amount: row.try_get("average_decay_amount")?,
                    memory_entropy: row.try_get("memory_entropy")?,
                    environmental_context: row.try_get("environmental_context")?,
                    processing_duration_ms: row.try_get("processing_duration_ms")?,
                })
            })
            .collect()
    }

    async fn run_cycle_inner(&self) -> Result<CycleReport> {
        let started = Instant::now();
        let now = now_ms();
        let context = EnvironmentalContext::current(self.context_override);
        debug!(context = %context, "decay cycle starting");

        let mut report = CycleReport::default();
        let mut total_decay = 0.0f64;

        for table in [SweepTable::Chats, SweepTable::Facts] {
            self.sweep_table(table, now, context, &mut report, &mut total_decay)
                .await;
        }

        report.entropy = match self.live_entropy().await {
            Ok(entropy) => entropy,
            Err(e) => {
                report.errors.push(format!("entropy computation failed: {e}"));
                0.0
            }
        };
        report.duration_ms = started.elapsed().as_millis() as u64;

        let average_decay = if report.decayed > 0 {
            total_decay / report.decayed as f64
        } else {
            0.0
        };

        if let Err(e) = self
            .record_metric(now, &report, average_decay, context)
            .await
        {
            report.errors.push(format!("metric insert failed: {e}"));
        }

        self.metrics
            .lock()
            .expect("metrics lock poisoned")
            .record_cycle(now, report.entropy);

        Ok(report)
    }

    /// Sweep one table in cursor-paged batches. Batch failures are recorded
    /// and end the table's sweep; the cycle moves on to the next table.
    async fn sweep_table(
        &self,
        table: SweepTable,
        now: i64,
        context: EnvironmentalContext,
        report: &mut CycleReport,
        total_decay: &mut f64,
    ) {
        let mut cursor: Option<String> = None;
        loop {
            match self
                .sweep_batch(table, now, context, cursor.as_deref(), report, total_decay)
                .await
            {
                Ok(Some(next_cursor)) => {
                    cursor = Some(next_cursor);
                    tokio::time::sleep(Duration::from_millis(self.config.batch_pause_ms)).await;
                }
                Ok(None) => break,
                Err(e) => {
                    let err = StoreError::DecayBatch(format!("{} sweep: {e}", table.name()));
                    warn!(table = table.name(), error = %err, "decay batch failed");
                    report.errors.push(err.to_string());
                    break;
                }
            }
        }
    }

    /// Process one batch. Returns the cursor for the next batch, or `None`
    /// when the table is exhausted.
    async fn sweep_batch(
        &self,
        table: SweepTable,
        now: i64,
        context: EnvironmentalContext,
        cursor: Option<&str>,
        report: &mut CycleReport,
        total_decay: &mut f64,
    ) -> Result<Option<String>> {
        let select_sql = match table {
            SweepTable::Chats => {
                "SELECT id, salience, memory_type, recall_count, last_accessed_at, decay_metadata \
                 FROM chats \
                 WHERE salience > 0.1 \
                   AND (decay_metadata->>'last_decay_run' IS NULL \
                        OR $1 - (decay_metadata->>'last_decay_run')::bigint > $2) \
                   AND ($3::text IS NULL OR id > $3) \
                 ORDER BY id ASC LIMIT $4"
            }
            SweepTable::Facts => {
                "SELECT id::text AS id, salience, NULL::text AS memory_type, recall_count, \
                 last_accessed_at, decay_metadata \
                 FROM facts \
                 WHERE salience > 0.1 \
                   AND (decay_metadata->>'last_decay_run' IS NULL \
                        OR $1 - (decay_metadata->>'last_decay_run')::bigint > $2) \
                   AND ($3::text IS NULL OR id::text > $3) \
                 ORDER BY id::text ASC LIMIT $4"
            }
        };

        let rows: Vec<PgRow> = sqlx::query(select_sql)
            .bind(now)
            .bind(self.config.interval_ms as i64)
            .bind(cursor)
            .bind(self.config.batch_size)
            .fetch_all(&self.pool)
            .await?;

        report.batches += 1;
        let batch_len = rows.len();
        let mut last_id: Option<String> = None;

        for row in &rows {
            let sweep_row = SweepRow {
                id: row.try_get("id")?,
                salience: row.try_get("salience")?,
                memory_type: row.try_get("memory_type")?,
                recall_count: row.try_get("recall_count")?,
                last_accessed_at: row.try_get("last_accessed_at")?,
                decay_metadata: row.try_get("decay_metadata")?,
            };
            last_id = Some(sweep_row.id.clone());
            report.processed += 1;

            if let Some(update) = plan_row_update(&sweep_row, now, context)? {
                let update_sql = match table {
                    SweepTable::Chats => {
                        "UPDATE chats SET salience = $1, decay_metadata = $2 WHERE id = $3"
                    }
                    SweepTable::Facts => {
                        "UPDATE facts SET salience = $1, decay_metadata = $2 WHERE id::text = $3"
                    }
                };
                sqlx::query(update_sql)
                    .bind(update.new_salience)
                    .bind(&update.decay_metadata)
                    .bind(&sweep_row.id)
                    .execute(&self.pool)
                    .await?;
                report.decayed += 1;
                *total_decay += update.decay_amount;
            }
        }

        if (batch_len as i64) < self.config.batch_size {
            Ok(None)
        } else {
            Ok(last_id)
        }
    }

    /// Normalised entropy over every live salience value in both tables.
    async fn live_entropy(&self) -> Result<f64> {
        let values: Vec<f64> = sqlx::query_scalar(
            "SELECT salience FROM chats \
             UNION ALL \
             SELECT salience FROM facts WHERE valid_to IS NULL",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(similarity::entropy(&values))
    }

    async fn record_metric(
        &self,
        run_timestamp: i64,
        report: &CycleReport,
        average_decay: f64,
        context: EnvironmentalContext,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO salience_decay_metrics (run_timestamp, items_processed, \
             items_decayed, error_count, average_decay_amount, memory_entropy, \
             environmental_context, processing_duration_ms) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(run_timestamp)
        .bind(report.processed as i64)
        .bind(report.decayed as i64)
        .bind(report.errors.len() as i64)
        .bind(average_decay)
        .bind(report.entropy)
        .bind(context.as_str())
        .bind(report.duration_ms as i64)
        .execute(&self.pool)
        .await?;

        // Metric rows are kept for at least a week, then pruned.
        let retention_ms = self.config.metrics_retention_days as i64 * 86_400_000;
        sqlx::query("DELETE FROM salience_decay_metrics WHERE run_timestamp < $1")
            .bind(run_timestamp - retention_ms)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
