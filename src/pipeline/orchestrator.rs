// src/pipeline/orchestrator.rs
//! One update run: aggregate → relevance → guard → dedup insert → purge →
//! watermark. At most one run per process.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use metrics::{counter, gauge, histogram};
use serde::Serialize;

use crate::error::StorageError;
use crate::ingest::types::{ProviderReport, SourceProvider};
use crate::ingest::{aggregate, ensure_metrics_described};
use crate::news::{estimate_read_time, NewNewsItem};
use crate::relevance::RelevanceFilter;
use crate::store::{InsertOutcome, NewsStore, Watermark};

pub const DEFAULT_RETENTION_DAYS: i64 = 30;
pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrchestratorConfig {
    pub retention_days: i64,
    pub provider_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            retention_days: DEFAULT_RETENTION_DAYS,
            provider_timeout: DEFAULT_PROVIDER_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum OrchestratorState {
    Idle,
    Running { started_at: DateTime<Utc> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub total_found: usize,
    pub relevant_count: usize,
    pub added: usize,
    pub duplicates: usize,
    pub rejected: usize,
    pub purged: usize,
    pub duration_ms: u64,
    pub providers: Vec<ProviderReport>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RunOutcome {
    Completed(RunReport),
    Skipped {
        reason: String,
    },
    Failed {
        error: String,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    },
}

impl RunOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunOutcome::Completed(_) => "completed",
            RunOutcome::Skipped { .. } => "skipped",
            RunOutcome::Failed { .. } => "failed",
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, RunOutcome::Completed(_))
    }

    pub fn report(&self) -> Option<&RunReport> {
        match self {
            RunOutcome::Completed(r) => Some(r),
            _ => None,
        }
    }
}

const ALREADY_RUNNING: &str = "update already in progress";

/// Restores `Idle` on drop, whatever path the run takes out.
struct RunGuard<'a> {
    state: &'a Mutex<OrchestratorState>,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        *lock(self.state) = OrchestratorState::Idle;
    }
}

// state is a plain enum, a poisoned lock still holds a usable value
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|p| p.into_inner())
}

pub struct UpdateOrchestrator {
    providers: Vec<Arc<dyn SourceProvider>>,
    store: Arc<dyn NewsStore>,
    watermark: Arc<dyn Watermark>,
    filter: RelevanceFilter,
    cfg: OrchestratorConfig,
    state: Mutex<OrchestratorState>,
    last: Mutex<Option<RunOutcome>>,
}

impl UpdateOrchestrator {
    pub fn new(
        providers: Vec<Arc<dyn SourceProvider>>,
        store: Arc<dyn NewsStore>,
        watermark: Arc<dyn Watermark>,
        filter: RelevanceFilter,
        cfg: OrchestratorConfig,
    ) -> Self {
        Self {
            providers,
            store,
            watermark,
            filter,
            cfg,
            state: Mutex::new(OrchestratorState::Idle),
            last: Mutex::new(None),
        }
    }

    pub fn state(&self) -> OrchestratorState {
        *lock(&self.state)
    }

    /// Most recent executed run (completed or failed). Skips are not kept.
    pub fn last_report(&self) -> Option<RunOutcome> {
        lock(&self.last).clone()
    }

    pub fn store(&self) -> &Arc<dyn NewsStore> {
        &self.store
    }

    /// Watermark read for scheduling. Unreadable counts as "never ran".
    pub async fn last_successful_update(&self) -> Option<DateTime<Utc>> {
        match self.watermark.get().await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(target: "scheduler", error = %e, "watermark read failed");
                None
            }
        }
    }

    fn try_begin(&self, started_at: DateTime<Utc>) -> Option<RunGuard<'_>> {
        let mut st = lock(&self.state);
        if matches!(*st, OrchestratorState::Running { .. }) {
            return None;
        }
        *st = OrchestratorState::Running { started_at };
        Some(RunGuard { state: &self.state })
    }

    fn skipped(&self) -> RunOutcome {
        tracing::info!(target: "ingest", "update skipped: already running");
        counter!("news_update_runs_total", "outcome" => "skipped").increment(1);
        RunOutcome::Skipped {
            reason: ALREADY_RUNNING.to_string(),
        }
    }

    pub async fn run(&self) -> RunOutcome {
        ensure_metrics_described();
        let started_at = Utc::now();
        let Some(guard) = self.try_begin(started_at) else {
            return self.skipped();
        };
        tracing::info!(target: "ingest", providers = self.providers.len(), strategy = self.filter.strategy_name(), "update started");

        let res = self.execute(started_at).await;
        let outcome = self.finish(started_at, res);
        drop(guard);
        outcome
    }

    /// Clear the store, then run. Nothing is cleared while another run is in flight.
    pub async fn clear_and_refresh(&self) -> RunOutcome {
        ensure_metrics_described();
        let started_at = Utc::now();
        let Some(guard) = self.try_begin(started_at) else {
            return self.skipped();
        };
        tracing::warn!(target: "store", "clearing all news before refresh");

        let res = match self.store.clear_all().await {
            Ok(()) => self.execute(started_at).await,
            Err(e) => Err(e),
        };
        let outcome = self.finish(started_at, res);
        drop(guard);
        outcome
    }

    fn finish(&self, started_at: DateTime<Utc>, res: Result<RunReport, StorageError>) -> RunOutcome {
        let outcome = match res {
            Ok(report) => {
                tracing::info!(
                    target: "ingest",
                    found = report.total_found,
                    relevant = report.relevant_count,
                    added = report.added,
                    duplicates = report.duplicates,
                    rejected = report.rejected,
                    purged = report.purged,
                    duration_ms = report.duration_ms,
                    "update completed"
                );
                histogram!("news_update_duration_ms").record(report.duration_ms as f64);
                gauge!("news_last_update_ts").set(report.finished_at.timestamp() as f64);
                RunOutcome::Completed(report)
            }
            Err(e) => {
                tracing::error!(target: "ingest", error = %e, "update failed");
                RunOutcome::Failed {
                    error: e.to_string(),
                    started_at,
                    finished_at: Utc::now(),
                }
            }
        };
        counter!("news_update_runs_total", "outcome" => outcome.as_str()).increment(1);
        *lock(&self.last) = Some(outcome.clone());
        outcome
    }

    async fn execute(&self, started_at: DateTime<Utc>) -> Result<RunReport, StorageError> {
        let t0 = Instant::now();
        let agg = aggregate(&self.providers, self.cfg.provider_timeout).await;

        let total_found = agg.candidates.len();
        let mut relevant_count = 0usize;
        let mut added = 0usize;
        let mut duplicates = 0usize;
        let mut rejected = 0usize;

        for cand in agg.candidates {
            if let Err(why) = self
                .filter
                .check_relevance(&cand)
                .and_then(|()| self.filter.ingestion_guard(&cand))
            {
                rejected += 1;
                counter!("news_rejected_total", "reason" => why.kind()).increment(1);
                tracing::debug!(target: "ingest", title = %cand.title, reason = %why, "candidate rejected");
                continue;
            }
            relevant_count += 1;

            if self.store.exists(&cand.url).await? {
                duplicates += 1;
                counter!("news_duplicates_total", "key" => "url").increment(1);
                tracing::debug!(target: "store", url = %cand.url, "duplicate url, skipping");
                continue;
            }

            let category = self.filter.categorize(&cand);
            let read_time_minutes = estimate_read_time(&cand.summary);
            let item = NewNewsItem {
                candidate: cand,
                category,
                read_time_minutes,
            };
            match self.store.insert(item).await? {
                InsertOutcome::Inserted(id) => {
                    added += 1;
                    counter!("news_added_total", "category" => category.as_str()).increment(1);
                    tracing::debug!(target: "store", %id, %category, "news added");
                }
                InsertOutcome::Duplicate(key) => {
                    duplicates += 1;
                    counter!("news_duplicates_total", "key" => key.as_str()).increment(1);
                }
            }
        }

        let cutoff = Utc::now().date_naive() - chrono::Duration::days(self.cfg.retention_days);
        let purged = self.store.purge_older_than(cutoff).await?;
        if purged > 0 {
            counter!("news_purged_total").increment(purged as u64);
            tracing::info!(target: "store", purged, %cutoff, "old news purged");
        }

        let finished_at = Utc::now();
        self.watermark.set(finished_at).await?;

        Ok(RunReport {
            started_at,
            finished_at,
            total_found,
            relevant_count,
            added,
            duplicates,
            rejected,
            purged,
            duration_ms: t0.elapsed().as_millis() as u64,
            providers: agg.reports,
        })
    }
}
