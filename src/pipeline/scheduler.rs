// src/pipeline/scheduler.rs
//! Daily trigger: once per local day at a fixed wall-clock time, with
//! catch-up on start and a short retry after a failed run.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, NaiveTime, Offset, Utc};
use metrics::gauge;
use tokio::task::JoinHandle;

use crate::pipeline::orchestrator::{RunOutcome, UpdateOrchestrator};

const HOUR: u64 = 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailySchedule {
    /// Local wall-clock time of the daily run.
    pub target: NaiveTime,
    /// Fixed UTC offset the target is expressed in (Brasília, no DST).
    pub offset: FixedOffset,
    pub success_interval: Duration,
    pub retry_interval: Duration,
}

impl Default for DailySchedule {
    fn default() -> Self {
        Self {
            target: NaiveTime::from_hms_opt(22, 0, 0).unwrap_or(NaiveTime::MIN),
            offset: FixedOffset::west_opt(3 * 3600).unwrap_or_else(|| Utc.fix()),
            success_interval: Duration::from_secs(24 * HOUR),
            retry_interval: Duration::from_secs(HOUR),
        }
    }
}

impl DailySchedule {
    /// Delay before the first run after start (or after a skipped run).
    pub fn initial_delay(&self, now: DateTime<Utc>, last_update: Option<DateTime<Utc>>) -> Duration {
        let local_now = now.with_timezone(&self.offset).naive_local();
        let today = local_now.date();

        let Some(last) = last_update else {
            return Duration::ZERO;
        };
        if last.with_timezone(&self.offset).date_naive() == today {
            let next = today
                .succ_opt()
                .map(|d| d.and_time(self.target))
                .unwrap_or(local_now);
            return (next - local_now).to_std().unwrap_or(Duration::ZERO);
        }

        let target_today = today.and_time(self.target);
        if local_now >= target_today {
            Duration::ZERO
        } else {
            (target_today - local_now).to_std().unwrap_or(Duration::ZERO)
        }
    }

    /// Delay after a run finished with `outcome`. A skip re-derives the
    /// delay from the persisted watermark.
    pub fn next_delay(
        &self,
        outcome: &RunOutcome,
        now: DateTime<Utc>,
        last_update: Option<DateTime<Utc>>,
    ) -> Duration {
        match outcome {
            RunOutcome::Completed(_) => self.success_interval,
            RunOutcome::Failed { .. } => self.retry_interval,
            RunOutcome::Skipped { .. } => self.initial_delay(now, last_update),
        }
    }
}

/// Spawn the daily update loop on the runtime.
pub fn spawn_daily_scheduler(
    orchestrator: Arc<UpdateOrchestrator>,
    schedule: DailySchedule,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let last = orchestrator.last_successful_update().await;
        let mut delay = schedule.initial_delay(Utc::now(), last);

        loop {
            tracing::info!(target: "scheduler", delay_secs = delay.as_secs(), "next news update scheduled");
            gauge!("news_scheduler_next_run_secs").set(delay.as_secs_f64());
            tokio::time::sleep(delay).await;

            let outcome = orchestrator.run().await;
            let last = if matches!(outcome, RunOutcome::Skipped { .. }) {
                orchestrator.last_successful_update().await
            } else {
                None
            };
            delay = schedule.next_delay(&outcome, Utc::now(), last);
            if matches!(outcome, RunOutcome::Failed { .. }) {
                tracing::warn!(target: "scheduler", retry_secs = delay.as_secs(), "update failed, retrying early");
            }
        }
    })
}
