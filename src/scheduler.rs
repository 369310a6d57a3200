//! Cron-driven report scheduler.
//!
//! One scheduler instance owns a periodic tick. A tick that arrives while a
//! previous sweep is still running is skipped outright, so at most one sweep
//! is ever in flight. Each sweep fetches the due jobs, executes them
//! sequentially and advances each job's `next_run` from its cron expression
//! regardless of whether execution succeeded.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::db::{DatabaseError, ScheduledJob};
use crate::db::stores::{EventStore, JobStore};
use crate::delivery::{DeliveryError, DeliveryTarget, DeliveryUnit, PreviewSource, ReportPublisher};
use crate::delivery::render_thread_title;
use crate::report;
use crate::schedule;

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(15);

#[derive(Error, Debug)]
pub enum SweepError {
    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

pub struct Scheduler {
    jobs: Arc<dyn JobStore>,
    events: Arc<dyn EventStore>,
    publisher: Arc<dyn ReportPublisher>,
    previews: Arc<dyn PreviewSource>,
    tick_interval: Duration,
    running: AtomicBool,
}

impl Scheduler {
    pub fn new(
        jobs: Arc<dyn JobStore>,
        events: Arc<dyn EventStore>,
        publisher: Arc<dyn ReportPublisher>,
        previews: Arc<dyn PreviewSource>,
        tick_interval: Duration,
    ) -> Self {
        Self {
            jobs,
            events,
            publisher,
            previews,
            tick_interval,
            running: AtomicBool::new(false),
        }
    }

    pub fn start(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.tick_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                self.tick().await;
            }
        })
    }

    /// One timer tick. Skips entirely when a sweep is already in flight;
    /// skipped ticks are not queued or retried early.
    pub async fn tick(&self) {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("previous sweep still running, skipping tick");
            return;
        }
        if let Err(e) = self.sweep().await {
            error!("scheduled job sweep failed: {}", e);
        }
        self.running.store(false, Ordering::SeqCst);
    }

    async fn sweep(&self) -> Result<(), DatabaseError> {
        let due = self.jobs.get_due_jobs(Utc::now()).await?;
        if due.is_empty() {
            return Ok(());
        }
        debug!(count = due.len(), "processing due jobs");

        for job in due {
            if let Err(e) = self.execute_job(&job).await {
                error!(
                    job_id = %job.id,
                    guild_id = job.guild_id,
                    channel_id = job.channel_id,
                    "error executing scheduled job: {}",
                    e
                );
            }

            // Reschedule even after a failed run so a permanently broken job
            // retries at its next cron occurrence instead of every tick.
            match schedule::next_occurrence(&job.cron_expression, Utc::now()) {
                Ok(next_run) => {
                    if let Err(e) = self.jobs.update_job_next_run(&job.id, next_run).await {
                        error!(job_id = %job.id, "failed to update next run: {}", e);
                    }
                }
                Err(e) => {
                    warn!(job_id = %job.id, "job stalled, no next occurrence: {}", e);
                }
            }
        }
        Ok(())
    }

    async fn execute_job(&self, job: &ScheduledJob) -> Result<(), SweepError> {
        let end = Utc::now();
        let window = chrono::Duration::milliseconds((job.interval_hours * 3_600_000.0) as i64);
        let start = end - window;

        let messages = self
            .events
            .top_messages(start, end, job.count as i64, job.guild_id, None, None)
            .await?;
        if messages.is_empty() {
            info!(job_id = %job.id, "no messages found in window, nothing to deliver");
            return Ok(());
        }

        let mut previews = HashMap::new();
        for message in &messages {
            if let Some(preview) = self
                .previews
                .message_preview(&message.url, report::MAX_PREVIEW_LENGTH)
                .await
            {
                previews.insert(message.url.clone(), preview);
            }
        }

        let header = report::sweep_header(job.count, job.interval_hours, start, end);
        let units: Vec<DeliveryUnit> = report::grouped_embeds(&messages, &previews)
            .into_iter()
            .map(DeliveryUnit::Embeds)
            .collect();

        let target = if job.is_forum {
            DeliveryTarget::Forum {
                channel_id: job.channel_id,
                thread_title: render_thread_title(
                    &job.thread_title_template,
                    end,
                    job.count,
                    job.interval_hours,
                ),
            }
        } else {
            DeliveryTarget::Channel { channel_id: job.channel_id }
        };

        self.publisher.publish(&target, &header, &units).await?;
        info!(job_id = %job.id, delivered = messages.len(), "executed scheduled job");
        Ok(())
    }
}
