use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::schedule::{self, CronError};

pub const MIN_INTERVAL_HOURS: f64 = 0.5;
pub const MAX_INTERVAL_HOURS: f64 = 168.0;
pub const MIN_JOB_COUNT: i32 = 1;
pub const MAX_JOB_COUNT: i32 = 20;
pub const MAX_THREAD_TITLE_LEN: usize = 100;

/// One emoji on a message together with its aggregate count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionTally {
    pub emoji: String,
    pub count: i32,
    /// Numeric id for custom guild emoji; `None` for unicode emoji.
    pub custom_emoji_id: Option<i64>,
}

/// A "reaction state changed" notification from the gateway. Carries the
/// message's full current reaction set, not a delta.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactionEvent {
    pub message_id: i64,
    pub guild_id: i64,
    pub channel_id: i64,
    pub author_id: i64,
    pub url: String,
    pub timestamp: DateTime<Utc>,
    pub reactions: Vec<ReactionTally>,
}

impl ReactionEvent {
    pub fn total_reactions(&self) -> i32 {
        self.reactions.iter().map(|r| r.count).sum()
    }
}

/// One row of a ranked top-messages result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopMessage {
    pub url: String,
    pub author_id: i64,
    pub total_reactions: i32,
    pub reactions: Vec<ReactionTally>,
}

#[derive(Error, Debug)]
pub enum JobError {
    #[error(
        "invalid interval {0}h: must be between {MIN_INTERVAL_HOURS} and {MAX_INTERVAL_HOURS} hours"
    )]
    Interval(f64),

    #[error("invalid count {0}: must be between {MIN_JOB_COUNT} and {MAX_JOB_COUNT}")]
    Count(i32),

    #[error("thread title template must be 1-{MAX_THREAD_TITLE_LEN} characters")]
    ThreadTitle,

    #[error(transparent)]
    Cron(#[from] CronError),
}

/// A recurring report definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledJob {
    pub id: String,
    pub cron_expression: String,
    pub interval_hours: f64,
    pub channel_id: i64,
    pub guild_id: i64,
    pub count: i32,
    pub next_run: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub is_forum: bool,
    pub thread_title_template: String,
}

impl ScheduledJob {
    /// Validates a new job definition and computes its first `next_run` from
    /// the cron expression. Jobs whose cron expression cannot produce a next
    /// occurrence are rejected here and never persisted.
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        cron_expression: &str,
        interval_hours: f64,
        channel_id: i64,
        guild_id: i64,
        count: i32,
        is_forum: bool,
        thread_title_template: &str,
    ) -> Result<Self, JobError> {
        if !(MIN_INTERVAL_HOURS..=MAX_INTERVAL_HOURS).contains(&interval_hours) {
            return Err(JobError::Interval(interval_hours));
        }
        if !(MIN_JOB_COUNT..=MAX_JOB_COUNT).contains(&count) {
            return Err(JobError::Count(count));
        }
        if is_forum
            && (thread_title_template.is_empty()
                || thread_title_template.chars().count() > MAX_THREAD_TITLE_LEN)
        {
            return Err(JobError::ThreadTitle);
        }

        let now = Utc::now();
        let next_run = schedule::next_occurrence(cron_expression, now)?;

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            cron_expression: cron_expression.to_string(),
            interval_hours,
            channel_id,
            guild_id,
            count,
            next_run,
            created_at: now,
            is_forum,
            thread_title_template: thread_title_template.to_string(),
        })
    }
}
