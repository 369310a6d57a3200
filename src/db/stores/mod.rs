use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use super::DatabaseError;
use super::models::{ReactionEvent, ScheduledJob, TopMessage};

/// Durable store for tracked messages, their reaction breakdown and the
/// opt-out list, plus the ranked top-messages query.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Applies a reaction-change event. No-op when the author has opted out.
    /// An empty reaction set deletes the message; otherwise the message row
    /// and its reaction rows are fully replaced in one transaction.
    async fn record_reaction_state(&self, event: &ReactionEvent) -> Result<(), DatabaseError>;

    /// Purges all of the user's messages and marks the user as opted out, in
    /// one transaction. The purge is permanent.
    async fn opt_out_user(&self, user_id: i64) -> Result<(), DatabaseError>;

    /// Removes the opt-out entry. Does not restore purged history.
    async fn opt_in_user(&self, user_id: i64) -> Result<(), DatabaseError>;

    async fn is_opted_out(&self, user_id: i64) -> Result<bool, DatabaseError>;

    /// Deletes messages (and their reactions) matching the guild and the
    /// supplied optional filters. Returns the number of messages removed.
    async fn delete_messages(
        &self,
        guild_id: i64,
        channel_id: Option<i64>,
        user_id: Option<i64>,
    ) -> Result<usize, DatabaseError>;

    /// Ranked retrieval over `[start, end)`, descending by total reaction
    /// count. Ties break by timestamp ascending, then message id ascending.
    /// The limit is applied as given; callers are responsible for clamping.
    async fn top_messages(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: i64,
        guild_id: i64,
        channel_id: Option<i64>,
        user_id: Option<i64>,
    ) -> Result<Vec<TopMessage>, DatabaseError>;

    /// Single-day convenience form of [`EventStore::top_messages`].
    async fn top_messages_for_date(
        &self,
        date: NaiveDate,
        limit: i64,
        guild_id: i64,
        channel_id: Option<i64>,
        user_id: Option<i64>,
    ) -> Result<Vec<TopMessage>, DatabaseError> {
        let start = date
            .and_hms_opt(0, 0, 0)
            .expect("midnight is always valid")
            .and_utc();
        let end = start + chrono::Duration::days(1);
        self.top_messages(start, end, limit, guild_id, channel_id, user_id)
            .await
    }
}

/// Durable store of recurring report definitions.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn create_scheduled_job(&self, job: &ScheduledJob) -> Result<(), DatabaseError>;

    /// All jobs whose `next_run` is at or before `now`.
    async fn get_due_jobs(&self, now: DateTime<Utc>) -> Result<Vec<ScheduledJob>, DatabaseError>;

    async fn update_job_next_run(
        &self,
        job_id: &str,
        next_run: DateTime<Utc>,
    ) -> Result<(), DatabaseError>;

    async fn get_jobs_for_guild(&self, guild_id: i64)
    -> Result<Vec<ScheduledJob>, DatabaseError>;

    async fn get_job_by_id(&self, job_id: &str) -> Result<Option<ScheduledJob>, DatabaseError>;

    async fn delete_job(&self, job_id: &str) -> Result<(), DatabaseError>;
}
