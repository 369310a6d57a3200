use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use tracing::{error, info};

use super::DatabaseError;
use super::models::{ReactionEvent, ReactionTally, ScheduledJob, TopMessage};
use crate::db::schema::{messages, opted_out_users, reactions, scheduled_jobs};

// Fixed-width UTC text keeps lexicographic string comparison equal to
// chronological comparison, which the range and due-job queries rely on.
pub(crate) fn datetime_to_string(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn string_to_datetime(s: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DatabaseError::Query(format!("invalid datetime format: {}", e)))
}

pub(crate) fn establish_connection(path: &str) -> Result<SqliteConnection, DatabaseError> {
    SqliteConnection::establish(path).map_err(|e| DatabaseError::Connection(e.to_string()))
}

fn task_error(e: tokio::task::JoinError) -> DatabaseError {
    DatabaseError::Task(e.to_string())
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = messages)]
struct DbMessage {
    id: i64,
    #[allow(dead_code)]
    guild_id: i64,
    #[allow(dead_code)]
    channel_id: i64,
    author: i64,
    url: String,
    #[allow(dead_code)]
    timestamp: String,
    total_reactions: i32,
}

#[derive(Insertable)]
#[diesel(table_name = messages)]
struct NewMessage<'a> {
    id: i64,
    guild_id: i64,
    channel_id: i64,
    author: i64,
    url: &'a str,
    timestamp: String,
    total_reactions: i32,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = reactions)]
struct DbReaction {
    #[allow(dead_code)]
    id: i32,
    message_id: i64,
    emoji: String,
    reaction_count: i32,
    reaction_id: Option<i64>,
}

#[derive(Insertable)]
#[diesel(table_name = reactions)]
struct NewReaction<'a> {
    message_id: i64,
    emoji: &'a str,
    reaction_count: i32,
    reaction_id: Option<i64>,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = scheduled_jobs)]
struct DbScheduledJob {
    id: String,
    cron_expression: String,
    interval_hours: f64,
    channel_id: i64,
    guild_id: i64,
    count: i32,
    next_run: String,
    created_at: String,
    is_forum: bool,
    thread_title_template: String,
}

impl DbScheduledJob {
    fn to_job(&self) -> Result<ScheduledJob, DatabaseError> {
        Ok(ScheduledJob {
            id: self.id.clone(),
            cron_expression: self.cron_expression.clone(),
            interval_hours: self.interval_hours,
            channel_id: self.channel_id,
            guild_id: self.guild_id,
            count: self.count,
            next_run: string_to_datetime(&self.next_run)?,
            created_at: string_to_datetime(&self.created_at)?,
            is_forum: self.is_forum,
            thread_title_template: self.thread_title_template.clone(),
        })
    }
}

#[derive(Insertable)]
#[diesel(table_name = scheduled_jobs)]
struct NewScheduledJob<'a> {
    id: &'a str,
    cron_expression: &'a str,
    interval_hours: f64,
    channel_id: i64,
    guild_id: i64,
    count: i32,
    next_run: String,
    created_at: String,
    is_forum: bool,
    thread_title_template: &'a str,
}

fn is_opted_out_blocking(conn: &mut SqliteConnection, uid: i64) -> Result<bool, DatabaseError> {
    use crate::db::schema::opted_out_users::dsl::*;
    diesel::select(diesel::dsl::exists(opted_out_users.filter(user_id.eq(uid))))
        .get_result::<bool>(conn)
        .map_err(|e| DatabaseError::Query(e.to_string()))
}

pub struct SqliteEventStore {
    db_path: Arc<String>,
}

impl SqliteEventStore {
    pub fn new(db_path: Arc<String>) -> Self {
        Self { db_path }
    }
}

#[async_trait]
impl super::EventStore for SqliteEventStore {
    async fn record_reaction_state(&self, event: &ReactionEvent) -> Result<(), DatabaseError> {
        let event = event.clone();
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = establish_connection(&db_path)?;

            if is_opted_out_blocking(&mut conn, event.author_id)? {
                info!(
                    message_id = event.message_id,
                    author_id = event.author_id,
                    "skipping reaction event, author opted out"
                );
                return Ok(());
            }

            let outcome = conn.transaction::<_, diesel::result::Error, _>(|conn| {
                if event.reactions.is_empty() {
                    diesel::delete(
                        reactions::table.filter(reactions::message_id.eq(event.message_id)),
                    )
                    .execute(conn)?;
                    diesel::delete(messages::table.filter(messages::id.eq(event.message_id)))
                        .execute(conn)?;
                    return Ok(());
                }

                let new_message = NewMessage {
                    id: event.message_id,
                    guild_id: event.guild_id,
                    channel_id: event.channel_id,
                    author: event.author_id,
                    url: &event.url,
                    timestamp: datetime_to_string(&event.timestamp),
                    total_reactions: event.total_reactions(),
                };
                diesel::replace_into(messages::table)
                    .values(&new_message)
                    .execute(conn)?;

                diesel::delete(
                    reactions::table.filter(reactions::message_id.eq(event.message_id)),
                )
                .execute(conn)?;

                for tally in &event.reactions {
                    let new_reaction = NewReaction {
                        message_id: event.message_id,
                        emoji: &tally.emoji,
                        reaction_count: tally.count,
                        reaction_id: tally.custom_emoji_id,
                    };
                    diesel::insert_into(reactions::table)
                        .values(&new_reaction)
                        .execute(conn)?;
                }
                Ok(())
            });

            outcome.map_err(|e| {
                error!(
                    message_id = event.message_id,
                    guild_id = event.guild_id,
                    channel_id = event.channel_id,
                    author_id = event.author_id,
                    "failed to record reaction state: {}",
                    e
                );
                DatabaseError::Query(e.to_string())
            })
        })
        .await
        .map_err(task_error)?
    }

    async fn opt_out_user(&self, uid: i64) -> Result<(), DatabaseError> {
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = establish_connection(&db_path)?;
            conn.transaction::<_, diesel::result::Error, _>(|conn| {
                let ids: Vec<i64> = messages::table
                    .filter(messages::author.eq(uid))
                    .select(messages::id)
                    .load(conn)?;

                diesel::delete(reactions::table.filter(reactions::message_id.eq_any(&ids)))
                    .execute(conn)?;
                diesel::delete(messages::table.filter(messages::id.eq_any(&ids)))
                    .execute(conn)?;

                diesel::insert_or_ignore_into(opted_out_users::table)
                    .values((
                        opted_out_users::user_id.eq(uid),
                        opted_out_users::opted_out_at.eq(datetime_to_string(&Utc::now())),
                    ))
                    .execute(conn)?;
                Ok(())
            })
            .map_err(|e| {
                error!(user_id = uid, "failed to opt out user: {}", e);
                DatabaseError::Query(e.to_string())
            })
        })
        .await
        .map_err(task_error)?
    }

    async fn opt_in_user(&self, uid: i64) -> Result<(), DatabaseError> {
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = establish_connection(&db_path)?;
            diesel::delete(opted_out_users::table.filter(opted_out_users::user_id.eq(uid)))
                .execute(&mut conn)
                .map(|_| ())
                .map_err(|e| DatabaseError::Query(e.to_string()))
        })
        .await
        .map_err(task_error)?
    }

    async fn is_opted_out(&self, uid: i64) -> Result<bool, DatabaseError> {
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = establish_connection(&db_path)?;
            is_opted_out_blocking(&mut conn, uid)
        })
        .await
        .map_err(task_error)?
    }

    async fn delete_messages(
        &self,
        guild: i64,
        channel: Option<i64>,
        user: Option<i64>,
    ) -> Result<usize, DatabaseError> {
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = establish_connection(&db_path)?;
            conn.transaction::<_, diesel::result::Error, _>(|conn| {
                let mut query = messages::table
                    .filter(messages::guild_id.eq(guild))
                    .select(messages::id)
                    .into_boxed();
                if let Some(channel) = channel {
                    query = query.filter(messages::channel_id.eq(channel));
                }
                if let Some(user) = user {
                    query = query.filter(messages::author.eq(user));
                }
                let ids: Vec<i64> = query.load(conn)?;

                diesel::delete(reactions::table.filter(reactions::message_id.eq_any(&ids)))
                    .execute(conn)?;
                let removed = diesel::delete(messages::table.filter(messages::id.eq_any(&ids)))
                    .execute(conn)?;
                Ok(removed)
            })
            .map_err(|e| {
                error!(
                    guild_id = guild,
                    channel_id = channel,
                    user_id = user,
                    "failed to delete messages: {}",
                    e
                );
                DatabaseError::Query(e.to_string())
            })
        })
        .await
        .map_err(task_error)?
    }

    async fn top_messages(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: i64,
        guild: i64,
        channel: Option<i64>,
        user: Option<i64>,
    ) -> Result<Vec<TopMessage>, DatabaseError> {
        let db_path = self.db_path.clone();
        let start = datetime_to_string(&start);
        let end = datetime_to_string(&end);
        tokio::task::spawn_blocking(move || {
            let mut conn = establish_connection(&db_path)?;

            let mut query = messages::table
                .select(DbMessage::as_select())
                .filter(messages::guild_id.eq(guild))
                .filter(messages::timestamp.ge(start))
                .filter(messages::timestamp.lt(end))
                .into_boxed();
            if let Some(channel) = channel {
                query = query.filter(messages::channel_id.eq(channel));
            }
            if let Some(user) = user {
                query = query.filter(messages::author.eq(user));
            }

            let rows: Vec<DbMessage> = query
                .order((
                    messages::total_reactions.desc(),
                    messages::timestamp.asc(),
                    messages::id.asc(),
                ))
                .limit(limit)
                .load(&mut conn)
                .map_err(|e| DatabaseError::Query(e.to_string()))?;

            let ids: Vec<i64> = rows.iter().map(|m| m.id).collect();
            let reaction_rows: Vec<DbReaction> = reactions::table
                .select(DbReaction::as_select())
                .filter(reactions::message_id.eq_any(&ids))
                .order((reactions::message_id.asc(), reactions::id.asc()))
                .load(&mut conn)
                .map_err(|e| DatabaseError::Query(e.to_string()))?;

            let mut breakdown: HashMap<i64, Vec<ReactionTally>> = HashMap::new();
            for row in reaction_rows {
                breakdown.entry(row.message_id).or_default().push(ReactionTally {
                    emoji: row.emoji,
                    count: row.reaction_count,
                    custom_emoji_id: row.reaction_id,
                });
            }

            Ok(rows
                .into_iter()
                .map(|m| TopMessage {
                    reactions: breakdown.remove(&m.id).unwrap_or_default(),
                    url: m.url,
                    author_id: m.author,
                    total_reactions: m.total_reactions,
                })
                .collect())
        })
        .await
        .map_err(task_error)?
    }
}

pub struct SqliteJobStore {
    db_path: Arc<String>,
}

impl SqliteJobStore {
    pub fn new(db_path: Arc<String>) -> Self {
        Self { db_path }
    }
}

#[async_trait]
impl super::JobStore for SqliteJobStore {
    async fn create_scheduled_job(&self, job: &ScheduledJob) -> Result<(), DatabaseError> {
        let job = job.clone();
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = establish_connection(&db_path)?;
            let new_job = NewScheduledJob {
                id: &job.id,
                cron_expression: &job.cron_expression,
                interval_hours: job.interval_hours,
                channel_id: job.channel_id,
                guild_id: job.guild_id,
                count: job.count,
                next_run: datetime_to_string(&job.next_run),
                created_at: datetime_to_string(&job.created_at),
                is_forum: job.is_forum,
                thread_title_template: &job.thread_title_template,
            };
            diesel::insert_into(scheduled_jobs::table)
                .values(&new_job)
                .execute(&mut conn)
                .map(|_| ())
                .map_err(|e| DatabaseError::Query(e.to_string()))
        })
        .await
        .map_err(task_error)?
    }

    async fn get_due_jobs(&self, now: DateTime<Utc>) -> Result<Vec<ScheduledJob>, DatabaseError> {
        let db_path = self.db_path.clone();
        let now = datetime_to_string(&now);
        tokio::task::spawn_blocking(move || {
            let mut conn = establish_connection(&db_path)?;
            let rows: Vec<DbScheduledJob> = scheduled_jobs::table
                .select(DbScheduledJob::as_select())
                .filter(scheduled_jobs::next_run.le(now))
                .order(scheduled_jobs::next_run.asc())
                .load(&mut conn)
                .map_err(|e| DatabaseError::Query(e.to_string()))?;
            rows.iter().map(|j| j.to_job()).collect()
        })
        .await
        .map_err(task_error)?
    }

    async fn update_job_next_run(
        &self,
        job_id: &str,
        next_run: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        let job_id = job_id.to_string();
        let db_path = self.db_path.clone();
        let next_run = datetime_to_string(&next_run);
        tokio::task::spawn_blocking(move || {
            let mut conn = establish_connection(&db_path)?;
            diesel::update(scheduled_jobs::table.filter(scheduled_jobs::id.eq(&job_id)))
                .set(scheduled_jobs::next_run.eq(next_run))
                .execute(&mut conn)
                .map(|_| ())
                .map_err(|e| DatabaseError::Query(e.to_string()))
        })
        .await
        .map_err(task_error)?
    }

    async fn get_jobs_for_guild(&self, guild: i64) -> Result<Vec<ScheduledJob>, DatabaseError> {
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = establish_connection(&db_path)?;
            let rows: Vec<DbScheduledJob> = scheduled_jobs::table
                .select(DbScheduledJob::as_select())
                .filter(scheduled_jobs::guild_id.eq(guild))
                .order(scheduled_jobs::created_at.asc())
                .load(&mut conn)
                .map_err(|e| DatabaseError::Query(e.to_string()))?;
            rows.iter().map(|j| j.to_job()).collect()
        })
        .await
        .map_err(task_error)?
    }

    async fn get_job_by_id(&self, job_id: &str) -> Result<Option<ScheduledJob>, DatabaseError> {
        let job_id = job_id.to_string();
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = establish_connection(&db_path)?;
            scheduled_jobs::table
                .select(DbScheduledJob::as_select())
                .filter(scheduled_jobs::id.eq(&job_id))
                .first::<DbScheduledJob>(&mut conn)
                .optional()
                .map_err(|e| DatabaseError::Query(e.to_string()))?
                .map(|j| j.to_job())
                .transpose()
        })
        .await
        .map_err(task_error)?
    }

    async fn delete_job(&self, job_id: &str) -> Result<(), DatabaseError> {
        let job_id = job_id.to_string();
        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = establish_connection(&db_path)?;
            diesel::delete(scheduled_jobs::table.filter(scheduled_jobs::id.eq(&job_id)))
                .execute(&mut conn)
                .map(|_| ())
                .map_err(|e| DatabaseError::Query(e.to_string()))
        })
        .await
        .map_err(task_error)?
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use tempfile::TempDir;

    use super::*;
    use crate::db::stores::{EventStore, JobStore};
    use crate::db::{DatabaseManager, ScheduledJob};

    async fn test_db() -> (TempDir, DatabaseManager) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.db").to_string_lossy().into_owned();
        let manager = DatabaseManager::new(&path);
        manager.migrate().await.unwrap();
        (dir, manager)
    }

    fn tally(emoji: &str, count: i32, custom: Option<i64>) -> ReactionTally {
        ReactionTally { emoji: emoji.into(), count, custom_emoji_id: custom }
    }

    fn event(message_id: i64, author: i64, reactions: Vec<ReactionTally>) -> ReactionEvent {
        ReactionEvent {
            message_id,
            guild_id: 10,
            channel_id: 20,
            author_id: author,
            url: format!("https://discord.com/channels/10/20/{message_id}"),
            timestamp: Utc::now(),
            reactions,
        }
    }

    #[tokio::test]
    async fn records_message_with_reaction_breakdown() {
        let (_dir, db) = test_db().await;
        let store = db.event_store();
        let t0 = Utc::now();

        store
            .record_reaction_state(&event(1, 100, vec![tally("👍", 3, None), tally("🎉", 2, None)]))
            .await
            .unwrap();

        let top = store
            .top_messages(t0 - Duration::hours(1), t0 + Duration::hours(1), 10, 10, None, None)
            .await
            .unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].total_reactions, 5);
        assert_eq!(top[0].reactions, vec![tally("👍", 3, None), tally("🎉", 2, None)]);
    }

    #[tokio::test]
    async fn total_matches_sum_after_replacement() {
        let (_dir, db) = test_db().await;
        let store = db.event_store();
        let t0 = Utc::now();

        let mut ev = event(1, 100, vec![tally("👍", 3, None)]);
        store.record_reaction_state(&ev).await.unwrap();

        // A reaction-change event fully replaces the set, it does not increment.
        ev.reactions = vec![tally("👍", 1, None), tally("custom", 4, Some(777))];
        store.record_reaction_state(&ev).await.unwrap();

        let top = store
            .top_messages(t0 - Duration::hours(1), t0 + Duration::hours(1), 10, 10, None, None)
            .await
            .unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].total_reactions, 5);
        assert_eq!(
            top[0].reactions,
            vec![tally("👍", 1, None), tally("custom", 4, Some(777))]
        );
    }

    #[tokio::test]
    async fn empty_reaction_set_deletes_message() {
        let (_dir, db) = test_db().await;
        let store = db.event_store();
        let t0 = Utc::now();

        let mut ev = event(1, 100, vec![tally("👍", 3, None)]);
        store.record_reaction_state(&ev).await.unwrap();
        ev.reactions.clear();
        store.record_reaction_state(&ev).await.unwrap();
        // Deleting an already-absent message is not an error.
        store.record_reaction_state(&ev).await.unwrap();

        let top = store
            .top_messages(t0 - Duration::hours(1), t0 + Duration::hours(1), 10, 10, None, None)
            .await
            .unwrap();
        assert!(top.is_empty());
    }

    #[tokio::test]
    async fn ordering_and_limit() {
        let (_dir, db) = test_db().await;
        let store = db.event_store();
        let t0 = Utc::now();

        for (id, count) in [(1, 2), (2, 7), (3, 7), (4, 1)] {
            let mut ev = event(id, 100, vec![tally("👍", count, None)]);
            // Tied totals break by timestamp ascending, then id.
            ev.timestamp = t0 + Duration::seconds(id);
            store.record_reaction_state(&ev).await.unwrap();
        }

        let top = store
            .top_messages(t0 - Duration::hours(1), t0 + Duration::hours(1), 3, 10, None, None)
            .await
            .unwrap();
        let totals: Vec<i32> = top.iter().map(|m| m.total_reactions).collect();
        assert_eq!(totals, vec![7, 7, 2]);
        assert!(top[0].url.ends_with("/2"));
        assert!(top[1].url.ends_with("/3"));
    }

    #[tokio::test]
    async fn channel_and_user_filters() {
        let (_dir, db) = test_db().await;
        let store = db.event_store();
        let t0 = Utc::now();

        let mut a = event(1, 100, vec![tally("👍", 3, None)]);
        a.channel_id = 20;
        let mut b = event(2, 200, vec![tally("👍", 5, None)]);
        b.channel_id = 21;
        store.record_reaction_state(&a).await.unwrap();
        store.record_reaction_state(&b).await.unwrap();

        let start = t0 - Duration::hours(1);
        let end = t0 + Duration::hours(1);
        let by_channel = store.top_messages(start, end, 10, 10, Some(20), None).await.unwrap();
        assert_eq!(by_channel.len(), 1);
        assert_eq!(by_channel[0].author_id, 100);

        let by_user = store.top_messages(start, end, 10, 10, None, Some(200)).await.unwrap();
        assert_eq!(by_user.len(), 1);
        assert_eq!(by_user[0].total_reactions, 5);

        let other_guild = store.top_messages(start, end, 10, 99, None, None).await.unwrap();
        assert!(other_guild.is_empty());
    }

    #[tokio::test]
    async fn opt_out_purges_and_gates_ingestion() {
        let (_dir, db) = test_db().await;
        let store = db.event_store();
        let t0 = Utc::now();

        for id in 1..=3 {
            store
                .record_reaction_state(&event(id, 100, vec![tally("👍", 2, None)]))
                .await
                .unwrap();
        }
        store
            .record_reaction_state(&event(4, 200, vec![tally("👍", 2, None)]))
            .await
            .unwrap();

        store.opt_out_user(100).await.unwrap();
        assert!(store.is_opted_out(100).await.unwrap());
        // Opting out twice is a no-op.
        store.opt_out_user(100).await.unwrap();

        let start = t0 - Duration::hours(1);
        let end = t0 + Duration::hours(1);
        let top = store.top_messages(start, end, 10, 10, None, None).await.unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].author_id, 200);

        // New events for the opted-out author are dropped.
        store
            .record_reaction_state(&event(5, 100, vec![tally("👍", 9, None)]))
            .await
            .unwrap();
        let top = store.top_messages(start, end, 10, 10, None, None).await.unwrap();
        assert_eq!(top.len(), 1);

        // Opting back in resumes tracking but does not restore history.
        store.opt_in_user(100).await.unwrap();
        assert!(!store.is_opted_out(100).await.unwrap());
        store
            .record_reaction_state(&event(6, 100, vec![tally("👍", 9, None)]))
            .await
            .unwrap();
        let top = store.top_messages(start, end, 10, 10, None, None).await.unwrap();
        assert_eq!(top.len(), 2);
    }

    #[tokio::test]
    async fn delete_messages_respects_filters_and_returns_count() {
        let (_dir, db) = test_db().await;
        let store = db.event_store();

        let mut a = event(1, 100, vec![tally("👍", 1, None)]);
        a.channel_id = 20;
        let mut b = event(2, 100, vec![tally("👍", 1, None)]);
        b.channel_id = 21;
        let mut c = event(3, 200, vec![tally("👍", 1, None)]);
        c.channel_id = 21;
        for ev in [&a, &b, &c] {
            store.record_reaction_state(ev).await.unwrap();
        }

        let removed = store.delete_messages(10, Some(21), Some(100)).await.unwrap();
        assert_eq!(removed, 1);
        let removed = store.delete_messages(10, None, None).await.unwrap();
        assert_eq!(removed, 2);
        let removed = store.delete_messages(10, None, None).await.unwrap();
        assert_eq!(removed, 0);
    }

    #[tokio::test]
    async fn single_date_form_covers_one_day() {
        let (_dir, db) = test_db().await;
        let store = db.event_store();

        let day = chrono::NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
        let mut inside = event(1, 100, vec![tally("👍", 1, None)]);
        inside.timestamp = day.and_hms_opt(23, 59, 59).unwrap().and_utc();
        let mut outside = event(2, 100, vec![tally("👍", 1, None)]);
        outside.timestamp = day.succ_opt().unwrap().and_hms_opt(0, 0, 0).unwrap().and_utc();
        store.record_reaction_state(&inside).await.unwrap();
        store.record_reaction_state(&outside).await.unwrap();

        let top = store.top_messages_for_date(day, 10, 10, None, None).await.unwrap();
        assert_eq!(top.len(), 1);
        assert!(top[0].url.ends_with("/1"));
    }

    #[tokio::test]
    async fn job_store_round_trip() {
        let (_dir, db) = test_db().await;
        let jobs = db.job_store();

        let job = ScheduledJob::create("0 */4 * * *", 4.0, 42, 10, 5, false, "").unwrap();
        jobs.create_scheduled_job(&job).await.unwrap();

        let fetched = jobs.get_job_by_id(&job.id).await.unwrap().unwrap();
        assert_eq!(fetched.cron_expression, "0 */4 * * *");
        assert_eq!(fetched.channel_id, 42);
        assert_eq!(fetched.next_run, job.next_run);

        let for_guild = jobs.get_jobs_for_guild(10).await.unwrap();
        assert_eq!(for_guild.len(), 1);
        assert!(jobs.get_jobs_for_guild(99).await.unwrap().is_empty());

        jobs.delete_job(&job.id).await.unwrap();
        assert!(jobs.get_job_by_id(&job.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn due_jobs_filter_on_next_run() {
        let (_dir, db) = test_db().await;
        let jobs = db.job_store();

        let job = ScheduledJob::create("* * * * *", 1.0, 42, 10, 5, false, "").unwrap();
        jobs.create_scheduled_job(&job).await.unwrap();

        // Not due before next_run.
        let due = jobs.get_due_jobs(job.next_run - Duration::seconds(1)).await.unwrap();
        assert!(due.is_empty());

        let due = jobs.get_due_jobs(job.next_run).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, job.id);

        let rescheduled = job.next_run + Duration::minutes(1);
        jobs.update_job_next_run(&job.id, rescheduled).await.unwrap();
        let due = jobs.get_due_jobs(job.next_run).await.unwrap();
        assert!(due.is_empty());
        let fetched = jobs.get_job_by_id(&job.id).await.unwrap().unwrap();
        assert_eq!(fetched.next_run, rescheduled);
    }
}
