use std::sync::Arc;

use diesel::prelude::*;
use diesel::sql_types::Integer;
use tokio::sync::OnceCell;
use tracing::info;

use super::DatabaseError;
use super::sqlite::{SqliteEventStore, SqliteJobStore, establish_connection};
use super::stores::{EventStore, JobStore};

/// Current schema version, stamped into `PRAGMA user_version`. A fresh file
/// starts at version 0 and walks the same upgrade path as an existing one.
const SCHEMA_VERSION: i32 = 2;

#[derive(QueryableByName)]
struct UserVersion {
    #[diesel(sql_type = Integer)]
    user_version: i32,
}

/// Owns the database path and hands out the stores backed by it. Migration
/// runs at most once per process.
pub struct DatabaseManager {
    db_path: Arc<String>,
    event_store: Arc<SqliteEventStore>,
    job_store: Arc<SqliteJobStore>,
    migrated: OnceCell<()>,
}

impl DatabaseManager {
    pub fn new(db_path: &str) -> Self {
        let db_path = Arc::new(db_path.to_string());
        Self {
            event_store: Arc::new(SqliteEventStore::new(db_path.clone())),
            job_store: Arc::new(SqliteJobStore::new(db_path.clone())),
            db_path,
            migrated: OnceCell::new(),
        }
    }

    pub fn event_store(&self) -> Arc<dyn EventStore> {
        self.event_store.clone()
    }

    pub fn job_store(&self) -> Arc<dyn JobStore> {
        self.job_store.clone()
    }

    pub async fn migrate(&self) -> Result<(), DatabaseError> {
        self.migrated
            .get_or_try_init(|| async {
                let db_path = self.db_path.clone();
                tokio::task::spawn_blocking(move || migrate_blocking(&db_path))
                    .await
                    .map_err(|e| DatabaseError::Task(e.to_string()))?
            })
            .await
            .map(|_| ())
    }
}

fn migrate_blocking(db_path: &str) -> Result<(), DatabaseError> {
    let mut conn = establish_connection(db_path)?;

    let version: i32 = diesel::sql_query("PRAGMA user_version")
        .get_result::<UserVersion>(&mut conn)
        .map_err(|e| DatabaseError::Migration(e.to_string()))?
        .user_version;

    if version >= SCHEMA_VERSION {
        return Ok(());
    }
    info!(from = version, to = SCHEMA_VERSION, "upgrading database schema");

    conn.transaction::<_, diesel::result::Error, _>(|conn| {
        for step in (version + 1)..=SCHEMA_VERSION {
            for statement in upgrade_statements(step) {
                diesel::sql_query(*statement).execute(conn)?;
            }
        }
        diesel::sql_query(format!("PRAGMA user_version = {SCHEMA_VERSION}")).execute(conn)?;
        Ok(())
    })
    .map_err(|e| DatabaseError::Migration(e.to_string()))
}

fn upgrade_statements(step: i32) -> &'static [&'static str] {
    match step {
        1 => &[
            "CREATE TABLE messages (
                id BIGINT PRIMARY KEY NOT NULL,
                guild_id BIGINT NOT NULL,
                channel_id BIGINT NOT NULL,
                author BIGINT NOT NULL,
                url TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                total_reactions INTEGER NOT NULL
            )",
            "CREATE TABLE reactions (
                id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
                message_id BIGINT NOT NULL,
                emoji TEXT NOT NULL,
                reaction_count INTEGER NOT NULL,
                reaction_id BIGINT
            )",
            "CREATE TABLE opted_out_users (
                user_id BIGINT PRIMARY KEY NOT NULL,
                opted_out_at TEXT NOT NULL
            )",
            "CREATE INDEX idx_messages_guild_author ON messages (guild_id, author)",
            "CREATE INDEX idx_messages_guild_timestamp
                ON messages (guild_id, timestamp, total_reactions)",
            "CREATE INDEX idx_messages_guild_channel ON messages (guild_id, channel_id)",
            "CREATE INDEX idx_reactions_message ON reactions (message_id)",
        ],
        2 => &[
            "CREATE TABLE scheduled_jobs (
                id TEXT PRIMARY KEY NOT NULL,
                cron_expression TEXT NOT NULL,
                interval_hours DOUBLE NOT NULL,
                channel_id BIGINT NOT NULL,
                guild_id BIGINT NOT NULL,
                count INTEGER NOT NULL,
                next_run TEXT NOT NULL,
                created_at TEXT NOT NULL,
                is_forum BOOLEAN NOT NULL DEFAULT 0,
                thread_title_template TEXT NOT NULL DEFAULT ''
            )",
            "CREATE INDEX idx_jobs_guild_channel ON scheduled_jobs (guild_id, channel_id)",
            "CREATE INDEX idx_jobs_next_run ON scheduled_jobs (next_run)",
        ],
        _ => &[],
    }
}
