#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use clap::Parser;
use tracing::{error, info};

mod cli;
mod config;
mod db;
mod delivery;
mod discord;
mod report;
mod schedule;
mod scheduler;
mod utils;

use cli::{Cli, Commands};
use config::Config;
use db::DatabaseManager;
use delivery::PreviewSource;
use discord::DiscordClient;
use scheduler::Scheduler;
use utils::AppError;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::ValidateConfig) => {
            return match Config::load_from_file(&cli.config) {
                Ok(_) => {
                    println!("Configuration is valid");
                    Ok(())
                }
                Err(e) => {
                    eprintln!("Configuration is invalid: {e}");
                    std::process::exit(1);
                }
            };
        }
        _ => {}
    }

    let config = Config::load_from_file(&cli.config)?;
    utils::logging::init_tracing(&config.logging.level);

    let db = Arc::new(DatabaseManager::new(&config.database.path));
    db.migrate().await?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run(config, db).await,
        Commands::Migrate => {
            info!("database schema is up to date");
            Ok(())
        }
        Commands::Top { guild, start_date, end_date, channel, user, count, post_to } => {
            top(config, db, guild, start_date, end_date, channel, user, count, post_to).await
        }
        Commands::ValidateConfig => unreachable!("handled before startup"),
    }
}

async fn run(config: Config, db: Arc<DatabaseManager>) -> Result<()> {
    info!("reaction stats bot starting up");

    let client = Arc::new(DiscordClient::new(&config.discord.token, &config.discord.api_url));
    let scheduler = Arc::new(Scheduler::new(
        db.job_store(),
        db.event_store(),
        client.clone(),
        client,
        Duration::from_secs(config.scheduler.tick_interval_secs),
    ));
    let scheduler_handle = scheduler.start();
    tokio::pin!(scheduler_handle);

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("received Ctrl+C, beginning shutdown");
        },
        _ = &mut scheduler_handle => {
            info!("scheduler task exited, beginning shutdown");
        },
    }

    scheduler_handle.abort();
    info!("reaction stats bot shutting down");
    Ok(())
}

fn parse_date(value: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("invalid date '{value}', expected YYYY-MM-DD")))
}

fn date_window(
    start_date: Option<&str>,
    end_date: Option<&str>,
) -> Result<(NaiveDate, NaiveDate), AppError> {
    let end = match end_date {
        Some(value) => parse_date(value)?,
        None => Utc::now().date_naive(),
    };
    let start = match start_date {
        Some(value) => parse_date(value)?,
        None => end,
    };

    let span = (end - start).num_days();
    if span < 0 {
        return Err(AppError::Validation(
            "start date must be before or equal to end date".to_string(),
        ));
    }
    if span > 7 {
        return Err(AppError::Validation("date range cannot exceed 7 days".to_string()));
    }
    Ok((start, end))
}

fn range_header(
    count: i64,
    start: NaiveDate,
    end: NaiveDate,
    user: Option<i64>,
    channel: Option<i64>,
) -> String {
    let mut header = format!("Top {count} messages");
    if start == end {
        header.push_str(&format!(" from {}", start.format("%b %d, %Y")));
    } else {
        header.push_str(&format!(
            " from {} to {}",
            start.format("%b %d, %Y"),
            end.format("%b %d, %Y")
        ));
    }
    if let Some(user) = user {
        header.push_str(&format!(" by <@{user}>"));
    }
    if let Some(channel) = channel {
        header.push_str(&format!(" in <#{channel}>"));
    }
    header
}

#[allow(clippy::too_many_arguments)]
async fn top(
    config: Config,
    db: Arc<DatabaseManager>,
    guild: i64,
    start_date: Option<String>,
    end_date: Option<String>,
    channel: Option<i64>,
    user: Option<i64>,
    count: i64,
    post_to: Option<i64>,
) -> Result<()> {
    if !(1..=10).contains(&count) {
        eprintln!("count must be between 1 and 10");
        std::process::exit(1);
    }
    let (start, end) = match date_window(start_date.as_deref(), end_date.as_deref()) {
        Ok(window) => window,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    match run_top_query(&config, &db, guild, start, end, channel, user, count, post_to).await {
        Ok(()) => Ok(()),
        Err(e) => {
            let error_id = utils::error::correlation_id();
            error!(%error_id, guild_id = guild, "top query failed: {}", e);
            eprintln!("Something went wrong. Error ID: {error_id}");
            std::process::exit(1);
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_top_query(
    config: &Config,
    db: &DatabaseManager,
    guild: i64,
    start: NaiveDate,
    end: NaiveDate,
    channel: Option<i64>,
    user: Option<i64>,
    count: i64,
    post_to: Option<i64>,
) -> Result<(), AppError> {
    let query_start = start
        .and_hms_opt(0, 0, 0)
        .expect("midnight is always valid")
        .and_utc();
    // End of range is inclusive of the whole end day.
    let query_end = query_start
        + chrono::Duration::days((end - start).num_days() + 1);

    let messages = db
        .event_store()
        .top_messages(query_start, query_end, count, guild, channel, user)
        .await?;

    if messages.is_empty() {
        let range = if start == end {
            format!("on {}", start.format("%b %d, %Y"))
        } else {
            format!("between {} and {}", start.format("%b %d, %Y"), end.format("%b %d, %Y"))
        };
        println!("No messages found {range}");
        return Ok(());
    }

    let client = DiscordClient::new(&config.discord.token, &config.discord.api_url);
    let mut previews = HashMap::new();
    for message in &messages {
        if let Some(preview) = client
            .message_preview(&message.url, report::MAX_PREVIEW_LENGTH)
            .await
        {
            previews.insert(message.url.clone(), preview);
        }
    }

    let header = range_header(count, start, end, user, channel);
    match post_to {
        Some(channel_id) => {
            for part in report::multipart_text(&messages, &previews, &header) {
                client.send_message(channel_id, Some(&part), &[]).await?;
            }
            info!(channel_id, delivered = messages.len(), "posted top messages");
        }
        None => {
            println!("{header}");
            println!("{}", report::adaptive_text(&messages, &previews));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_window_defaults_to_today() {
        let (start, end) = date_window(None, None).unwrap();
        assert_eq!(start, end);
        assert_eq!(end, Utc::now().date_naive());
    }

    #[test]
    fn start_defaults_to_end_date() {
        let (start, end) = date_window(None, Some("2026-03-14")).unwrap();
        assert_eq!(start, end);
        assert_eq!(end, NaiveDate::from_ymd_opt(2026, 3, 14).unwrap());
    }

    #[test]
    fn inverted_range_is_rejected() {
        let err = date_window(Some("2026-03-15"), Some("2026-03-14"));
        assert!(matches!(err, Err(AppError::Validation(_))));
    }

    #[test]
    fn overlong_range_is_rejected() {
        assert!(date_window(Some("2026-03-01"), Some("2026-03-08")).is_ok());
        let err = date_window(Some("2026-03-01"), Some("2026-03-09"));
        assert!(matches!(err, Err(AppError::Validation(_))));
    }

    #[test]
    fn malformed_date_is_rejected() {
        let err = date_window(Some("03/14/2026"), None);
        assert!(matches!(err, Err(AppError::Validation(_))));
    }

    #[test]
    fn header_names_range_and_filters() {
        let start = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
        let end = NaiveDate::from_ymd_opt(2026, 3, 16).unwrap();
        assert_eq!(
            range_header(5, start, end, Some(7), Some(9)),
            "Top 5 messages from Mar 14, 2026 to Mar 16, 2026 by <@7> in <#9>"
        );
        assert_eq!(range_header(5, start, start, None, None), "Top 5 messages from Mar 14, 2026");
    }
}
