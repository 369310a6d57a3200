use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "reaction-stats-bot")]
#[command(about = "Discord reaction statistics bot", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[arg(short, long, env = "CONFIG_PATH", default_value = "config.yaml")]
    pub config: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(about = "Run the bot with the report scheduler")]
    Run,

    #[command(about = "Apply pending database schema upgrades and exit")]
    Migrate,

    #[command(about = "Validate the configuration file")]
    ValidateConfig,

    #[command(about = "Query top reacted messages for a date range")]
    Top {
        #[arg(long, help = "Guild ID to query")]
        guild: i64,

        #[arg(long, help = "Start date (YYYY-MM-DD). Defaults to the end date")]
        start_date: Option<String>,

        #[arg(long, help = "End date (YYYY-MM-DD). Defaults to today")]
        end_date: Option<String>,

        #[arg(long, help = "Filter by channel ID")]
        channel: Option<i64>,

        #[arg(long, help = "Filter by author ID")]
        user: Option<i64>,

        #[arg(long, default_value = "10", help = "Number of messages to show (1-10)")]
        count: i64,

        #[arg(long, help = "Post the result to this channel instead of stdout")]
        post_to: Option<i64>,
    },
}
