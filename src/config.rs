pub use self::parser::{Config, DatabaseConfig, DiscordConfig, LoggingConfig, SchedulerConfig};
pub use self::validator::ConfigError;

mod parser;
mod validator;
