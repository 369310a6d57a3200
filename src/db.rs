pub use self::error::DatabaseError;
pub use self::manager::DatabaseManager;
pub use self::models::{JobError, ReactionEvent, ReactionTally, ScheduledJob, TopMessage};
pub use self::stores::{EventStore, JobStore};

pub mod error;
pub mod manager;
pub mod models;
pub mod schema;
pub mod sqlite;
pub mod stores;
