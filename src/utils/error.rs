use thiserror::Error;
use uuid::Uuid;

use crate::db::DatabaseError;
use crate::db::models::JobError;
use crate::delivery::DeliveryError;
use crate::schedule::CronError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Job error: {0}")]
    Job(#[from] JobError),

    #[error("Cron error: {0}")]
    Cron(#[from] CronError),

    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Correlation id for runtime failures. Shown to the user and attached to
/// the log line so a report can be matched to its stack trace.
pub fn correlation_id() -> Uuid {
    Uuid::new_v4()
}
