use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("query failed: {0}")]
    Query(String),

    #[error("migration failed: {0}")]
    Migration(String),

    /// The blocking task carrying the operation panicked or was cancelled.
    #[error("storage task failed: {0}")]
    Task(String),
}
