use thiserror::Error;

/// Custom error type for ledger store operations
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Transaction aborted after {attempts} conflicting attempts")]
    Conflict { attempts: u32 },

    #[error("Failed to serialize ledger document: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(#[from] diesel::result::ConnectionError),

    #[error("Failed to create database pool: {0}")]
    PoolCreationFailed(#[from] r2d2::Error),

    #[error("Database query failed: {0}")]
    QueryFailed(#[from] diesel::result::Error),

    #[error("Database migration failed: {0}")]
    MigrationFailed(String),
}
