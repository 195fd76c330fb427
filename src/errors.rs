use diesel::result::Error as DieselError;
use thiserror::Error;

use crate::ledger::LedgerError;
use crate::missions::MissionError;

// Create a type alias for Result using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Root error type for the mission engine
#[derive(Error, Debug)]
pub enum Error {
    #[error("Ledger operation failed: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Mission error: {0}")]
    Mission(#[from] MissionError),

    #[error("Input validation failed: {0}")]
    Validation(String),
}

impl From<DieselError> for Error {
    fn from(err: DieselError) -> Self {
        Error::Ledger(LedgerError::QueryFailed(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Ledger(LedgerError::Serialization(err))
    }
}

impl From<r2d2::Error> for Error {
    fn from(err: r2d2::Error) -> Self {
        Error::Ledger(LedgerError::PoolCreationFailed(err))
    }
}

impl From<diesel::result::ConnectionError> for Error {
    fn from(err: diesel::result::ConnectionError) -> Self {
        Error::Ledger(LedgerError::ConnectionFailed(err))
    }
}

impl Error {
    /// Returns the mission-level error when this is one, discarding the
    /// storage wrappers around it.
    pub fn as_mission_error(&self) -> Option<&MissionError> {
        match self {
            Error::Mission(e) => Some(e),
            _ => None,
        }
    }
}
