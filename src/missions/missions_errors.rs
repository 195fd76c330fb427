use thiserror::Error;

/// Custom error type for mission lifecycle operations. Every variant is a
/// guard failure evaluated inside the ledger transaction; a failed guard
/// aborts with no partial writes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MissionError {
    #[error("Only the alliance leader can start a special mission")]
    NotLeader,

    #[error("Alliance does not exist or has no members")]
    AllianceMissingOrEmpty,

    #[error("The alliance already has an active special mission")]
    MissionAlreadyActive,

    #[error("There is no active special mission")]
    NoActiveMission,

    #[error("Member '{0}' is not part of this alliance")]
    NotAMember(String),
}
