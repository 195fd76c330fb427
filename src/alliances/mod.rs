// Module declarations
pub(crate) mod alliances_model;
pub(crate) mod alliances_repository;

// Re-export the public interface
pub use alliances_model::{Alliance, AllianceStatus, Mission};
pub use alliances_repository::{
    alliance_key, equipment_key, equipment_prefix, member_key, progress_key, progress_prefix,
    AllianceRepository,
};
