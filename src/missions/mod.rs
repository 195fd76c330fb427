// Module declarations
pub(crate) mod missions_constants;
pub(crate) mod missions_damage;
pub(crate) mod missions_errors;
pub(crate) mod missions_model;
pub(crate) mod missions_progress;
pub(crate) mod missions_service;
pub(crate) mod missions_traits;

#[cfg(test)]
mod missions_service_tests;

// Re-export the public interface
pub use missions_constants::*;
pub use missions_damage::{apply_damage, clamp_to_remaining};
pub use missions_errors::MissionError;
pub use missions_model::{
    classify_task, CategoryRule, ContributionCategory, ContributionOutcome, FinalizeOutcome,
    MemberProgress, TaskDifficulty, TaskImportance, TaskStatus, TaskView,
};
pub use missions_service::MissionService;
pub use missions_traits::{Clock, SystemClock, TaskSource};
