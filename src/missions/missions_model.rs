use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::rewards::rewards_model::RewardReport;

/// Capped contribution categories. The daily chat bonus is not listed here;
/// it is deduplicated by calendar-day key rather than a numeric counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContributionCategory {
    ShopPurchase,
    BattleHit,
    SimpleTask,
    OtherTask,
}

/// Per-category cap and damage configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryRule {
    /// Maximum counted units per member per mission.
    pub cap: u32,
    pub damage_per_unit: i64,
}

impl ContributionCategory {
    pub const fn rule(self) -> CategoryRule {
        match self {
            ContributionCategory::ShopPurchase => CategoryRule {
                cap: 5,
                damage_per_unit: 2,
            },
            ContributionCategory::BattleHit => CategoryRule {
                cap: 10,
                damage_per_unit: 2,
            },
            ContributionCategory::SimpleTask => CategoryRule {
                cap: 10,
                damage_per_unit: 1,
            },
            ContributionCategory::OtherTask => CategoryRule {
                cap: 6,
                damage_per_unit: 4,
            },
        }
    }
}

/// Per-(mission, member) contribution record. Counters only grow and stay
/// within their caps; the day-key set only grows; the one-shot flags
/// transition false to true at most once.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberProgress {
    pub mission_id: String,
    pub member_id: String,
    pub shop_purchases: u32,
    pub battle_hits: u32,
    pub simple_tasks: u32,
    pub other_tasks: u32,
    pub message_days: BTreeSet<String>,
    pub no_unresolved_awarded: bool,
    /// Set by the reward distributor in the same transaction as the grants;
    /// makes a partially failed distribution resumable.
    pub reward_granted: bool,
    pub damage_dealt: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MemberProgress {
    pub fn new(
        mission_id: impl Into<String>,
        member_id: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        MemberProgress {
            mission_id: mission_id.into(),
            member_id: member_id.into(),
            shop_purchases: 0,
            battle_hits: 0,
            simple_tasks: 0,
            other_tasks: 0,
            message_days: BTreeSet::new(),
            no_unresolved_awarded: false,
            reward_granted: false,
            damage_dealt: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskDifficulty {
    VeryEasy,
    Easy,
    Hard,
    Extreme,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskImportance {
    Normal,
    Important,
    VeryImportant,
    Special,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Active,
    Completed,
    Failed,
    Paused,
    Cancelled,
}

impl TaskStatus {
    /// Active and failed tasks both count as unresolved for the bonus check.
    pub fn is_unresolved(self) -> bool {
        matches!(self, TaskStatus::Active | TaskStatus::Failed)
    }
}

/// Read-only view of a task, supplied by the surrounding application.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskView {
    pub difficulty: TaskDifficulty,
    pub importance: TaskImportance,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
}

/// Tri-state result of a contribution attempt. Hard failures (no mission,
/// not a member) are `Err` instead, so the UI can tell "+2 damage",
/// "already maxed" and a genuine error apart.
#[derive(Debug, Clone, PartialEq)]
pub enum ContributionOutcome {
    /// Clamped damage landed on the boss.
    Applied { damage: i64 },
    /// The cap (or daily/one-shot dedupe) already absorbed this event. A
    /// defined steady state, not an error.
    LimitReached,
    /// The time-box had passed; no damage was written and the mission was
    /// finalized instead.
    Expired { finalize: FinalizeOutcome },
}

/// Result of a finalize call. `NoMission` and `StillRunning` are documented
/// no-ops, which is what makes finalize idempotent and freely pollable.
#[derive(Debug, Clone, PartialEq)]
pub enum FinalizeOutcome {
    NoMission,
    StillRunning,
    Closed {
        won: bool,
        /// Present only on the single finalize call that won the reward
        /// distribution; repeats see `None`.
        rewards: Option<RewardReport>,
    },
}

/// Classifies a completed task into its mission category and unit count.
///
/// Simple tasks are the low-tier ones: very-easy or easy difficulty, or
/// normal/important importance. The easy-and-normal combination counts
/// double.
pub fn classify_task(task: &TaskView) -> (ContributionCategory, u32) {
    let simple = matches!(
        task.difficulty,
        TaskDifficulty::VeryEasy | TaskDifficulty::Easy
    ) || matches!(
        task.importance,
        TaskImportance::Normal | TaskImportance::Important
    );

    if simple {
        let units = if task.difficulty == TaskDifficulty::Easy
            && task.importance == TaskImportance::Normal
        {
            2
        } else {
            1
        };
        (ContributionCategory::SimpleTask, units)
    } else {
        (ContributionCategory::OtherTask, 1)
    }
}
