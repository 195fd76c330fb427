use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::missions::missions_constants::MISSION_DURATION_DAYS;

/// Alliance status as shown in the roster UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AllianceStatus {
    Active,
    InMission,
}

/// Alliance document. The current special mission is embedded; a new
/// mission supersedes the previous one in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alliance {
    pub id: String,
    pub name: String,
    pub leader_id: String,
    pub member_ids: Vec<String>,
    pub status: AllianceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mission: Option<Mission>,
}

impl Alliance {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        leader_id: impl Into<String>,
        member_ids: Vec<String>,
    ) -> Self {
        Alliance {
            id: id.into(),
            name: name.into(),
            leader_id: leader_id.into(),
            member_ids,
            status: AllianceStatus::Active,
            mission: None,
        }
    }

    pub fn is_member(&self, member_id: &str) -> bool {
        self.member_ids.iter().any(|id| id == member_id)
    }

    /// The embedded mission, only while it is accepting contributions.
    pub fn active_mission(&self) -> Option<&Mission> {
        self.mission.as_ref().filter(|m| m.active)
    }

    pub fn active_mission_mut(&mut self) -> Option<&mut Mission> {
        self.mission.as_mut().filter(|m| m.active)
    }
}

/// One time-boxed raid-boss mission, embedded in its alliance document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mission {
    pub id: String,
    pub active: bool,
    pub started_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub boss_max_hp: i64,
    pub boss_current_hp: i64,
    pub current_damage: i64,
    pub result_processed: bool,
    pub reward_distributed: bool,
    pub won: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    pub last_updated: DateTime<Utc>,
}

impl Mission {
    pub fn start(id: impl Into<String>, boss_max_hp: i64, now: DateTime<Utc>) -> Self {
        Mission {
            id: id.into(),
            active: true,
            started_at: now,
            ends_at: now + Duration::days(MISSION_DURATION_DAYS),
            boss_max_hp,
            boss_current_hp: boss_max_hp,
            current_damage: 0,
            result_processed: false,
            reward_distributed: false,
            won: false,
            finished_at: None,
            last_updated: now,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.ends_at
    }
}
