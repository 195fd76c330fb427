use chrono::{DateTime, Utc};

use super::missions_model::TaskView;
use crate::errors::Result;

/// Time source for the mission time-box. Production uses `SystemClock`;
/// tests drive a manual clock through the 14-day window.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Read-only view into the surrounding application's task list, consumed by
/// the no-unresolved-tasks bonus check.
pub trait TaskSource: Send + Sync {
    /// Tasks belonging to `member_id` created at or after `since`.
    fn tasks_since(&self, member_id: &str, since: DateTime<Utc>) -> Result<Vec<TaskView>>;
}
