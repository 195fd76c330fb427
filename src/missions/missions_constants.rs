/// Fixed mission time-box.
pub const MISSION_DURATION_DAYS: i64 = 14;

/// Boss health scales with the roster but never drops below one member's
/// worth.
pub const MIN_BOSS_MAX_HP: i64 = 100;
pub const BOSS_HP_PER_MEMBER: i64 = 100;

/// Flat damage for the first credited chat message of a UTC calendar day.
pub const DAMAGE_DAILY_MESSAGE: i64 = 4;

/// Flat one-shot damage when a member has no unresolved tasks created since
/// mission start.
pub const DAMAGE_NO_UNRESOLVED_BONUS: i64 = 10;

/// UTC calendar-day key used to dedupe the daily chat bonus.
pub const DAY_KEY_FORMAT: &str = "%Y-%m-%d";
