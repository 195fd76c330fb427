//! Damage accumulator: clamps raw damage to the boss's remaining health and
//! keeps `current_damage` and `boss_current_hp` consistent.

use chrono::{DateTime, Utc};

use crate::alliances::Mission;

/// Portion of `raw_damage` that still fits before a full kill.
pub fn clamp_to_remaining(mission: &Mission, raw_damage: i64) -> i64 {
    raw_damage.min((mission.boss_max_hp - mission.current_damage).max(0))
}

/// Applies clamped damage to the mission totals and returns the amount that
/// actually landed. `current_damage` can never exceed `boss_max_hp` and
/// `boss_current_hp` can never go below zero.
pub fn apply_damage(mission: &mut Mission, raw_damage: i64, now: DateTime<Utc>) -> i64 {
    let applied = clamp_to_remaining(mission, raw_damage);
    mission.current_damage += applied;
    mission.boss_current_hp = (mission.boss_max_hp - mission.current_damage).max(0);
    mission.last_updated = now;
    applied
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mission_with(max_hp: i64, current_damage: i64) -> Mission {
        let mut mission = Mission::start("m1", max_hp, Utc::now());
        mission.current_damage = current_damage;
        mission.boss_current_hp = (max_hp - current_damage).max(0);
        mission
    }

    #[test]
    fn damage_clamps_at_full_kill() {
        let mut mission = mission_with(100, 98);
        let applied = apply_damage(&mut mission, 10, Utc::now());
        assert_eq!(applied, 2);
        assert_eq!(mission.current_damage, 100);
        assert_eq!(mission.boss_current_hp, 0);
    }

    #[test]
    fn dead_boss_absorbs_nothing() {
        let mut mission = mission_with(100, 100);
        let applied = apply_damage(&mut mission, 4, Utc::now());
        assert_eq!(applied, 0);
        assert_eq!(mission.current_damage, 100);
    }

    #[test]
    fn partial_damage_lands_in_full() {
        let mut mission = mission_with(300, 0);
        let applied = apply_damage(&mut mission, 26, Utc::now());
        assert_eq!(applied, 26);
        assert_eq!(mission.boss_current_hp, 274);
    }
}
