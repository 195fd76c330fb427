use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::{Arc, Mutex};

use crate::alliances::{Alliance, AllianceRepository, AllianceStatus};
use crate::errors::{Error, Result};
use crate::ledger::MemoryLedger;
use crate::missions::missions_model::{
    ContributionOutcome, FinalizeOutcome, TaskDifficulty, TaskImportance, TaskStatus, TaskView,
};
use crate::missions::missions_service::MissionService;
use crate::missions::missions_traits::{Clock, TaskSource};
use crate::missions::MissionError;

const ALLIANCE: &str = "a1";

struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    fn new(start: DateTime<Utc>) -> Self {
        ManualClock {
            now: Mutex::new(start),
        }
    }

    fn advance(&self, delta: Duration) {
        *self.now.lock().unwrap() += delta;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

#[derive(Default)]
struct MockTaskSource {
    tasks: Mutex<Vec<(String, TaskView)>>,
}

impl MockTaskSource {
    fn add(&self, member_id: &str, task: TaskView) {
        self.tasks.lock().unwrap().push((member_id.to_string(), task));
    }
}

impl TaskSource for MockTaskSource {
    fn tasks_since(&self, member_id: &str, since: DateTime<Utc>) -> Result<Vec<TaskView>> {
        Ok(self
            .tasks
            .lock()
            .unwrap()
            .iter()
            .filter(|(owner, task)| owner == member_id && task.created_at >= since)
            .map(|(_, task)| task.clone())
            .collect())
    }
}

struct Fixture {
    clock: Arc<ManualClock>,
    tasks: Arc<MockTaskSource>,
    service: MissionService<MemoryLedger>,
    repo: AllianceRepository<MemoryLedger>,
}

fn start_of_test() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
}

/// Alliance "a1" with the first listed member as leader.
fn fixture(member_ids: &[&str]) -> Fixture {
    let ledger = Arc::new(MemoryLedger::new());
    let clock = Arc::new(ManualClock::new(start_of_test()));
    let tasks = Arc::new(MockTaskSource::default());
    let service = MissionService::new(Arc::clone(&ledger), clock.clone(), tasks.clone());
    let repo = AllianceRepository::new(Arc::clone(&ledger));

    if !member_ids.is_empty() {
        repo.save(&Alliance::new(
            ALLIANCE,
            "Test Alliance",
            member_ids[0],
            member_ids.iter().map(|id| id.to_string()).collect(),
        ))
        .unwrap();
    }
    Fixture {
        clock,
        tasks,
        service,
        repo,
    }
}

fn completed_task(difficulty: TaskDifficulty, importance: TaskImportance) -> TaskView {
    TaskView {
        difficulty,
        importance,
        status: TaskStatus::Completed,
        created_at: start_of_test(),
    }
}

/// Parks an unresolved task on the member so the one-shot bonus stays out
/// of damage arithmetic.
fn suppress_bonus(fixture: &Fixture, member_id: &str) {
    fixture.tasks.add(
        member_id,
        TaskView {
            difficulty: TaskDifficulty::Hard,
            importance: TaskImportance::VeryImportant,
            status: TaskStatus::Active,
            created_at: start_of_test() + Duration::hours(1),
        },
    );
}

fn mission_error(result: Result<impl std::fmt::Debug>) -> MissionError {
    match result {
        Err(Error::Mission(e)) => e,
        other => panic!("expected mission error, got {other:?}"),
    }
}

#[test]
fn start_mission_scales_boss_hp_with_roster() {
    let f = fixture(&["u1", "u2", "u3"]);
    let boss_hp = f.service.start_mission(ALLIANCE, "u1").unwrap();
    assert_eq!(boss_hp, 300);

    let alliance = f.repo.get(ALLIANCE).unwrap().unwrap();
    assert_eq!(alliance.status, AllianceStatus::InMission);
    let mission = alliance.mission.unwrap();
    assert!(mission.active);
    assert_eq!(mission.boss_max_hp, 300);
    assert_eq!(mission.boss_current_hp, 300);
    assert_eq!(mission.current_damage, 0);
    assert_eq!(mission.ends_at, mission.started_at + Duration::days(14));

    for member_id in ["u1", "u2", "u3"] {
        let progress = f.repo.get_progress(ALLIANCE, member_id).unwrap().unwrap();
        assert_eq!(progress.mission_id, mission.id);
        assert_eq!(progress.damage_dealt, 0);

        let member = f.repo.get_member(member_id).unwrap().unwrap();
        assert_eq!(member.special_missions_started, 1);
    }
}

#[test]
fn start_mission_has_floor_of_one_hundred_hp() {
    let f = fixture(&["solo"]);
    assert_eq!(f.service.start_mission(ALLIANCE, "solo").unwrap(), 100);
}

#[test]
fn start_mission_rejects_non_leader() {
    let f = fixture(&["u1", "u2"]);
    let err = mission_error(f.service.start_mission(ALLIANCE, "u2"));
    assert_eq!(err, MissionError::NotLeader);
}

#[test]
fn start_mission_rejects_missing_or_empty_alliance() {
    let f = fixture(&[]);
    let err = mission_error(f.service.start_mission(ALLIANCE, "u1"));
    assert_eq!(err, MissionError::AllianceMissingOrEmpty);

    f.repo
        .save(&Alliance::new(ALLIANCE, "Hollow", "u1", Vec::new()))
        .unwrap();
    let err = mission_error(f.service.start_mission(ALLIANCE, "u1"));
    assert_eq!(err, MissionError::AllianceMissingOrEmpty);
}

#[test]
fn start_mission_rejects_overlapping_mission_but_allows_restart_after_expiry() {
    let f = fixture(&["u1", "u2"]);
    f.service.start_mission(ALLIANCE, "u1").unwrap();

    let err = mission_error(f.service.start_mission(ALLIANCE, "u1"));
    assert_eq!(err, MissionError::MissionAlreadyActive);

    f.clock.advance(Duration::days(15));
    assert_eq!(f.service.start_mission(ALLIANCE, "u1").unwrap(), 200);
}

#[test]
fn shop_purchases_cap_at_five() {
    let f = fixture(&["u1", "u2"]);
    f.service.start_mission(ALLIANCE, "u1").unwrap();

    let mut applied = 0;
    let mut capped = 0;
    for _ in 0..20 {
        match f.service.record_shop_purchase(ALLIANCE, "u2").unwrap() {
            ContributionOutcome::Applied { damage } => applied += damage,
            ContributionOutcome::LimitReached => capped += 1,
            other => panic!("unexpected outcome {other:?}"),
        }
    }
    assert_eq!(applied, 10);
    assert_eq!(capped, 15);

    let progress = f.repo.get_progress(ALLIANCE, "u2").unwrap().unwrap();
    assert_eq!(progress.shop_purchases, 5);
    assert_eq!(progress.damage_dealt, 10);

    let mission = f.repo.get(ALLIANCE).unwrap().unwrap().mission.unwrap();
    assert_eq!(mission.current_damage, 10);
    assert_eq!(mission.boss_current_hp, 190);
}

#[test]
fn battle_hits_cap_at_ten() {
    let f = fixture(&["u1"]);
    f.service.start_mission(ALLIANCE, "u1").unwrap();

    for _ in 0..10 {
        assert_eq!(
            f.service.record_battle_hit(ALLIANCE, "u1").unwrap(),
            ContributionOutcome::Applied { damage: 2 }
        );
    }
    assert_eq!(
        f.service.record_battle_hit(ALLIANCE, "u1").unwrap(),
        ContributionOutcome::LimitReached
    );

    let progress = f.repo.get_progress(ALLIANCE, "u1").unwrap().unwrap();
    assert_eq!(progress.battle_hits, 10);
    assert_eq!(progress.damage_dealt, 20);
}

#[test]
fn easy_normal_task_counts_double() {
    let f = fixture(&["u1"]);
    suppress_bonus(&f, "u1");
    f.service.start_mission(ALLIANCE, "u1").unwrap();

    let outcome = f
        .service
        .record_task_completion(
            ALLIANCE,
            "u1",
            &completed_task(TaskDifficulty::Easy, TaskImportance::Normal),
        )
        .unwrap();
    assert_eq!(outcome, ContributionOutcome::Applied { damage: 2 });

    let progress = f.repo.get_progress(ALLIANCE, "u1").unwrap().unwrap();
    assert_eq!(progress.simple_tasks, 2);
    assert_eq!(progress.other_tasks, 0);
}

#[test]
fn hard_important_task_lands_as_other_category() {
    let f = fixture(&["u1"]);
    suppress_bonus(&f, "u1");
    f.service.start_mission(ALLIANCE, "u1").unwrap();

    let outcome = f
        .service
        .record_task_completion(
            ALLIANCE,
            "u1",
            &completed_task(TaskDifficulty::Extreme, TaskImportance::Special),
        )
        .unwrap();
    assert_eq!(outcome, ContributionOutcome::Applied { damage: 4 });

    let progress = f.repo.get_progress(ALLIANCE, "u1").unwrap().unwrap();
    assert_eq!(progress.other_tasks, 1);
}

#[test]
fn very_easy_special_task_is_still_simple_single_unit() {
    let f = fixture(&["u1"]);
    suppress_bonus(&f, "u1");
    f.service.start_mission(ALLIANCE, "u1").unwrap();

    let outcome = f
        .service
        .record_task_completion(
            ALLIANCE,
            "u1",
            &completed_task(TaskDifficulty::VeryEasy, TaskImportance::Special),
        )
        .unwrap();
    assert_eq!(outcome, ContributionOutcome::Applied { damage: 1 });

    let progress = f.repo.get_progress(ALLIANCE, "u1").unwrap().unwrap();
    assert_eq!(progress.simple_tasks, 1);
}

#[test]
fn no_unresolved_bonus_fires_once() {
    let f = fixture(&["u1"]);
    f.service.start_mission(ALLIANCE, "u1").unwrap();

    // Task source has nothing unresolved, so the first completion also
    // lands the flat 10 bonus.
    f.service
        .record_task_completion(
            ALLIANCE,
            "u1",
            &completed_task(TaskDifficulty::Easy, TaskImportance::Normal),
        )
        .unwrap();

    let progress = f.repo.get_progress(ALLIANCE, "u1").unwrap().unwrap();
    assert!(progress.no_unresolved_awarded);
    assert_eq!(progress.damage_dealt, 12);

    f.service
        .record_task_completion(
            ALLIANCE,
            "u1",
            &completed_task(TaskDifficulty::Easy, TaskImportance::Normal),
        )
        .unwrap();

    let progress = f.repo.get_progress(ALLIANCE, "u1").unwrap().unwrap();
    assert_eq!(progress.damage_dealt, 14);

    let mission = f.repo.get(ALLIANCE).unwrap().unwrap().mission.unwrap();
    assert_eq!(mission.current_damage, 14);
}

#[test]
fn unresolved_task_blocks_the_bonus() {
    let f = fixture(&["u1"]);
    suppress_bonus(&f, "u1");
    f.service.start_mission(ALLIANCE, "u1").unwrap();

    f.service
        .record_task_completion(
            ALLIANCE,
            "u1",
            &completed_task(TaskDifficulty::Easy, TaskImportance::Normal),
        )
        .unwrap();

    let progress = f.repo.get_progress(ALLIANCE, "u1").unwrap().unwrap();
    assert!(!progress.no_unresolved_awarded);
    assert_eq!(progress.damage_dealt, 2);
}

#[test]
fn chat_bonus_is_once_per_utc_day() {
    let f = fixture(&["u1"]);
    f.service.start_mission(ALLIANCE, "u1").unwrap();

    assert_eq!(
        f.service.record_chat_message(ALLIANCE, "u1").unwrap(),
        ContributionOutcome::Applied { damage: 4 }
    );
    for _ in 0..4 {
        assert_eq!(
            f.service.record_chat_message(ALLIANCE, "u1").unwrap(),
            ContributionOutcome::LimitReached
        );
    }

    f.clock.advance(Duration::days(1));
    assert_eq!(
        f.service.record_chat_message(ALLIANCE, "u1").unwrap(),
        ContributionOutcome::Applied { damage: 4 }
    );

    let progress = f.repo.get_progress(ALLIANCE, "u1").unwrap().unwrap();
    assert_eq!(progress.message_days.len(), 2);
    assert_eq!(progress.damage_dealt, 8);
}

#[test]
fn contributions_require_membership() {
    let f = fixture(&["u1", "u2"]);
    f.service.start_mission(ALLIANCE, "u1").unwrap();

    let err = mission_error(f.service.record_shop_purchase(ALLIANCE, "stranger"));
    assert_eq!(err, MissionError::NotAMember("stranger".to_string()));
}

#[test]
fn contributions_require_an_active_mission() {
    let f = fixture(&["u1"]);
    let err = mission_error(f.service.record_shop_purchase(ALLIANCE, "u1"));
    assert_eq!(err, MissionError::NoActiveMission);
}

#[test]
fn expired_contribution_finalizes_instead_of_damaging() {
    let f = fixture(&["u1", "u2"]);
    f.service.start_mission(ALLIANCE, "u1").unwrap();
    f.service.record_shop_purchase(ALLIANCE, "u2").unwrap();

    f.clock.advance(Duration::days(15));
    let outcome = f.service.record_shop_purchase(ALLIANCE, "u2").unwrap();
    assert_eq!(
        outcome,
        ContributionOutcome::Expired {
            finalize: FinalizeOutcome::Closed {
                won: false,
                rewards: None,
            },
        }
    );

    let alliance = f.repo.get(ALLIANCE).unwrap().unwrap();
    assert_eq!(alliance.status, AllianceStatus::Active);
    let mission = alliance.mission.unwrap();
    assert!(!mission.active);
    assert!(mission.result_processed);
    assert!(!mission.won);
    // The late purchase never landed.
    assert_eq!(mission.current_damage, 2);

    let err = mission_error(f.service.record_shop_purchase(ALLIANCE, "u2"));
    assert_eq!(err, MissionError::NoActiveMission);
}

#[test]
fn finalize_is_a_noop_before_the_deadline_and_idempotent_after() {
    let f = fixture(&["u1"]);
    f.service.start_mission(ALLIANCE, "u1").unwrap();

    assert_eq!(
        f.service.finalize(ALLIANCE).unwrap(),
        FinalizeOutcome::StillRunning
    );
    let mission = f.repo.get(ALLIANCE).unwrap().unwrap().mission.unwrap();
    assert!(mission.active);

    f.clock.advance(Duration::days(14));
    assert_eq!(
        f.service.finalize(ALLIANCE).unwrap(),
        FinalizeOutcome::Closed {
            won: false,
            rewards: None,
        }
    );
    assert_eq!(
        f.service.finalize(ALLIANCE).unwrap(),
        FinalizeOutcome::NoMission
    );
}

#[test]
fn full_kill_before_deadline_wins_and_rewards_once() {
    let f = fixture(&["u1"]);
    f.service.start_mission(ALLIANCE, "u1").unwrap();

    for _ in 0..10 {
        f.service.record_battle_hit(ALLIANCE, "u1").unwrap();
    }
    for _ in 0..5 {
        f.service.record_shop_purchase(ALLIANCE, "u1").unwrap();
    }
    // Six "other" completions; the first also lands the +10 bonus.
    for _ in 0..6 {
        f.service
            .record_task_completion(
                ALLIANCE,
                "u1",
                &completed_task(TaskDifficulty::Extreme, TaskImportance::Special),
            )
            .unwrap();
    }
    for _ in 0..10 {
        f.service
            .record_task_completion(
                ALLIANCE,
                "u1",
                &completed_task(TaskDifficulty::VeryEasy, TaskImportance::Important),
            )
            .unwrap();
    }
    // 74 so far; chat across seven days covers the remaining 26, the last
    // message clamped to 2.
    for day in 0..7 {
        let outcome = f.service.record_chat_message(ALLIANCE, "u1").unwrap();
        if day == 6 {
            assert_eq!(outcome, ContributionOutcome::Applied { damage: 2 });
        } else {
            assert_eq!(outcome, ContributionOutcome::Applied { damage: 4 });
        }
        f.clock.advance(Duration::days(1));
    }

    let mission = f.repo.get(ALLIANCE).unwrap().unwrap().mission.unwrap();
    assert_eq!(mission.current_damage, 100);
    assert_eq!(mission.boss_current_hp, 0);

    f.clock.advance(Duration::days(8));
    let outcome = f.service.finalize(ALLIANCE).unwrap();
    let FinalizeOutcome::Closed {
        won: true,
        rewards: Some(report),
    } = outcome
    else {
        panic!("expected a rewarded win, got {outcome:?}");
    };
    assert_eq!(report.rewarded, vec!["u1".to_string()]);
    assert!(report.failed.is_empty());

    let member = f.repo.get_member("u1").unwrap().unwrap();
    assert_eq!(member.coins, 120); // half of the level-2 boss reward (240)
    assert_eq!(member.special_missions_completed, 1);
    assert!(member.badges.contains("special_mission_1"));

    let equipment = f.repo.list_equipment("u1").unwrap();
    assert_eq!(equipment.len(), 2);

    // A second finalize cannot re-reward.
    assert_eq!(
        f.service.finalize(ALLIANCE).unwrap(),
        FinalizeOutcome::NoMission
    );
    let member = f.repo.get_member("u1").unwrap().unwrap();
    assert_eq!(member.coins, 120);
}

#[test]
fn one_short_of_full_kill_loses() {
    let f = fixture(&["u1"]);
    f.service.start_mission(ALLIANCE, "u1").unwrap();

    for _ in 0..10 {
        f.service.record_battle_hit(ALLIANCE, "u1").unwrap();
    }
    for _ in 0..5 {
        f.service.record_shop_purchase(ALLIANCE, "u1").unwrap();
    }
    for _ in 0..6 {
        f.service
            .record_task_completion(
                ALLIANCE,
                "u1",
                &completed_task(TaskDifficulty::Extreme, TaskImportance::Special),
            )
            .unwrap();
    }
    for _ in 0..7 {
        f.service
            .record_task_completion(
                ALLIANCE,
                "u1",
                &completed_task(TaskDifficulty::VeryEasy, TaskImportance::Important),
            )
            .unwrap();
    }
    for _ in 0..7 {
        f.service.record_chat_message(ALLIANCE, "u1").unwrap();
        f.clock.advance(Duration::days(1));
    }

    // 20 + 10 + 24 + 10 (bonus) + 7 + 28 = 99.
    let mission = f.repo.get(ALLIANCE).unwrap().unwrap().mission.unwrap();
    assert_eq!(mission.current_damage, 99);

    f.clock.advance(Duration::days(8));
    assert_eq!(
        f.service.finalize(ALLIANCE).unwrap(),
        FinalizeOutcome::Closed {
            won: false,
            rewards: None,
        }
    );
    assert!(f.repo.get_member("u1").unwrap().is_none() || {
        let member = f.repo.get_member("u1").unwrap().unwrap();
        member.special_missions_completed == 0 && member.coins == 0
    });
}

#[test]
fn three_member_scenario_matches_the_arithmetic() {
    let f = fixture(&["a", "b", "c"]);
    suppress_bonus(&f, "a");
    assert_eq!(f.service.start_mission(ALLIANCE, "a").unwrap(), 300);

    // Member a: two easy/normal tasks, double units, one damage each.
    for _ in 0..2 {
        assert_eq!(
            f.service
                .record_task_completion(
                    ALLIANCE,
                    "a",
                    &completed_task(TaskDifficulty::Easy, TaskImportance::Normal),
                )
                .unwrap(),
            ContributionOutcome::Applied { damage: 2 }
        );
    }

    // Member b: seven purchase attempts, five count.
    for attempt in 0..7 {
        let outcome = f.service.record_shop_purchase(ALLIANCE, "b").unwrap();
        if attempt < 5 {
            assert_eq!(outcome, ContributionOutcome::Applied { damage: 2 });
        } else {
            assert_eq!(outcome, ContributionOutcome::LimitReached);
        }
    }

    // Member c: the daily message on three distinct days.
    for _ in 0..3 {
        assert_eq!(
            f.service.record_chat_message(ALLIANCE, "c").unwrap(),
            ContributionOutcome::Applied { damage: 4 }
        );
        f.clock.advance(Duration::days(1));
    }

    let mission = f.repo.get(ALLIANCE).unwrap().unwrap().mission.unwrap();
    assert_eq!(mission.current_damage, 26);
    assert_eq!(mission.boss_current_hp, 274);

    let a = f.repo.get_progress(ALLIANCE, "a").unwrap().unwrap();
    let b = f.repo.get_progress(ALLIANCE, "b").unwrap().unwrap();
    let c = f.repo.get_progress(ALLIANCE, "c").unwrap().unwrap();
    assert_eq!(a.simple_tasks, 4);
    assert_eq!(b.shop_purchases, 5);
    assert_eq!(c.message_days.len(), 3);

    assert_eq!(
        f.service.finalize(ALLIANCE).unwrap(),
        FinalizeOutcome::StillRunning
    );

    f.clock.advance(Duration::days(14));
    assert_eq!(
        f.service.finalize(ALLIANCE).unwrap(),
        FinalizeOutcome::Closed {
            won: false,
            rewards: None,
        }
    );
}

#[test]
fn final_health_is_independent_of_event_order() {
    let run = |reversed: bool| -> (i64, i64) {
        let f = fixture(&["u1", "u2", "u3"]);
        f.service.start_mission(ALLIANCE, "u1").unwrap();

        let mut events: Vec<Box<dyn Fn(&Fixture)>> = Vec::new();
        for member in ["u1", "u2", "u3"] {
            for _ in 0..6 {
                events.push(Box::new(move |f: &Fixture| {
                    f.service.record_shop_purchase(ALLIANCE, member).unwrap();
                }));
            }
            for _ in 0..4 {
                events.push(Box::new(move |f: &Fixture| {
                    f.service.record_battle_hit(ALLIANCE, member).unwrap();
                }));
            }
            events.push(Box::new(move |f: &Fixture| {
                f.service.record_chat_message(ALLIANCE, member).unwrap();
            }));
        }
        if reversed {
            events.reverse();
        }
        for event in &events {
            event(&f);
        }

        let mission = f.repo.get(ALLIANCE).unwrap().unwrap().mission.unwrap();
        (mission.current_damage, mission.boss_current_hp)
    };

    assert_eq!(run(false), run(true));
    // 3 members x (5x2 shop + 4x2 battle + 4 chat) = 66 damage.
    assert_eq!(run(false), (66, 234));
}

#[test]
fn concurrent_contributions_keep_totals_consistent() {
    let f = fixture(&["u1", "u2", "u3"]);
    f.service.start_mission(ALLIANCE, "u1").unwrap();

    std::thread::scope(|scope| {
        for member in ["u1", "u2", "u3"] {
            let service = &f.service;
            scope.spawn(move || {
                for _ in 0..10 {
                    service.record_shop_purchase(ALLIANCE, member).unwrap();
                }
                for _ in 0..15 {
                    service.record_battle_hit(ALLIANCE, member).unwrap();
                }
                for _ in 0..5 {
                    service.record_chat_message(ALLIANCE, member).unwrap();
                }
            });
        }
    });

    let mission = f.repo.get(ALLIANCE).unwrap().unwrap().mission.unwrap();
    // Per member: 10 shop damage + 20 battle damage + 4 chat damage.
    assert_eq!(mission.current_damage, 102);
    assert_eq!(mission.boss_current_hp, 198);

    let mut dealt = 0;
    for member in ["u1", "u2", "u3"] {
        let progress = f.repo.get_progress(ALLIANCE, member).unwrap().unwrap();
        assert_eq!(progress.shop_purchases, 5);
        assert_eq!(progress.battle_hits, 10);
        assert_eq!(progress.message_days.len(), 1);
        dealt += progress.damage_dealt;
    }
    assert_eq!(dealt, mission.current_damage);
}
