use log::{debug, error, info};
use std::sync::Arc;
use uuid::Uuid;

use super::missions_constants::{
    BOSS_HP_PER_MEMBER, DAMAGE_DAILY_MESSAGE, DAMAGE_NO_UNRESOLVED_BONUS, DAY_KEY_FORMAT,
    MIN_BOSS_MAX_HP,
};
use super::missions_damage::apply_damage;
use super::missions_errors::MissionError;
use super::missions_model::{
    classify_task, ContributionCategory, ContributionOutcome, FinalizeOutcome, MemberProgress,
    TaskView,
};
use super::missions_traits::{Clock, TaskSource};
use crate::alliances::{alliance_key, member_key, progress_key, Alliance, AllianceStatus, Mission};
use crate::errors::Result;
use crate::ledger::LedgerStore;
use crate::rewards::rewards_model::Member;
use crate::rewards::RewardService;

/// Mission lifecycle controller: owns start, the time-box, lazy expiration
/// detection and finalization, and wraps every contribution in one ledger
/// transaction.
pub struct MissionService<L: LedgerStore> {
    ledger: Arc<L>,
    clock: Arc<dyn Clock>,
    task_source: Arc<dyn TaskSource>,
    rewards: RewardService<L>,
}

/// Event kinds sharing the contribution transaction shape. Counter events
/// go through the per-category caps; the other two are deduplicated by
/// day-key and one-shot flag respectively.
enum ContributionEvent {
    Counter {
        category: ContributionCategory,
        requested_units: u32,
    },
    DailyMessage {
        day_key: String,
    },
    NoUnresolvedBonus,
}

enum TxnOutcome {
    Applied(i64),
    LimitReached,
    Expired,
}

enum FinalizeTxn {
    NoMission,
    StillRunning,
    Closed {
        won: bool,
        reward_members: Option<Vec<String>>,
    },
}

impl<L: LedgerStore> MissionService<L> {
    pub fn new(ledger: Arc<L>, clock: Arc<dyn Clock>, task_source: Arc<dyn TaskSource>) -> Self {
        let rewards = RewardService::new(Arc::clone(&ledger), Arc::clone(&clock));
        MissionService {
            ledger,
            clock,
            task_source,
            rewards,
        }
    }

    pub fn rewards(&self) -> &RewardService<L> {
        &self.rewards
    }

    /// Starts a special mission for the alliance. Only the leader may start
    /// one, only when no mission is active with an unexpired time-box.
    /// Returns the computed boss health.
    pub fn start_mission(&self, alliance_id: &str, requesting_member_id: &str) -> Result<i64> {
        let now = self.clock.now();

        let boss_max_hp = self.ledger.run_transaction(|txn| {
            let key = alliance_key(alliance_id);
            let Some(mut alliance) = txn.get::<Alliance>(&key)? else {
                return Err(MissionError::AllianceMissingOrEmpty.into());
            };
            if alliance.leader_id != requesting_member_id {
                return Err(MissionError::NotLeader.into());
            }
            if alliance.member_ids.is_empty() {
                return Err(MissionError::AllianceMissingOrEmpty.into());
            }
            if let Some(mission) = &alliance.mission {
                if mission.active && mission.ends_at > now {
                    return Err(MissionError::MissionAlreadyActive.into());
                }
            }

            let boss_max_hp = MIN_BOSS_MAX_HP.max(alliance.member_ids.len() as i64 * BOSS_HP_PER_MEMBER);
            let mission = Mission::start(Uuid::new_v4().to_string(), boss_max_hp, now);

            for member_id in &alliance.member_ids {
                txn.put(
                    &progress_key(alliance_id, member_id),
                    &MemberProgress::new(mission.id.as_str(), member_id.as_str(), now),
                )?;

                let member_doc_key = member_key(member_id);
                let mut member = txn
                    .get::<Member>(&member_doc_key)?
                    .unwrap_or_else(|| Member::new(member_id.as_str()));
                member.special_missions_started += 1;
                member.last_updated = now;
                txn.put(&member_doc_key, &member)?;
            }

            alliance.mission = Some(mission);
            alliance.status = AllianceStatus::InMission;
            txn.put(&key, &alliance)?;
            Ok(boss_max_hp)
        })?;

        info!("started special mission for alliance {alliance_id} with boss hp {boss_max_hp}");
        Ok(boss_max_hp)
    }

    pub fn record_shop_purchase(
        &self,
        alliance_id: &str,
        member_id: &str,
    ) -> Result<ContributionOutcome> {
        self.apply_contribution(
            alliance_id,
            member_id,
            ContributionEvent::Counter {
                category: ContributionCategory::ShopPurchase,
                requested_units: 1,
            },
        )
    }

    pub fn record_battle_hit(
        &self,
        alliance_id: &str,
        member_id: &str,
    ) -> Result<ContributionOutcome> {
        self.apply_contribution(
            alliance_id,
            member_id,
            ContributionEvent::Counter {
                category: ContributionCategory::BattleHit,
                requested_units: 1,
            },
        )
    }

    /// Credits a completed task, then evaluates the one-shot
    /// no-unresolved-tasks bonus for the member.
    pub fn record_task_completion(
        &self,
        alliance_id: &str,
        member_id: &str,
        task: &TaskView,
    ) -> Result<ContributionOutcome> {
        let (category, requested_units) = classify_task(task);
        let outcome = self.apply_contribution(
            alliance_id,
            member_id,
            ContributionEvent::Counter {
                category,
                requested_units,
            },
        )?;

        if !matches!(outcome, ContributionOutcome::Expired { .. }) {
            if let Err(e) = self.evaluate_no_unresolved_bonus(alliance_id, member_id) {
                error!("no-unresolved bonus evaluation failed for member {member_id}: {e}");
            }
        }
        Ok(outcome)
    }

    /// Credits the first alliance-chat message of the member's UTC calendar
    /// day; repeats within the same day are a no-op.
    pub fn record_chat_message(
        &self,
        alliance_id: &str,
        member_id: &str,
    ) -> Result<ContributionOutcome> {
        let day_key = self.clock.now().format(DAY_KEY_FORMAT).to_string();
        self.apply_contribution(
            alliance_id,
            member_id,
            ContributionEvent::DailyMessage { day_key },
        )
    }

    /// Checks whether the member has any unresolved (active or failed)
    /// tasks created since mission start; when none exist, awards the flat
    /// one-shot bonus. Returns the damage applied, if any.
    fn evaluate_no_unresolved_bonus(
        &self,
        alliance_id: &str,
        member_id: &str,
    ) -> Result<Option<i64>> {
        let started_at = self.ledger.run_transaction(|txn| {
            let alliance = txn.get::<Alliance>(&alliance_key(alliance_id))?;
            Ok(alliance.and_then(|a| a.active_mission().map(|m| m.started_at)))
        })?;
        let Some(started_at) = started_at else {
            return Ok(None);
        };

        let tasks = self.task_source.tasks_since(member_id, started_at)?;
        if tasks.iter().any(|task| task.status.is_unresolved()) {
            return Ok(None);
        }

        match self.apply_contribution(alliance_id, member_id, ContributionEvent::NoUnresolvedBonus)?
        {
            ContributionOutcome::Applied { damage } => Ok(Some(damage)),
            _ => Ok(None),
        }
    }

    /// Shared transaction shape for every contribution kind.
    fn apply_contribution(
        &self,
        alliance_id: &str,
        member_id: &str,
        event: ContributionEvent,
    ) -> Result<ContributionOutcome> {
        let now = self.clock.now();

        let outcome = self.ledger.run_transaction(|txn| {
            let key = alliance_key(alliance_id);
            let Some(mut alliance) = txn.get::<Alliance>(&key)? else {
                return Err(MissionError::AllianceMissingOrEmpty.into());
            };
            let is_member = alliance.is_member(member_id);

            let Some(mission) = alliance.active_mission_mut() else {
                return Err(MissionError::NoActiveMission.into());
            };
            if mission.is_expired(now) {
                // Abort the write; the caller path runs finalize instead so
                // no damage ever lands past the deadline.
                return Ok(TxnOutcome::Expired);
            }
            if !is_member {
                return Err(MissionError::NotAMember(member_id.to_string()).into());
            }

            let mission_id = mission.id.clone();
            let pkey = progress_key(alliance_id, member_id);
            // A stale document from a superseded mission is replaced, never
            // carried over.
            let mut progress = match txn.get::<MemberProgress>(&pkey)? {
                Some(p) if p.mission_id == mission_id => p,
                _ => MemberProgress::new(mission_id, member_id, now),
            };

            let raw_damage = match &event {
                ContributionEvent::Counter {
                    category,
                    requested_units,
                } => {
                    let applicable = progress.applicable_units(*category, *requested_units);
                    if applicable == 0 {
                        return Ok(TxnOutcome::LimitReached);
                    }
                    progress.record_units(*category, applicable);
                    applicable as i64 * category.rule().damage_per_unit
                }
                ContributionEvent::DailyMessage { day_key } => {
                    if !progress.message_days.insert(day_key.clone()) {
                        return Ok(TxnOutcome::LimitReached);
                    }
                    DAMAGE_DAILY_MESSAGE
                }
                ContributionEvent::NoUnresolvedBonus => {
                    if progress.no_unresolved_awarded {
                        return Ok(TxnOutcome::LimitReached);
                    }
                    progress.no_unresolved_awarded = true;
                    DAMAGE_NO_UNRESOLVED_BONUS
                }
            };

            let applied = apply_damage(mission, raw_damage, now);
            progress.damage_dealt += applied;
            progress.updated_at = now;

            txn.put(&pkey, &progress)?;
            txn.put(&key, &alliance)?;
            Ok(TxnOutcome::Applied(applied))
        })?;

        match outcome {
            TxnOutcome::Applied(damage) => {
                debug!("member {member_id} dealt {damage} damage in alliance {alliance_id}");
                Ok(ContributionOutcome::Applied { damage })
            }
            TxnOutcome::LimitReached => Ok(ContributionOutcome::LimitReached),
            TxnOutcome::Expired => {
                info!("mission time-box passed for alliance {alliance_id}, finalizing");
                let finalize = self.finalize(alliance_id)?;
                Ok(ContributionOutcome::Expired { finalize })
            }
        }
    }

    /// Closes the mission once its time-box has passed, determining the
    /// win/loss outcome and kicking off reward distribution on a win.
    ///
    /// Safe to poll: before the deadline this is a no-op, and repeat calls
    /// after the close change nothing and cannot re-reward (the
    /// reward-distributed flag flips inside the closing transaction).
    pub fn finalize(&self, alliance_id: &str) -> Result<FinalizeOutcome> {
        let now = self.clock.now();

        let fin = self.ledger.run_transaction(|txn| {
            let key = alliance_key(alliance_id);
            let Some(mut alliance) = txn.get::<Alliance>(&key)? else {
                return Err(MissionError::AllianceMissingOrEmpty.into());
            };
            let Some(mission) = alliance.active_mission_mut() else {
                return Ok(FinalizeTxn::NoMission);
            };
            if now < mission.ends_at {
                return Ok(FinalizeTxn::StillRunning);
            }

            let won = mission.boss_max_hp > 0 && mission.current_damage >= mission.boss_max_hp;
            let should_reward = won && !mission.reward_distributed;

            mission.active = false;
            mission.result_processed = true;
            mission.won = won;
            mission.finished_at = Some(now);
            mission.last_updated = now;
            if should_reward {
                mission.reward_distributed = true;
            }
            alliance.status = AllianceStatus::Active;

            let reward_members = should_reward.then(|| alliance.member_ids.clone());
            txn.put(&key, &alliance)?;
            Ok(FinalizeTxn::Closed {
                won,
                reward_members,
            })
        })?;

        match fin {
            FinalizeTxn::NoMission => Ok(FinalizeOutcome::NoMission),
            FinalizeTxn::StillRunning => Ok(FinalizeOutcome::StillRunning),
            FinalizeTxn::Closed {
                won,
                reward_members,
            } => {
                info!("mission closed for alliance {alliance_id}, won = {won}");
                let rewards = match reward_members {
                    Some(members) => Some(self.rewards.distribute(alliance_id, &members)),
                    None => None,
                };
                Ok(FinalizeOutcome::Closed { won, rewards })
            }
        }
    }
}
