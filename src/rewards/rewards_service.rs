use log::{debug, error, info};
use std::sync::Arc;
use uuid::Uuid;

use super::rewards_model::{
    coin_bonus_for_boss_level, ClothingKind, EquipmentItem, Member, PotionKind, RewardReport,
    MILESTONE_BADGES,
};
use crate::alliances::{equipment_key, member_key, progress_key, progress_prefix};
use crate::errors::Result;
use crate::ledger::LedgerStore;
use crate::missions::missions_model::MemberProgress;
use crate::missions::missions_traits::Clock;

/// Distributes the winning-mission payout: coin bonus, milestone badges,
/// one random potion and one random clothing item per member.
///
/// Each member is rewarded in its own transaction, guarded by the
/// per-member `reward_granted` flag, so one member's failure never blocks
/// the rest and a crashed pass is resumable without double-granting.
pub struct RewardService<L: LedgerStore> {
    ledger: Arc<L>,
    clock: Arc<dyn Clock>,
}

impl<L: LedgerStore> RewardService<L> {
    pub fn new(ledger: Arc<L>, clock: Arc<dyn Clock>) -> Self {
        RewardService { ledger, clock }
    }

    /// Rewards every listed member independently; failures are logged and
    /// reported, never propagated.
    pub fn distribute(&self, alliance_id: &str, member_ids: &[String]) -> RewardReport {
        let mut report = RewardReport::default();
        for member_id in member_ids {
            match self.reward_member(alliance_id, member_id) {
                Ok(true) => report.rewarded.push(member_id.clone()),
                Ok(false) => report.skipped.push(member_id.clone()),
                Err(e) => {
                    error!("reward distribution failed for member {member_id}: {e}");
                    report.failed.push(member_id.clone());
                }
            }
        }
        info!(
            "distributed mission rewards for alliance {alliance_id}: {} rewarded, {} skipped, {} failed",
            report.rewarded.len(),
            report.skipped.len(),
            report.failed.len()
        );
        report
    }

    /// Re-scans the mission progress documents and rewards only the members
    /// whose reward has not been granted yet. Recovery path after a
    /// distribution pass failed partway through the roster.
    pub fn distribute_pending(&self, alliance_id: &str) -> Result<RewardReport> {
        let pending: Vec<String> = self.ledger.run_transaction(|txn| {
            let keys = txn.list_keys(&progress_prefix(alliance_id))?;
            let mut members = Vec::new();
            for key in keys {
                if let Some(progress) = txn.get::<MemberProgress>(&key)? {
                    if !progress.reward_granted {
                        members.push(progress.member_id);
                    }
                }
            }
            Ok(members)
        })?;
        Ok(self.distribute(alliance_id, &pending))
    }

    /// Rewards one member. Returns false when the member was already
    /// rewarded for this mission.
    fn reward_member(&self, alliance_id: &str, member_id: &str) -> Result<bool> {
        // Draws happen once per member so transaction retries grant the
        // same items.
        let mut rng = rand::thread_rng();
        let potion = PotionKind::random(&mut rng);
        let clothing = ClothingKind::random(&mut rng);
        self.grant_member_rewards(alliance_id, member_id, potion, clothing)
    }

    /// One atomic grant: coins, milestone badges, potion (stacked by slug)
    /// and clothing (fresh row), plus the `reward_granted` marker.
    pub(crate) fn grant_member_rewards(
        &self,
        alliance_id: &str,
        member_id: &str,
        potion: PotionKind,
        clothing: ClothingKind,
    ) -> Result<bool> {
        let now = self.clock.now();
        let clothing_item_id = format!("mission_{}_{}", clothing.template().slug, Uuid::new_v4());

        let granted = self.ledger.run_transaction(|txn| {
            let pkey = progress_key(alliance_id, member_id);
            let Some(mut progress) = txn.get::<MemberProgress>(&pkey)? else {
                // No progress record means this member never belonged to
                // the mission roster; nothing to grant.
                return Ok(false);
            };
            if progress.reward_granted {
                return Ok(false);
            }

            let mkey = member_key(member_id);
            let mut member = txn
                .get::<Member>(&mkey)?
                .unwrap_or_else(|| Member::new(member_id));

            let bonus = coin_bonus_for_boss_level(member.boss_level);
            member.coins += bonus;
            member.special_missions_completed += 1;
            for (threshold, badge) in MILESTONE_BADGES {
                if member.special_missions_completed >= threshold {
                    member.badges.insert(badge.to_string());
                }
            }
            member.last_updated = now;

            // Potion: stacked by catalog slug, never a duplicate row.
            let potion_template = potion.template();
            let ekey = equipment_key(member_id, potion_template.slug);
            let potion_item = match txn.get::<EquipmentItem>(&ekey)? {
                Some(mut held) => {
                    held.quantity += 1;
                    held
                }
                None => potion_template.into_item(now),
            };
            txn.put(&ekey, &potion_item)?;

            // Clothing: always a fresh row, it is equip-and-expire.
            let clothing_item = clothing.template().into_item(now);
            txn.put(&equipment_key(member_id, &clothing_item_id), &clothing_item)?;

            progress.reward_granted = true;
            progress.updated_at = now;
            txn.put(&pkey, &progress)?;
            txn.put(&mkey, &member)?;
            Ok(true)
        })?;

        if granted {
            debug!("granted mission rewards to member {member_id}");
        }
        Ok(granted)
    }
}
