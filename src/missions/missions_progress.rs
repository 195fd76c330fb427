//! Progress counter rules: how much of a requested contribution is still
//! within a member's per-category cap, and the bookkeeping when it lands.

use super::missions_model::{ContributionCategory, MemberProgress};

impl MemberProgress {
    pub fn counter(&self, category: ContributionCategory) -> u32 {
        match category {
            ContributionCategory::ShopPurchase => self.shop_purchases,
            ContributionCategory::BattleHit => self.battle_hits,
            ContributionCategory::SimpleTask => self.simple_tasks,
            ContributionCategory::OtherTask => self.other_tasks,
        }
    }

    /// Units of `requested` that still fit under the category cap. Zero
    /// means the limit is already reached.
    pub fn applicable_units(&self, category: ContributionCategory, requested: u32) -> u32 {
        let rule = category.rule();
        requested.min(rule.cap.saturating_sub(self.counter(category)))
    }

    /// Bumps the category counter. Callers pass units that already went
    /// through `applicable_units`, so the cap invariant holds.
    pub(crate) fn record_units(&mut self, category: ContributionCategory, units: u32) {
        let counter = match category {
            ContributionCategory::ShopPurchase => &mut self.shop_purchases,
            ContributionCategory::BattleHit => &mut self.battle_hits,
            ContributionCategory::SimpleTask => &mut self.simple_tasks,
            ContributionCategory::OtherTask => &mut self.other_tasks,
        };
        *counter += units;
    }
}
