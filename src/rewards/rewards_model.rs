use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Completed-mission milestones and the badge granted at each.
pub const MILESTONE_BADGES: [(i32, &str); 3] = [
    (1, "special_mission_1"),
    (3, "special_mission_3"),
    (5, "special_mission_5"),
];

/// Share of the next solo-boss coin reward paid out per member on a win.
pub const COIN_BONUS_RATIO: f64 = 0.5;

/// Clothing rewards survive this many solo battles before expiring.
pub const CLOTHING_BATTLES_REMAINING: i32 = 2;

/// Member (user) document as far as this engine is concerned. The full
/// profile lives with the surrounding application; these are the fields the
/// reward distributor and mission start touch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: String,
    pub coins: i64,
    pub boss_level: i32,
    pub special_missions_started: i32,
    pub special_missions_completed: i32,
    pub badges: BTreeSet<String>,
    pub last_updated: DateTime<Utc>,
}

impl Member {
    pub fn new(id: impl Into<String>) -> Self {
        Member {
            id: id.into(),
            coins: 0,
            boss_level: 1,
            special_missions_started: 0,
            special_missions_completed: 0,
            badges: BTreeSet::new(),
            last_updated: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EquipmentKind {
    Potion,
    Clothing,
}

/// Effect tag consumed by the solo-battle engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EffectTag {
    BoostPpSingle,
    BoostPpPermanent,
    AttackPower,
    HitChance,
    ExtraAttack,
}

/// Granted reward item, stored under `members/{id}/equipment/{itemId}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentItem {
    pub name: String,
    pub kind: EquipmentKind,
    pub slug: String,
    pub description: String,
    pub quantity: i64,
    pub active: bool,
    pub bonus: f64,
    pub effect: EffectTag,
    pub battles_remaining: i32,
    pub upgrade_level: i32,
    pub created_at: DateTime<Utc>,
}

/// Enum-keyed catalog entry; the two reward catalogs below are data tables,
/// not scattered literals.
#[derive(Debug, Clone, Copy)]
pub struct RewardTemplate {
    pub slug: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub kind: EquipmentKind,
    pub effect: EffectTag,
    pub bonus: f64,
    pub battles_remaining: i32,
}

impl RewardTemplate {
    pub fn into_item(self, now: DateTime<Utc>) -> EquipmentItem {
        EquipmentItem {
            name: self.name.to_string(),
            kind: self.kind,
            slug: self.slug.to_string(),
            description: self.description.to_string(),
            quantity: 1,
            active: false,
            bonus: self.bonus,
            effect: self.effect,
            battles_remaining: self.battles_remaining,
            upgrade_level: 1,
            created_at: now,
        }
    }
}

/// Consumable reward catalog: four potion variants. Potions stack by slug.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PotionKind {
    PpBoost20Single,
    PpBoost40Single,
    PpBoost5Permanent,
    PpBoost10Permanent,
}

impl PotionKind {
    pub const ALL: [PotionKind; 4] = [
        PotionKind::PpBoost20Single,
        PotionKind::PpBoost40Single,
        PotionKind::PpBoost5Permanent,
        PotionKind::PpBoost10Permanent,
    ];

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }

    pub const fn template(self) -> RewardTemplate {
        match self {
            PotionKind::PpBoost20Single => RewardTemplate {
                slug: "PP_20_SINGLE",
                name: "Strength potion (single use)",
                description: "Raises power by 20% for one battle",
                kind: EquipmentKind::Potion,
                effect: EffectTag::BoostPpSingle,
                bonus: 0.20,
                battles_remaining: 0,
            },
            PotionKind::PpBoost40Single => RewardTemplate {
                slug: "PP_40_SINGLE",
                name: "Power potion (single use)",
                description: "Raises power by 40% for one battle",
                kind: EquipmentKind::Potion,
                effect: EffectTag::BoostPpSingle,
                bonus: 0.40,
                battles_remaining: 0,
            },
            PotionKind::PpBoost5Permanent => RewardTemplate {
                slug: "PP_5_PERMANENT",
                name: "Strength potion (permanent)",
                description: "Permanently raises power by 5%",
                kind: EquipmentKind::Potion,
                effect: EffectTag::BoostPpPermanent,
                bonus: 0.05,
                battles_remaining: 0,
            },
            PotionKind::PpBoost10Permanent => RewardTemplate {
                slug: "PP_10_PERMANENT",
                name: "Power potion (permanent)",
                description: "Permanently raises power by 10%",
                kind: EquipmentKind::Potion,
                effect: EffectTag::BoostPpPermanent,
                bonus: 0.10,
                battles_remaining: 0,
            },
        }
    }
}

/// Temporary equipment catalog: three clothing variants, each granted as a
/// fresh row with a two-battle lifetime (equip and expire, no stacking).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClothingKind {
    Gloves,
    Shield,
    Boots,
}

impl ClothingKind {
    pub const ALL: [ClothingKind; 3] = [
        ClothingKind::Gloves,
        ClothingKind::Shield,
        ClothingKind::Boots,
    ];

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }

    pub const fn template(self) -> RewardTemplate {
        match self {
            ClothingKind::Gloves => RewardTemplate {
                slug: "GLOVES",
                name: "Gloves",
                description: "+10% attack power, lasts 2 battles",
                kind: EquipmentKind::Clothing,
                effect: EffectTag::AttackPower,
                bonus: 0.10,
                battles_remaining: CLOTHING_BATTLES_REMAINING,
            },
            ClothingKind::Shield => RewardTemplate {
                slug: "SHIELD",
                name: "Shield",
                description: "+10% chance to land an attack, lasts 2 battles",
                kind: EquipmentKind::Clothing,
                effect: EffectTag::HitChance,
                bonus: 0.10,
                battles_remaining: CLOTHING_BATTLES_REMAINING,
            },
            ClothingKind::Boots => RewardTemplate {
                slug: "BOOTS",
                name: "Boots",
                description: "40% chance of one extra attack, lasts 2 battles",
                kind: EquipmentKind::Clothing,
                effect: EffectTag::ExtraAttack,
                bonus: 0.40,
                battles_remaining: CLOTHING_BATTLES_REMAINING,
            },
        }
    }
}

/// Per-member result of one distribution pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewardReport {
    pub rewarded: Vec<String>,
    /// Members whose reward was already granted by an earlier pass.
    pub skipped: Vec<String>,
    pub failed: Vec<String>,
}

/// Coin reward for defeating the solo boss at `level`: 200 coins at level 1,
/// growing 20% per level. Consumed read-only to size the mission coin bonus.
pub fn coins_reward_for_level(level: i32) -> i64 {
    let mut coins = 200.0_f64;
    for _ in 1..level.max(1) {
        coins *= 1.2;
    }
    coins.round() as i64
}

/// Mission coin bonus: half of the next solo-boss level's reward, never
/// less than one coin.
pub fn coin_bonus_for_boss_level(boss_level: i32) -> i64 {
    let next_reward = coins_reward_for_level(boss_level.max(1) + 1);
    ((next_reward as f64 * COIN_BONUS_RATIO).round() as i64).max(1)
}
