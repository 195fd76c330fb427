// Module declarations
pub(crate) mod rewards_model;
pub(crate) mod rewards_service;


// Re-export the public interface
pub use rewards_model::{
    coin_bonus_for_boss_level, coins_reward_for_level, ClothingKind, EffectTag, EquipmentItem,
    EquipmentKind, Member, PotionKind, RewardReport, RewardTemplate, CLOTHING_BATTLES_REMAINING,
    COIN_BONUS_RATIO, MILESTONE_BADGES,
};
pub use rewards_service::RewardService;
