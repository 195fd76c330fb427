use std::sync::Arc;

use super::alliances_model::Alliance;
use crate::errors::Result;
use crate::ledger::{DocKey, LedgerStore};
use crate::missions::missions_model::MemberProgress;
use crate::rewards::rewards_model::{EquipmentItem, Member};

// Ledger key builders for the hierarchical document namespace.

pub fn alliance_key(alliance_id: &str) -> DocKey {
    DocKey::new(format!("alliances/{alliance_id}"))
}

pub fn progress_prefix(alliance_id: &str) -> DocKey {
    DocKey::new(format!("alliances/{alliance_id}/progress"))
}

pub fn progress_key(alliance_id: &str, member_id: &str) -> DocKey {
    DocKey::new(format!("alliances/{alliance_id}/progress/{member_id}"))
}

pub fn member_key(member_id: &str) -> DocKey {
    DocKey::new(format!("members/{member_id}"))
}

pub fn equipment_prefix(member_id: &str) -> DocKey {
    DocKey::new(format!("members/{member_id}/equipment"))
}

pub fn equipment_key(member_id: &str, item_id: &str) -> DocKey {
    DocKey::new(format!("members/{member_id}/equipment/{item_id}"))
}

/// Read-side access to alliance documents, used by embedders to render
/// mission state. All mutation goes through the mission and reward services.
pub struct AllianceRepository<L: LedgerStore> {
    ledger: Arc<L>,
}

impl<L: LedgerStore> AllianceRepository<L> {
    pub fn new(ledger: Arc<L>) -> Self {
        AllianceRepository { ledger }
    }

    pub fn get(&self, alliance_id: &str) -> Result<Option<Alliance>> {
        self.ledger
            .run_transaction(|txn| txn.get(&alliance_key(alliance_id)))
    }

    /// Creates or replaces an alliance document. Membership is handed in by
    /// the surrounding application, not derived here.
    pub fn save(&self, alliance: &Alliance) -> Result<()> {
        self.ledger
            .run_transaction(|txn| txn.put(&alliance_key(&alliance.id), alliance))
    }

    pub fn get_progress(
        &self,
        alliance_id: &str,
        member_id: &str,
    ) -> Result<Option<MemberProgress>> {
        self.ledger
            .run_transaction(|txn| txn.get(&progress_key(alliance_id, member_id)))
    }

    pub fn get_member(&self, member_id: &str) -> Result<Option<Member>> {
        self.ledger
            .run_transaction(|txn| txn.get(&member_key(member_id)))
    }

    pub fn save_member(&self, member: &Member) -> Result<()> {
        self.ledger
            .run_transaction(|txn| txn.put(&member_key(&member.id), member))
    }

    pub fn list_equipment(&self, member_id: &str) -> Result<Vec<EquipmentItem>> {
        self.ledger.run_transaction(|txn| {
            let keys = txn.list_keys(&equipment_prefix(member_id))?;
            let mut items = Vec::with_capacity(keys.len());
            for key in keys {
                if let Some(item) = txn.get(&key)? {
                    items.push(item);
                }
            }
            Ok(items)
        })
    }
}
