// 🏠 Household Entity
//
// A shared grouping of users who jointly view and manage finance records.
// Exactly one creator per household; the creator is never removed from it
// and never deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::user::{User, UserId};

pub type HouseholdId = i64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Household {
    pub id: HouseholdId,
    pub name: String,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
}

impl Household {
    pub const MAX_NAME_LEN: usize = 255;

    /// Name given to the household auto-created at registration
    pub fn default_name_for(user_name: &str) -> String {
        format!("Lar de {}", user_name)
    }

    pub fn is_creator(&self, user_id: UserId) -> bool {
        self.created_by == user_id
    }
}

/// Household plus its current members, as shown on the household page
#[derive(Debug, Clone, Serialize)]
pub struct HouseholdWithMembers {
    #[serde(flatten)]
    pub household: Household,
    pub members: Vec<User>,
}
