// 👤 User Entity
//
// A user carries a role (admin | user) and an optional household.
// The household reference is mutable at any time (join / leave / switch /
// admin move); records created earlier keep the household they were
// stamped with.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::household::HouseholdId;
use super::text_enum;
use crate::error::{AppError, AppResult};

pub type UserId = i64;

// ============================================================================
// ROLE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Manages users, roles and household membership
    Admin,

    /// Regular household member
    #[default]
    User,
}

text_enum!(Role {
    Admin => "admin",
    User => "user",
});

impl Role {
    /// Human-facing label
    pub fn label(&self) -> &'static str {
        match self {
            Role::Admin => "Administrador",
            Role::User => "Usuário",
        }
    }
}

// ============================================================================
// USER ENTITY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,

    /// None = unassigned
    pub household_id: Option<HouseholdId>,

    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn has_household(&self) -> bool {
        self.household_id.is_some()
    }

    /// True only for a real (non-null) shared household
    pub fn is_member_of(&self, household_id: HouseholdId) -> bool {
        self.household_id == Some(household_id)
    }
}

// ============================================================================
// NEW USER (insert payload)
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: Role,
}

impl NewUser {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        NewUser {
            name: name.into(),
            email: email.into(),
            role: Role::User,
        }
    }

    pub fn admin(name: impl Into<String>, email: impl Into<String>) -> Self {
        NewUser {
            role: Role::Admin,
            ..NewUser::new(name, email)
        }
    }

    /// Trim + lowercase the e-mail and check required fields
    pub fn validate(mut self) -> AppResult<Self> {
        self.name = self.name.trim().to_string();
        self.email = self.email.trim().to_lowercase();

        if self.name.is_empty() {
            return Err(AppError::validation("name is required"));
        }
        if self.name.chars().count() > 255 {
            return Err(AppError::validation("name must be at most 255 characters"));
        }
        if self.email.is_empty() || !self.email.contains('@') {
            return Err(AppError::validation("a valid email is required"));
        }
        if self.email.chars().count() > 255 {
            return Err(AppError::validation("email must be at most 255 characters"));
        }

        Ok(self)
    }
}
