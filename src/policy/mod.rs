// 🔐 Authorization Policies - pure predicates
//
// One family per resource kind:
// - records: receitas and despesas (identical shape)
// - users: user management, roles, household membership
// - households: viewing and renaming a household
//
// Every predicate takes the acting user explicitly and returns a tagged
// Decision. Conditions are ORed: any single true condition allows.
// Nothing here touches the store; callers pass in what the rule needs
// (e.g. the current admin count).

pub mod households;
pub mod records;
pub mod users;

use crate::error::{AppError, AppResult};

// ============================================================================
// DECISION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// Not owner, creator, responsible party, nor same household
    NoRelation,

    /// Not owner, creator or responsible party
    NotOwnerCreatorOrResponsible,

    NotCreatorOrOwner,

    NotOwner,

    NotAdmin,

    NotHouseholdMember,

    /// Actor targeted themselves where that is not allowed
    SelfTarget,

    /// Acting on the only remaining admin
    LastAdmin,
}

impl DenyReason {
    pub fn message(&self) -> &'static str {
        match self {
            DenyReason::NoRelation => "not owner, creator, responsible party or household member",
            DenyReason::NotOwnerCreatorOrResponsible => "not owner, creator or responsible party",
            DenyReason::NotCreatorOrOwner => "not creator or owner",
            DenyReason::NotOwner => "not owner",
            DenyReason::NotAdmin => "admin role required",
            DenyReason::NotHouseholdMember => "not a member of this household",
            DenyReason::SelfTarget => "cannot target own account",
            DenyReason::LastAdmin => "at least one admin must remain",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn allow_if(condition: bool, otherwise: DenyReason) -> Self {
        if condition {
            Decision::Allow
        } else {
            Decision::Deny(otherwise)
        }
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    pub fn deny_reason(&self) -> Option<DenyReason> {
        match self {
            Decision::Allow => None,
            Decision::Deny(reason) => Some(*reason),
        }
    }

    /// Turn a denial into the caller-facing error.
    ///
    /// A last-admin denial is an invariant violation; every other denial is
    /// a plain Forbidden.
    pub fn into_result(self, action: &'static str) -> AppResult<()> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(DenyReason::LastAdmin) => Err(AppError::invariant(format!(
                "{}: {}",
                action,
                DenyReason::LastAdmin.message()
            ))),
            Decision::Deny(reason) => Err(AppError::Forbidden {
                action,
                reason: reason.message(),
            }),
        }
    }
}
