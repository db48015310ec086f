// User management policy.
//
// `admin_count` is the current system-wide number of admins, looked up by
// the caller (db::count_admins) right before the check.

use super::{Decision, DenyReason};
use crate::entities::User;

pub fn view_any(actor: &User) -> Decision {
    Decision::allow_if(actor.is_admin(), DenyReason::NotAdmin)
}

pub fn view(actor: &User, target: &User) -> Decision {
    Decision::allow_if(actor.is_admin() || actor.id == target.id, DenyReason::NotAdmin)
}

pub fn create(actor: &User) -> Decision {
    Decision::allow_if(actor.is_admin(), DenyReason::NotAdmin)
}

/// Generic profile update: admin, and never on self
pub fn update(actor: &User, target: &User) -> Decision {
    if actor.id == target.id {
        return Decision::Deny(DenyReason::SelfTarget);
    }
    Decision::allow_if(actor.is_admin(), DenyReason::NotAdmin)
}

pub fn update_role(actor: &User, target: &User, admin_count: i64) -> Decision {
    guard_admin_change(actor, target, admin_count)
}

/// Household-creator protection is a separate caller-level precondition
/// (see `db::is_household_creator`).
pub fn delete(actor: &User, target: &User, admin_count: i64) -> Decision {
    guard_admin_change(actor, target, admin_count)
}

pub fn restore(actor: &User, _target: &User) -> Decision {
    Decision::allow_if(actor.is_admin(), DenyReason::NotAdmin)
}

pub fn force_delete(actor: &User, target: &User) -> Decision {
    update(actor, target)
}

pub fn manage_household_membership(actor: &User, _target: &User) -> Decision {
    Decision::allow_if(actor.is_admin(), DenyReason::NotAdmin)
}

pub fn can_update_role(actor: &User, target: &User, admin_count: i64) -> bool {
    update_role(actor, target, admin_count).is_allowed()
}

pub fn can_delete_user(actor: &User, target: &User, admin_count: i64) -> bool {
    delete(actor, target, admin_count).is_allowed()
}

/// Shared shape of update_role and delete: not self, admin only, and never
/// the last admin.
fn guard_admin_change(actor: &User, target: &User, admin_count: i64) -> Decision {
    if actor.id == target.id {
        return Decision::Deny(DenyReason::SelfTarget);
    }
    if !actor.is_admin() {
        return Decision::Deny(DenyReason::NotAdmin);
    }
    if target.is_admin() {
        return Decision::allow_if(admin_count > 1, DenyReason::LastAdmin);
    }
    Decision::Allow
}
