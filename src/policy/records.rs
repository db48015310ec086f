// Receita / Despesa policy. Both kinds share one shape through LedgerRecord.

use super::{Decision, DenyReason};
use crate::entities::{LedgerRecord, User};

pub fn view_any(_user: &User) -> Decision {
    Decision::Allow
}

/// Owner, creator, responsible party, or same (non-null) household
pub fn view<R: LedgerRecord>(user: &User, record: &R) -> Decision {
    let stamp = record.ownership();
    let shares_household = match (user.household_id, stamp.household_id) {
        (Some(mine), Some(theirs)) => mine == theirs,
        _ => false,
    };

    Decision::allow_if(
        stamp.is_owner(user.id)
            || stamp.is_creator(user.id)
            || stamp.is_responsible(user.id)
            || shares_household,
        DenyReason::NoRelation,
    )
}

pub fn create(_user: &User) -> Decision {
    Decision::Allow
}

/// Household membership alone is not enough to edit
pub fn update<R: LedgerRecord>(user: &User, record: &R) -> Decision {
    let stamp = record.ownership();
    Decision::allow_if(
        stamp.is_owner(user.id) || stamp.is_creator(user.id) || stamp.is_responsible(user.id),
        DenyReason::NotOwnerCreatorOrResponsible,
    )
}

pub fn delete<R: LedgerRecord>(user: &User, record: &R) -> Decision {
    let stamp = record.ownership();
    Decision::allow_if(
        stamp.is_creator(user.id) || stamp.is_owner(user.id),
        DenyReason::NotCreatorOrOwner,
    )
}

pub fn restore<R: LedgerRecord>(user: &User, record: &R) -> Decision {
    Decision::allow_if(record.ownership().is_owner(user.id), DenyReason::NotOwner)
}

pub fn force_delete<R: LedgerRecord>(user: &User, record: &R) -> Decision {
    Decision::allow_if(record.ownership().is_owner(user.id), DenyReason::NotOwner)
}

pub fn can_view<R: LedgerRecord>(user: &User, record: &R) -> bool {
    view(user, record).is_allowed()
}

pub fn can_create(user: &User) -> bool {
    create(user).is_allowed()
}

pub fn can_update<R: LedgerRecord>(user: &User, record: &R) -> bool {
    update(user, record).is_allowed()
}

pub fn can_delete<R: LedgerRecord>(user: &User, record: &R) -> bool {
    delete(user, record).is_allowed()
}
