// Household pages: only current members may see or rename a household.

use super::{Decision, DenyReason};
use crate::entities::{Household, User};

pub fn view(actor: &User, household: &Household) -> Decision {
    Decision::allow_if(actor.is_member_of(household.id), DenyReason::NotHouseholdMember)
}

pub fn update(actor: &User, household: &Household) -> Decision {
    Decision::allow_if(actor.is_member_of(household.id), DenyReason::NotHouseholdMember)
}
