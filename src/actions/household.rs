// 🏠 Household membership transitions for the acting user
//
//   unassigned ──create──▶ member(H')      (actor becomes creator of H')
//   any        ──join(H)─▶ member(H)       (no-op if already member(H))
//   any        ──switch(H)▶ member(H)      (unconditional, H must exist)
//   member(H)  ──leave───▶ unassigned
//
// Records already created keep the household they were stamped with.

use rusqlite::Connection;
use tracing::{debug, info};

use super::{record_event, MembershipChange};
use crate::db;
use crate::entities::{Household, HouseholdId, HouseholdWithMembers, User};
use crate::error::{AppError, AppResult};
use crate::policy;

fn validate_name(name: &str) -> AppResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::validation("household name is required"));
    }
    if name.chars().count() > Household::MAX_NAME_LEN {
        return Err(AppError::validation("household name must be at most 255 characters"));
    }
    Ok(name.to_string())
}

fn with_members(conn: &Connection, household: Household) -> AppResult<HouseholdWithMembers> {
    let members = db::list_household_members(conn, household.id)?;
    Ok(HouseholdWithMembers { household, members })
}

/// The actor's current household, if any
pub fn current_household(conn: &Connection, actor: &User) -> AppResult<Option<HouseholdWithMembers>> {
    match actor.household_id {
        Some(household_id) => {
            let household = db::require_household(conn, household_id)?;
            Ok(Some(with_members(conn, household)?))
        }
        None => Ok(None),
    }
}

/// Create a household and move the actor into it as creator
pub fn create_household(conn: &Connection, actor: &User, name: &str) -> AppResult<Household> {
    let name = validate_name(name)?;

    let tx = conn.unchecked_transaction()?;
    let household = db::insert_household(&tx, &name, actor.id)?;
    db::set_user_household(&tx, actor.id, Some(household.id))?;
    record_event(
        &tx,
        "household_created",
        "household",
        household.id,
        serde_json::json!({ "name": household.name, "previous_household_id": actor.household_id }),
        actor.id,
    )?;
    tx.commit()?;

    info!(user_id = actor.id, household_id = household.id, "household created");
    Ok(household)
}

pub fn join_household(conn: &Connection, actor: &User, household_id: HouseholdId) -> AppResult<MembershipChange> {
    let household = db::require_household(conn, household_id)?;

    if actor.is_member_of(household.id) {
        debug!(user_id = actor.id, household_id, "already a member, nothing to join");
        return Ok(MembershipChange::Unchanged);
    }

    let tx = conn.unchecked_transaction()?;
    db::set_user_household(&tx, actor.id, Some(household.id))?;
    record_event(
        &tx,
        "household_joined",
        "user",
        actor.id,
        serde_json::json!({ "household_id": household.id, "from": actor.household_id }),
        actor.id,
    )?;
    tx.commit()?;

    info!(user_id = actor.id, household_id, "joined household");
    Ok(MembershipChange::Changed)
}

/// Quick switch between households. No membership validation beyond the
/// household existing.
pub fn switch_household(conn: &Connection, actor: &User, household_id: HouseholdId) -> AppResult<Household> {
    let household = db::require_household(conn, household_id)?;

    let tx = conn.unchecked_transaction()?;
    db::set_user_household(&tx, actor.id, Some(household.id))?;
    record_event(
        &tx,
        "household_switched",
        "user",
        actor.id,
        serde_json::json!({ "household_id": household.id, "from": actor.household_id }),
        actor.id,
    )?;
    tx.commit()?;

    info!(user_id = actor.id, household_id, "switched household");
    Ok(household)
}

pub fn leave_household(conn: &Connection, actor: &User) -> AppResult<MembershipChange> {
    let Some(previous) = actor.household_id else {
        return Ok(MembershipChange::Unchanged);
    };

    let tx = conn.unchecked_transaction()?;
    db::set_user_household(&tx, actor.id, None)?;
    record_event(
        &tx,
        "household_left",
        "user",
        actor.id,
        serde_json::json!({ "household_id": previous }),
        actor.id,
    )?;
    tx.commit()?;

    info!(user_id = actor.id, household_id = previous, "left household");
    Ok(MembershipChange::Changed)
}

/// Household page; members only
pub fn show_household(conn: &Connection, actor: &User, household_id: HouseholdId) -> AppResult<HouseholdWithMembers> {
    let household = db::require_household(conn, household_id)?;
    policy::households::view(actor, &household).into_result("household.view")?;
    with_members(conn, household)
}

pub fn rename_household(
    conn: &Connection,
    actor: &User,
    household_id: HouseholdId,
    name: &str,
) -> AppResult<Household> {
    let household = db::require_household(conn, household_id)?;
    policy::households::update(actor, &household).into_result("household.update")?;

    let name = validate_name(name)?;
    let tx = conn.unchecked_transaction()?;
    db::rename_household(&tx, household.id, &name)?;
    record_event(
        &tx,
        "household_renamed",
        "household",
        household.id,
        serde_json::json!({ "from": household.name, "to": name }),
        actor.id,
    )?;
    tx.commit()?;

    Ok(Household { name, ..household })
}

/// Every household with its members (join picker)
pub fn available_households(conn: &Connection) -> AppResult<Vec<HouseholdWithMembers>> {
    db::list_households(conn)?
        .into_iter()
        .map(|household| with_members(conn, household))
        .collect()
}
