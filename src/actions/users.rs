// 👥 User management: roles, deletion and admin-driven household membership

use rusqlite::Connection;
use serde::Serialize;
use tracing::{info, warn};

use super::{record_event, MembershipChange};
use crate::db;
use crate::entities::{Household, HouseholdId, NewUser, Role, User, UserId};
use crate::error::{AppError, AppResult};
use crate::policy;

/// Member-management page: the actor's household, its members, and
/// everyone who could be added to it
#[derive(Debug, Clone, Serialize)]
pub struct MembershipOverview {
    pub household: Household,
    pub members: Vec<User>,
    pub available_users: Vec<User>,
}

fn actor_household(conn: &Connection, actor: &User, what: &str) -> AppResult<Household> {
    match actor.household_id {
        Some(household_id) => db::require_household(conn, household_id),
        None => Err(AppError::invariant(format!(
            "you must belong to a household to {}",
            what
        ))),
    }
}

pub fn list_users(conn: &Connection, actor: &User) -> AppResult<Vec<User>> {
    policy::users::view_any(actor).into_result("users.view_any")?;
    db::list_users(conn)
}

pub fn get_user(conn: &Connection, actor: &User, user_id: UserId) -> AppResult<User> {
    let target = db::require_user(conn, user_id)?;
    policy::users::view(actor, &target).into_result("users.view")?;
    Ok(target)
}

/// Admin creates an account, optionally straight into their own household
pub fn create_user(
    conn: &Connection,
    actor: &User,
    new_user: NewUser,
    add_to_household: bool,
) -> AppResult<User> {
    policy::users::create(actor).into_result("users.create")?;

    let new_user = new_user.validate()?;
    if db::find_user_by_email(conn, &new_user.email)?.is_some() {
        return Err(AppError::validation("email is already registered"));
    }

    let household_id = if add_to_household { actor.household_id } else { None };
    let tx = conn.unchecked_transaction()?;
    let user = db::insert_user(&tx, &new_user, household_id)?;
    record_event(
        &tx,
        "user_created",
        "user",
        user.id,
        serde_json::json!({ "role": user.role, "household_id": household_id }),
        actor.id,
    )?;
    tx.commit()?;

    info!(actor_id = actor.id, user_id = user.id, "user created");
    Ok(user)
}

pub fn update_role(conn: &Connection, actor: &User, target_id: UserId, role: Role) -> AppResult<User> {
    let target = db::require_user(conn, target_id)?;
    let admin_count = db::count_admins(conn)?;

    let decision = policy::users::update_role(actor, &target, admin_count);
    if let Some(reason) = decision.deny_reason() {
        warn!(actor_id = actor.id, target_id, ?reason, "role change denied");
    }
    decision.into_result("users.update_role")?;

    let tx = conn.unchecked_transaction()?;
    db::update_user_role(&tx, target.id, role)?;
    record_event(
        &tx,
        "role_changed",
        "user",
        target.id,
        serde_json::json!({ "from": target.role, "to": role }),
        actor.id,
    )?;
    tx.commit()?;

    info!(actor_id = actor.id, target_id, role = %role, "role changed");
    Ok(User { role, ..target })
}

/// Delete a user. Policy first, then the household-creator precondition:
/// a household creator is never deleted, whatever the policy says.
pub fn delete_user(conn: &Connection, actor: &User, target_id: UserId) -> AppResult<()> {
    let target = db::require_user(conn, target_id)?;
    let admin_count = db::count_admins(conn)?;

    let decision = policy::users::delete(actor, &target, admin_count);
    if let Some(reason) = decision.deny_reason() {
        warn!(actor_id = actor.id, target_id, ?reason, "user deletion denied");
    }
    decision.into_result("users.delete")?;

    if db::is_household_creator(conn, target.id)? {
        warn!(actor_id = actor.id, target_id, "refusing to delete a household creator");
        return Err(AppError::invariant("household creators cannot be deleted"));
    }

    let tx = conn.unchecked_transaction()?;
    db::delete_user(&tx, target.id)?;
    record_event(
        &tx,
        "user_deleted",
        "user",
        target.id,
        serde_json::json!({ "email": target.email, "role": target.role }),
        actor.id,
    )?;
    tx.commit()?;

    info!(actor_id = actor.id, target_id, "user deleted");
    Ok(())
}

// ============================================================================
// ADMIN HOUSEHOLD MEMBERSHIP
// ============================================================================

pub fn membership_overview(conn: &Connection, actor: &User) -> AppResult<MembershipOverview> {
    policy::users::manage_household_membership(actor, actor).into_result("users.manage_membership")?;
    let household = actor_household(conn, actor, "manage members")?;

    Ok(MembershipOverview {
        members: db::list_household_members(conn, household.id)?,
        available_users: db::list_users_outside_household(conn, household.id)?,
        household,
    })
}

/// Pull `target` into the actor's household
pub fn add_to_household(conn: &Connection, actor: &User, target_id: UserId) -> AppResult<MembershipChange> {
    let target = db::require_user(conn, target_id)?;
    policy::users::manage_household_membership(actor, &target).into_result("users.manage_membership")?;
    let household = actor_household(conn, actor, "add members")?;

    if target.is_member_of(household.id) {
        return Ok(MembershipChange::Unchanged);
    }

    let tx = conn.unchecked_transaction()?;
    db::set_user_household(&tx, target.id, Some(household.id))?;
    record_event(
        &tx,
        "member_added",
        "household",
        household.id,
        serde_json::json!({ "user_id": target.id, "from": target.household_id }),
        actor.id,
    )?;
    tx.commit()?;

    info!(actor_id = actor.id, target_id, household_id = household.id, "member added");
    Ok(MembershipChange::Changed)
}

/// Remove `target` from the actor's household. The household creator can
/// never be removed.
pub fn remove_from_household(conn: &Connection, actor: &User, target_id: UserId) -> AppResult<()> {
    let target = db::require_user(conn, target_id)?;
    policy::users::manage_household_membership(actor, &target).into_result("users.manage_membership")?;
    let household = actor_household(conn, actor, "remove members")?;

    if !target.is_member_of(household.id) {
        return Err(AppError::invariant("user does not belong to your household"));
    }
    if household.is_creator(target.id) {
        warn!(actor_id = actor.id, target_id, household_id = household.id, "refusing to remove household creator");
        return Err(AppError::invariant("the household creator cannot be removed"));
    }

    let tx = conn.unchecked_transaction()?;
    db::set_user_household(&tx, target.id, None)?;
    record_event(
        &tx,
        "member_removed",
        "household",
        household.id,
        serde_json::json!({ "user_id": target.id }),
        actor.id,
    )?;
    tx.commit()?;

    info!(actor_id = actor.id, target_id, household_id = household.id, "member removed");
    Ok(())
}

/// Move `target` into any existing household
pub fn move_to_household(
    conn: &Connection,
    actor: &User,
    target_id: UserId,
    household_id: HouseholdId,
) -> AppResult<MembershipChange> {
    let target = db::require_user(conn, target_id)?;
    policy::users::manage_household_membership(actor, &target).into_result("users.manage_membership")?;
    let household = db::require_household(conn, household_id)?;

    if target.is_member_of(household.id) {
        return Ok(MembershipChange::Unchanged);
    }

    let tx = conn.unchecked_transaction()?;
    db::set_user_household(&tx, target.id, Some(household.id))?;
    record_event(
        &tx,
        "member_moved",
        "user",
        target.id,
        serde_json::json!({ "from": target.household_id, "to": household.id }),
        actor.id,
    )?;
    tx.commit()?;

    info!(actor_id = actor.id, target_id, household_id, "member moved");
    Ok(MembershipChange::Changed)
}
