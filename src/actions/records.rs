// 💰 Receitas / despesas write path
//
// Generic over the record kind: both kinds share the ownership stamp, the
// policy family and the scoping rules, so one implementation serves both.

use rusqlite::Connection;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::record_event;
use crate::db;
use crate::entities::{LedgerRecord, Ownership, RecordDraft, User};
use crate::error::{AppError, AppResult};
use crate::ledger::{delete_record, StoredRecord};
use crate::policy;
use crate::scope::{scope_for_household, stamp_household_on_create};

/// Load a record or fail with NotFound, before any policy runs
fn require<R: StoredRecord>(conn: &Connection, id: i64) -> AppResult<R> {
    R::find(conn, id)?.ok_or_else(|| AppError::not_found(R::KIND.entity(), id))
}

/// Create a record owned by `actor` and stamped with the actor's current
/// household. The responsible party defaults to the creator.
pub fn create<R>(conn: &Connection, actor: &User, draft: R::Draft) -> AppResult<R>
where
    R: StoredRecord + Serialize,
{
    policy::records::create(actor).into_result("records.create")?;

    let draft = draft.validate()?;
    if let Some(responsible_id) = draft.responsible_user_id() {
        db::require_user(conn, responsible_id)?;
    }

    let mut ownership = Ownership::for_creator(actor, draft.responsible_user_id());
    stamp_household_on_create(actor, &mut ownership);

    let tx = conn.unchecked_transaction()?;
    let record = R::insert(&tx, &ownership, &draft)?;
    record_event(
        &tx,
        "record_created",
        R::KIND.entity(),
        record.id(),
        serde_json::to_value(&record)?,
        actor.id,
    )?;
    tx.commit()?;

    info!(
        kind = R::KIND.entity(),
        record_id = record.id(),
        user_id = actor.id,
        household_id = ?ownership.household_id,
        "record created"
    );
    Ok(record)
}

pub fn get<R: StoredRecord>(conn: &Connection, actor: &User, id: i64) -> AppResult<R> {
    let record = require::<R>(conn, id)?;
    policy::records::view(actor, &record).into_result("records.view")?;
    Ok(record)
}

/// Overwrite the editable fields; ownership and household never change
pub fn update<R>(conn: &Connection, actor: &User, id: i64, draft: R::Draft) -> AppResult<R>
where
    R: StoredRecord + Serialize,
{
    let existing = require::<R>(conn, id)?;

    let decision = policy::records::update(actor, &existing);
    if let Some(reason) = decision.deny_reason() {
        warn!(kind = R::KIND.entity(), record_id = id, user_id = actor.id, ?reason, "update denied");
    }
    decision.into_result("records.update")?;

    let draft = draft.validate()?;
    if draft.responsible_user_id().is_some() {
        debug!(record_id = id, "responsible_user_id ignored on update");
    }

    let tx = conn.unchecked_transaction()?;
    R::overwrite(&tx, id, &draft)?;
    let record = require::<R>(&tx, id)?;
    record_event(
        &tx,
        "record_updated",
        R::KIND.entity(),
        id,
        serde_json::to_value(&record)?,
        actor.id,
    )?;
    tx.commit()?;

    info!(kind = R::KIND.entity(), record_id = id, user_id = actor.id, "record updated");
    Ok(record)
}

pub fn delete<R: StoredRecord>(conn: &Connection, actor: &User, id: i64) -> AppResult<()> {
    let existing = require::<R>(conn, id)?;

    let decision = policy::records::delete(actor, &existing);
    if let Some(reason) = decision.deny_reason() {
        warn!(kind = R::KIND.entity(), record_id = id, user_id = actor.id, ?reason, "delete denied");
    }
    decision.into_result("records.delete")?;

    let tx = conn.unchecked_transaction()?;
    delete_record(&tx, R::KIND, id)?;
    record_event(
        &tx,
        "record_deleted",
        R::KIND.entity(),
        id,
        serde_json::json!({ "household_id": existing.ownership().household_id }),
        actor.id,
    )?;
    tx.commit()?;

    info!(kind = R::KIND.entity(), record_id = id, user_id = actor.id, "record deleted");
    Ok(())
}

/// Records visible to the actor under household scoping
pub fn list<R: StoredRecord>(conn: &Connection, actor: &User) -> AppResult<Vec<R>> {
    policy::records::view_any(actor).into_result("records.view_any")?;
    R::list(conn, &scope_for_household(actor))
}
