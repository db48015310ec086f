// ⚙️ Actions - the single write path
//
// Every action follows the same control flow:
// 1. resolve the target (NotFound if missing)
// 2. consult the policy (Forbidden / InvariantViolation if denied)
// 3. stamp household on insert
// 4. write, then append an audit event on the same transaction
//
// A denied action never reaches step 3.

pub mod household;
pub mod records;
pub mod registration;
pub mod users;

use rusqlite::Connection;
use serde::Serialize;

use crate::db::{insert_event, Event};
use crate::entities::UserId;
use crate::error::AppResult;

/// Outcome of a membership transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipChange {
    Changed,

    /// Already in the requested state; informational, nothing written
    Unchanged,
}

pub(crate) fn record_event(
    conn: &Connection,
    event_type: &str,
    entity_type: &str,
    entity_id: i64,
    data: serde_json::Value,
    actor: UserId,
) -> AppResult<()> {
    insert_event(conn, &Event::new(event_type, entity_type, entity_id, data, actor))
}
