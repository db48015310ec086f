use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::entities::{Household, HouseholdId, NewUser, Role, User, UserId};
use crate::error::{AppError, AppResult};

/// Event for audit trail: every accepted mutation leaves one behind.
///
/// Entity ids and actors are stored as TEXT so system actors ("seeder") fit
/// next to numeric user ids. Callers write events on the same transaction
/// as the change they describe.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Event {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub entity_type: String,
    pub entity_id: String,
    pub data: serde_json::Value,
    /// Acting user id, or a fixed label for system actors ("seeder")
    pub actor: String,
}

impl Event {
    pub fn new(
        event_type: &str,
        entity_type: &str,
        entity_id: impl ToString,
        data: serde_json::Value,
        actor: impl ToString,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            data,
            actor: actor.to_string(),
        }
    }
}

/// Open (or create) the database file and make sure the schema exists
pub fn open_database(path: &Path) -> AppResult<Connection> {
    let conn = Connection::open(path)?;
    setup_database(&conn)?;
    Ok(conn)
}

pub fn setup_database(conn: &Connection) -> AppResult<()> {
    // WAL for crash recovery; foreign keys are off by default in SQLite
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;

    // ==========================================================================
    // Users + Households (cyclic: households.created_by -> users,
    // users.household_id -> households)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL CHECK (length(name) BETWEEN 1 AND 255),
            email TEXT UNIQUE NOT NULL,
            role TEXT NOT NULL DEFAULT 'user' CHECK (role IN ('admin', 'user')),
            household_id INTEGER REFERENCES households(id) ON DELETE SET NULL,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS households (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL CHECK (length(name) BETWEEN 1 AND 255),
            created_by INTEGER NOT NULL REFERENCES users(id),
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    // ==========================================================================
    // Receitas + Despesas (same ownership stamp columns)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS receitas (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            household_id INTEGER REFERENCES households(id) ON DELETE SET NULL,
            created_by INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            responsible_user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            descricao TEXT NOT NULL,
            valor TEXT NOT NULL,
            tipo TEXT NOT NULL CHECK (tipo IN ('salario', 'freelance', 'rendimento', 'outros')),
            frequencia TEXT NOT NULL CHECK (frequencia IN ('mensal', 'semanal', 'unica')),
            status TEXT NOT NULL CHECK (status IN ('recebido', 'pendente')),
            data_recebimento TEXT,
            data_vencimento TEXT,
            observacoes TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS despesas (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            household_id INTEGER REFERENCES households(id) ON DELETE SET NULL,
            created_by INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            responsible_user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            descricao TEXT NOT NULL,
            valor TEXT NOT NULL,
            tipo TEXT NOT NULL CHECK (tipo IN ('fixa', 'variavel')),
            categoria TEXT NOT NULL,
            status TEXT NOT NULL CHECK (status IN ('pago', 'pendente', 'vencido')),
            data_pagamento TEXT,
            data_vencimento TEXT NOT NULL,
            recorrente INTEGER NOT NULL DEFAULT 0,
            observacoes TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;

    // ==========================================================================
    // Events Table (audit trail)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT UNIQUE NOT NULL,
            timestamp TEXT NOT NULL,
            event_type TEXT NOT NULL,
            entity_type TEXT NOT NULL,
            entity_id TEXT NOT NULL,
            data TEXT NOT NULL,
            actor TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    // ==========================================================================
    // Indexes
    // ==========================================================================
    for statement in [
        "CREATE INDEX IF NOT EXISTS idx_users_household ON users(household_id)",
        "CREATE INDEX IF NOT EXISTS idx_users_role ON users(role)",
        "CREATE INDEX IF NOT EXISTS idx_households_creator ON households(created_by)",
        "CREATE INDEX IF NOT EXISTS idx_receitas_household ON receitas(household_id)",
        "CREATE INDEX IF NOT EXISTS idx_receitas_created_by ON receitas(created_by)",
        "CREATE INDEX IF NOT EXISTS idx_receitas_responsible ON receitas(responsible_user_id)",
        "CREATE INDEX IF NOT EXISTS idx_despesas_household ON despesas(household_id)",
        "CREATE INDEX IF NOT EXISTS idx_despesas_created_by ON despesas(created_by)",
        "CREATE INDEX IF NOT EXISTS idx_despesas_responsible ON despesas(responsible_user_id)",
        "CREATE INDEX IF NOT EXISTS idx_events_entity ON events(entity_type, entity_id)",
        "CREATE INDEX IF NOT EXISTS idx_events_timestamp ON events(timestamp)",
    ] {
        conn.execute(statement, [])?;
    }

    Ok(())
}

// ============================================================================
// USERS
// ============================================================================

const USER_COLUMNS: &str = "id, name, email, role, household_id, created_at";

fn user_from_row(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        role: row.get(3)?,
        household_id: row.get(4)?,
        created_at: row.get(5)?,
    })
}

/// Insert a user. `new_user` is expected to be validated already.
pub fn insert_user(
    conn: &Connection,
    new_user: &NewUser,
    household_id: Option<HouseholdId>,
) -> AppResult<User> {
    conn.execute(
        "INSERT INTO users (name, email, role, household_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![new_user.name, new_user.email, new_user.role, household_id, Utc::now()],
    )?;

    require_user(conn, conn.last_insert_rowid())
}

pub fn get_user(conn: &Connection, id: UserId) -> AppResult<Option<User>> {
    let user = conn
        .query_row(
            &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
            [id],
            user_from_row,
        )
        .optional()?;
    Ok(user)
}

/// Like `get_user` but a missing row is NotFound
pub fn require_user(conn: &Connection, id: UserId) -> AppResult<User> {
    get_user(conn, id)?.ok_or_else(|| AppError::not_found("user", id))
}

pub fn find_user_by_email(conn: &Connection, email: &str) -> AppResult<Option<User>> {
    let user = conn
        .query_row(
            &format!("SELECT {} FROM users WHERE email = ?1", USER_COLUMNS),
            [email.trim().to_lowercase()],
            user_from_row,
        )
        .optional()?;
    Ok(user)
}

fn query_users(conn: &Connection, sql: &str, args: &[&dyn rusqlite::ToSql]) -> AppResult<Vec<User>> {
    let mut stmt = conn.prepare(sql)?;
    let users = stmt
        .query_map(args, user_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(users)
}

pub fn list_users(conn: &Connection) -> AppResult<Vec<User>> {
    query_users(
        conn,
        &format!("SELECT {} FROM users ORDER BY name", USER_COLUMNS),
        &[],
    )
}

pub fn list_household_members(conn: &Connection, household_id: HouseholdId) -> AppResult<Vec<User>> {
    query_users(
        conn,
        &format!(
            "SELECT {} FROM users WHERE household_id = ?1 ORDER BY name",
            USER_COLUMNS
        ),
        &[&household_id],
    )
}

/// Users with no household or in a different one
pub fn list_users_outside_household(
    conn: &Connection,
    household_id: HouseholdId,
) -> AppResult<Vec<User>> {
    query_users(
        conn,
        &format!(
            "SELECT {} FROM users
             WHERE household_id IS NULL OR household_id != ?1
             ORDER BY name",
            USER_COLUMNS
        ),
        &[&household_id],
    )
}

pub fn set_user_household(
    conn: &Connection,
    user_id: UserId,
    household_id: Option<HouseholdId>,
) -> AppResult<()> {
    let changed = conn.execute(
        "UPDATE users SET household_id = ?1 WHERE id = ?2",
        params![household_id, user_id],
    )?;
    if changed == 0 {
        return Err(AppError::not_found("user", user_id));
    }
    Ok(())
}

pub fn update_user_role(conn: &Connection, user_id: UserId, role: Role) -> AppResult<()> {
    let changed = conn.execute(
        "UPDATE users SET role = ?1 WHERE id = ?2",
        params![role, user_id],
    )?;
    if changed == 0 {
        return Err(AppError::not_found("user", user_id));
    }
    Ok(())
}

pub fn delete_user(conn: &Connection, user_id: UserId) -> AppResult<()> {
    let changed = conn.execute("DELETE FROM users WHERE id = ?1", [user_id])?;
    if changed == 0 {
        return Err(AppError::not_found("user", user_id));
    }
    Ok(())
}

/// System-wide number of admins
pub fn count_admins(conn: &Connection) -> AppResult<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM users WHERE role = 'admin'",
        [],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Whether the user created any household
pub fn is_household_creator(conn: &Connection, user_id: UserId) -> AppResult<bool> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM households WHERE created_by = ?1)",
        [user_id],
        |row| row.get(0),
    )?;
    Ok(exists)
}

// ============================================================================
// HOUSEHOLDS
// ============================================================================

const HOUSEHOLD_COLUMNS: &str = "id, name, created_by, created_at";

fn household_from_row(row: &Row) -> rusqlite::Result<Household> {
    Ok(Household {
        id: row.get(0)?,
        name: row.get(1)?,
        created_by: row.get(2)?,
        created_at: row.get(3)?,
    })
}

pub fn insert_household(conn: &Connection, name: &str, created_by: UserId) -> AppResult<Household> {
    conn.execute(
        "INSERT INTO households (name, created_by, created_at) VALUES (?1, ?2, ?3)",
        params![name, created_by, Utc::now()],
    )?;

    require_household(conn, conn.last_insert_rowid())
}

pub fn get_household(conn: &Connection, id: HouseholdId) -> AppResult<Option<Household>> {
    let household = conn
        .query_row(
            &format!("SELECT {} FROM households WHERE id = ?1", HOUSEHOLD_COLUMNS),
            [id],
            household_from_row,
        )
        .optional()?;
    Ok(household)
}

pub fn require_household(conn: &Connection, id: HouseholdId) -> AppResult<Household> {
    get_household(conn, id)?.ok_or_else(|| AppError::not_found("household", id))
}

pub fn list_households(conn: &Connection) -> AppResult<Vec<Household>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM households ORDER BY name",
        HOUSEHOLD_COLUMNS
    ))?;
    let households = stmt
        .query_map([], household_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(households)
}

pub fn rename_household(conn: &Connection, id: HouseholdId, name: &str) -> AppResult<()> {
    let changed = conn.execute(
        "UPDATE households SET name = ?1 WHERE id = ?2",
        params![name, id],
    )?;
    if changed == 0 {
        return Err(AppError::not_found("household", id));
    }
    Ok(())
}

// ============================================================================
// EVENTS
// ============================================================================

/// Insert event into audit trail
pub fn insert_event(conn: &Connection, event: &Event) -> AppResult<()> {
    let data_json = serde_json::to_string(&event.data)?;

    conn.execute(
        "INSERT INTO events (
            event_id, timestamp, event_type, entity_type, entity_id, data, actor
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            event.event_id,
            event.timestamp.to_rfc3339(),
            event.event_type,
            event.entity_type,
            event.entity_id,
            data_json,
            event.actor,
        ],
    )?;

    Ok(())
}

/// Get events for a specific entity, newest first. Events written in the
/// same instant fall back to insertion order (`id DESC`). A row with an
/// unparseable timestamp or payload is a conversion error, not a skipped row.
pub fn get_events_for_entity(
    conn: &Connection,
    entity_type: &str,
    entity_id: &str,
) -> AppResult<Vec<Event>> {
    let mut stmt = conn.prepare(
        "SELECT event_id, timestamp, event_type, entity_type, entity_id, data, actor
         FROM events
         WHERE entity_type = ?1 AND entity_id = ?2
         ORDER BY timestamp DESC, id DESC",
    )?;

    let events = stmt
        .query_map(params![entity_type, entity_id], |row| {
            let timestamp_str: String = row.get(1)?;
            let data_json: String = row.get(5)?;

            Ok(Event {
                event_id: row.get(0)?,
                timestamp: DateTime::parse_from_rfc3339(&timestamp_str)
                    .map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
                    })?
                    .with_timezone(&Utc),
                event_type: row.get(2)?,
                entity_type: row.get(3)?,
                entity_id: row.get(4)?,
                data: serde_json::from_str(&data_json).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
                })?,
                actor: row.get(6)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        conn
    }

    #[test]
    fn test_setup_is_idempotent() {
        let conn = test_db();
        setup_database(&conn).unwrap();
        assert_eq!(count_admins(&conn).unwrap(), 0);
    }

    #[test]
    fn test_insert_and_get_user() {
        let conn = test_db();
        let user = insert_user(&conn, &NewUser::new("Ana", "ana@example.com"), None).unwrap();

        assert_eq!(user.role, Role::User);
        assert_eq!(user.household_id, None);

        let loaded = get_user(&conn, user.id).unwrap().unwrap();
        assert_eq!(loaded, user);

        let by_email = find_user_by_email(&conn, " ANA@example.com").unwrap().unwrap();
        assert_eq!(by_email.id, user.id);

        assert!(get_user(&conn, 999).unwrap().is_none());
        assert!(matches!(require_user(&conn, 999), Err(AppError::NotFound { .. })));
    }

    #[test]
    fn test_duplicate_email_is_rejected_by_schema() {
        let conn = test_db();
        insert_user(&conn, &NewUser::new("Ana", "ana@example.com"), None).unwrap();
        let second = insert_user(&conn, &NewUser::new("Outra Ana", "ana@example.com"), None);
        assert!(matches!(second, Err(AppError::Database(_))));
    }

    #[test]
    fn test_count_admins() {
        let conn = test_db();
        insert_user(&conn, &NewUser::admin("Root", "root@example.com"), None).unwrap();
        let bob = insert_user(&conn, &NewUser::new("Bob", "bob@example.com"), None).unwrap();
        assert_eq!(count_admins(&conn).unwrap(), 1);

        update_user_role(&conn, bob.id, Role::Admin).unwrap();
        assert_eq!(count_admins(&conn).unwrap(), 2);
    }

    #[test]
    fn test_household_creator_and_members() {
        let conn = test_db();
        let ana = insert_user(&conn, &NewUser::new("Ana", "ana@example.com"), None).unwrap();
        let bob = insert_user(&conn, &NewUser::new("Bob", "bob@example.com"), None).unwrap();

        assert!(!is_household_creator(&conn, ana.id).unwrap());

        let household = insert_household(&conn, "Lar de Ana", ana.id).unwrap();
        set_user_household(&conn, ana.id, Some(household.id)).unwrap();

        assert!(is_household_creator(&conn, ana.id).unwrap());
        assert!(!is_household_creator(&conn, bob.id).unwrap());

        let members = list_household_members(&conn, household.id).unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].id, ana.id);

        let outside = list_users_outside_household(&conn, household.id).unwrap();
        assert_eq!(outside.len(), 1);
        assert_eq!(outside[0].id, bob.id);
    }

    #[test]
    fn test_household_name_length_checked_by_schema() {
        let conn = test_db();
        let ana = insert_user(&conn, &NewUser::new("Ana", "ana@example.com"), None).unwrap();
        let too_long = "x".repeat(256);
        assert!(insert_household(&conn, &too_long, ana.id).is_err());
    }

    #[test]
    fn test_missing_rows_are_not_found() {
        let conn = test_db();
        assert!(matches!(
            set_user_household(&conn, 1, None),
            Err(AppError::NotFound { entity: "user", .. })
        ));
        assert!(matches!(
            rename_household(&conn, 1, "x"),
            Err(AppError::NotFound { entity: "household", .. })
        ));
    }

    #[test]
    fn test_event_log() {
        let conn = test_db();

        let event = Event::new(
            "role_changed",
            "user",
            7,
            serde_json::json!({"from": "admin", "to": "user"}),
            1,
        );

        insert_event(&conn, &event).unwrap();

        let events = get_events_for_entity(&conn, "user", "7").unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "role_changed");
        assert_eq!(events[0].actor, "1");
        assert_eq!(events[0].data["to"], "user");
    }

    #[test]
    fn test_event_log_ties_and_bad_rows() {
        let conn = test_db();

        let first = Event::new("member_added", "household", 3, serde_json::json!({}), "seeder");
        let second = Event {
            event_id: uuid::Uuid::new_v4().to_string(),
            event_type: "member_removed".to_string(),
            ..first.clone()
        };
        insert_event(&conn, &first).unwrap();
        insert_event(&conn, &second).unwrap();

        let events = get_events_for_entity(&conn, "household", "3").unwrap();
        assert_eq!(events[0].event_type, "member_removed");
        assert_eq!(events[1].event_type, "member_added");
        assert_eq!(events[1].actor, "seeder");

        conn.execute("UPDATE events SET data = 'not json' WHERE event_type = 'member_added'", [])
            .unwrap();
        assert!(matches!(
            get_events_for_entity(&conn, "household", "3"),
            Err(AppError::Database(rusqlite::Error::FromSqlConversionFailure(5, _, _)))
        ));
    }
}
