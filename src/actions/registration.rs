// 📝 Registration + admin seeding
//
// Registration is the one multi-write action: user, household and the
// user's back-reference commit together or not at all.

use rusqlite::Connection;
use tracing::info;

use super::record_event;
use crate::db;
use crate::entities::{Household, NewUser, Role, User};
use crate::error::{AppError, AppResult};

/// Register a regular user together with their own household.
///
/// The household is named `"Lar de {name}"` and the user becomes both its
/// creator and member. On any failure nothing is left behind.
pub fn register_user(conn: &Connection, new_user: NewUser) -> AppResult<(User, Household)> {
    let new_user = NewUser {
        role: Role::User,
        ..new_user
    }
    .validate()?;

    if db::find_user_by_email(conn, &new_user.email)?.is_some() {
        return Err(AppError::validation("email is already registered"));
    }

    let household_name = Household::default_name_for(&new_user.name);
    if household_name.chars().count() > Household::MAX_NAME_LEN {
        return Err(AppError::validation(format!(
            "name is too long: household name would exceed {} characters",
            Household::MAX_NAME_LEN
        )));
    }

    // Dropping `tx` without commit rolls everything back
    let tx = conn.unchecked_transaction()?;

    let user = db::insert_user(&tx, &new_user, None)?;
    let household = db::insert_household(&tx, &household_name, user.id)?;
    db::set_user_household(&tx, user.id, Some(household.id))?;
    record_event(
        &tx,
        "user_registered",
        "user",
        user.id,
        serde_json::json!({ "household_id": household.id, "household_name": household.name }),
        user.id,
    )?;

    tx.commit()?;

    info!(user_id = user.id, household_id = household.id, "user registered");

    let user = User {
        household_id: Some(household.id),
        ..user
    };
    Ok((user, household))
}

/// First-or-create the bootstrap admin. Returns the user and whether it was
/// created by this call. An existing account is returned untouched.
pub fn seed_admin(conn: &Connection, name: &str, email: &str) -> AppResult<(User, bool)> {
    let new_admin = NewUser::admin(name, email).validate()?;

    if let Some(existing) = db::find_user_by_email(conn, &new_admin.email)? {
        return Ok((existing, false));
    }

    let tx = conn.unchecked_transaction()?;
    let admin = db::insert_user(&tx, &new_admin, None)?;
    db::insert_event(
        &tx,
        &db::Event::new(
            "admin_seeded",
            "user",
            admin.id,
            serde_json::json!({ "email": admin.email }),
            "seeder",
        ),
    )?;
    tx.commit()?;

    info!(user_id = admin.id, email = %admin.email, "admin seeded");
    Ok((admin, true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::setup_database;

    fn test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        conn
    }

    fn count(conn: &Connection, table: &str) -> i64 {
        conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_registration_creates_household() {
        let conn = test_db();
        let (user, household) = register_user(&conn, NewUser::new("Test User", "test@example.com")).unwrap();

        assert_eq!(household.name, "Lar de Test User");
        assert_eq!(household.created_by, user.id);
        assert_eq!(user.household_id, Some(household.id));
        assert_eq!(user.role, Role::User);

        let stored = db::require_user(&conn, user.id).unwrap();
        assert_eq!(stored.household_id, Some(household.id));
        assert!(db::is_household_creator(&conn, user.id).unwrap());
    }

    #[test]
    fn test_registration_ignores_requested_role() {
        let conn = test_db();
        let (user, _) = register_user(&conn, NewUser::admin("Sneaky", "sneaky@example.com")).unwrap();
        assert_eq!(user.role, Role::User);
        assert_eq!(db::count_admins(&conn).unwrap(), 0);
    }

    #[test]
    fn test_name_too_long_for_household_is_validation_error() {
        let conn = test_db();

        // 250 chars is a valid user name, but "Lar de " + 250 is not a valid
        // household name
        let long_name = "a".repeat(250);
        let result = register_user(&conn, NewUser::new(long_name, "long@example.com"));

        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(count(&conn, "users"), 0);
        assert_eq!(count(&conn, "households"), 0);
        assert_eq!(count(&conn, "events"), 0);
    }

    #[test]
    fn test_registration_rolls_back_when_event_insert_fails() {
        let conn = test_db();
        conn.execute_batch(
            "CREATE TRIGGER fail_user_registered BEFORE INSERT ON events
             WHEN NEW.event_type = 'user_registered'
             BEGIN SELECT RAISE(ABORT, 'event log unavailable'); END;",
        )
        .unwrap();

        let result = register_user(&conn, NewUser::new("Ana", "ana@example.com"));

        assert!(matches!(result, Err(AppError::Database(_))));
        assert_eq!(count(&conn, "users"), 0);
        assert_eq!(count(&conn, "households"), 0);
        assert_eq!(count(&conn, "events"), 0);
    }

    #[test]
    fn test_longest_name_that_fits_registers() {
        let conn = test_db();
        let name = "b".repeat(255 - "Lar de ".len());

        let (_, household) = register_user(&conn, NewUser::new(name, "fits@example.com")).unwrap();
        assert_eq!(household.name.chars().count(), 255);
    }

    #[test]
    fn test_duplicate_email_rejected_before_any_write() {
        let conn = test_db();
        register_user(&conn, NewUser::new("Ana", "ana@example.com")).unwrap();

        let second = register_user(&conn, NewUser::new("Ana Two", "ANA@example.com"));
        assert!(matches!(second, Err(AppError::Validation(_))));
        assert_eq!(count(&conn, "users"), 1);
        assert_eq!(count(&conn, "households"), 1);
    }

    #[test]
    fn test_seed_admin_is_idempotent() {
        let conn = test_db();

        let (admin, created) = seed_admin(&conn, "Administrador", "admin@zello.com").unwrap();
        assert!(created);
        assert!(admin.is_admin());

        let (again, created) = seed_admin(&conn, "Administrador", "admin@zello.com").unwrap();
        assert!(!created);
        assert_eq!(again.id, admin.id);
        assert_eq!(db::count_admins(&conn).unwrap(), 1);
    }
}
