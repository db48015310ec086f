// End-to-end scenarios over a fresh in-memory database

use rusqlite::Connection;
use rust_decimal::Decimal;

use zello::actions::{household, records, registration, users};
use zello::entities::{ExpenseDraft, IncomeDraft};
use zello::{
    can_delete_user, can_update_role, count_admins, is_household_creator, scope_for_household,
    setup_database, AppError, Expense, ExpenseStatus, ExpenseType, HouseholdScope, Income,
    IncomeFrequency, IncomeStatus, IncomeType, NewUser, Role, User,
};

fn fresh_db() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    setup_database(&conn).unwrap();
    conn
}

fn reload(conn: &Connection, user: &User) -> User {
    zello::db::require_user(conn, user.id).unwrap()
}

fn aluguel() -> ExpenseDraft {
    ExpenseDraft {
        descricao: "Aluguel".to_string(),
        valor: Decimal::new(180000, 2),
        tipo: ExpenseType::Fixa,
        categoria: "aluguel".to_string(),
        status: ExpenseStatus::Pendente,
        data_pagamento: None,
        data_vencimento: chrono::NaiveDate::from_ymd_opt(2024, 4, 5).unwrap(),
        recorrente: true,
        observacoes: Some("  ".to_string()),
        responsible_user_id: None,
    }
}

fn salario() -> IncomeDraft {
    IncomeDraft {
        descricao: "Salario".to_string(),
        valor: Decimal::new(650000, 2),
        tipo: IncomeType::Salario,
        frequencia: IncomeFrequency::Mensal,
        status: IncomeStatus::Recebido,
        data_recebimento: None,
        data_vencimento: None,
        observacoes: None,
        responsible_user_id: None,
    }
}

#[test]
fn registering_user_a_creates_lar_de_a_and_stamps_expenses() {
    let conn = fresh_db();

    let (a, lar) = registration::register_user(&conn, NewUser::new("A", "a@example.com")).unwrap();
    assert_eq!(lar.name, "Lar de A");
    assert_eq!(lar.created_by, a.id);
    assert_eq!(a.household_id, Some(lar.id));

    let expense: Expense = records::create(&conn, &a, aluguel()).unwrap();
    assert_eq!(expense.ownership.household_id, Some(lar.id));
    assert_eq!(expense.observacoes, None);

    let (b, _) = registration::register_user(&conn, NewUser::new("B", "b@example.com")).unwrap();
    assert!(matches!(
        records::get::<Expense>(&conn, &b, expense.id),
        Err(AppError::Forbidden { .. })
    ));
}

#[test]
fn two_admins_demote_one_then_self_demotion_is_denied() {
    let conn = fresh_db();
    let (admin1, _) = registration::seed_admin(&conn, "Admin One", "admin1@example.com").unwrap();
    let (admin2, _) = registration::seed_admin(&conn, "Admin Two", "admin2@example.com").unwrap();

    assert!(can_update_role(&admin1, &admin2, count_admins(&conn).unwrap()));
    users::update_role(&conn, &admin1, admin2.id, Role::User).unwrap();
    assert_eq!(count_admins(&conn).unwrap(), 1);

    assert!(!can_update_role(&admin1, &admin1, count_admins(&conn).unwrap()));
    assert!(users::update_role(&conn, &admin1, admin1.id, Role::User).is_err());
    assert_eq!(reload(&conn, &admin1).role, Role::Admin);
}

#[test]
fn sole_admin_can_never_be_deleted() {
    let conn = fresh_db();
    let (admin, _) = registration::seed_admin(&conn, "Root", "root@example.com").unwrap();

    assert_eq!(count_admins(&conn).unwrap(), 1);
    assert!(!can_delete_user(&admin, &admin, 1));
    assert!(users::delete_user(&conn, &admin, admin.id).is_err());
    assert_eq!(count_admins(&conn).unwrap(), 1);
}

#[test]
fn household_creator_survives_admin_deletion_attempts() {
    let conn = fresh_db();
    let (root, _) = registration::seed_admin(&conn, "Root", "root@example.com").unwrap();
    let (creator, _) = registration::register_user(&conn, NewUser::new("Carla", "carla@example.com")).unwrap();

    assert!(is_household_creator(&conn, creator.id).unwrap());
    assert!(matches!(
        users::delete_user(&conn, &root, creator.id),
        Err(AppError::InvariantViolation(_))
    ));

    // Still protected after leaving the household they created
    household::leave_household(&conn, &creator).unwrap();
    assert!(matches!(
        users::delete_user(&conn, &root, creator.id),
        Err(AppError::InvariantViolation(_))
    ));
}

#[test]
fn scoping_follows_the_actor_household() {
    let conn = fresh_db();
    let (ana, lar_ana) = registration::register_user(&conn, NewUser::new("Ana", "ana@example.com")).unwrap();
    let (bob, lar_bob) = registration::register_user(&conn, NewUser::new("Bob", "bob@example.com")).unwrap();

    let _: Income = records::create(&conn, &ana, salario()).unwrap();
    let _: Income = records::create(&conn, &bob, salario()).unwrap();

    assert_eq!(scope_for_household(&ana), HouseholdScope::Household(lar_ana.id));
    let listed = records::list::<Income>(&conn, &ana).unwrap();
    assert_eq!(listed.len(), 1);
    assert!(listed.iter().all(|r| r.ownership.household_id == Some(lar_ana.id)));

    // Bob joins Ana's household: he now sees her receita, not his old one
    household::join_household(&conn, &bob, lar_ana.id).unwrap();
    let bob = reload(&conn, &bob);
    let listed = records::list::<Income>(&conn, &bob).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].ownership.user_id, ana.id);

    // His old record kept its household
    let back = household::switch_household(&conn, &bob, lar_bob.id).unwrap();
    assert_eq!(back.id, lar_bob.id);
    let bob = reload(&conn, &bob);
    assert_eq!(records::list::<Income>(&conn, &bob).unwrap()[0].ownership.user_id, bob.id);
}

#[test]
fn unassigned_users_share_unassigned_records() {
    let conn = fresh_db();
    let (ana, _) = registration::register_user(&conn, NewUser::new("Ana", "ana@example.com")).unwrap();
    let (bob, _) = registration::register_user(&conn, NewUser::new("Bob", "bob@example.com")).unwrap();

    household::leave_household(&conn, &ana).unwrap();
    household::leave_household(&conn, &bob).unwrap();
    let ana = reload(&conn, &ana);
    let bob = reload(&conn, &bob);

    let orphan: Expense = records::create(&conn, &ana, aluguel()).unwrap();
    assert_eq!(orphan.ownership.household_id, None);
    assert_eq!(scope_for_household(&bob), HouseholdScope::Unassigned);

    // Listed under bob's unassigned scope, but not viewable one by one
    assert_eq!(records::list::<Expense>(&conn, &bob).unwrap().len(), 1);
    assert!(records::get::<Expense>(&conn, &bob, orphan.id).is_err());
}

#[test]
fn admin_moves_user_between_households() {
    let conn = fresh_db();
    let (root, _) = registration::seed_admin(&conn, "Root", "root@example.com").unwrap();
    let (ana, lar_ana) = registration::register_user(&conn, NewUser::new("Ana", "ana@example.com")).unwrap();
    let (bob, _) = registration::register_user(&conn, NewUser::new("Bob", "bob@example.com")).unwrap();

    users::move_to_household(&conn, &root, bob.id, lar_ana.id).unwrap();
    assert_eq!(reload(&conn, &bob).household_id, Some(lar_ana.id));

    household::join_household(&conn, &root, lar_ana.id).unwrap();
    let root = reload(&conn, &root);
    let overview = users::membership_overview(&conn, &root).unwrap();
    assert_eq!(overview.members.len(), 3);
    assert!(overview.available_users.is_empty());

    users::remove_from_household(&conn, &root, bob.id).unwrap();
    assert!(matches!(
        users::remove_from_household(&conn, &root, ana.id),
        Err(AppError::InvariantViolation(_))
    ));
}
