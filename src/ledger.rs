// 📒 Ledger storage - receitas and despesas tables
//
// Plain row-level persistence. No policy checks happen here: callers go
// through `actions::records`, which authorizes and stamps first.

use chrono::Utc;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use std::str::FromStr;

use crate::entities::{
    Expense, ExpenseDraft, Income, IncomeDraft, LedgerRecord, Ownership, RecordDraft, RecordKind,
};
use crate::error::{AppError, AppResult};
use crate::scope::HouseholdScope;

const OWNERSHIP_COLUMNS: &str = "user_id, household_id, created_by, responsible_user_id";

fn ownership_from_row(row: &Row, start: usize) -> rusqlite::Result<Ownership> {
    Ok(Ownership {
        user_id: row.get(start)?,
        household_id: row.get(start + 1)?,
        created_by: row.get(start + 2)?,
        responsible_user_id: row.get(start + 3)?,
    })
}

/// `valor` is kept as decimal TEXT so cents never go through a float
fn decimal_from_row(row: &Row, idx: usize) -> rusqlite::Result<Decimal> {
    let text: String = row.get(idx)?;
    Decimal::from_str(&text).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Storage seam shared by both record kinds
pub trait StoredRecord: LedgerRecord + Sized {
    type Draft: RecordDraft;

    fn insert(conn: &Connection, ownership: &Ownership, draft: &Self::Draft) -> AppResult<Self>;
    fn find(conn: &Connection, id: i64) -> AppResult<Option<Self>>;
    fn overwrite(conn: &Connection, id: i64, draft: &Self::Draft) -> AppResult<()>;
    fn list(conn: &Connection, scope: &HouseholdScope) -> AppResult<Vec<Self>>;
}

impl StoredRecord for Income {
    type Draft = IncomeDraft;

    fn insert(conn: &Connection, ownership: &Ownership, draft: &IncomeDraft) -> AppResult<Self> {
        insert_income(conn, ownership, draft)
    }

    fn find(conn: &Connection, id: i64) -> AppResult<Option<Self>> {
        get_income(conn, id)
    }

    fn overwrite(conn: &Connection, id: i64, draft: &IncomeDraft) -> AppResult<()> {
        update_income(conn, id, draft)
    }

    fn list(conn: &Connection, scope: &HouseholdScope) -> AppResult<Vec<Self>> {
        list_incomes(conn, scope)
    }
}

impl StoredRecord for Expense {
    type Draft = ExpenseDraft;

    fn insert(conn: &Connection, ownership: &Ownership, draft: &ExpenseDraft) -> AppResult<Self> {
        insert_expense(conn, ownership, draft)
    }

    fn find(conn: &Connection, id: i64) -> AppResult<Option<Self>> {
        get_expense(conn, id)
    }

    fn overwrite(conn: &Connection, id: i64, draft: &ExpenseDraft) -> AppResult<()> {
        update_expense(conn, id, draft)
    }

    fn list(conn: &Connection, scope: &HouseholdScope) -> AppResult<Vec<Self>> {
        list_expenses(conn, scope)
    }
}

pub fn delete_record(conn: &Connection, kind: RecordKind, id: i64) -> AppResult<()> {
    let changed = conn.execute(&format!("DELETE FROM {} WHERE id = ?1", kind.table()), [id])?;
    if changed == 0 {
        return Err(AppError::not_found(kind.entity(), id));
    }
    Ok(())
}

// ============================================================================
// RECEITAS
// ============================================================================

fn income_select() -> String {
    format!(
        "SELECT id, {}, descricao, valor, tipo, frequencia, status,
                data_recebimento, data_vencimento, observacoes, created_at, updated_at
         FROM receitas",
        OWNERSHIP_COLUMNS
    )
}

fn income_from_row(row: &Row) -> rusqlite::Result<Income> {
    Ok(Income {
        id: row.get(0)?,
        ownership: ownership_from_row(row, 1)?,
        descricao: row.get(5)?,
        valor: decimal_from_row(row, 6)?,
        tipo: row.get(7)?,
        frequencia: row.get(8)?,
        status: row.get(9)?,
        data_recebimento: row.get(10)?,
        data_vencimento: row.get(11)?,
        observacoes: row.get(12)?,
        created_at: row.get(13)?,
        updated_at: row.get(14)?,
    })
}

pub fn insert_income(conn: &Connection, ownership: &Ownership, draft: &IncomeDraft) -> AppResult<Income> {
    let now = Utc::now();
    conn.execute(
        "INSERT INTO receitas (
            user_id, household_id, created_by, responsible_user_id,
            descricao, valor, tipo, frequencia, status,
            data_recebimento, data_vencimento, observacoes, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        params![
            ownership.user_id,
            ownership.household_id,
            ownership.created_by,
            ownership.responsible_user_id,
            draft.descricao,
            draft.valor.to_string(),
            draft.tipo,
            draft.frequencia,
            draft.status,
            draft.data_recebimento,
            draft.data_vencimento,
            draft.observacoes,
            now,
            now,
        ],
    )?;

    let id = conn.last_insert_rowid();
    get_income(conn, id)?.ok_or_else(|| AppError::not_found("receita", id))
}

pub fn get_income(conn: &Connection, id: i64) -> AppResult<Option<Income>> {
    let income = conn
        .query_row(&format!("{} WHERE id = ?1", income_select()), [id], income_from_row)
        .optional()?;
    Ok(income)
}

/// Overwrite the editable fields. The ownership stamp is never touched.
pub fn update_income(conn: &Connection, id: i64, draft: &IncomeDraft) -> AppResult<()> {
    let changed = conn.execute(
        "UPDATE receitas SET
            descricao = ?1, valor = ?2, tipo = ?3, frequencia = ?4, status = ?5,
            data_recebimento = ?6, data_vencimento = ?7, observacoes = ?8, updated_at = ?9
         WHERE id = ?10",
        params![
            draft.descricao,
            draft.valor.to_string(),
            draft.tipo,
            draft.frequencia,
            draft.status,
            draft.data_recebimento,
            draft.data_vencimento,
            draft.observacoes,
            Utc::now(),
            id,
        ],
    )?;
    if changed == 0 {
        return Err(AppError::not_found("receita", id));
    }
    Ok(())
}

/// Receitas visible under `scope`, newest first
pub fn list_incomes(conn: &Connection, scope: &HouseholdScope) -> AppResult<Vec<Income>> {
    let (clause, args) = scope.sql_clause("household_id");
    let mut stmt = conn.prepare(&format!(
        "{} WHERE {} ORDER BY created_at DESC, id DESC",
        income_select(),
        clause
    ))?;
    let incomes = stmt
        .query_map(params_from_iter(args), income_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(incomes)
}

// ============================================================================
// DESPESAS
// ============================================================================

fn expense_select() -> String {
    format!(
        "SELECT id, {}, descricao, valor, tipo, categoria, status,
                data_pagamento, data_vencimento, recorrente, observacoes, created_at, updated_at
         FROM despesas",
        OWNERSHIP_COLUMNS
    )
}

fn expense_from_row(row: &Row) -> rusqlite::Result<Expense> {
    Ok(Expense {
        id: row.get(0)?,
        ownership: ownership_from_row(row, 1)?,
        descricao: row.get(5)?,
        valor: decimal_from_row(row, 6)?,
        tipo: row.get(7)?,
        categoria: row.get(8)?,
        status: row.get(9)?,
        data_pagamento: row.get(10)?,
        data_vencimento: row.get(11)?,
        recorrente: row.get(12)?,
        observacoes: row.get(13)?,
        created_at: row.get(14)?,
        updated_at: row.get(15)?,
    })
}

pub fn insert_expense(conn: &Connection, ownership: &Ownership, draft: &ExpenseDraft) -> AppResult<Expense> {
    let now = Utc::now();
    conn.execute(
        "INSERT INTO despesas (
            user_id, household_id, created_by, responsible_user_id,
            descricao, valor, tipo, categoria, status,
            data_pagamento, data_vencimento, recorrente, observacoes, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
        params![
            ownership.user_id,
            ownership.household_id,
            ownership.created_by,
            ownership.responsible_user_id,
            draft.descricao,
            draft.valor.to_string(),
            draft.tipo,
            draft.categoria,
            draft.status,
            draft.data_pagamento,
            draft.data_vencimento,
            draft.recorrente,
            draft.observacoes,
            now,
            now,
        ],
    )?;

    let id = conn.last_insert_rowid();
    get_expense(conn, id)?.ok_or_else(|| AppError::not_found("despesa", id))
}

pub fn get_expense(conn: &Connection, id: i64) -> AppResult<Option<Expense>> {
    let expense = conn
        .query_row(&format!("{} WHERE id = ?1", expense_select()), [id], expense_from_row)
        .optional()?;
    Ok(expense)
}

/// Overwrite the editable fields. The ownership stamp is never touched.
pub fn update_expense(conn: &Connection, id: i64, draft: &ExpenseDraft) -> AppResult<()> {
    let changed = conn.execute(
        "UPDATE despesas SET
            descricao = ?1, valor = ?2, tipo = ?3, categoria = ?4, status = ?5,
            data_pagamento = ?6, data_vencimento = ?7, recorrente = ?8, observacoes = ?9,
            updated_at = ?10
         WHERE id = ?11",
        params![
            draft.descricao,
            draft.valor.to_string(),
            draft.tipo,
            draft.categoria,
            draft.status,
            draft.data_pagamento,
            draft.data_vencimento,
            draft.recorrente,
            draft.observacoes,
            Utc::now(),
            id,
        ],
    )?;
    if changed == 0 {
        return Err(AppError::not_found("despesa", id));
    }
    Ok(())
}

/// Despesas visible under `scope`, earliest due date first
pub fn list_expenses(conn: &Connection, scope: &HouseholdScope) -> AppResult<Vec<Expense>> {
    let (clause, args) = scope.sql_clause("household_id");
    let mut stmt = conn.prepare(&format!(
        "{} WHERE {} ORDER BY data_vencimento ASC, id ASC",
        expense_select(),
        clause
    ))?;
    let expenses = stmt
        .query_map(params_from_iter(args), expense_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(expenses)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{insert_household, insert_user, setup_database};
    use crate::entities::{
        ExpenseStatus, ExpenseType, IncomeFrequency, IncomeStatus, IncomeType, NewUser,
    };
    use chrono::NaiveDate;

    fn test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        conn
    }

    fn income_draft(descricao: &str) -> IncomeDraft {
        IncomeDraft {
            descricao: descricao.to_string(),
            valor: Decimal::new(320075, 2),
            tipo: IncomeType::Salario,
            frequencia: IncomeFrequency::Mensal,
            status: IncomeStatus::Pendente,
            data_recebimento: None,
            data_vencimento: NaiveDate::from_ymd_opt(2025, 10, 5),
            observacoes: None,
            responsible_user_id: None,
        }
    }

    fn expense_draft(descricao: &str, due_day: u32) -> ExpenseDraft {
        ExpenseDraft {
            descricao: descricao.to_string(),
            valor: Decimal::new(9990, 2),
            tipo: ExpenseType::Variavel,
            categoria: "lazer".to_string(),
            status: ExpenseStatus::Pendente,
            data_pagamento: None,
            data_vencimento: NaiveDate::from_ymd_opt(2025, 10, due_day).unwrap(),
            recorrente: false,
            observacoes: Some("cinema".to_string()),
            responsible_user_id: None,
        }
    }

    #[test]
    fn test_income_insert_get_update_keeps_stamp() {
        let conn = test_db();
        let ana = insert_user(&conn, &NewUser::new("Ana", "ana@example.com"), None).unwrap();
        let household = insert_household(&conn, "Lar de Ana", ana.id).unwrap();

        let ownership = Ownership {
            user_id: ana.id,
            household_id: Some(household.id),
            created_by: ana.id,
            responsible_user_id: ana.id,
        };
        let income = insert_income(&conn, &ownership, &income_draft("Salário")).unwrap();

        assert_eq!(income.valor, Decimal::new(320075, 2));
        assert_eq!(income.ownership, ownership);

        let mut edited = income_draft("Salário + bônus");
        edited.status = IncomeStatus::Recebido;
        update_income(&conn, income.id, &edited).unwrap();

        let reloaded = get_income(&conn, income.id).unwrap().unwrap();
        assert_eq!(reloaded.descricao, "Salário + bônus");
        assert_eq!(reloaded.status, IncomeStatus::Recebido);
        assert_eq!(reloaded.ownership, ownership);
    }

    #[test]
    fn test_expense_listing_respects_scope_and_due_order() {
        let conn = test_db();
        let ana = insert_user(&conn, &NewUser::new("Ana", "ana@example.com"), None).unwrap();
        let household = insert_household(&conn, "Lar de Ana", ana.id).unwrap();

        let scoped = Ownership {
            user_id: ana.id,
            household_id: Some(household.id),
            created_by: ana.id,
            responsible_user_id: ana.id,
        };
        let unscoped = Ownership {
            household_id: None,
            ..scoped
        };

        insert_expense(&conn, &scoped, &expense_draft("late", 20)).unwrap();
        insert_expense(&conn, &scoped, &expense_draft("early", 2)).unwrap();
        insert_expense(&conn, &unscoped, &expense_draft("loose", 10)).unwrap();

        let in_household = list_expenses(&conn, &HouseholdScope::Household(household.id)).unwrap();
        let names: Vec<&str> = in_household.iter().map(|e| e.descricao.as_str()).collect();
        assert_eq!(names, vec!["early", "late"]);

        let loose = list_expenses(&conn, &HouseholdScope::Unassigned).unwrap();
        assert_eq!(loose.len(), 1);
        assert_eq!(loose[0].descricao, "loose");
        assert_eq!(loose[0].observacoes.as_deref(), Some("cinema"));
    }

    #[test]
    fn test_delete_record() {
        let conn = test_db();
        let ana = insert_user(&conn, &NewUser::new("Ana", "ana@example.com"), None).unwrap();
        let ownership = Ownership {
            user_id: ana.id,
            household_id: None,
            created_by: ana.id,
            responsible_user_id: ana.id,
        };
        let expense = insert_expense(&conn, &ownership, &expense_draft("x", 1)).unwrap();

        delete_record(&conn, RecordKind::Despesa, expense.id).unwrap();
        assert!(get_expense(&conn, expense.id).unwrap().is_none());
        assert!(matches!(
            delete_record(&conn, RecordKind::Despesa, expense.id),
            Err(AppError::NotFound { entity: "despesa", .. })
        ));
    }

    #[test]
    fn test_unknown_responsible_user_violates_foreign_key() {
        let conn = test_db();
        let ana = insert_user(&conn, &NewUser::new("Ana", "ana@example.com"), None).unwrap();
        let ownership = Ownership {
            user_id: ana.id,
            household_id: None,
            created_by: ana.id,
            responsible_user_id: 999,
        };
        assert!(insert_income(&conn, &ownership, &income_draft("x")).is_err());
    }
}
