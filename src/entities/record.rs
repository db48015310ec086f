// 💰 Finance Records - Receitas (income) and Despesas (expenses)
//
// Both kinds share the same ownership stamp:
// - user_id: the owner
// - created_by: who inserted it
// - responsible_user_id: who is accountable (defaults to the creator)
// - household_id: the creator's household at insert time (nullable)
//
// The stamp is written once at insert and never re-stamped by updates.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::household::HouseholdId;
use super::text_enum;
use super::user::{User, UserId};
use crate::error::{AppError, AppResult};

// ============================================================================
// RECORD KIND
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Receita,
    Despesa,
}

impl RecordKind {
    pub fn table(&self) -> &'static str {
        match self {
            RecordKind::Receita => "receitas",
            RecordKind::Despesa => "despesas",
        }
    }

    /// Entity name used in errors and audit events
    pub fn entity(&self) -> &'static str {
        match self {
            RecordKind::Receita => "receita",
            RecordKind::Despesa => "despesa",
        }
    }
}

// ============================================================================
// OWNERSHIP STAMP
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ownership {
    pub user_id: UserId,
    pub household_id: Option<HouseholdId>,
    pub created_by: UserId,
    pub responsible_user_id: UserId,
}

impl Ownership {
    /// Stamp for a record the given user is creating.
    ///
    /// Household is left empty here; the write path stamps it through
    /// `scope::stamp_household_on_create`.
    pub fn for_creator(creator: &User, responsible_user_id: Option<UserId>) -> Self {
        Ownership {
            user_id: creator.id,
            household_id: None,
            created_by: creator.id,
            responsible_user_id: responsible_user_id.unwrap_or(creator.id),
        }
    }

    pub fn is_owner(&self, user_id: UserId) -> bool {
        self.user_id == user_id
    }

    pub fn is_creator(&self, user_id: UserId) -> bool {
        self.created_by == user_id
    }

    pub fn is_responsible(&self, user_id: UserId) -> bool {
        self.responsible_user_id == user_id
    }
}

/// Common view over receitas and despesas used by policies and scoping
pub trait LedgerRecord {
    const KIND: RecordKind;

    fn id(&self) -> i64;
    fn ownership(&self) -> &Ownership;
}

/// Create/update payload of a record kind
pub trait RecordDraft: Sized {
    fn validate(self) -> AppResult<Self>;

    /// Requested responsible party; None means "the creator"
    fn responsible_user_id(&self) -> Option<UserId>;
}

// ============================================================================
// INCOME (RECEITA)
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncomeType {
    Salario,
    Freelance,
    Rendimento,
    Outros,
}

text_enum!(IncomeType {
    Salario => "salario",
    Freelance => "freelance",
    Rendimento => "rendimento",
    Outros => "outros",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncomeFrequency {
    Mensal,
    Semanal,
    Unica,
}

text_enum!(IncomeFrequency {
    Mensal => "mensal",
    Semanal => "semanal",
    Unica => "unica",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncomeStatus {
    Recebido,
    Pendente,
}

text_enum!(IncomeStatus {
    Recebido => "recebido",
    Pendente => "pendente",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Income {
    pub id: i64,
    #[serde(flatten)]
    pub ownership: Ownership,
    pub descricao: String,
    pub valor: Decimal,
    pub tipo: IncomeType,
    pub frequencia: IncomeFrequency,
    pub status: IncomeStatus,
    pub data_recebimento: Option<NaiveDate>,
    pub data_vencimento: Option<NaiveDate>,
    pub observacoes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LedgerRecord for Income {
    const KIND: RecordKind = RecordKind::Receita;

    fn id(&self) -> i64 {
        self.id
    }

    fn ownership(&self) -> &Ownership {
        &self.ownership
    }
}

/// Editable fields of a receita (create and update payload)
#[derive(Debug, Clone, Deserialize)]
pub struct IncomeDraft {
    pub descricao: String,
    pub valor: Decimal,
    pub tipo: IncomeType,
    pub frequencia: IncomeFrequency,
    pub status: IncomeStatus,
    #[serde(default)]
    pub data_recebimento: Option<NaiveDate>,
    #[serde(default)]
    pub data_vencimento: Option<NaiveDate>,
    #[serde(default)]
    pub observacoes: Option<String>,

    /// Only honoured at creation
    #[serde(default)]
    pub responsible_user_id: Option<UserId>,
}

impl IncomeDraft {
    pub fn validate(mut self) -> AppResult<Self> {
        self.descricao = validate_text("descricao", &self.descricao)?;
        self.valor = validate_amount(self.valor)?;
        self.observacoes = normalize_notes(self.observacoes);
        Ok(self)
    }
}

impl RecordDraft for IncomeDraft {
    fn validate(self) -> AppResult<Self> {
        IncomeDraft::validate(self)
    }

    fn responsible_user_id(&self) -> Option<UserId> {
        self.responsible_user_id
    }
}

// ============================================================================
// EXPENSE (DESPESA)
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpenseType {
    Fixa,
    Variavel,
}

text_enum!(ExpenseType {
    Fixa => "fixa",
    Variavel => "variavel",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpenseStatus {
    Pago,
    Pendente,
    Vencido,
}

text_enum!(ExpenseStatus {
    Pago => "pago",
    Pendente => "pendente",
    Vencido => "vencido",
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub id: i64,
    #[serde(flatten)]
    pub ownership: Ownership,
    pub descricao: String,
    pub valor: Decimal,
    pub tipo: ExpenseType,
    /// Free text: aluguel, mercado, combustivel, lazer, ...
    pub categoria: String,
    pub status: ExpenseStatus,
    pub data_pagamento: Option<NaiveDate>,
    pub data_vencimento: NaiveDate,
    pub recorrente: bool,
    pub observacoes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LedgerRecord for Expense {
    const KIND: RecordKind = RecordKind::Despesa;

    fn id(&self) -> i64 {
        self.id
    }

    fn ownership(&self) -> &Ownership {
        &self.ownership
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExpenseDraft {
    pub descricao: String,
    pub valor: Decimal,
    pub tipo: ExpenseType,
    pub categoria: String,
    pub status: ExpenseStatus,
    #[serde(default)]
    pub data_pagamento: Option<NaiveDate>,
    pub data_vencimento: NaiveDate,
    #[serde(default)]
    pub recorrente: bool,
    #[serde(default)]
    pub observacoes: Option<String>,

    /// Only honoured at creation
    #[serde(default)]
    pub responsible_user_id: Option<UserId>,
}

impl ExpenseDraft {
    pub fn validate(mut self) -> AppResult<Self> {
        self.descricao = validate_text("descricao", &self.descricao)?;
        self.categoria = validate_text("categoria", &self.categoria)?;
        self.valor = validate_amount(self.valor)?;
        self.observacoes = normalize_notes(self.observacoes);
        Ok(self)
    }
}

impl RecordDraft for ExpenseDraft {
    fn validate(self) -> AppResult<Self> {
        ExpenseDraft::validate(self)
    }

    fn responsible_user_id(&self) -> Option<UserId> {
        self.responsible_user_id
    }
}

// ============================================================================
// DRAFT HELPERS
// ============================================================================

fn validate_text(field: &str, value: &str) -> AppResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation(format!("{} is required", field)));
    }
    if trimmed.chars().count() > 255 {
        return Err(AppError::validation(format!(
            "{} must be at most 255 characters",
            field
        )));
    }
    Ok(trimmed.to_string())
}

fn validate_amount(valor: Decimal) -> AppResult<Decimal> {
    if valor.is_sign_negative() && !valor.is_zero() {
        return Err(AppError::validation("valor must be >= 0"));
    }
    Ok(valor.round_dp(2))
}

fn normalize_notes(notes: Option<String>) -> Option<String> {
    notes
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Role;

    fn creator() -> User {
        User {
            id: 5,
            name: "Ana".to_string(),
            email: "ana@example.com".to_string(),
            role: Role::User,
            household_id: Some(3),
            created_at: Utc::now(),
        }
    }

    fn expense_draft(valor: Decimal) -> ExpenseDraft {
        ExpenseDraft {
            descricao: "  Aluguel  ".to_string(),
            valor,
            tipo: ExpenseType::Fixa,
            categoria: "moradia".to_string(),
            status: ExpenseStatus::Pendente,
            data_pagamento: None,
            data_vencimento: NaiveDate::from_ymd_opt(2025, 10, 5).unwrap(),
            recorrente: true,
            observacoes: Some("   ".to_string()),
            responsible_user_id: None,
        }
    }

    #[test]
    fn test_ownership_defaults_responsible_to_creator() {
        let ownership = Ownership::for_creator(&creator(), None);

        assert_eq!(ownership.user_id, 5);
        assert_eq!(ownership.created_by, 5);
        assert_eq!(ownership.responsible_user_id, 5);
        // Household is stamped later by the write path
        assert_eq!(ownership.household_id, None);
    }

    #[test]
    fn test_ownership_explicit_responsible() {
        let ownership = Ownership::for_creator(&creator(), Some(9));
        assert!(ownership.is_creator(5));
        assert!(ownership.is_responsible(9));
        assert!(!ownership.is_responsible(5));
    }

    #[test]
    fn test_expense_draft_validation() {
        let draft = expense_draft(Decimal::new(150050, 2)).validate().unwrap();
        assert_eq!(draft.descricao, "Aluguel");
        assert_eq!(draft.observacoes, None);
        assert_eq!(draft.valor, Decimal::new(150050, 2));

        assert!(expense_draft(Decimal::new(-1, 0)).validate().is_err());
        assert!(expense_draft(Decimal::ZERO).validate().is_ok());
    }

    #[test]
    fn test_income_enums_parse() {
        assert_eq!("salario".parse::<IncomeType>().unwrap(), IncomeType::Salario);
        assert_eq!("unica".parse::<IncomeFrequency>().unwrap(), IncomeFrequency::Unica);
        assert!("pago".parse::<IncomeStatus>().is_err());
        assert_eq!(ExpenseStatus::Vencido.to_string(), "vencido");
    }

    #[test]
    fn test_record_kind_tables() {
        assert_eq!(Income::KIND.table(), "receitas");
        assert_eq!(Expense::KIND.entity(), "despesa");
    }
}
