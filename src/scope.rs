// 🏠 Household Scoping
//
// Two halves:
// - a filter: narrow a record set to the acting user's household, or to
//   household-less records when the user has none
// - a creation step: stamp the creator's current household on a new record
//
// Scoping never rejects. It only filters and stamps.
//
// NOTE: the unassigned branch keys off the *actor* having no household, so
// two household-less users see each other's household-less records.

use rusqlite::types::Value;
use serde::Serialize;

use crate::entities::{Expense, HouseholdId, Income, Ownership, User};

/// Anything carrying a nullable household reference
pub trait HouseholdScoped {
    fn household_id(&self) -> Option<HouseholdId>;
    fn set_household_id(&mut self, household_id: Option<HouseholdId>);
}

impl HouseholdScoped for Ownership {
    fn household_id(&self) -> Option<HouseholdId> {
        self.household_id
    }

    fn set_household_id(&mut self, household_id: Option<HouseholdId>) {
        self.household_id = household_id;
    }
}

impl HouseholdScoped for Income {
    fn household_id(&self) -> Option<HouseholdId> {
        self.ownership.household_id
    }

    fn set_household_id(&mut self, household_id: Option<HouseholdId>) {
        self.ownership.household_id = household_id;
    }
}

impl HouseholdScoped for Expense {
    fn household_id(&self) -> Option<HouseholdId> {
        self.ownership.household_id
    }

    fn set_household_id(&mut self, household_id: Option<HouseholdId>) {
        self.ownership.household_id = household_id;
    }
}

// ============================================================================
// QUERY FILTER
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "scope", content = "household_id", rename_all = "snake_case")]
pub enum HouseholdScope {
    /// Records whose household == H
    Household(HouseholdId),

    /// Records with no household
    Unassigned,
}

/// Build the filter for the acting user
pub fn scope_for_household(user: &User) -> HouseholdScope {
    match user.household_id {
        Some(household_id) => HouseholdScope::Household(household_id),
        None => HouseholdScope::Unassigned,
    }
}

impl HouseholdScope {
    /// In-memory predicate
    pub fn matches<R: HouseholdScoped + ?Sized>(&self, record: &R) -> bool {
        match self {
            HouseholdScope::Household(id) => record.household_id() == Some(*id),
            HouseholdScope::Unassigned => record.household_id().is_none(),
        }
    }

    /// Narrow an already-loaded record set
    pub fn filter<R: HouseholdScoped>(&self, records: Vec<R>) -> Vec<R> {
        records.into_iter().filter(|r| self.matches(r)).collect()
    }

    /// SQL fragment for `column`, plus the parameters it binds.
    ///
    /// `column` is always one of our own column names, never user input.
    pub fn sql_clause(&self, column: &str) -> (String, Vec<Value>) {
        match self {
            HouseholdScope::Household(id) => (format!("{} = ?", column), vec![Value::Integer(*id)]),
            HouseholdScope::Unassigned => (format!("{} IS NULL", column), Vec::new()),
        }
    }
}

// ============================================================================
// CREATION STAMP
// ============================================================================

/// Pre-insert step for household-scoped records.
///
/// Copies the creator's current household onto the record; leaves it absent
/// when the creator has none. Must be called by the write path before the
/// record is persisted.
pub fn stamp_household_on_create<R: HouseholdScoped + ?Sized>(user: &User, record: &mut R) {
    if let Some(household_id) = user.household_id {
        record.set_household_id(Some(household_id));
    }
}
