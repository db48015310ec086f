// Zello - Household Finance Tracker - Core Library
// Exposes all modules for use in CLI, API server, and tests

pub mod actions;
pub mod config;
pub mod dashboard;
pub mod db;
pub mod entities;
pub mod error;
pub mod ledger;
pub mod policy;
pub mod scope;

#[cfg(feature = "server")]
pub mod api;

// Re-export commonly used types
pub use actions::MembershipChange;
pub use config::{Config, ConfigError};
pub use dashboard::{DashboardSummary, Period, PeriodQuery};
pub use db::{
    count_admins, get_events_for_entity, insert_event, is_household_creator, open_database,
    setup_database, Event,
};
pub use entities::{
    Expense, ExpenseDraft, ExpenseStatus, ExpenseType, Household, HouseholdId, Income, IncomeDraft,
    IncomeFrequency, IncomeStatus, IncomeType, NewUser, Ownership, Role, User, UserId,
};
pub use error::{AppError, AppResult};
pub use ledger::StoredRecord;
pub use policy::{
    records::{can_create, can_delete, can_update, can_view},
    users::{can_delete_user, can_update_role},
    Decision, DenyReason,
};
pub use scope::{scope_for_household, stamp_household_on_create, HouseholdScope, HouseholdScoped};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
