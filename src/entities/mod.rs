// Entity Models
//
// Each entity is a plain value loaded from SQLite:
// - User: role + optional household membership
// - Household: shared grouping, always has exactly one creator
// - Income / Expense: finance records stamped with owner, creator,
//   responsible party and household at insert time

/// Enums persisted as lowercase TEXT columns.
///
/// Generates `as_str`, `FromStr` (unknown values are a validation error),
/// `Display` and the rusqlite `ToSql`/`FromSql` conversions.
macro_rules! text_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = crate::error::AppError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(crate::error::AppError::validation(format!(
                        "invalid {}: {:?}",
                        stringify!($name),
                        other
                    ))),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl rusqlite::types::ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
                Ok(rusqlite::types::ToSqlOutput::from(self.as_str()))
            }
        }

        impl rusqlite::types::FromSql for $name {
            fn column_result(
                value: rusqlite::types::ValueRef<'_>,
            ) -> rusqlite::types::FromSqlResult<Self> {
                let text = value.as_str()?;
                text.parse()
                    .map_err(|e| rusqlite::types::FromSqlError::Other(Box::new(e)))
            }
        }
    };
}

pub(crate) use text_enum;

pub mod user;
pub mod household;
pub mod record;

pub use user::{User, Role, NewUser, UserId};
pub use household::{Household, HouseholdId, HouseholdWithMembers};
pub use record::{
    Ownership, LedgerRecord, RecordDraft, RecordKind,
    Income, IncomeDraft, IncomeType, IncomeFrequency, IncomeStatus,
    Expense, ExpenseDraft, ExpenseType, ExpenseStatus,
};
