//! Data models for the expense dashboard.
//!
//! This module contains the records fetched from the remote API and the
//! persisted user profile:
//!
//! - `Category`, `CategoryOption`: spending categories and picker options
//! - `Expense`: a single expense row with its shape rules
//! - `Overview`: aggregates backing the overview charts
//! - `UserProfile`: the `{username, email}` record kept with the session
//!
//! Records decoded from the API go through `validate()` before any store
//! hands them out, so shape drift is reported as a `ValidationError` here
//! instead of leaking into presentation code.

pub mod category;
mod de;
pub mod expense;
pub mod overview;
pub mod user;

use thiserror::Error;

pub use category::{Category, CategoryOption};
pub use expense::Expense;
pub use overview::{CategoryTotal, DailyAmount, DailyTotal, Overview, WeekComparison};
pub use user::UserProfile;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Unexpected response shape: {0}")]
    Shape(String),

    #[error("Record {index}: `{field}` {reason}")]
    Field {
        index: usize,
        field: &'static str,
        reason: String,
    },
}

impl ValidationError {
    pub(crate) fn field(index: usize, field: &'static str, reason: impl Into<String>) -> Self {
        ValidationError::Field {
            index,
            field,
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for ValidationError {
    fn from(e: serde_json::Error) -> Self {
        ValidationError::Shape(e.to_string())
    }
}
