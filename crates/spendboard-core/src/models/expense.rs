use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{de, ValidationError};
use crate::utils::{format_date, format_idr};

/// Title length bounds, in characters
const TITLE_MIN_CHARS: usize = 2;
const TITLE_MAX_CHARS: usize = 20;

/// Maximum description length, in characters
const DESCRIPTION_MAX_CHARS: usize = 55;

/// Maximum payment method length, in characters
const PAYMENT_MAX_CHARS: usize = 30;

/// A single expense row as returned by `GET /expenses`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
pub struct Expense {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "de::optional_id")]
    pub category_id: Option<String>,
    pub category_name: String,
    pub category_icon: String,
    /// Payment method label (e.g. "Cash", "Debit")
    #[serde(default)]
    pub payment: Option<String>,
    #[serde(deserialize_with = "de::coerced_date")]
    pub date: DateTime<Utc>,
}

impl Expense {
    pub fn validate(&self, index: usize) -> Result<(), ValidationError> {
        if let Some(ref title) = self.title {
            let len = title.chars().count();
            if !(TITLE_MIN_CHARS..=TITLE_MAX_CHARS).contains(&len) {
                return Err(ValidationError::field(
                    index,
                    "title",
                    format!(
                        "must be {}-{} characters, got {}",
                        TITLE_MIN_CHARS, TITLE_MAX_CHARS, len
                    ),
                ));
            }
        }

        if let Some(amount) = self.amount {
            if !amount.is_finite() || amount <= 0.0 {
                return Err(ValidationError::field(
                    index,
                    "amount",
                    format!("must be positive, got {}", amount),
                ));
            }
        }

        check_max_len(index, "description", self.description.as_deref(), DESCRIPTION_MAX_CHARS)?;
        check_max_len(index, "payment", self.payment.as_deref(), PAYMENT_MAX_CHARS)?;
        Ok(())
    }

    /// Decode and validate a `GET /expenses` response body.
    pub fn decode_list(raw: serde_json::Value) -> Result<Vec<Expense>, ValidationError> {
        let expenses: Vec<Expense> = serde_json::from_value(raw)?;
        for (index, expense) in expenses.iter().enumerate() {
            expense.validate(index)?;
        }
        Ok(expenses)
    }

    pub fn display_amount(&self) -> String {
        match self.amount {
            Some(amount) => format_idr(amount),
            None => "-".to_string(),
        }
    }

    pub fn display_date(&self) -> String {
        format_date(&self.date)
    }

    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or("Untitled")
    }
}

fn check_max_len(
    index: usize,
    field: &'static str,
    value: Option<&str>,
    max: usize,
) -> Result<(), ValidationError> {
    match value {
        Some(v) if v.chars().count() > max => Err(ValidationError::field(
            index,
            field,
            format!("must be at most {} characters", max),
        )),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;
    use serde_json::json;

    fn raw_expense() -> serde_json::Value {
        json!({
            "id": 7,
            "title": "Lunch",
            "amount": 45000.0,
            "description": "Nasi goreng",
            "category_id": 3,
            "category_name": "Food",
            "category_icon": "Utensils",
            "payment": "Cash",
            "date": "2025-01-06"
        })
    }

    #[test]
    fn test_decode_list_valid_expense() {
        let expenses = Expense::decode_list(json!([raw_expense()])).unwrap();
        let expense = &expenses[0];
        assert_eq!(expense.id, Some(7));
        assert_eq!(expense.category_id.as_deref(), Some("3"));
        assert_eq!(expense.date.day(), 6);
        assert_eq!(expense.display_amount(), "Rp 45.000,00");
        assert_eq!(expense.display_date(), "Mon, Jan 6, 2025");
    }

    #[test]
    fn test_decode_list_allows_nullable_fields() {
        let mut raw = raw_expense();
        raw["id"] = json!(null);
        raw["title"] = json!(null);
        raw["amount"] = json!(null);
        raw["payment"] = json!(null);
        raw.as_object_mut().unwrap().remove("description");

        let expenses = Expense::decode_list(json!([raw])).unwrap();
        assert_eq!(expenses[0].display_title(), "Untitled");
        assert_eq!(expenses[0].display_amount(), "-");
    }

    #[test]
    fn test_validate_title_length() {
        let mut raw = raw_expense();
        raw["title"] = json!("x");
        let err = Expense::decode_list(json!([raw_expense(), raw])).unwrap_err();
        assert!(matches!(err, ValidationError::Field { index: 1, field: "title", .. }));

        let mut raw = raw_expense();
        raw["title"] = json!("this title is far too long");
        assert!(Expense::decode_list(json!([raw])).is_err());
    }

    #[test]
    fn test_validate_amount_must_be_positive() {
        let mut raw = raw_expense();
        raw["amount"] = json!(0);
        let err = Expense::decode_list(json!([raw])).unwrap_err();
        assert!(matches!(err, ValidationError::Field { field: "amount", .. }));
    }

    #[test]
    fn test_validate_description_and_payment_limits() {
        let mut raw = raw_expense();
        raw["description"] = json!("d".repeat(56));
        assert!(Expense::decode_list(json!([raw])).is_err());

        let mut raw = raw_expense();
        raw["payment"] = json!("p".repeat(31));
        assert!(Expense::decode_list(json!([raw])).is_err());

        let mut raw = raw_expense();
        raw["description"] = json!("d".repeat(55));
        raw["payment"] = json!("p".repeat(30));
        assert!(Expense::decode_list(json!([raw])).is_ok());
    }

    #[test]
    fn test_decode_list_accepts_mixed_date_forms() {
        let mut naive = raw_expense();
        naive["date"] = json!("2025-01-06 10:00:00");
        let mut epoch = raw_expense();
        epoch["date"] = json!(1736157600000_i64);

        let expenses = Expense::decode_list(json!([raw_expense(), naive, epoch])).unwrap();
        assert_eq!(expenses.len(), 3);
        assert_eq!(expenses[1].date, expenses[2].date);
        assert_eq!(expenses[1].display_date(), "Mon, Jan 6, 2025");
    }

    #[test]
    fn test_decode_list_rejects_bad_date() {
        let mut raw = raw_expense();
        raw["date"] = json!("not a date");
        assert!(matches!(
            Expense::decode_list(json!([raw])).unwrap_err(),
            ValidationError::Shape(_)
        ));
    }
}
