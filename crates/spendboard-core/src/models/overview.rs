use serde::{Deserialize, Serialize};

use super::{de, ValidationError};

/// Aggregates behind the overview page charts (`GET /overview`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
pub struct Overview {
    #[serde(rename = "amountsByDate", default)]
    pub amounts_by_date: Vec<DailyAmount>,
    #[serde(rename = "allCategories", default)]
    pub all_categories: Vec<CategoryTotal>,
    #[serde(rename = "dailyExpensesThisWeek", default)]
    pub daily_expenses_this_week: Vec<DailyTotal>,
    #[serde(rename = "dailyExpensesLastWeek", default)]
    pub daily_expenses_last_week: Vec<DailyTotal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
pub struct DailyAmount {
    pub date: String,
    #[serde(deserialize_with = "de::decimal")]
    pub total_amount: f64,
    pub total_expenses: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
pub struct CategoryTotal {
    #[serde(default, deserialize_with = "de::optional_id")]
    pub category_id: Option<String>,
    pub category_name: String,
    pub category_icon: String,
    #[serde(deserialize_with = "de::decimal")]
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
pub struct DailyTotal {
    pub date: String,
    #[serde(deserialize_with = "de::decimal")]
    pub total: f64,
}

/// One point of the this-week vs last-week chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
pub struct WeekComparison {
    pub date: String,
    #[serde(rename = "Last Week")]
    pub last_week: f64,
    #[serde(rename = "This Week")]
    pub this_week: f64,
}

impl Overview {
    /// Decode and validate a `GET /overview` response body.
    pub fn decode(raw: serde_json::Value) -> Result<Overview, ValidationError> {
        let overview: Overview = serde_json::from_value(raw)?;
        overview.validate()?;
        Ok(overview)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        for (index, day) in self.amounts_by_date.iter().enumerate() {
            if day.total_amount < 0.0 {
                return Err(ValidationError::field(index, "total_amount", "must not be negative"));
            }
        }
        for (index, category) in self.all_categories.iter().enumerate() {
            if category.total < 0.0 {
                return Err(ValidationError::field(index, "total", "must not be negative"));
            }
        }
        Ok(())
    }

    /// Pair this week's and last week's daily totals by day position.
    ///
    /// The label comes from this week's entry when present, otherwise from
    /// last week's; a day missing from either side counts as zero.
    pub fn weekly_comparison(&self) -> Vec<WeekComparison> {
        let this_week = &self.daily_expenses_this_week;
        let last_week = &self.daily_expenses_last_week;
        let days = this_week.len().max(last_week.len());

        (0..days)
            .map(|i| {
                let current = this_week.get(i);
                let previous = last_week.get(i);
                let date = current
                    .or(previous)
                    .map(|d| d.date.clone())
                    .unwrap_or_default();

                WeekComparison {
                    date,
                    last_week: previous.map(|d| d.total).unwrap_or(0.0),
                    this_week: current.map(|d| d.total).unwrap_or(0.0),
                }
            })
            .collect()
    }

    /// Sum of all category totals
    pub fn grand_total(&self) -> f64 {
        self.all_categories.iter().map(|c| c.total).sum()
    }

    /// Category with the highest total, if any
    pub fn top_category(&self) -> Option<&CategoryTotal> {
        self.all_categories
            .iter()
            .max_by(|a, b| a.total.total_cmp(&b.total))
    }

    pub fn is_empty(&self) -> bool {
        self.amounts_by_date.is_empty()
            && self.all_categories.is_empty()
            && self.daily_expenses_this_week.is_empty()
            && self.daily_expenses_last_week.is_empty()
    }
}
