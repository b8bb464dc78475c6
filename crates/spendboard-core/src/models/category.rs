use serde::{Deserialize, Serialize};

use super::{de, ValidationError};

/// A spending category as returned by `GET /categories`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
pub struct Category {
    #[serde(default, deserialize_with = "de::optional_id")]
    pub id: Option<String>,
    pub name: String,
    /// Icon identifier understood by the front-end icon set (e.g. `"ShoppingCart"`)
    pub icon: String,
}

/// A category as offered in filter and picker widgets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
pub struct CategoryOption {
    pub value: String,
    pub label: String,
    pub icon: Option<String>,
}

impl Category {
    pub fn validate(&self, index: usize) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::field(index, "name", "must not be empty"));
        }
        Ok(())
    }

    /// Picker option keyed by category name; a blank icon means "no icon".
    pub fn option(&self) -> CategoryOption {
        let icon = Some(self.icon.trim())
            .filter(|icon| !icon.is_empty())
            .map(str::to_string);

        CategoryOption {
            value: self.name.clone(),
            label: self.name.clone(),
            icon,
        }
    }

    /// Decode and validate a `GET /categories` response body.
    pub fn decode_list(raw: serde_json::Value) -> Result<Vec<Category>, ValidationError> {
        let categories: Vec<Category> = serde_json::from_value(raw)?;
        for (index, category) in categories.iter().enumerate() {
            category.validate(index)?;
        }
        Ok(categories)
    }
}
