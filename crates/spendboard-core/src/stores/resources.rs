//! The three API resources backing the dashboard stores.

use std::sync::Arc;

use crate::events::Event;
use crate::models::{Category, Expense, Overview, ValidationError};

/// A remote resource a `DataStore` can fetch and cache.
pub trait Resource: Send + Sync + 'static {
    /// Cached value. `Default` is the "empty" state a failed fetch resets to.
    type Data: Default + Send + Sync + 'static;

    /// Short name for logs
    const NAME: &'static str;

    /// Endpoint path, relative to the API base URL
    const ENDPOINT: &'static str;

    /// Turn a raw response body into typed, validated data.
    fn decode(raw: serde_json::Value) -> Result<Self::Data, ValidationError>;

    /// Event announcing freshly cached data.
    fn completed(data: Arc<Self::Data>) -> Event;
}

/// `GET /categories`, announced on `category-data`
#[derive(Debug)]
pub struct CategoryResource;

impl Resource for CategoryResource {
    type Data = Vec<Category>;
    const NAME: &'static str = "categories";
    const ENDPOINT: &'static str = "categories";

    fn decode(raw: serde_json::Value) -> Result<Self::Data, ValidationError> {
        Category::decode_list(raw)
    }

    fn completed(data: Arc<Self::Data>) -> Event {
        Event::CategoryData(data)
    }
}

/// `GET /expenses`, announced on `expense-data`
#[derive(Debug)]
pub struct ExpenseResource;

impl Resource for ExpenseResource {
    type Data = Vec<Expense>;
    const NAME: &'static str = "expenses";
    const ENDPOINT: &'static str = "expenses";

    fn decode(raw: serde_json::Value) -> Result<Self::Data, ValidationError> {
        Expense::decode_list(raw)
    }

    fn completed(data: Arc<Self::Data>) -> Event {
        Event::ExpenseData(data)
    }
}

/// `GET /overview`, announced on `responseData`
#[derive(Debug)]
pub struct OverviewResource;

impl Resource for OverviewResource {
    type Data = Overview;
    const NAME: &'static str = "overview";
    const ENDPOINT: &'static str = "overview";

    fn decode(raw: serde_json::Value) -> Result<Self::Data, ValidationError> {
        Overview::decode(raw)
    }

    fn completed(data: Arc<Self::Data>) -> Event {
        Event::ResponseData(data)
    }
}
