//! Core library for spendboard, an expense-tracking dashboard client.
//!
//! - `auth`: persisted credential record and the session state machine
//! - `router`: route table and navigation guards
//! - `events`: synchronous publish/subscribe bus
//! - `stores`: reactive caches for categories, expenses and overview data
//! - `api`: REST client for the expense backend
//! - `models`: typed, validated API records
//! - `context`: the `AppContext` tying the pieces together

pub mod api;
pub mod auth;
pub mod config;
pub mod context;
pub mod events;
pub mod models;
pub mod router;
pub mod stores;
pub mod utils;

pub use api::{ApiClient, ApiError};
pub use auth::{Session, SessionState};
pub use config::Config;
pub use context::AppContext;
pub use events::{Channel, Event, EventBus};
pub use router::{DashboardView, Navigation, Route, Router};
pub use stores::{Dashboard, StoreError};
