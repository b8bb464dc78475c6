//! Reactive data stores for the dashboard.
//!
//! Each store owns one API resource: it fetches with the current bearer
//! token, caches the validated result in a `tokio::sync::watch` channel and
//! announces it on the event bus. Stores never wait on each other.
//!
//! `Dashboard` groups the three stores and wires the bus so that change
//! signals (`updated`, `updated-category`) trigger the matching refetches.

pub mod dashboard;
pub mod resources;
pub mod store;

pub use dashboard::{CategoryStore, Dashboard, ExpenseStore, OverviewStore};
pub use resources::{CategoryResource, ExpenseResource, OverviewResource, Resource};
pub use store::{DataStore, FetchHandle, LoadingTracker, StoreError};
