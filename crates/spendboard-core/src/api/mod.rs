//! REST API client module for the expense backend.
//!
//! This module provides the `ApiClient` for authenticating and fetching
//! categories, expenses and overview aggregates.
//!
//! Every data request carries `Authorization: Bearer <token>`. Requests are
//! not retried; a failed call is reported to the caller as an `ApiError`.

pub mod client;
pub mod error;

pub use client::{ApiClient, AuthResponse, DEFAULT_API_BASE_URL};
pub use error::ApiError;
