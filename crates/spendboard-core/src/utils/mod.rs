//! Utility functions for display formatting.

pub mod format;

pub use format::{format_date, format_idr, format_optional, truncate_string};
