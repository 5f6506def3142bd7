//! Utility modules shared across the crate.

pub mod paths;

pub use paths::{normalize_name, resolve_under_root};
