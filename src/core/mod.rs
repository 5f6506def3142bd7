//! Command-line error reporting.
//!
//! [`user_friendly_error`] maps an [`anyhow::Error`] from the binary onto an
//! [`ErrorContext`] whose [`display`](ErrorContext::display) prints a colored
//! `error:` line, optional `details:` and a `suggestion:`.

pub mod error;

pub use error::{ErrorContext, user_friendly_error};
