//! Integration test suite for template-compose
//!
//! End-to-end tests of the public API and the `tcompose` binary.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! RUST_LOG=template_compose=debug cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **composition**: layouts, includes, cycles, duplicate layouts, escaping
//! - **invalidation**: cascading eviction and re-resolution
//! - **concurrency**: parallel renders against a shared runtime
//! - **filesystem**: templates read from disk, directory indexes, root escapes
//! - **cli**: the `tcompose` binary

mod composition;
mod filesystem;
mod invalidation;
