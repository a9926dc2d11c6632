//! Test utilities
//!
//! Manual mock implementations and test fixtures for unit testing.
//!
//! The in-memory repositories enforce the same status-guarded writes as the
//! PostgreSQL adapters, so service tests exercise conflict handling without
//! a database.

pub mod fixtures;
pub mod mocks;

pub use fixtures::*;
pub use mocks::*;
