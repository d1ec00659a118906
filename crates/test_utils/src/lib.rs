//! Test Utilities Crate
//!
//! Provides shared test infrastructure, fixtures, and helpers for the
//! clinic billing test suite.
//!
//! # Modules
//!
//! - `fixtures`: Pre-built test data for common entities
//! - `builders`: Builder patterns for request drafts
//! - `database`: Database test helpers and container management
//! - `assertions`: Custom assertion helpers for domain types
//! - `generators`: Property-based test data generators
//! - `stores`: Seeded in-memory ports for service-level tests

pub mod assertions;
pub mod builders;
pub mod database;
pub mod fixtures;
pub mod generators;
pub mod stores;

pub use assertions::*;
pub use builders::*;
pub use database::*;
pub use fixtures::*;
pub use generators::*;
pub use stores::*;
