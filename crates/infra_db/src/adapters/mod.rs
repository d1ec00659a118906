//! Domain Adapters
//!
//! This module provides adapter implementations for domain ports,
//! connecting domain interfaces to the PostgreSQL database layer.
//!
//! # Architecture
//!
//! The billing adapter:
//! - Implements every storage port of `domain_billing`
//! - Translates between domain models and database row types
//! - Uses the repository layer for database operations
//!
//! # Usage
//!
//! ```rust,ignore
//! use infra_db::adapters::PostgresBillingAdapter;
//! use domain_billing::LedgerEntryPort;
//!
//! let adapter = PostgresBillingAdapter::new(pool);
//! let entry = adapter.get_entry(LedgerEntryId::new(42)).await?;
//! ```

pub mod billing;

pub use billing::PostgresBillingAdapter;
