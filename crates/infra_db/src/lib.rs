//! Infrastructure Database Layer
//!
//! This crate provides the PostgreSQL persistence for the clinic billing
//! core using SQLx.
//!
//! # Architecture
//!
//! The crate follows the repository pattern, providing data access abstractions
//! that hide the database implementation details from the domain layer. The
//! [`adapters::PostgresBillingAdapter`] wraps the repositories and implements
//! the `domain_billing` storage ports.
//!
//! # Consistency
//!
//! Invariants that must hold under concurrency live in the schema and in
//! single statements:
//! - A ledger entry references exactly one funding origin (CHECK constraint)
//! - A package quota is consumed by a guarded `UPDATE ... RETURNING`
//! - A ledger entry has at most one boleto (UNIQUE plus `ON CONFLICT DO NOTHING`)
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, run_migrations, DatabaseConfig, PostgresBillingAdapter};
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/clinic_billing")).await?;
//! run_migrations(&pool).await?;
//! let adapter = PostgresBillingAdapter::new(pool);
//! ```

pub mod adapters;
pub mod error;
pub mod pool;
pub mod repositories;

pub use adapters::PostgresBillingAdapter;
pub use error::DatabaseError;
pub use pool::{create_pool, run_migrations, DatabaseConfig, DatabasePool};
