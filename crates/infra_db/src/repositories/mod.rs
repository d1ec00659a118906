//! Repository implementations for billing aggregates
//!
//! This module provides concrete repository implementations that handle
//! database access for each aggregate. Repositories encapsulate SQL queries
//! and map between database rows and domain types.
//!
//! # Architecture
//!
//! Each repository follows these principles:
//! - Runtime-checked queries (`query_as::<_, Row>`) over `FromRow` row types
//! - Status columns stored as text and parsed into domain enums on read
//! - Quota and idempotency guards expressed in single SQL statements

pub mod billing;
pub mod contract;
pub mod reference;
pub mod treatment;

pub use billing::{BillingRepository, BoletoRow, LedgerEntryRow};
pub use contract::{ContractRepository, ContractRow};
pub use reference::{
    BudgetCategoryRow, PatientRow, ReferenceRepository, SupplierRow, TreatmentTypeRow,
};
pub use treatment::{SessionAppointmentRow, TreatmentPackageRow, TreatmentRepository};

use std::str::FromStr;

use domain_billing::BillingError;

use crate::error::DatabaseError;

/// Parses a text column into its domain enum
pub(crate) fn decode<T>(column: &str, value: &str) -> Result<T, DatabaseError>
where
    T: FromStr<Err = BillingError>,
{
    value.parse().map_err(|e: BillingError| {
        DatabaseError::SerializationError(format!("column {}: {}", column, e))
    })
}
