//! Core Kernel - Foundational types for the clinic billing system
//!
//! This crate provides the building blocks shared by every other crate:
//! - Money with precise decimal arithmetic and minor-unit conversion
//! - Strongly-typed integer identifiers for persisted entities
//! - Port infrastructure for the hexagonal (ports and adapters) layout

pub mod money;
pub mod identifiers;
pub mod ports;

pub use money::{Money, MoneyError, CURRENCY_CODE};
pub use identifiers::{
    LedgerEntryId, ContractId, TreatmentPackageId, SessionAppointmentId,
    PatientId, SupplierId, InvoiceId, BudgetCategoryId, TreatmentTypeId,
};
pub use ports::{
    PortError, DomainPort, HealthCheckable, HealthCheckResult, AdapterHealth,
};
