//! Billing Domain - Clinic Ledger and Boleto Issuance
//!
//! This crate implements the billing core of the clinic back office:
//! receivable and payable ledger entries, the funding origin each entry is
//! tied to, treatment package session quotas, and at-most-once boleto
//! issuance through an external provider.
//!
//! # Funding Origins
//!
//! Every ledger entry is funded by exactly one origin:
//! - **Contract**: a single-procedure agreement with a patient (receivable)
//! - **TreatmentPackage**: a prepaid bundle of sessions (receivable)
//! - **Supplier**: someone the clinic pays (payable)
//!
//! [`FundingOrigin`] is a sum type, so an entry can never carry two origins
//! or none once it has been validated.
//!
//! # Example
//!
//! ```rust,ignore
//! use domain_billing::{BillingPorts, InvoiceIssuanceService, IssueBoletoRequest};
//!
//! let issuance = InvoiceIssuanceService::new(ports, provider);
//! let outcome = issuance
//!     .issue(IssueBoletoRequest::new(entry_id, "Peeling", "Sessão 1 de 4"))
//!     .await?;
//! ```

pub mod adapters;
pub mod contract;
pub mod error;
pub mod invoice;
pub mod issuance;
pub mod ledger;
pub mod origin;
pub mod party;
pub mod ports;
pub mod services;
pub mod session;
pub mod treatment_package;

mod serde_ext;

pub use adapters::{BoletoProviderConfig, CoraBoletoProvider};
pub use contract::{Contract, ContractDraft, ContractPatch, ContractStatus};
pub use error::{BillingError, ErrorCategory};
pub use invoice::{BoletoRequest, Invoice, IssueBoletoRequest, IssuedBoleto};
pub use issuance::{InvoiceIssuanceService, IssuanceOutcome};
pub use ledger::{
    EntryKind, EntryStatus, FundingOrigin, LedgerEntry, LedgerEntryDraft, LedgerEntryPatch,
    LedgerFilter,
};
pub use origin::{OriginKind, OriginResolver, ResolvedOrigin};
pub use party::{BudgetCategory, Patient, PatientSummary, Supplier, TreatmentType};
pub use ports::{
    BillingPorts, BoletoProviderPort, ContractPort, InvoicePort, LedgerEntryPort,
    ReferenceDataPort, SessionAppointmentPort, TreatmentPackagePort,
};
pub use services::{ContractService, LedgerService, SessionService, TreatmentPackageService};
pub use session::{SessionAppointment, SessionDraft, SessionStatus};
pub use treatment_package::{
    PackageStatus, TreatmentPackage, TreatmentPackageDraft, TreatmentPackagePatch,
};
