//! Funding origin resolution
//!
//! Turns the origin key stored on a ledger entry into something a person can
//! read, and finds the patient who should be billed for a receivable.

use serde::Serialize;
use tracing::{debug, instrument};

use core_kernel::{PatientId, PortError};

use crate::error::BillingError;
use crate::ledger::{FundingOrigin, LedgerEntry};
use crate::party::{Patient, PatientSummary};
use crate::ports::BillingPorts;

/// What an entry's origin resolved to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OriginKind {
    Contract,
    TreatmentPackage,
    Supplier,
    /// The referenced contract or package no longer resolves
    Unknown,
}

/// Result of resolving a ledger entry's origin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOrigin {
    pub kind: OriginKind,
    pub label: String,
    pub patient: Option<Patient>,
}

impl ResolvedOrigin {
    fn unknown() -> Self {
        Self {
            kind: OriginKind::Unknown,
            label: "Unknown origin".to_string(),
            patient: None,
        }
    }

    pub fn patient_summary(&self) -> Option<PatientSummary> {
        self.patient.as_ref().map(PatientSummary::from)
    }

    /// Returns the patient to bill
    ///
    /// # Errors
    ///
    /// `BillingError::DomainRule` when no patient is reachable through a
    /// contract or a treatment package
    pub fn require_patient(&self) -> Result<&Patient, BillingError> {
        self.patient.as_ref().ok_or_else(|| {
            BillingError::rule(
                "ledger entry has no patient reachable through a contract or treatment package",
            )
        })
    }
}

/// Resolves funding origins against the storage ports
#[derive(Clone)]
pub struct OriginResolver {
    ports: BillingPorts,
}

impl OriginResolver {
    pub fn new(ports: BillingPorts) -> Self {
        Self { ports }
    }

    /// Resolves the origin of `entry`
    ///
    /// A contract or package that no longer exists resolves to
    /// [`OriginKind::Unknown`]; storage failures are still errors.
    #[instrument(skip(self, entry), fields(ledger_entry_id = %entry.id))]
    pub async fn resolve(&self, entry: &LedgerEntry) -> Result<ResolvedOrigin, BillingError> {
        match entry.origin {
            FundingOrigin::Contract(contract_id) => {
                match found(self.ports.contracts.get_contract(contract_id).await)? {
                    Some(contract) => Ok(ResolvedOrigin {
                        kind: OriginKind::Contract,
                        label: contract.identifier,
                        patient: self.patient(contract.patient_id).await?,
                    }),
                    None => {
                        debug!(contract_id = %contract_id, "Contract origin no longer resolves");
                        Ok(ResolvedOrigin::unknown())
                    }
                }
            }
            FundingOrigin::TreatmentPackage(package_id) => {
                match found(self.ports.packages.get_package(package_id).await)? {
                    Some(package) => Ok(ResolvedOrigin {
                        kind: OriginKind::TreatmentPackage,
                        label: package.description,
                        patient: self.patient(package.patient_id).await?,
                    }),
                    None => {
                        debug!(package_id = %package_id, "Package origin no longer resolves");
                        Ok(ResolvedOrigin::unknown())
                    }
                }
            }
            FundingOrigin::Supplier(supplier_id) => {
                let label = found(self.ports.reference.get_supplier(supplier_id).await)?
                    .map(|supplier| supplier.name)
                    .unwrap_or_else(|| supplier_id.code());
                Ok(ResolvedOrigin {
                    kind: OriginKind::Supplier,
                    label,
                    patient: None,
                })
            }
        }
    }

    async fn patient(&self, id: PatientId) -> Result<Option<Patient>, BillingError> {
        found(self.ports.reference.get_patient(id).await)
    }
}

/// Maps `NotFound` to `None` and keeps every other failure
fn found<T>(result: Result<T, PortError>) -> Result<Option<T>, BillingError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e.into()),
    }
}
