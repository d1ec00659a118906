//! Ledger entry DTOs

use serde::{Deserialize, Serialize};

use core_kernel::{ContractId, SupplierId, TreatmentPackageId};
use domain_billing::{
    EntryKind, LedgerEntry, LedgerFilter, OriginKind, PatientSummary, ResolvedOrigin,
};

/// Query string accepted by `GET /ledger-entries`
#[derive(Debug, Default, Deserialize)]
pub struct LedgerEntryQuery {
    pub kind: Option<EntryKind>,
    pub contract_id: Option<ContractId>,
    pub treatment_package_id: Option<TreatmentPackageId>,
    pub supplier_id: Option<SupplierId>,
}

impl From<LedgerEntryQuery> for LedgerFilter {
    fn from(query: LedgerEntryQuery) -> Self {
        LedgerFilter {
            contract_id: query.contract_id,
            treatment_package_id: query.treatment_package_id,
            supplier_id: query.supplier_id,
            kind: query.kind,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OriginResponse {
    pub kind: OriginKind,
    pub label: String,
    pub patient: Option<PatientSummary>,
}

impl From<ResolvedOrigin> for OriginResponse {
    fn from(origin: ResolvedOrigin) -> Self {
        Self {
            patient: origin.patient_summary(),
            kind: origin.kind,
            label: origin.label,
        }
    }
}

/// An entry together with its resolved origin
#[derive(Debug, Serialize)]
pub struct LedgerEntryOriginResponse {
    pub entry: LedgerEntry,
    pub origin: OriginResponse,
}
