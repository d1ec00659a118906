//! Boletos issued for receivable ledger entries
//!
//! An [`Invoice`] is the persisted payment artifact returned by the boleto
//! provider. A [`BoletoRequest`] is the provider-neutral description of what
//! is being billed, composed from a ledger entry and the patient reachable
//! through its funding origin.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use core_kernel::{InvoiceId, LedgerEntryId};

use crate::error::BillingError;
use crate::ledger::{EntryKind, LedgerEntry};
use crate::party::{digits_only, Patient};

/// Placeholder for missing optional address fields
pub const ADDRESS_FALLBACK: &str = "N/A";

/// State used when the patient has none on file
pub const DEFAULT_STATE: &str = "SP";

/// Postal code used when the patient has none on file
pub const ZIP_CODE_FALLBACK: &str = "00000000";

/// A boleto persisted for a ledger entry (at most one per entry)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    pub ledger_entry_id: LedgerEntryId,
    pub service_name: String,
    pub service_description: String,
    pub barcode: Option<String>,
    pub digitable_line: Option<String>,
    /// Identifier assigned by the provider
    pub external_invoice_id: Option<String>,
    pub pdf_link: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Payment artifact fields returned by the provider, stored untransformed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedBoleto {
    pub external_invoice_id: Option<String>,
    pub barcode: Option<String>,
    pub digitable_line: Option<String>,
    pub pdf_link: Option<String>,
}

/// An invoice waiting for an identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInvoice {
    pub ledger_entry_id: LedgerEntryId,
    pub service_name: String,
    pub service_description: String,
    pub boleto: IssuedBoleto,
}

impl NewInvoice {
    pub fn into_invoice(self, id: InvoiceId, now: DateTime<Utc>) -> Invoice {
        Invoice {
            id,
            ledger_entry_id: self.ledger_entry_id,
            service_name: self.service_name,
            service_description: self.service_description,
            barcode: self.boleto.barcode,
            digitable_line: self.boleto.digitable_line,
            external_invoice_id: self.boleto.external_invoice_id,
            pdf_link: self.boleto.pdf_link,
            created_at: now,
        }
    }
}

/// Request to issue a boleto for a ledger entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueBoletoRequest {
    pub ledger_entry_id: LedgerEntryId,
    pub service_name: String,
    pub service_description: String,
}

impl IssueBoletoRequest {
    pub fn new(
        ledger_entry_id: LedgerEntryId,
        service_name: impl Into<String>,
        service_description: impl Into<String>,
    ) -> Self {
        Self {
            ledger_entry_id,
            service_name: service_name.into(),
            service_description: service_description.into(),
        }
    }

    /// Rejects blank service fields
    pub fn validate(&self) -> Result<(), BillingError> {
        if self.service_name.trim().is_empty() {
            return Err(BillingError::validation("service name is required"));
        }
        if self.service_description.trim().is_empty() {
            return Err(BillingError::validation("service description is required"));
        }
        Ok(())
    }
}

/// Provider-neutral description of a boleto to issue
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoletoRequest {
    /// Our reference for the charge, e.g. `LANC-42`
    pub code: String,
    /// Stable per ledger entry so provider-side replays deduplicate
    pub idempotency_key: Uuid,
    pub customer: BoletoCustomer,
    pub service: BoletoService,
    pub due_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoletoCustomer {
    pub name: String,
    pub email: Option<String>,
    /// CPF, digits only
    pub document: String,
    pub address: BoletoAddress,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoletoAddress {
    pub street: String,
    pub number: String,
    pub district: String,
    pub city: String,
    pub state: String,
    pub complement: String,
    pub zip_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoletoService {
    pub name: String,
    pub description: String,
    /// Amount in centavos
    pub amount_minor: i64,
}

impl BoletoRequest {
    /// Composes the request for `entry`, billed to `patient`
    ///
    /// # Errors
    ///
    /// * `DomainRule` if the entry is not a receivable or the patient has no
    ///   usable CPF
    /// * `Validation` if the amount cannot be expressed in centavos
    pub fn compose(
        entry: &LedgerEntry,
        patient: &Patient,
        request: &IssueBoletoRequest,
        default_state: &str,
    ) -> Result<Self, BillingError> {
        if entry.kind != EntryKind::Receivable {
            return Err(BillingError::rule("only receivable entries may be invoiced"));
        }

        let document = patient.cpf_digits();
        if document.is_empty() {
            return Err(BillingError::rule(format!(
                "patient {} has no CPF on file",
                patient.id
            )));
        }

        let zip_code = patient
            .zip_code
            .as_deref()
            .map(digits_only)
            .filter(|zip| !zip.is_empty())
            .unwrap_or_else(|| ZIP_CODE_FALLBACK.to_string());

        Ok(Self {
            code: entry.id.code(),
            idempotency_key: idempotency_key(entry.id),
            customer: BoletoCustomer {
                name: patient.name.clone(),
                email: patient.email.clone(),
                document,
                address: BoletoAddress {
                    street: or_fallback(&patient.street, ADDRESS_FALLBACK),
                    number: or_fallback(&patient.number, ADDRESS_FALLBACK),
                    district: or_fallback(&patient.district, ADDRESS_FALLBACK),
                    city: or_fallback(&patient.city, ADDRESS_FALLBACK),
                    state: or_fallback(&patient.state, default_state),
                    complement: or_fallback(&patient.complement, ADDRESS_FALLBACK),
                    zip_code,
                },
            },
            service: BoletoService {
                name: request.service_name.trim().to_string(),
                description: request.service_description.trim().to_string(),
                amount_minor: entry.amount.to_minor_units()?,
            },
            due_date: entry.due_date,
        })
    }
}

/// Deterministic idempotency key for a ledger entry
pub fn idempotency_key(ledger_entry_id: LedgerEntryId) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, ledger_entry_id.code().as_bytes())
}

fn or_fallback(value: &Option<String>, fallback: &str) -> String {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(fallback)
        .to_string()
}
