//! Idempotent boleto issuance
//!
//! A ledger entry gets at most one boleto. Repeated requests return the
//! stored invoice without calling the provider again, concurrent requests
//! for the same entry are serialized in-process, and the unique constraint
//! behind [`InvoicePort::insert_or_get_existing`] settles races between
//! processes.
//!
//! [`InvoicePort::insert_or_get_existing`]: crate::ports::InvoicePort::insert_or_get_existing

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, instrument, warn};

use core_kernel::LedgerEntryId;

use crate::error::BillingError;
use crate::invoice::{BoletoRequest, Invoice, IssueBoletoRequest, NewInvoice, DEFAULT_STATE};
use crate::ledger::EntryKind;
use crate::origin::OriginResolver;
use crate::ports::{BillingPorts, BoletoProviderPort};

/// Result of an issuance request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssuanceOutcome {
    /// A boleto was issued by this request
    Issued(Invoice),
    /// The entry already had a boleto, which is returned unchanged
    AlreadyIssued(Invoice),
}

impl IssuanceOutcome {
    pub fn invoice(&self) -> &Invoice {
        match self {
            Self::Issued(invoice) | Self::AlreadyIssued(invoice) => invoice,
        }
    }

    pub fn into_invoice(self) -> Invoice {
        match self {
            Self::Issued(invoice) | Self::AlreadyIssued(invoice) => invoice,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, Self::Issued(_))
    }
}

type InFlightLocks = DashMap<LedgerEntryId, Arc<Mutex<()>>>;

/// Per-entry lock that leaves the map once its last holder is gone
///
/// Cleanup runs on drop, so a request cancelled mid-issuance still
/// releases its entry.
struct InFlightSlot<'a> {
    locks: &'a InFlightLocks,
    entry_id: LedgerEntryId,
    lock: Arc<Mutex<()>>,
}

impl<'a> InFlightSlot<'a> {
    fn claim(locks: &'a InFlightLocks, entry_id: LedgerEntryId) -> Self {
        let lock = locks.entry(entry_id).or_default().clone();
        Self {
            locks,
            entry_id,
            lock,
        }
    }

    fn mutex(&self) -> &Mutex<()> {
        &self.lock
    }
}

impl Drop for InFlightSlot<'_> {
    fn drop(&mut self) {
        drop(std::mem::take(&mut self.lock));
        self.locks
            .remove_if(&self.entry_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

/// Issues boletos for receivable ledger entries
#[derive(Clone)]
pub struct InvoiceIssuanceService {
    ports: BillingPorts,
    provider: Arc<dyn BoletoProviderPort>,
    resolver: OriginResolver,
    default_state: String,
    in_flight: Arc<InFlightLocks>,
}

impl InvoiceIssuanceService {
    pub fn new(ports: BillingPorts, provider: Arc<dyn BoletoProviderPort>) -> Self {
        let resolver = OriginResolver::new(ports.clone());
        Self {
            ports,
            provider,
            resolver,
            default_state: DEFAULT_STATE.to_string(),
            in_flight: Arc::new(DashMap::new()),
        }
    }

    /// State sent to the provider when the patient has none on file
    pub fn with_default_state(mut self, state: impl Into<String>) -> Self {
        self.default_state = state.into();
        self
    }

    /// Issues a boleto for the requested ledger entry
    ///
    /// # Arguments
    ///
    /// * `request` - Ledger entry and the service lines shown on the boleto
    ///
    /// # Returns
    ///
    /// [`IssuanceOutcome::Issued`] when this call created the boleto, or
    /// [`IssuanceOutcome::AlreadyIssued`] with the stored one
    ///
    /// # Errors
    ///
    /// * `Validation` for blank service fields
    /// * `NotFound` if the ledger entry does not exist
    /// * `DomainRule` for payables and entries without a billable patient
    /// * `Provider`, `ProviderAuth` or `ProviderUnavailable` when the
    ///   provider call fails; nothing is persisted in that case
    #[instrument(skip(self, request), fields(ledger_entry_id = %request.ledger_entry_id))]
    pub async fn issue(&self, request: IssueBoletoRequest) -> Result<IssuanceOutcome, BillingError> {
        request.validate()?;

        let slot = InFlightSlot::claim(&self.in_flight, request.ledger_entry_id);
        let _guard = slot.mutex().lock().await;
        self.issue_locked(request).await
    }

    async fn issue_locked(&self, request: IssueBoletoRequest) -> Result<IssuanceOutcome, BillingError> {
        let entry = self.ports.ledger.get_entry(request.ledger_entry_id).await?;
        if entry.kind != EntryKind::Receivable {
            warn!(kind = %entry.kind, "Boleto requested for a non-receivable entry");
            return Err(BillingError::rule("only receivable entries may be invoiced"));
        }

        if let Some(existing) = self.ports.invoices.find_by_ledger_entry(entry.id).await? {
            info!(invoice_id = %existing.id, "Boleto already issued, returning stored invoice");
            return Ok(IssuanceOutcome::AlreadyIssued(existing));
        }

        let origin = self.resolver.resolve(&entry).await?;
        let patient = origin.require_patient()?;
        let boleto_request =
            BoletoRequest::compose(&entry, patient, &request, &self.default_state)?;

        let boleto = self
            .provider
            .issue_boleto(&boleto_request)
            .await
            .map_err(|e| {
                error!(error = %e, code = %boleto_request.code, "Boleto provider call failed");
                BillingError::from_provider(e)
            })?;

        let new_invoice = NewInvoice {
            ledger_entry_id: entry.id,
            service_name: boleto_request.service.name.clone(),
            service_description: boleto_request.service.description.clone(),
            boleto,
        };
        let external_id = new_invoice.boleto.external_invoice_id.clone();

        let (invoice, created) = self
            .ports
            .invoices
            .insert_or_get_existing(new_invoice)
            .await
            .map_err(|e| {
                error!(
                    error = %e,
                    external_invoice_id = ?external_id,
                    "Boleto issued by provider but could not be recorded"
                );
                BillingError::from(e)
            })?;

        if created {
            info!(
                invoice_id = %invoice.id,
                external_invoice_id = ?invoice.external_invoice_id,
                amount_minor = boleto_request.service.amount_minor,
                "Boleto issued"
            );
            Ok(IssuanceOutcome::Issued(invoice))
        } else {
            warn!(invoice_id = %invoice.id, "Boleto recorded concurrently by another request");
            Ok(IssuanceOutcome::AlreadyIssued(invoice))
        }
    }

    /// Lists every stored boleto
    pub async fn list(&self) -> Result<Vec<Invoice>, BillingError> {
        Ok(self.ports.invoices.list_invoices().await?)
    }

    /// Returns the boleto of a ledger entry, if any
    pub async fn find_by_ledger_entry(
        &self,
        ledger_entry_id: LedgerEntryId,
    ) -> Result<Option<Invoice>, BillingError> {
        Ok(self.ports.invoices.find_by_ledger_entry(ledger_entry_id).await?)
    }
}
