//! Billing Domain Ports
//!
//! This module defines the port interfaces the billing services depend on,
//! enabling swappable implementations (PostgreSQL, in-memory mock, HTTP
//! provider client).
//!
//! # Architecture
//!
//! Storage is split into one port per aggregate so that each service only
//! sees what it needs. In production a single adapter
//! (`infra_db::PostgresBillingAdapter`) implements all storage ports and is
//! shared through [`BillingPorts::from_adapter`].
//!
//! The external boleto provider sits behind [`BoletoProviderPort`]; its
//! production adapter lives in [`crate::adapters::boleto_provider`].
//!
//! # Usage
//!
//! ```rust,ignore
//! use domain_billing::ports::BillingPorts;
//! use domain_billing::LedgerService;
//! use std::sync::Arc;
//!
//! let adapter = Arc::new(PostgresBillingAdapter::new(pool));
//! let ports = BillingPorts::from_adapter(adapter);
//! let ledger = LedgerService::new(ports.clone());
//! ```

use async_trait::async_trait;
use std::sync::Arc;

use core_kernel::{
    BudgetCategoryId, ContractId, DomainPort, LedgerEntryId, PatientId, PortError,
    SessionAppointmentId, SupplierId, TreatmentPackageId, TreatmentTypeId,
};

use crate::contract::{Contract, NewContract};
use crate::invoice::{BoletoRequest, Invoice, IssuedBoleto, NewInvoice};
use crate::ledger::{FundingOrigin, LedgerEntry, LedgerFilter, NewLedgerEntry};
use crate::party::{BudgetCategory, Patient, Supplier, TreatmentType};
use crate::session::{NewSessionAppointment, SessionAppointment, SessionStatus};
use crate::treatment_package::{NewTreatmentPackage, TreatmentPackage};

/// Storage of ledger entries
#[async_trait]
pub trait LedgerEntryPort: DomainPort {
    /// Persists a validated entry and returns it with its assigned id
    async fn create_entry(&self, entry: NewLedgerEntry) -> Result<LedgerEntry, PortError>;

    /// Retrieves an entry, or `PortError::NotFound`
    async fn get_entry(&self, id: LedgerEntryId) -> Result<LedgerEntry, PortError>;

    /// Lists entries matching `filter`, in no guaranteed order
    async fn list_entries(&self, filter: LedgerFilter) -> Result<Vec<LedgerEntry>, PortError>;

    /// Replaces a stored entry with `entry`
    async fn update_entry(&self, entry: LedgerEntry) -> Result<LedgerEntry, PortError>;

    /// Deletes an entry
    ///
    /// # Returns
    ///
    /// `PortError::NotFound` if absent, `PortError::Conflict` if a boleto
    /// still references it
    async fn delete_entry(&self, id: LedgerEntryId) -> Result<(), PortError>;

    /// Returns true if at least one entry is funded by `origin`
    async fn has_entries_for(&self, origin: FundingOrigin) -> Result<bool, PortError>;
}

/// Storage of contracts
#[async_trait]
pub trait ContractPort: DomainPort {
    async fn create_contract(&self, contract: NewContract) -> Result<Contract, PortError>;

    async fn get_contract(&self, id: ContractId) -> Result<Contract, PortError>;

    async fn list_contracts(&self) -> Result<Vec<Contract>, PortError>;

    async fn update_contract(&self, contract: Contract) -> Result<Contract, PortError>;

    async fn delete_contract(&self, id: ContractId) -> Result<(), PortError>;
}

/// Storage of treatment packages
#[async_trait]
pub trait TreatmentPackagePort: DomainPort {
    async fn create_package(&self, package: NewTreatmentPackage)
        -> Result<TreatmentPackage, PortError>;

    async fn get_package(&self, id: TreatmentPackageId) -> Result<TreatmentPackage, PortError>;

    async fn list_packages(&self) -> Result<Vec<TreatmentPackage>, PortError>;

    async fn list_by_patient(&self, patient_id: PatientId)
        -> Result<Vec<TreatmentPackage>, PortError>;

    /// Active packages with sessions left
    async fn list_pending(&self) -> Result<Vec<TreatmentPackage>, PortError>;

    async fn update_package(&self, package: TreatmentPackage)
        -> Result<TreatmentPackage, PortError>;

    async fn delete_package(&self, id: TreatmentPackageId) -> Result<(), PortError>;

    /// Atomically consumes one session of the quota
    ///
    /// The increment only applies while the package is not cancelled and
    /// `sessions_completed < sessions_contracted`; the status flips to
    /// completed in the same write when the quota is reached.
    ///
    /// # Returns
    ///
    /// The updated package, or `None` if the guard rejected the write
    async fn increment_session(&self, id: TreatmentPackageId)
        -> Result<Option<TreatmentPackage>, PortError>;

    /// Atomically releases one session, flooring at zero
    async fn decrement_session(&self, id: TreatmentPackageId)
        -> Result<TreatmentPackage, PortError>;
}

/// Storage of session appointments
#[async_trait]
pub trait SessionAppointmentPort: DomainPort {
    async fn create_appointment(&self, appointment: NewSessionAppointment)
        -> Result<SessionAppointment, PortError>;

    async fn get_appointment(&self, id: SessionAppointmentId)
        -> Result<SessionAppointment, PortError>;

    async fn list_by_package(&self, package_id: TreatmentPackageId)
        -> Result<Vec<SessionAppointment>, PortError>;

    async fn delete_appointment(&self, id: SessionAppointmentId) -> Result<(), PortError>;

    async fn update_status(&self, id: SessionAppointmentId, status: SessionStatus)
        -> Result<SessionAppointment, PortError>;

    /// Number of realized appointments under a package
    async fn count_realized(&self, package_id: TreatmentPackageId) -> Result<i64, PortError>;
}

/// Storage of issued boletos
#[async_trait]
pub trait InvoicePort: DomainPort {
    async fn find_by_ledger_entry(&self, ledger_entry_id: LedgerEntryId)
        -> Result<Option<Invoice>, PortError>;

    /// Inserts the invoice unless one already exists for its ledger entry
    ///
    /// # Returns
    ///
    /// The stored invoice and `true` if this call created it, or the
    /// pre-existing invoice and `false`
    async fn insert_or_get_existing(&self, invoice: NewInvoice)
        -> Result<(Invoice, bool), PortError>;

    async fn list_invoices(&self) -> Result<Vec<Invoice>, PortError>;
}

/// Read access to reference data owned by other parts of the back office
#[async_trait]
pub trait ReferenceDataPort: DomainPort {
    async fn get_patient(&self, id: PatientId) -> Result<Patient, PortError>;

    async fn get_supplier(&self, id: SupplierId) -> Result<Supplier, PortError>;

    async fn get_budget_category(&self, id: BudgetCategoryId) -> Result<BudgetCategory, PortError>;

    async fn get_treatment_type(&self, id: TreatmentTypeId) -> Result<TreatmentType, PortError>;
}

/// External boleto issuing provider
#[async_trait]
pub trait BoletoProviderPort: DomainPort {
    /// Issues a boleto and returns the provider's payment artifact
    ///
    /// # Errors
    ///
    /// * `PortError::Upstream` for a non-success provider response
    /// * `PortError::Unauthorized` if the token handshake failed
    /// * `PortError::Timeout` / `PortError::Connection` for transport failures
    async fn issue_boleto(&self, request: &BoletoRequest) -> Result<IssuedBoleto, PortError>;
}

/// The storage ports the billing services share
#[derive(Clone)]
pub struct BillingPorts {
    pub ledger: Arc<dyn LedgerEntryPort>,
    pub contracts: Arc<dyn ContractPort>,
    pub packages: Arc<dyn TreatmentPackagePort>,
    pub sessions: Arc<dyn SessionAppointmentPort>,
    pub invoices: Arc<dyn InvoicePort>,
    pub reference: Arc<dyn ReferenceDataPort>,
}

impl BillingPorts {
    /// Uses one adapter for every storage port
    pub fn from_adapter<A>(adapter: Arc<A>) -> Self
    where
        A: LedgerEntryPort
            + ContractPort
            + TreatmentPackagePort
            + SessionAppointmentPort
            + InvoicePort
            + ReferenceDataPort
            + 'static,
    {
        Self {
            ledger: adapter.clone(),
            contracts: adapter.clone(),
            packages: adapter.clone(),
            sessions: adapter.clone(),
            invoices: adapter.clone(),
            reference: adapter,
        }
    }
}

/// Mock adapters for testing
///
/// These adapters keep everything in memory and are useful for unit testing
/// services without a database or a provider sandbox.
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use chrono::Utc;
    use std::collections::{BTreeMap, HashMap};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::RwLock;

    use core_kernel::{AdapterHealth, HealthCheckResult, HealthCheckable, InvoiceId};

    use crate::treatment_package::PackageStatus;

    #[derive(Debug, Default)]
    struct State {
        last_id: i64,
        entries: BTreeMap<LedgerEntryId, LedgerEntry>,
        contracts: BTreeMap<ContractId, Contract>,
        packages: BTreeMap<TreatmentPackageId, TreatmentPackage>,
        sessions: BTreeMap<SessionAppointmentId, SessionAppointment>,
        invoices: BTreeMap<InvoiceId, Invoice>,
        patients: HashMap<PatientId, Patient>,
        suppliers: HashMap<SupplierId, Supplier>,
        budget_categories: HashMap<BudgetCategoryId, BudgetCategory>,
        treatment_types: HashMap<TreatmentTypeId, TreatmentType>,
    }

    impl State {
        fn next_id(&mut self) -> i64 {
            self.last_id += 1;
            self.last_id
        }
    }

    /// In-memory implementation of every billing storage port
    ///
    /// Mirrors the foreign keys of the relational schema: deleting a row
    /// that is still referenced fails with `PortError::Conflict`.
    #[derive(Debug, Default, Clone)]
    pub struct MockBillingStore {
        state: Arc<RwLock<State>>,
    }

    impl MockBillingStore {
        /// Creates an empty store
        pub fn new() -> Self {
            Self::default()
        }

        pub async fn insert_patient(&self, patient: Patient) {
            self.state.write().await.patients.insert(patient.id, patient);
        }

        pub async fn insert_supplier(&self, supplier: Supplier) {
            self.state.write().await.suppliers.insert(supplier.id, supplier);
        }

        pub async fn insert_budget_category(&self, category: BudgetCategory) {
            self.state.write().await.budget_categories.insert(category.id, category);
        }

        pub async fn insert_treatment_type(&self, treatment_type: TreatmentType) {
            self.state
                .write()
                .await
                .treatment_types
                .insert(treatment_type.id, treatment_type);
        }

        /// Number of stored invoices
        pub async fn invoice_count(&self) -> usize {
            self.state.read().await.invoices.len()
        }
    }

    impl DomainPort for MockBillingStore {}

    #[async_trait]
    impl HealthCheckable for MockBillingStore {
        async fn health_check(&self) -> HealthCheckResult {
            HealthCheckResult {
                adapter_id: "mock-billing-store".to_string(),
                status: AdapterHealth::Healthy,
                latency_ms: 0,
                message: Some("Mock adapter always healthy".to_string()),
                checked_at: Utc::now(),
            }
        }
    }

    #[async_trait]
    impl LedgerEntryPort for MockBillingStore {
        async fn create_entry(&self, entry: NewLedgerEntry) -> Result<LedgerEntry, PortError> {
            let mut state = self.state.write().await;
            let id = LedgerEntryId::new(state.next_id());
            let entry = entry.into_entry(id, Utc::now());
            state.entries.insert(id, entry.clone());
            Ok(entry)
        }

        async fn get_entry(&self, id: LedgerEntryId) -> Result<LedgerEntry, PortError> {
            self.state
                .read()
                .await
                .entries
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("LedgerEntry", id))
        }

        async fn list_entries(&self, filter: LedgerFilter) -> Result<Vec<LedgerEntry>, PortError> {
            let state = self.state.read().await;
            Ok(state
                .entries
                .values()
                .filter(|e| filter.matches(e))
                .cloned()
                .collect())
        }

        async fn update_entry(&self, entry: LedgerEntry) -> Result<LedgerEntry, PortError> {
            let mut state = self.state.write().await;
            match state.entries.get_mut(&entry.id) {
                Some(stored) => {
                    *stored = entry.clone();
                    Ok(entry)
                }
                None => Err(PortError::not_found("LedgerEntry", entry.id)),
            }
        }

        async fn delete_entry(&self, id: LedgerEntryId) -> Result<(), PortError> {
            let mut state = self.state.write().await;
            if state.invoices.values().any(|i| i.ledger_entry_id == id) {
                return Err(PortError::conflict("ledger entry is referenced by a boleto"));
            }
            state
                .entries
                .remove(&id)
                .map(|_| ())
                .ok_or_else(|| PortError::not_found("LedgerEntry", id))
        }

        async fn has_entries_for(&self, origin: FundingOrigin) -> Result<bool, PortError> {
            Ok(self
                .state
                .read()
                .await
                .entries
                .values()
                .any(|e| e.origin == origin))
        }
    }

    #[async_trait]
    impl ContractPort for MockBillingStore {
        async fn create_contract(&self, contract: NewContract) -> Result<Contract, PortError> {
            let mut state = self.state.write().await;
            if state.contracts.values().any(|c| c.identifier == contract.identifier) {
                return Err(PortError::conflict("contract identifier already exists"));
            }
            let id = ContractId::new(state.next_id());
            let contract = contract.into_contract(id, Utc::now());
            state.contracts.insert(id, contract.clone());
            Ok(contract)
        }

        async fn get_contract(&self, id: ContractId) -> Result<Contract, PortError> {
            self.state
                .read()
                .await
                .contracts
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("Contract", id))
        }

        async fn list_contracts(&self) -> Result<Vec<Contract>, PortError> {
            Ok(self.state.read().await.contracts.values().cloned().collect())
        }

        async fn update_contract(&self, contract: Contract) -> Result<Contract, PortError> {
            let mut state = self.state.write().await;
            match state.contracts.get_mut(&contract.id) {
                Some(stored) => {
                    *stored = contract.clone();
                    Ok(contract)
                }
                None => Err(PortError::not_found("Contract", contract.id)),
            }
        }

        async fn delete_contract(&self, id: ContractId) -> Result<(), PortError> {
            let mut state = self.state.write().await;
            if state.entries.values().any(|e| e.origin.contract_id() == Some(id)) {
                return Err(PortError::conflict("contract is referenced by ledger entries"));
            }
            state
                .contracts
                .remove(&id)
                .map(|_| ())
                .ok_or_else(|| PortError::not_found("Contract", id))
        }
    }

    #[async_trait]
    impl TreatmentPackagePort for MockBillingStore {
        async fn create_package(
            &self,
            package: NewTreatmentPackage,
        ) -> Result<TreatmentPackage, PortError> {
            let mut state = self.state.write().await;
            let id = TreatmentPackageId::new(state.next_id());
            let package = package.into_package(id, Utc::now());
            state.packages.insert(id, package.clone());
            Ok(package)
        }

        async fn get_package(&self, id: TreatmentPackageId) -> Result<TreatmentPackage, PortError> {
            self.state
                .read()
                .await
                .packages
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("TreatmentPackage", id))
        }

        async fn list_packages(&self) -> Result<Vec<TreatmentPackage>, PortError> {
            Ok(self.state.read().await.packages.values().cloned().collect())
        }

        async fn list_by_patient(
            &self,
            patient_id: PatientId,
        ) -> Result<Vec<TreatmentPackage>, PortError> {
            Ok(self
                .state
                .read()
                .await
                .packages
                .values()
                .filter(|p| p.patient_id == patient_id)
                .cloned()
                .collect())
        }

        async fn list_pending(&self) -> Result<Vec<TreatmentPackage>, PortError> {
            Ok(self
                .state
                .read()
                .await
                .packages
                .values()
                .filter(|p| p.has_pending_sessions())
                .cloned()
                .collect())
        }

        async fn update_package(
            &self,
            package: TreatmentPackage,
        ) -> Result<TreatmentPackage, PortError> {
            let mut state = self.state.write().await;
            match state.packages.get_mut(&package.id) {
                Some(stored) => {
                    *stored = package.clone();
                    Ok(package)
                }
                None => Err(PortError::not_found("TreatmentPackage", package.id)),
            }
        }

        async fn delete_package(&self, id: TreatmentPackageId) -> Result<(), PortError> {
            let mut state = self.state.write().await;
            let referenced = state.sessions.values().any(|s| s.treatment_package_id == id)
                || state
                    .entries
                    .values()
                    .any(|e| e.origin.treatment_package_id() == Some(id));
            if referenced {
                return Err(PortError::conflict("treatment package is still referenced"));
            }
            state
                .packages
                .remove(&id)
                .map(|_| ())
                .ok_or_else(|| PortError::not_found("TreatmentPackage", id))
        }

        async fn increment_session(
            &self,
            id: TreatmentPackageId,
        ) -> Result<Option<TreatmentPackage>, PortError> {
            let mut state = self.state.write().await;
            let package = state
                .packages
                .get_mut(&id)
                .ok_or_else(|| PortError::not_found("TreatmentPackage", id))?;
            if package.status == PackageStatus::Cancelled || package.is_quota_exhausted() {
                return Ok(None);
            }
            package
                .increment_session()
                .map_err(|e| PortError::internal(e.to_string()))?;
            Ok(Some(package.clone()))
        }

        async fn decrement_session(
            &self,
            id: TreatmentPackageId,
        ) -> Result<TreatmentPackage, PortError> {
            let mut state = self.state.write().await;
            let package = state
                .packages
                .get_mut(&id)
                .ok_or_else(|| PortError::not_found("TreatmentPackage", id))?;
            package.decrement_session();
            Ok(package.clone())
        }
    }

    #[async_trait]
    impl SessionAppointmentPort for MockBillingStore {
        async fn create_appointment(
            &self,
            appointment: NewSessionAppointment,
        ) -> Result<SessionAppointment, PortError> {
            let mut state = self.state.write().await;
            let id = SessionAppointmentId::new(state.next_id());
            let appointment = appointment.into_appointment(id, Utc::now());
            state.sessions.insert(id, appointment.clone());
            Ok(appointment)
        }

        async fn get_appointment(
            &self,
            id: SessionAppointmentId,
        ) -> Result<SessionAppointment, PortError> {
            self.state
                .read()
                .await
                .sessions
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("SessionAppointment", id))
        }

        async fn list_by_package(
            &self,
            package_id: TreatmentPackageId,
        ) -> Result<Vec<SessionAppointment>, PortError> {
            Ok(self
                .state
                .read()
                .await
                .sessions
                .values()
                .filter(|s| s.treatment_package_id == package_id)
                .cloned()
                .collect())
        }

        async fn delete_appointment(&self, id: SessionAppointmentId) -> Result<(), PortError> {
            self.state
                .write()
                .await
                .sessions
                .remove(&id)
                .map(|_| ())
                .ok_or_else(|| PortError::not_found("SessionAppointment", id))
        }

        async fn update_status(
            &self,
            id: SessionAppointmentId,
            status: SessionStatus,
        ) -> Result<SessionAppointment, PortError> {
            let mut state = self.state.write().await;
            let appointment = state
                .sessions
                .get_mut(&id)
                .ok_or_else(|| PortError::not_found("SessionAppointment", id))?;
            appointment.status = status;
            appointment.updated_at = Utc::now();
            Ok(appointment.clone())
        }

        async fn count_realized(&self, package_id: TreatmentPackageId) -> Result<i64, PortError> {
            let count = self
                .state
                .read()
                .await
                .sessions
                .values()
                .filter(|s| {
                    s.treatment_package_id == package_id && s.status == SessionStatus::Realized
                })
                .count();
            Ok(count as i64)
        }
    }

    #[async_trait]
    impl InvoicePort for MockBillingStore {
        async fn find_by_ledger_entry(
            &self,
            ledger_entry_id: LedgerEntryId,
        ) -> Result<Option<Invoice>, PortError> {
            Ok(self
                .state
                .read()
                .await
                .invoices
                .values()
                .find(|i| i.ledger_entry_id == ledger_entry_id)
                .cloned())
        }

        async fn insert_or_get_existing(
            &self,
            invoice: NewInvoice,
        ) -> Result<(Invoice, bool), PortError> {
            let mut state = self.state.write().await;
            if let Some(existing) = state
                .invoices
                .values()
                .find(|i| i.ledger_entry_id == invoice.ledger_entry_id)
            {
                return Ok((existing.clone(), false));
            }
            if !state.entries.contains_key(&invoice.ledger_entry_id) {
                return Err(PortError::not_found("LedgerEntry", invoice.ledger_entry_id));
            }
            let id = InvoiceId::new(state.next_id());
            let invoice = invoice.into_invoice(id, Utc::now());
            state.invoices.insert(id, invoice.clone());
            Ok((invoice, true))
        }

        async fn list_invoices(&self) -> Result<Vec<Invoice>, PortError> {
            Ok(self.state.read().await.invoices.values().cloned().collect())
        }
    }

    #[async_trait]
    impl ReferenceDataPort for MockBillingStore {
        async fn get_patient(&self, id: PatientId) -> Result<Patient, PortError> {
            self.state
                .read()
                .await
                .patients
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("Patient", id))
        }

        async fn get_supplier(&self, id: SupplierId) -> Result<Supplier, PortError> {
            self.state
                .read()
                .await
                .suppliers
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("Supplier", id))
        }

        async fn get_budget_category(
            &self,
            id: BudgetCategoryId,
        ) -> Result<BudgetCategory, PortError> {
            self.state
                .read()
                .await
                .budget_categories
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("BudgetCategory", id))
        }

        async fn get_treatment_type(
            &self,
            id: TreatmentTypeId,
        ) -> Result<TreatmentType, PortError> {
            self.state
                .read()
                .await
                .treatment_types
                .get(&id)
                .cloned()
                .ok_or_else(|| PortError::not_found("TreatmentType", id))
        }
    }

    /// Scripted boleto provider that records every call
    #[derive(Debug)]
    pub struct MockBoletoProvider {
        response: RwLock<Result<IssuedBoleto, (u16, String)>>,
        requests: RwLock<Vec<BoletoRequest>>,
        calls: AtomicUsize,
        delay: Option<Duration>,
    }

    impl Default for MockBoletoProvider {
        fn default() -> Self {
            Self::new()
        }
    }

    impl MockBoletoProvider {
        /// Provider that issues a fixed, well-formed boleto
        pub fn new() -> Self {
            Self::returning(IssuedBoleto {
                external_invoice_id: Some("inv_mock_0001".to_string()),
                barcode: Some("23793381286000000000000000000000000000000000".to_string()),
                digitable_line: Some(
                    "23793.38128 60000.000003 00000.000000 0 00000000000000".to_string(),
                ),
                pdf_link: Some("https://provider.example/boletos/inv_mock_0001.pdf".to_string()),
            })
        }

        pub fn returning(boleto: IssuedBoleto) -> Self {
            Self {
                response: RwLock::new(Ok(boleto)),
                requests: RwLock::new(Vec::new()),
                calls: AtomicUsize::new(0),
                delay: None,
            }
        }

        /// Provider that answers every call with `status` and `body`
        pub fn failing(status: u16, body: impl Into<String>) -> Self {
            let provider = Self::new();
            Self {
                response: RwLock::new(Err((status, body.into()))),
                ..provider
            }
        }

        /// Delays every response, to widen race windows in tests
        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        /// Number of issue calls received
        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        /// Requests received so far
        pub async fn requests(&self) -> Vec<BoletoRequest> {
            self.requests.read().await.clone()
        }
    }

    impl DomainPort for MockBoletoProvider {}

    #[async_trait]
    impl BoletoProviderPort for MockBoletoProvider {
        async fn issue_boleto(&self, request: &BoletoRequest) -> Result<IssuedBoleto, PortError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.write().await.push(request.clone());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            match &*self.response.read().await {
                Ok(boleto) => Ok(boleto.clone()),
                Err((status, body)) => Err(PortError::Upstream {
                    status: *status,
                    body: body.clone(),
                }),
            }
        }
    }
}
