//! Billing domain services
//!
//! This module contains the application services that orchestrate the
//! billing aggregates through their ports: reference checks, cross-aggregate
//! guards, and quota bookkeeping.

use tracing::{info, instrument, warn};

use core_kernel::{
    ContractId, LedgerEntryId, PatientId, PortError, SessionAppointmentId, SupplierId,
    TreatmentPackageId,
};

use crate::contract::{Contract, ContractDraft, ContractPatch};
use crate::error::BillingError;
use crate::ledger::{FundingOrigin, LedgerEntry, LedgerEntryDraft, LedgerEntryPatch, LedgerFilter};
use crate::origin::{OriginResolver, ResolvedOrigin};
use crate::ports::BillingPorts;
use crate::session::{SessionAppointment, SessionDraft, SessionStatus};
use crate::treatment_package::{TreatmentPackage, TreatmentPackageDraft, TreatmentPackagePatch};

/// Maps a storage-level reference conflict to a business rule message
fn guard_conflict(error: PortError, message: &str) -> BillingError {
    match error {
        PortError::Conflict { .. } => BillingError::rule(message),
        other => other.into(),
    }
}

// ============================================================================
// Ledger
// ============================================================================

/// Service for ledger entries
///
/// Enforces the funding-origin invariants, checks that every referenced
/// entity exists, and protects entries that already have a boleto.
#[derive(Clone)]
pub struct LedgerService {
    ports: BillingPorts,
    resolver: OriginResolver,
}

impl LedgerService {
    pub fn new(ports: BillingPorts) -> Self {
        let resolver = OriginResolver::new(ports.clone());
        Self { ports, resolver }
    }

    /// Creates a ledger entry
    ///
    /// # Errors
    ///
    /// * `Validation` for dual, absent or kind-incompatible origins, negative
    ///   amounts, and paid entries without a paid date
    /// * `NotFound` if the origin or budget category does not exist
    #[instrument(skip(self, draft), fields(kind = %draft.kind))]
    pub async fn create(&self, draft: LedgerEntryDraft) -> Result<LedgerEntry, BillingError> {
        let new_entry = draft.validate().map_err(|e| {
            warn!(error = %e, "Ledger entry rejected");
            e
        })?;

        self.ensure_origin_exists(&new_entry.origin).await?;
        self.ports
            .reference
            .get_budget_category(new_entry.budget_category_id)
            .await?;

        let entry = self.ports.ledger.create_entry(new_entry).await?;
        info!(
            ledger_entry_id = %entry.id,
            origin = entry.origin.discriminant(),
            amount = %entry.amount,
            "Ledger entry created"
        );
        Ok(entry)
    }

    pub async fn get(&self, id: LedgerEntryId) -> Result<LedgerEntry, BillingError> {
        Ok(self.ports.ledger.get_entry(id).await?)
    }

    pub async fn list(&self, filter: LedgerFilter) -> Result<Vec<LedgerEntry>, BillingError> {
        Ok(self.ports.ledger.list_entries(filter).await?)
    }

    /// Lists the entries of a contract, which must exist
    pub async fn list_by_contract(
        &self,
        contract_id: ContractId,
    ) -> Result<Vec<LedgerEntry>, BillingError> {
        self.ports.contracts.get_contract(contract_id).await?;
        self.list(LedgerFilter::by_contract(contract_id)).await
    }

    /// Lists the entries of a supplier, which must exist
    pub async fn list_by_supplier(
        &self,
        supplier_id: SupplierId,
    ) -> Result<Vec<LedgerEntry>, BillingError> {
        self.ports.reference.get_supplier(supplier_id).await?;
        self.list(LedgerFilter::by_supplier(supplier_id)).await
    }

    /// Applies a partial update and re-validates the whole entry
    ///
    /// Once a boleto exists for the entry, its kind, origin, amount and due
    /// date are frozen.
    #[instrument(skip(self, patch))]
    pub async fn update(
        &self,
        id: LedgerEntryId,
        patch: LedgerEntryPatch,
    ) -> Result<LedgerEntry, BillingError> {
        let current = self.ports.ledger.get_entry(id).await?;
        let updated = patch.apply(&current).map_err(|e| {
            warn!(error = %e, "Ledger entry update rejected");
            e
        })?;

        if updated.origin != current.origin {
            self.ensure_origin_exists(&updated.origin).await?;
        }
        if updated.budget_category_id != current.budget_category_id {
            self.ports
                .reference
                .get_budget_category(updated.budget_category_id)
                .await?;
        }
        if current.financial_terms_differ(&updated)
            && self.ports.invoices.find_by_ledger_entry(id).await?.is_some()
        {
            warn!("Attempt to change financial terms of an invoiced entry");
            return Err(BillingError::rule(
                "ledger entry has an issued boleto; kind, origin, amount and due date can no longer change",
            ));
        }

        let entry = self.ports.ledger.update_entry(updated).await?;
        info!(status = %entry.status, "Ledger entry updated");
        Ok(entry)
    }

    /// Deletes an entry that has no boleto
    #[instrument(skip(self))]
    pub async fn delete(&self, id: LedgerEntryId) -> Result<(), BillingError> {
        const MESSAGE: &str = "cannot delete ledger entry with an issued boleto";

        self.ports.ledger.get_entry(id).await?;
        if self.ports.invoices.find_by_ledger_entry(id).await?.is_some() {
            warn!("Delete refused, boleto exists");
            return Err(BillingError::rule(MESSAGE));
        }
        self.ports
            .ledger
            .delete_entry(id)
            .await
            .map_err(|e| guard_conflict(e, MESSAGE))?;
        info!("Ledger entry deleted");
        Ok(())
    }

    /// Resolves the funding origin of an entry for display
    pub async fn resolve_origin(
        &self,
        id: LedgerEntryId,
    ) -> Result<(LedgerEntry, ResolvedOrigin), BillingError> {
        let entry = self.ports.ledger.get_entry(id).await?;
        let origin = self.resolver.resolve(&entry).await?;
        Ok((entry, origin))
    }

    async fn ensure_origin_exists(&self, origin: &FundingOrigin) -> Result<(), BillingError> {
        match *origin {
            FundingOrigin::Contract(id) => {
                self.ports.contracts.get_contract(id).await?;
            }
            FundingOrigin::TreatmentPackage(id) => {
                self.ports.packages.get_package(id).await?;
            }
            FundingOrigin::Supplier(id) => {
                self.ports.reference.get_supplier(id).await?;
            }
        }
        Ok(())
    }
}

// ============================================================================
// Contracts
// ============================================================================

/// Service for patient contracts
#[derive(Clone)]
pub struct ContractService {
    ports: BillingPorts,
}

impl ContractService {
    pub fn new(ports: BillingPorts) -> Self {
        Self { ports }
    }

    #[instrument(skip(self, draft), fields(patient_id = %draft.patient_id))]
    pub async fn create(&self, draft: ContractDraft) -> Result<Contract, BillingError> {
        let new_contract = draft.validate()?;
        self.ports.reference.get_patient(new_contract.patient_id).await?;

        let contract = self.ports.contracts.create_contract(new_contract).await?;
        info!(contract_id = %contract.id, identifier = %contract.identifier, "Contract created");
        Ok(contract)
    }

    pub async fn get(&self, id: ContractId) -> Result<Contract, BillingError> {
        Ok(self.ports.contracts.get_contract(id).await?)
    }

    pub async fn list(&self) -> Result<Vec<Contract>, BillingError> {
        Ok(self.ports.contracts.list_contracts().await?)
    }

    #[instrument(skip(self, patch))]
    pub async fn update(
        &self,
        id: ContractId,
        patch: ContractPatch,
    ) -> Result<Contract, BillingError> {
        let current = self.ports.contracts.get_contract(id).await?;
        let updated = patch.apply(&current)?;
        if updated.patient_id != current.patient_id {
            self.ports.reference.get_patient(updated.patient_id).await?;
        }
        Ok(self.ports.contracts.update_contract(updated).await?)
    }

    /// Deletes a contract with no ledger entries
    #[instrument(skip(self))]
    pub async fn delete(&self, id: ContractId) -> Result<(), BillingError> {
        const MESSAGE: &str = "cannot delete contract with associated entries";

        self.ports.contracts.get_contract(id).await?;
        if self
            .ports
            .ledger
            .has_entries_for(FundingOrigin::Contract(id))
            .await?
        {
            warn!("Delete refused, contract has ledger entries");
            return Err(BillingError::rule(MESSAGE));
        }
        self.ports
            .contracts
            .delete_contract(id)
            .await
            .map_err(|e| guard_conflict(e, MESSAGE))?;
        info!("Contract deleted");
        Ok(())
    }
}

// ============================================================================
// Treatment packages
// ============================================================================

/// Service for treatment packages and their session quota
#[derive(Clone)]
pub struct TreatmentPackageService {
    ports: BillingPorts,
}

impl TreatmentPackageService {
    pub fn new(ports: BillingPorts) -> Self {
        Self { ports }
    }

    #[instrument(skip(self, draft), fields(patient_id = %draft.patient_id))]
    pub async fn create(&self, draft: TreatmentPackageDraft) -> Result<TreatmentPackage, BillingError> {
        let new_package = draft.validate()?;
        self.ports.reference.get_patient(new_package.patient_id).await?;
        self.ports
            .reference
            .get_treatment_type(new_package.treatment_type_id)
            .await?;

        let package = self.ports.packages.create_package(new_package).await?;
        info!(
            package_id = %package.id,
            sessions_contracted = package.sessions_contracted,
            "Treatment package created"
        );
        Ok(package)
    }

    pub async fn get(&self, id: TreatmentPackageId) -> Result<TreatmentPackage, BillingError> {
        Ok(self.ports.packages.get_package(id).await?)
    }

    pub async fn list(&self) -> Result<Vec<TreatmentPackage>, BillingError> {
        Ok(self.ports.packages.list_packages().await?)
    }

    /// Lists the packages of a patient, who must exist
    pub async fn list_by_patient(
        &self,
        patient_id: PatientId,
    ) -> Result<Vec<TreatmentPackage>, BillingError> {
        self.ports.reference.get_patient(patient_id).await?;
        Ok(self.ports.packages.list_by_patient(patient_id).await?)
    }

    /// Active packages that still have sessions to schedule
    pub async fn list_pending(&self) -> Result<Vec<TreatmentPackage>, BillingError> {
        Ok(self.ports.packages.list_pending().await?)
    }

    #[instrument(skip(self, patch))]
    pub async fn update(
        &self,
        id: TreatmentPackageId,
        patch: TreatmentPackagePatch,
    ) -> Result<TreatmentPackage, BillingError> {
        let current = self.ports.packages.get_package(id).await?;
        let updated = patch.apply(&current).map_err(|e| {
            warn!(error = %e, "Treatment package update rejected");
            e
        })?;
        if updated.patient_id != current.patient_id {
            self.ports.reference.get_patient(updated.patient_id).await?;
        }
        if updated.treatment_type_id != current.treatment_type_id {
            self.ports
                .reference
                .get_treatment_type(updated.treatment_type_id)
                .await?;
        }
        Ok(self.ports.packages.update_package(updated).await?)
    }

    /// Deletes a package with no sessions and no ledger entries
    #[instrument(skip(self))]
    pub async fn delete(&self, id: TreatmentPackageId) -> Result<(), BillingError> {
        const MESSAGE: &str =
            "cannot delete treatment package with scheduled sessions or ledger entries";

        self.ports.packages.get_package(id).await?;
        let has_sessions = !self.ports.sessions.list_by_package(id).await?.is_empty();
        let has_entries = self
            .ports
            .ledger
            .has_entries_for(FundingOrigin::TreatmentPackage(id))
            .await?;
        if has_sessions || has_entries {
            warn!(has_sessions, has_entries, "Delete refused, package is referenced");
            return Err(BillingError::rule(MESSAGE));
        }
        self.ports
            .packages
            .delete_package(id)
            .await
            .map_err(|e| guard_conflict(e, MESSAGE))?;
        info!("Treatment package deleted");
        Ok(())
    }

    /// Consumes one session of the quota
    ///
    /// The package moves to completed in the same write that consumes its
    /// last session.
    ///
    /// # Errors
    ///
    /// * `NotFound` if the package does not exist
    /// * `DomainRule` if it is cancelled or its quota is exhausted; the
    ///   stored state is unchanged
    #[instrument(skip(self), fields(package_id = %id))]
    pub async fn increment_session(
        &self,
        id: TreatmentPackageId,
    ) -> Result<TreatmentPackage, BillingError> {
        let mut current = self.ports.packages.get_package(id).await?;
        if let Err(e) = current.increment_session() {
            warn!(error = %e, "Session increment rejected");
            return Err(e);
        }

        match self.ports.packages.increment_session(id).await? {
            Some(package) => {
                info!(
                    sessions_completed = package.sessions_completed,
                    status = %package.status,
                    "Session recorded"
                );
                Ok(package)
            }
            None => {
                warn!("Quota used up by a concurrent request");
                Err(BillingError::rule(format!(
                    "treatment package {} has no sessions left",
                    id
                )))
            }
        }
    }

    /// Releases one session, never going below zero
    #[instrument(skip(self), fields(package_id = %id))]
    pub async fn decrement_session(
        &self,
        id: TreatmentPackageId,
    ) -> Result<TreatmentPackage, BillingError> {
        let package = self.ports.packages.decrement_session(id).await?;
        info!(sessions_completed = package.sessions_completed, "Session released");
        Ok(package)
    }
}

// ============================================================================
// Session appointments
// ============================================================================

/// Service for session appointments, limited to their effect on the quota
#[derive(Clone)]
pub struct SessionService {
    ports: BillingPorts,
    packages: TreatmentPackageService,
}

impl SessionService {
    pub fn new(ports: BillingPorts) -> Self {
        let packages = TreatmentPackageService::new(ports.clone());
        Self { ports, packages }
    }

    /// Schedules the next session of a package, consuming one quota unit
    ///
    /// # Errors
    ///
    /// * `NotFound` if the package or patient does not exist
    /// * `Validation` if the patient is not the package's patient
    /// * `DomainRule` if the quota is exhausted or the package is cancelled
    #[instrument(skip(self, draft), fields(package_id = %draft.treatment_package_id))]
    pub async fn schedule(&self, draft: SessionDraft) -> Result<SessionAppointment, BillingError> {
        let package = self
            .ports
            .packages
            .get_package(draft.treatment_package_id)
            .await?;
        self.ports.reference.get_patient(draft.patient_id).await?;

        if package.patient_id != draft.patient_id {
            return Err(BillingError::validation(
                "session patient must be the treatment package's patient",
            ));
        }
        if package.is_quota_exhausted() {
            return Err(BillingError::rule(
                "all sessions of the treatment package were already scheduled",
            ));
        }

        let package = self.packages.increment_session(package.id).await?;
        let new_appointment =
            match draft.validate(package.sessions_completed, package.sessions_contracted) {
                Ok(new_appointment) => new_appointment,
                Err(e) => {
                    self.release(package.id).await;
                    return Err(e);
                }
            };

        match self.ports.sessions.create_appointment(new_appointment).await {
            Ok(appointment) => {
                info!(
                    session_id = %appointment.id,
                    session_number = appointment.session_number,
                    "Session scheduled"
                );
                Ok(appointment)
            }
            Err(e) => {
                self.release(package.id).await;
                Err(e.into())
            }
        }
    }

    pub async fn get(&self, id: SessionAppointmentId) -> Result<SessionAppointment, BillingError> {
        Ok(self.ports.sessions.get_appointment(id).await?)
    }

    /// Lists the sessions of a package, which must exist
    pub async fn list_by_package(
        &self,
        package_id: TreatmentPackageId,
    ) -> Result<Vec<SessionAppointment>, BillingError> {
        self.ports.packages.get_package(package_id).await?;
        Ok(self.ports.sessions.list_by_package(package_id).await?)
    }

    /// Deletes a session and gives its quota unit back
    #[instrument(skip(self))]
    pub async fn delete(&self, id: SessionAppointmentId) -> Result<(), BillingError> {
        let appointment = self.ports.sessions.get_appointment(id).await?;
        self.ports.sessions.delete_appointment(id).await?;
        self.packages
            .decrement_session(appointment.treatment_package_id)
            .await?;
        Ok(())
    }

    /// Marks a session as realized
    ///
    /// Completes the package when the number of realized sessions reaches
    /// the contracted quota. A cancelled package keeps its status.
    #[instrument(skip(self))]
    pub async fn mark_realized(
        &self,
        id: SessionAppointmentId,
    ) -> Result<(SessionAppointment, TreatmentPackage), BillingError> {
        let appointment = self
            .ports
            .sessions
            .update_status(id, SessionStatus::Realized)
            .await?;
        let package_id = appointment.treatment_package_id;

        let realized = self.ports.sessions.count_realized(package_id).await?;
        let mut package = self.ports.packages.get_package(package_id).await?;
        if package.record_realized_sessions(realized) {
            info!(package_id = %package_id, realized, "All sessions realized, package completed");
            package = self.ports.packages.update_package(package).await?;
        }
        Ok((appointment, package))
    }

    async fn release(&self, package_id: TreatmentPackageId) {
        if let Err(e) = self.packages.decrement_session(package_id).await {
            warn!(package_id = %package_id, error = %e, "Failed to release session after scheduling error");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoice::{IssuedBoleto, NewInvoice};
    use crate::ledger::{EntryKind, EntryStatus};
    use crate::party::{BudgetCategory, Patient, Supplier, TreatmentType};
    use crate::ports::mock::MockBillingStore;
    use crate::treatment_package::PackageStatus;
    use crate::ports::InvoicePort;
    use chrono::{NaiveDate, NaiveTime};
    use core_kernel::{BudgetCategoryId, Money, TreatmentTypeId};
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    const PATIENT: PatientId = PatientId::new(1);
    const OTHER_PATIENT: PatientId = PatientId::new(2);
    const CATEGORY: BudgetCategoryId = BudgetCategoryId::new(1);
    const SUPPLIER: SupplierId = SupplierId::new(1);

    async fn seeded() -> (Arc<MockBillingStore>, BillingPorts) {
        let store = Arc::new(MockBillingStore::new());
        store
            .insert_patient(Patient::new(PATIENT, "Ana Souza", "123.456.789-09"))
            .await;
        store
            .insert_patient(Patient::new(OTHER_PATIENT, "Bruno Lima", "987.654.321-00"))
            .await;
        store
            .insert_budget_category(BudgetCategory {
                id: CATEGORY,
                name: "Receitas de tratamento".to_string(),
            })
            .await;
        store
            .insert_supplier(Supplier {
                id: SUPPLIER,
                name: "Dermo Supply".to_string(),
                document: "12.345.678/0001-90".to_string(),
                email: None,
            })
            .await;
        store
            .insert_treatment_type(TreatmentType {
                id: TreatmentTypeId::new(1),
                name: "Microagulhamento".to_string(),
            })
            .await;
        let ports = BillingPorts::from_adapter(store.clone());
        (store, ports)
    }

    fn receivable(
        contract_id: Option<ContractId>,
        package_id: Option<TreatmentPackageId>,
    ) -> LedgerEntryDraft {
        LedgerEntryDraft {
            kind: EntryKind::Receivable,
            contract_id,
            treatment_package_id: package_id,
            supplier_id: None,
            budget_category_id: CATEGORY,
            due_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            paid_date: None,
            amount: dec!(200.00),
            status: EntryStatus::Pending,
            invoice_number: None,
            notes: None,
            payment_method: None,
        }
    }

    fn package_draft(contracted: i32) -> TreatmentPackageDraft {
        TreatmentPackageDraft {
            patient_id: PATIENT,
            treatment_type_id: TreatmentTypeId::new(1),
            description: "Microagulhamento facial".to_string(),
            start_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            sessions_contracted: contracted,
            sessions_completed: 0,
            total_amount: dec!(1200.00),
            status: PackageStatus::Active,
            notes: None,
        }
    }

    fn session_draft(package_id: TreatmentPackageId, patient_id: PatientId) -> SessionDraft {
        SessionDraft {
            patient_id,
            treatment_package_id: package_id,
            scheduled_date: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
            start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end_time: None,
            notes: None,
        }
    }

    fn contract_draft() -> ContractDraft {
        ContractDraft {
            patient_id: PATIENT,
            session_appointment_id: None,
            status: Default::default(),
            deposit_amount: Some(dec!(500)),
            remaining_amount: Some(dec!(1500)),
        }
    }

    mod ledger_tests {
        use super::*;

        #[tokio::test]
        async fn test_create_receivable_for_package() {
            let (_, ports) = seeded().await;
            let package = TreatmentPackageService::new(ports.clone())
                .create(package_draft(10))
                .await
                .unwrap();

            let entry = LedgerService::new(ports)
                .create(receivable(None, Some(package.id)))
                .await
                .unwrap();

            assert_eq!(entry.status, EntryStatus::Pending);
            assert_eq!(entry.amount, Money::new(dec!(200.00)));
            assert_eq!(entry.origin, FundingOrigin::TreatmentPackage(package.id));
        }

        #[tokio::test]
        async fn test_create_with_both_origins_fails() {
            let (_, ports) = seeded().await;
            let err = LedgerService::new(ports)
                .create(receivable(Some(ContractId::new(3)), Some(TreatmentPackageId::new(7))))
                .await
                .unwrap_err();

            assert!(matches!(err, BillingError::Validation(ref m) if m.contains("cannot link both")));
        }

        #[tokio::test]
        async fn test_create_with_missing_origin_is_not_found() {
            let (_, ports) = seeded().await;
            let err = LedgerService::new(ports)
                .create(receivable(None, Some(TreatmentPackageId::new(404))))
                .await
                .unwrap_err();

            assert!(matches!(err, BillingError::NotFound { .. }));
        }

        #[tokio::test]
        async fn test_create_with_missing_budget_category_is_not_found() {
            let (_, ports) = seeded().await;
            let contract = ContractService::new(ports.clone())
                .create(contract_draft())
                .await
                .unwrap();
            let mut draft = receivable(Some(contract.id), None);
            draft.budget_category_id = BudgetCategoryId::new(99);

            let err = LedgerService::new(ports).create(draft).await.unwrap_err();
            assert!(matches!(err, BillingError::NotFound { ref entity, .. } if entity == "BudgetCategory"));
        }

        #[tokio::test]
        async fn test_payable_requires_supplier() {
            let (_, ports) = seeded().await;
            let service = LedgerService::new(ports);
            let mut draft = receivable(None, None);
            draft.kind = EntryKind::Payable;
            assert!(matches!(
                service.create(draft.clone()).await,
                Err(BillingError::Validation(_))
            ));

            draft.supplier_id = Some(SUPPLIER);
            let entry = service.create(draft).await.unwrap();
            assert_eq!(entry.origin, FundingOrigin::Supplier(SUPPLIER));

            let listed = service.list_by_supplier(SUPPLIER).await.unwrap();
            assert_eq!(listed.len(), 1);
        }

        #[tokio::test]
        async fn test_list_by_unknown_contract_is_not_found() {
            let (_, ports) = seeded().await;
            let err = LedgerService::new(ports)
                .list_by_contract(ContractId::new(77))
                .await
                .unwrap_err();
            assert!(matches!(err, BillingError::NotFound { .. }));
        }

        #[tokio::test]
        async fn test_update_is_partial() {
            let (_, ports) = seeded().await;
            let contract = ContractService::new(ports.clone())
                .create(contract_draft())
                .await
                .unwrap();
            let service = LedgerService::new(ports);
            let entry = service
                .create(receivable(Some(contract.id), None))
                .await
                .unwrap();

            let updated = service
                .update(
                    entry.id,
                    LedgerEntryPatch {
                        status: Some(EntryStatus::Paid),
                        paid_date: Some(NaiveDate::from_ymd_opt(2024, 6, 2)),
                        ..Default::default()
                    },
                )
                .await
                .unwrap();

            assert_eq!(updated.status, EntryStatus::Paid);
            assert_eq!(updated.amount, entry.amount);
            assert_eq!(updated.origin, entry.origin);
        }

        #[tokio::test]
        async fn test_invoiced_entry_is_protected() {
            let (store, ports) = seeded().await;
            let contract = ContractService::new(ports.clone())
                .create(contract_draft())
                .await
                .unwrap();
            let service = LedgerService::new(ports);
            let entry = service
                .create(receivable(Some(contract.id), None))
                .await
                .unwrap();
            store
                .insert_or_get_existing(NewInvoice {
                    ledger_entry_id: entry.id,
                    service_name: "Consulta".to_string(),
                    service_description: "Consulta inicial".to_string(),
                    boleto: IssuedBoleto::default(),
                })
                .await
                .unwrap();

            let amount_change = LedgerEntryPatch {
                amount: Some(dec!(999)),
                ..Default::default()
            };
            assert!(matches!(
                service.update(entry.id, amount_change).await,
                Err(BillingError::DomainRule(_))
            ));

            let notes_change = LedgerEntryPatch {
                notes: Some(Some("boleto enviado".to_string())),
                ..Default::default()
            };
            assert!(service.update(entry.id, notes_change).await.is_ok());

            let err = service.delete(entry.id).await.unwrap_err();
            assert_eq!(err.to_string(), "cannot delete ledger entry with an issued boleto");
        }

        #[tokio::test]
        async fn test_delete_unknown_entry() {
            let (_, ports) = seeded().await;
            let err = LedgerService::new(ports)
                .delete(LedgerEntryId::new(123))
                .await
                .unwrap_err();
            assert!(matches!(err, BillingError::NotFound { .. }));
        }

        #[tokio::test]
        async fn test_resolve_origin_labels() {
            let (_, ports) = seeded().await;
            let contract = ContractService::new(ports.clone())
                .create(contract_draft())
                .await
                .unwrap();
            let service = LedgerService::new(ports);
            let entry = service
                .create(receivable(Some(contract.id), None))
                .await
                .unwrap();

            let (_, origin) = service.resolve_origin(entry.id).await.unwrap();
            assert_eq!(origin.kind, crate::origin::OriginKind::Contract);
            assert_eq!(origin.label, contract.identifier);
            assert_eq!(origin.patient.map(|p| p.id), Some(PATIENT));
        }
    }

    mod contract_tests {
        use super::*;

        #[tokio::test]
        async fn test_delete_with_entries_fails() {
            let (_, ports) = seeded().await;
            let contracts = ContractService::new(ports.clone());
            let contract = contracts.create(contract_draft()).await.unwrap();
            LedgerService::new(ports)
                .create(receivable(Some(contract.id), None))
                .await
                .unwrap();

            let err = contracts.delete(contract.id).await.unwrap_err();
            assert!(matches!(err, BillingError::DomainRule(_)));
            assert_eq!(err.to_string(), "cannot delete contract with associated entries");
        }

        #[tokio::test]
        async fn test_delete_without_entries() {
            let (_, ports) = seeded().await;
            let contracts = ContractService::new(ports);
            let contract = contracts.create(contract_draft()).await.unwrap();
            contracts.delete(contract.id).await.unwrap();
            assert!(matches!(
                contracts.get(contract.id).await,
                Err(BillingError::NotFound { .. })
            ));
        }

        #[tokio::test]
        async fn test_create_for_unknown_patient() {
            let (_, ports) = seeded().await;
            let mut draft = contract_draft();
            draft.patient_id = PatientId::new(404);
            assert!(matches!(
                ContractService::new(ports).create(draft).await,
                Err(BillingError::NotFound { .. })
            ));
        }
    }

    mod package_tests {
        use super::*;

        #[tokio::test]
        async fn test_increment_to_quota_completes() {
            let (_, ports) = seeded().await;
            let service = TreatmentPackageService::new(ports);
            let package = service.create(package_draft(2)).await.unwrap();

            let first = service.increment_session(package.id).await.unwrap();
            assert_eq!(first.status, PackageStatus::Active);
            let second = service.increment_session(package.id).await.unwrap();
            assert_eq!(second.sessions_completed, 2);
            assert_eq!(second.status, PackageStatus::Completed);

            let err = service.increment_session(package.id).await.unwrap_err();
            assert!(matches!(err, BillingError::DomainRule(_)));
            assert_eq!(service.get(package.id).await.unwrap().sessions_completed, 2);
        }

        #[tokio::test]
        async fn test_increment_unknown_package() {
            let (_, ports) = seeded().await;
            let err = TreatmentPackageService::new(ports)
                .increment_session(TreatmentPackageId::new(404))
                .await
                .unwrap_err();
            assert!(matches!(err, BillingError::NotFound { .. }));
        }

        #[tokio::test]
        async fn test_pending_listing() {
            let (_, ports) = seeded().await;
            let service = TreatmentPackageService::new(ports);
            let open = service.create(package_draft(3)).await.unwrap();
            let full = service.create(package_draft(1)).await.unwrap();
            service.increment_session(full.id).await.unwrap();

            let pending = service.list_pending().await.unwrap();
            assert_eq!(pending.len(), 1);
            assert_eq!(pending[0].id, open.id);
        }

        #[tokio::test]
        async fn test_delete_guarded_by_sessions() {
            let (_, ports) = seeded().await;
            let packages = TreatmentPackageService::new(ports.clone());
            let package = packages.create(package_draft(3)).await.unwrap();
            SessionService::new(ports)
                .schedule(session_draft(package.id, PATIENT))
                .await
                .unwrap();

            assert!(matches!(
                packages.delete(package.id).await,
                Err(BillingError::DomainRule(_))
            ));
        }

        #[tokio::test]
        async fn test_list_by_unknown_patient() {
            let (_, ports) = seeded().await;
            assert!(matches!(
                TreatmentPackageService::new(ports)
                    .list_by_patient(PatientId::new(404))
                    .await,
                Err(BillingError::NotFound { .. })
            ));
        }
    }

    mod session_tests {
        use super::*;

        #[tokio::test]
        async fn test_schedule_numbers_sessions_and_consumes_quota() {
            let (_, ports) = seeded().await;
            let packages = TreatmentPackageService::new(ports.clone());
            let package = packages.create(package_draft(3)).await.unwrap();
            let sessions = SessionService::new(ports);

            let first = sessions.schedule(session_draft(package.id, PATIENT)).await.unwrap();
            let second = sessions.schedule(session_draft(package.id, PATIENT)).await.unwrap();

            assert_eq!(first.session_number, 1);
            assert_eq!(second.session_number, 2);
            assert_eq!(packages.get(package.id).await.unwrap().sessions_completed, 2);
        }

        #[tokio::test]
        async fn test_schedule_for_other_patient_fails() {
            let (_, ports) = seeded().await;
            let package = TreatmentPackageService::new(ports.clone())
                .create(package_draft(3))
                .await
                .unwrap();

            let err = SessionService::new(ports)
                .schedule(session_draft(package.id, OTHER_PATIENT))
                .await
                .unwrap_err();
            assert!(matches!(err, BillingError::Validation(_)));
        }

        #[tokio::test]
        async fn test_schedule_beyond_quota_fails() {
            let (_, ports) = seeded().await;
            let package = TreatmentPackageService::new(ports.clone())
                .create(package_draft(1))
                .await
                .unwrap();
            let sessions = SessionService::new(ports);
            sessions.schedule(session_draft(package.id, PATIENT)).await.unwrap();

            assert!(matches!(
                sessions.schedule(session_draft(package.id, PATIENT)).await,
                Err(BillingError::DomainRule(_))
            ));
        }

        #[tokio::test]
        async fn test_delete_releases_quota() {
            let (_, ports) = seeded().await;
            let packages = TreatmentPackageService::new(ports.clone());
            let package = packages.create(package_draft(3)).await.unwrap();
            let sessions = SessionService::new(ports);
            let appointment = sessions.schedule(session_draft(package.id, PATIENT)).await.unwrap();

            sessions.delete(appointment.id).await.unwrap();
            assert_eq!(packages.get(package.id).await.unwrap().sessions_completed, 0);
        }

        #[tokio::test]
        async fn test_mark_realized_completes_when_all_realized() {
            let (_, ports) = seeded().await;
            let packages = TreatmentPackageService::new(ports.clone());
            let package = packages.create(package_draft(2)).await.unwrap();
            let sessions = SessionService::new(ports);
            let a = sessions.schedule(session_draft(package.id, PATIENT)).await.unwrap();
            let b = sessions.schedule(session_draft(package.id, PATIENT)).await.unwrap();

            // scheduling the last session already completed the package
            let (_, after_first) = sessions.mark_realized(a.id).await.unwrap();
            assert_eq!(after_first.status, PackageStatus::Completed);

            let (realized, after_second) = sessions.mark_realized(b.id).await.unwrap();
            assert_eq!(realized.status, SessionStatus::Realized);
            assert_eq!(after_second.status, PackageStatus::Completed);
        }

        #[tokio::test]
        async fn test_mark_realized_leaves_cancelled_package() {
            let (_, ports) = seeded().await;
            let packages = TreatmentPackageService::new(ports.clone());
            let package = packages.create(package_draft(1)).await.unwrap();
            let sessions = SessionService::new(ports.clone());
            let a = sessions.schedule(session_draft(package.id, PATIENT)).await.unwrap();
            let mut cancelled = packages.get(package.id).await.unwrap();
            cancelled.status = PackageStatus::Cancelled;
            ports.packages.update_package(cancelled).await.unwrap();

            let (_, after) = sessions.mark_realized(a.id).await.unwrap();
            assert_eq!(after.status, PackageStatus::Cancelled);
        }
    }
}
