//! PostgreSQL Billing Adapter
//!
//! This module provides the internal (database) adapter for the billing
//! domain, implementing every storage port of `domain_billing` on top of the
//! repositories in [`crate::repositories`].
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::adapters::PostgresBillingAdapter;
//! use domain_billing::BillingPorts;
//! use std::sync::Arc;
//!
//! let adapter = Arc::new(PostgresBillingAdapter::new(pool));
//! let ports = BillingPorts::from_adapter(adapter);
//! ```

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tracing::{debug, instrument};

use core_kernel::{
    AdapterHealth, BudgetCategoryId, ContractId, DomainPort, HealthCheckResult, HealthCheckable,
    LedgerEntryId, PatientId, PortError, SessionAppointmentId, SupplierId, TreatmentPackageId,
    TreatmentTypeId,
};
use domain_billing::contract::NewContract;
use domain_billing::invoice::NewInvoice;
use domain_billing::ledger::NewLedgerEntry;
use domain_billing::session::NewSessionAppointment;
use domain_billing::treatment_package::NewTreatmentPackage;
use domain_billing::{
    BudgetCategory, Contract, ContractPort, FundingOrigin, Invoice, InvoicePort, LedgerEntry,
    LedgerEntryPort, LedgerFilter, Patient, ReferenceDataPort, SessionAppointment,
    SessionAppointmentPort, SessionStatus, Supplier, TreatmentPackage, TreatmentPackagePort,
    TreatmentType,
};

use crate::error::DatabaseError;
use crate::repositories::{
    BillingRepository, ContractRepository, ReferenceRepository, TreatmentRepository,
};

const ADAPTER_ID: &str = "postgres-billing-adapter";

/// PostgreSQL-backed implementation of the billing storage ports
///
/// # Error Handling
///
/// Database errors are translated to `PortError` variants:
/// - `DatabaseError::NotFound` -> `PortError::NotFound`
/// - Unique and foreign key violations -> `PortError::Conflict`
/// - Check constraint violations -> `PortError::Validation`
/// - Connection and pool errors -> `PortError::Connection`
/// - Other errors -> `PortError::Internal`
#[derive(Debug, Clone)]
pub struct PostgresBillingAdapter {
    billing: BillingRepository,
    contracts: ContractRepository,
    treatment: TreatmentRepository,
    reference: ReferenceRepository,
    pool: PgPool,
}

impl PostgresBillingAdapter {
    /// Creates a new PostgreSQL billing adapter
    ///
    /// # Arguments
    ///
    /// * `pool` - The PostgreSQL connection pool
    pub fn new(pool: PgPool) -> Self {
        Self {
            billing: BillingRepository::new(pool.clone()),
            contracts: ContractRepository::new(pool.clone()),
            treatment: TreatmentRepository::new(pool.clone()),
            reference: ReferenceRepository::new(pool.clone()),
            pool,
        }
    }
}

impl DomainPort for PostgresBillingAdapter {}

#[async_trait]
impl HealthCheckable for PostgresBillingAdapter {
    /// Runs `SELECT 1` against the pool
    async fn health_check(&self) -> HealthCheckResult {
        let start = std::time::Instant::now();

        let result = sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await;

        let latency_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(_) => HealthCheckResult {
                adapter_id: ADAPTER_ID.to_string(),
                status: AdapterHealth::Healthy,
                latency_ms,
                message: None,
                checked_at: Utc::now(),
            },
            Err(e) => HealthCheckResult {
                adapter_id: ADAPTER_ID.to_string(),
                status: AdapterHealth::Unhealthy,
                latency_ms,
                message: Some(format!("Database error: {}", e)),
                checked_at: Utc::now(),
            },
        }
    }
}

// ============================================================================
// Ledger entries
// ============================================================================

#[async_trait]
impl LedgerEntryPort for PostgresBillingAdapter {
    #[instrument(skip(self, entry), fields(kind = entry.kind.as_str()))]
    async fn create_entry(&self, entry: NewLedgerEntry) -> Result<LedgerEntry, PortError> {
        let row = self.billing.insert_entry(&entry).await.map_err(db_to_port_error)?;
        debug!(ledger_entry_id = row.id, "Ledger entry inserted");
        LedgerEntry::try_from(row).map_err(db_to_port_error)
    }

    async fn get_entry(&self, id: LedgerEntryId) -> Result<LedgerEntry, PortError> {
        let row = self.billing.get_entry(id.value()).await.map_err(db_to_port_error)?;
        LedgerEntry::try_from(row).map_err(db_to_port_error)
    }

    async fn list_entries(&self, filter: LedgerFilter) -> Result<Vec<LedgerEntry>, PortError> {
        self.billing
            .list_entries(&filter)
            .await
            .map_err(db_to_port_error)?
            .into_iter()
            .map(|row| LedgerEntry::try_from(row).map_err(db_to_port_error))
            .collect()
    }

    #[instrument(skip(self, entry), fields(ledger_entry_id = %entry.id))]
    async fn update_entry(&self, entry: LedgerEntry) -> Result<LedgerEntry, PortError> {
        let row = self.billing.update_entry(&entry).await.map_err(db_to_port_error)?;
        LedgerEntry::try_from(row).map_err(db_to_port_error)
    }

    async fn delete_entry(&self, id: LedgerEntryId) -> Result<(), PortError> {
        self.billing.delete_entry(id.value()).await.map_err(db_to_port_error)
    }

    async fn has_entries_for(&self, origin: FundingOrigin) -> Result<bool, PortError> {
        self.billing.has_entries_for(&origin).await.map_err(db_to_port_error)
    }
}

// ============================================================================
// Contracts
// ============================================================================

#[async_trait]
impl ContractPort for PostgresBillingAdapter {
    async fn create_contract(&self, contract: NewContract) -> Result<Contract, PortError> {
        let row = self.contracts.insert(&contract).await.map_err(db_to_port_error)?;
        Contract::try_from(row).map_err(db_to_port_error)
    }

    async fn get_contract(&self, id: ContractId) -> Result<Contract, PortError> {
        let row = self.contracts.get(id.value()).await.map_err(db_to_port_error)?;
        Contract::try_from(row).map_err(db_to_port_error)
    }

    async fn list_contracts(&self) -> Result<Vec<Contract>, PortError> {
        self.contracts
            .list()
            .await
            .map_err(db_to_port_error)?
            .into_iter()
            .map(|row| Contract::try_from(row).map_err(db_to_port_error))
            .collect()
    }

    async fn update_contract(&self, contract: Contract) -> Result<Contract, PortError> {
        let row = self.contracts.update(&contract).await.map_err(db_to_port_error)?;
        Contract::try_from(row).map_err(db_to_port_error)
    }

    async fn delete_contract(&self, id: ContractId) -> Result<(), PortError> {
        self.contracts.delete(id.value()).await.map_err(db_to_port_error)
    }
}

// ============================================================================
// Treatment packages
// ============================================================================

#[async_trait]
impl TreatmentPackagePort for PostgresBillingAdapter {
    async fn create_package(
        &self,
        package: NewTreatmentPackage,
    ) -> Result<TreatmentPackage, PortError> {
        let row = self.treatment.insert_package(&package).await.map_err(db_to_port_error)?;
        TreatmentPackage::try_from(row).map_err(db_to_port_error)
    }

    async fn get_package(&self, id: TreatmentPackageId) -> Result<TreatmentPackage, PortError> {
        let row = self.treatment.get_package(id.value()).await.map_err(db_to_port_error)?;
        TreatmentPackage::try_from(row).map_err(db_to_port_error)
    }

    async fn list_packages(&self) -> Result<Vec<TreatmentPackage>, PortError> {
        let rows = self.treatment.list_packages().await.map_err(db_to_port_error)?;
        rows_to_packages(rows)
    }

    async fn list_by_patient(
        &self,
        patient_id: PatientId,
    ) -> Result<Vec<TreatmentPackage>, PortError> {
        let rows = self
            .treatment
            .list_packages_by_patient(patient_id.value())
            .await
            .map_err(db_to_port_error)?;
        rows_to_packages(rows)
    }

    async fn list_pending(&self) -> Result<Vec<TreatmentPackage>, PortError> {
        let rows = self.treatment.list_pending_packages().await.map_err(db_to_port_error)?;
        rows_to_packages(rows)
    }

    async fn update_package(
        &self,
        package: TreatmentPackage,
    ) -> Result<TreatmentPackage, PortError> {
        let row = self.treatment.update_package(&package).await.map_err(db_to_port_error)?;
        TreatmentPackage::try_from(row).map_err(db_to_port_error)
    }

    async fn delete_package(&self, id: TreatmentPackageId) -> Result<(), PortError> {
        self.treatment.delete_package(id.value()).await.map_err(db_to_port_error)
    }

    #[instrument(skip(self), fields(package_id = %id))]
    async fn increment_session(
        &self,
        id: TreatmentPackageId,
    ) -> Result<Option<TreatmentPackage>, PortError> {
        match self.treatment.increment_session(id.value()).await.map_err(db_to_port_error)? {
            Some(row) => TreatmentPackage::try_from(row).map(Some).map_err(db_to_port_error),
            None => {
                debug!("Quota guard rejected the increment");
                Ok(None)
            }
        }
    }

    async fn decrement_session(
        &self,
        id: TreatmentPackageId,
    ) -> Result<TreatmentPackage, PortError> {
        let row = self.treatment.decrement_session(id.value()).await.map_err(db_to_port_error)?;
        TreatmentPackage::try_from(row).map_err(db_to_port_error)
    }
}

fn rows_to_packages(
    rows: Vec<crate::repositories::TreatmentPackageRow>,
) -> Result<Vec<TreatmentPackage>, PortError> {
    rows.into_iter()
        .map(|row| TreatmentPackage::try_from(row).map_err(db_to_port_error))
        .collect()
}

// ============================================================================
// Session appointments
// ============================================================================

#[async_trait]
impl SessionAppointmentPort for PostgresBillingAdapter {
    async fn create_appointment(
        &self,
        appointment: NewSessionAppointment,
    ) -> Result<SessionAppointment, PortError> {
        let row = self.treatment.insert_session(&appointment).await.map_err(db_to_port_error)?;
        SessionAppointment::try_from(row).map_err(db_to_port_error)
    }

    async fn get_appointment(
        &self,
        id: SessionAppointmentId,
    ) -> Result<SessionAppointment, PortError> {
        let row = self.treatment.get_session(id.value()).await.map_err(db_to_port_error)?;
        SessionAppointment::try_from(row).map_err(db_to_port_error)
    }

    async fn list_by_package(
        &self,
        package_id: TreatmentPackageId,
    ) -> Result<Vec<SessionAppointment>, PortError> {
        self.treatment
            .list_sessions_by_package(package_id.value())
            .await
            .map_err(db_to_port_error)?
            .into_iter()
            .map(|row| SessionAppointment::try_from(row).map_err(db_to_port_error))
            .collect()
    }

    async fn delete_appointment(&self, id: SessionAppointmentId) -> Result<(), PortError> {
        self.treatment.delete_session(id.value()).await.map_err(db_to_port_error)
    }

    async fn update_status(
        &self,
        id: SessionAppointmentId,
        status: SessionStatus,
    ) -> Result<SessionAppointment, PortError> {
        let row = self
            .treatment
            .update_session_status(id.value(), status)
            .await
            .map_err(db_to_port_error)?;
        SessionAppointment::try_from(row).map_err(db_to_port_error)
    }

    async fn count_realized(&self, package_id: TreatmentPackageId) -> Result<i64, PortError> {
        self.treatment.count_realized(package_id.value()).await.map_err(db_to_port_error)
    }
}

// ============================================================================
// Boletos
// ============================================================================

#[async_trait]
impl InvoicePort for PostgresBillingAdapter {
    async fn find_by_ledger_entry(
        &self,
        ledger_entry_id: LedgerEntryId,
    ) -> Result<Option<Invoice>, PortError> {
        let row = self
            .billing
            .find_boleto(ledger_entry_id.value())
            .await
            .map_err(db_to_port_error)?;
        Ok(row.map(Invoice::from))
    }

    #[instrument(skip(self, invoice), fields(ledger_entry_id = %invoice.ledger_entry_id))]
    async fn insert_or_get_existing(
        &self,
        invoice: NewInvoice,
    ) -> Result<(Invoice, bool), PortError> {
        let (row, created) = self
            .billing
            .insert_boleto_or_get_existing(&invoice)
            .await
            .map_err(db_to_port_error)?;
        if !created {
            debug!("Boleto already stored, returning existing row");
        }
        Ok((Invoice::from(row), created))
    }

    async fn list_invoices(&self) -> Result<Vec<Invoice>, PortError> {
        let rows = self.billing.list_boletos().await.map_err(db_to_port_error)?;
        Ok(rows.into_iter().map(Invoice::from).collect())
    }
}

// ============================================================================
// Reference data
// ============================================================================

#[async_trait]
impl ReferenceDataPort for PostgresBillingAdapter {
    async fn get_patient(&self, id: PatientId) -> Result<Patient, PortError> {
        self.reference
            .get_patient(id.value())
            .await
            .map(Patient::from)
            .map_err(db_to_port_error)
    }

    async fn get_supplier(&self, id: SupplierId) -> Result<Supplier, PortError> {
        self.reference
            .get_supplier(id.value())
            .await
            .map(Supplier::from)
            .map_err(db_to_port_error)
    }

    async fn get_budget_category(&self, id: BudgetCategoryId) -> Result<BudgetCategory, PortError> {
        self.reference
            .get_budget_category(id.value())
            .await
            .map(BudgetCategory::from)
            .map_err(db_to_port_error)
    }

    async fn get_treatment_type(&self, id: TreatmentTypeId) -> Result<TreatmentType, PortError> {
        self.reference
            .get_treatment_type(id.value())
            .await
            .map(TreatmentType::from)
            .map_err(db_to_port_error)
    }
}

/// Converts a DatabaseError to a PortError
fn db_to_port_error(e: DatabaseError) -> PortError {
    match e {
        DatabaseError::NotFound { entity, id } => PortError::NotFound {
            entity_type: entity.to_string(),
            id,
        },
        DatabaseError::DuplicateEntry(msg) | DatabaseError::ForeignKeyViolation(msg) => {
            PortError::conflict(msg)
        }
        DatabaseError::ConstraintViolation(msg) => PortError::validation(msg),
        DatabaseError::ConnectionFailed(msg) => PortError::connection(msg),
        DatabaseError::PoolExhausted => PortError::connection("connection pool exhausted"),
        other => PortError::internal(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_to_not_found() {
        let err = db_to_port_error(DatabaseError::not_found("Contract", 3));
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Not found: Contract with id 3");
    }

    #[test]
    fn test_foreign_key_violation_maps_to_conflict() {
        let err = db_to_port_error(DatabaseError::ForeignKeyViolation("boletos_fk".into()));
        assert!(matches!(err, PortError::Conflict { .. }));
    }

    #[test]
    fn test_check_violation_maps_to_validation() {
        let err = db_to_port_error(DatabaseError::ConstraintViolation(
            "ledger_entries_single_origin".into(),
        ));
        assert!(matches!(err, PortError::Validation { .. }));
    }

    #[test]
    fn test_pool_exhaustion_is_transient() {
        assert!(db_to_port_error(DatabaseError::PoolExhausted).is_transient());
    }
}
