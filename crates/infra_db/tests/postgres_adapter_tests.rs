//! PostgreSQL adapter tests
//!
//! These run against a throwaway Postgres container and need a Docker
//! daemon; run them with `cargo test -p infra_db -- --ignored`.

use std::sync::Arc;

use core_kernel::{
    AdapterHealth, ContractId, HealthCheckable, LedgerEntryId, PortError, TreatmentPackageId,
};
use domain_billing::invoice::NewInvoice;
use domain_billing::ports::mock::MockBoletoProvider;
use domain_billing::{
    BillingError, BillingPorts, ContractService, EntryKind, ErrorCategory, FundingOrigin,
    InvoiceIssuanceService, InvoicePort, IssueBoletoRequest, IssuedBoleto, LedgerEntryPort,
    LedgerFilter, LedgerService, PackageStatus, SessionService, TreatmentPackagePatch,
    TreatmentPackagePort, TreatmentPackageService,
};
use infra_db::PostgresBillingAdapter;
use rust_decimal_macros::dec;
use test_utils::{
    assert_error_category, assert_quota_consistent, create_isolated_test_database,
    ContractDraftBuilder, LedgerEntryDraftBuilder, SessionDraftBuilder, TestDatabase,
    TreatmentPackageDraftBuilder,
};

async fn setup() -> (TestDatabase, Arc<PostgresBillingAdapter>, BillingPorts) {
    let db = create_isolated_test_database()
        .await
        .expect("Failed to create test database");
    let adapter = Arc::new(PostgresBillingAdapter::new(db.pool().clone()));
    let ports = BillingPorts::from_adapter(adapter.clone());
    (db, adapter, ports)
}

// ============================================================================
// Ledger Entries
// ============================================================================

mod ledger_tests {
    use super::*;

    #[tokio::test]
    #[ignore = "requires docker"]
    async fn test_create_and_filter_entries() {
        let (_db, _adapter, ports) = setup().await;
        let packages = TreatmentPackageService::new(ports.clone());
        let ledger = LedgerService::new(ports.clone());

        let package = packages
            .create(TreatmentPackageDraftBuilder::new().build())
            .await
            .unwrap();
        let receivable = ledger
            .create(LedgerEntryDraftBuilder::receivable().for_package(package.id).build())
            .await
            .unwrap();
        ledger
            .create(LedgerEntryDraftBuilder::payable().with_amount(dec!(80.00)).build())
            .await
            .unwrap();

        let fetched = ledger.get(receivable.id).await.unwrap();
        assert_eq!(fetched.origin, FundingOrigin::TreatmentPackage(package.id));
        assert_eq!(fetched.amount.amount(), dec!(200.00));

        let payables = ledger
            .list(LedgerFilter {
                kind: Some(EntryKind::Payable),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(payables.len(), 1);
        assert_eq!(payables[0].kind, EntryKind::Payable);
    }

    #[tokio::test]
    #[ignore = "requires docker"]
    async fn test_unknown_origin_is_not_found() {
        let (_db, _adapter, ports) = setup().await;
        let ledger = LedgerService::new(ports);

        let err = ledger
            .create(
                LedgerEntryDraftBuilder::receivable()
                    .for_contract(ContractId::new(999))
                    .build(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::NotFound { .. }));
    }

    #[tokio::test]
    #[ignore = "requires docker"]
    async fn test_schema_rejects_two_origins() {
        let (db, _adapter, _ports) = setup().await;

        let result = sqlx::query(
            "INSERT INTO ledger_entries (kind, origin_kind, contract_id, supplier_id, \
             budget_category_id, due_date, amount) \
             VALUES ('receivable', 'contract', NULL, 1, 1, '2024-06-01', 10)",
        )
        .execute(db.pool())
        .await;

        let err = infra_db::DatabaseError::from(result.unwrap_err());
        assert!(matches!(err, infra_db::DatabaseError::ConstraintViolation(_)));
    }

    #[tokio::test]
    #[ignore = "requires docker"]
    async fn test_delete_missing_entry_is_not_found() {
        let (_db, adapter, _ports) = setup().await;
        let err = adapter.delete_entry(LedgerEntryId::new(404)).await.unwrap_err();
        assert!(err.is_not_found());
    }
}

// ============================================================================
// Treatment Packages and Sessions
// ============================================================================

mod package_tests {
    use super::*;

    #[tokio::test]
    #[ignore = "requires docker"]
    async fn test_increment_guard_stops_at_quota() {
        let (_db, adapter, ports) = setup().await;
        let packages = TreatmentPackageService::new(ports);
        let package = packages
            .create(TreatmentPackageDraftBuilder::new().with_quota(2, 1).build())
            .await
            .unwrap();

        let completed = adapter.increment_session(package.id).await.unwrap().unwrap();
        assert_eq!(completed.sessions_completed, 2);
        assert_eq!(completed.status, PackageStatus::Completed);

        assert!(adapter.increment_session(package.id).await.unwrap().is_none());

        let err = adapter
            .increment_session(TreatmentPackageId::new(404))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    #[ignore = "requires docker"]
    async fn test_concurrent_increments_never_exceed_quota() {
        let (_db, adapter, ports) = setup().await;
        let packages = TreatmentPackageService::new(ports);
        let package = packages
            .create(TreatmentPackageDraftBuilder::new().with_quota(3, 0).build())
            .await
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..10 {
            let adapter = adapter.clone();
            handles.push(tokio::spawn(async move {
                adapter.increment_session(package.id).await
            }));
        }

        let mut granted = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap().is_some() {
                granted += 1;
            }
        }

        assert_eq!(granted, 3);
        let stored = adapter.get_package(package.id).await.unwrap();
        assert_eq!(stored.sessions_completed, 3);
        assert_eq!(stored.status, PackageStatus::Completed);
        assert_quota_consistent(&stored);
    }

    #[tokio::test]
    #[ignore = "requires docker"]
    async fn test_update_filling_quota_stores_completed_package() {
        let (_db, adapter, ports) = setup().await;
        let packages = TreatmentPackageService::new(ports);
        let package = packages
            .create(TreatmentPackageDraftBuilder::new().with_quota(4, 3).build())
            .await
            .unwrap();

        packages
            .update(
                package.id,
                TreatmentPackagePatch {
                    sessions_completed: Some(4),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let stored = adapter.get_package(package.id).await.unwrap();
        assert_eq!(stored.status, PackageStatus::Completed);
        assert_quota_consistent(&stored);

        let reopen = TreatmentPackagePatch {
            status: Some(PackageStatus::Active),
            ..Default::default()
        };
        let err = packages.update(package.id, reopen).await.unwrap_err();
        assert_error_category(&err, ErrorCategory::DomainRule);
    }

    #[tokio::test]
    #[ignore = "requires docker"]
    async fn test_schedule_delete_round_trip_restores_quota() {
        let (_db, _adapter, ports) = setup().await;
        let packages = TreatmentPackageService::new(ports.clone());
        let sessions = SessionService::new(ports);
        let package = packages
            .create(TreatmentPackageDraftBuilder::new().build())
            .await
            .unwrap();

        let session = sessions
            .schedule(SessionDraftBuilder::for_package(package.id).build())
            .await
            .unwrap();
        assert_eq!(session.session_number, 1);
        assert_eq!(packages.get(package.id).await.unwrap().sessions_completed, 1);

        sessions.delete(session.id).await.unwrap();
        assert_eq!(packages.get(package.id).await.unwrap().sessions_completed, 0);
    }

    #[tokio::test]
    #[ignore = "requires docker"]
    async fn test_package_with_entries_cannot_be_deleted() {
        let (_db, _adapter, ports) = setup().await;
        let packages = TreatmentPackageService::new(ports.clone());
        let ledger = LedgerService::new(ports);
        let package = packages
            .create(TreatmentPackageDraftBuilder::new().build())
            .await
            .unwrap();
        ledger
            .create(LedgerEntryDraftBuilder::receivable().for_package(package.id).build())
            .await
            .unwrap();

        let err = packages.delete(package.id).await.unwrap_err();
        assert!(matches!(err, BillingError::DomainRule(_)));
    }
}

// ============================================================================
// Contracts
// ============================================================================

mod contract_tests {
    use super::*;

    #[tokio::test]
    #[ignore = "requires docker"]
    async fn test_contract_with_entries_cannot_be_deleted() {
        let (_db, _adapter, ports) = setup().await;
        let contracts = ContractService::new(ports.clone());
        let ledger = LedgerService::new(ports);

        let contract = contracts
            .create(ContractDraftBuilder::new().with_amounts(dec!(300), dec!(700)).build())
            .await
            .unwrap();
        ledger
            .create(LedgerEntryDraftBuilder::receivable().for_contract(contract.id).build())
            .await
            .unwrap();

        let err = contracts.delete(contract.id).await.unwrap_err();
        assert_eq!(err.to_string(), "cannot delete contract with associated entries");
    }
}

// ============================================================================
// Boletos
// ============================================================================

mod boleto_tests {
    use super::*;

    fn issued() -> IssuedBoleto {
        IssuedBoleto {
            external_invoice_id: Some("inv_123".to_string()),
            barcode: Some("23793381286000000000300000000401".to_string()),
            digitable_line: Some("23793.38128 60000.000003 00000.000400".to_string()),
            pdf_link: Some("https://example.com/boleto.pdf".to_string()),
        }
    }

    #[tokio::test]
    #[ignore = "requires docker"]
    async fn test_second_insert_returns_existing_boleto() {
        let (_db, adapter, ports) = setup().await;
        let ledger = LedgerService::new(ports);
        let contract_entry = ledger
            .create(LedgerEntryDraftBuilder::payable().build())
            .await
            .unwrap();

        let invoice = NewInvoice {
            ledger_entry_id: contract_entry.id,
            service_name: "Consulta".to_string(),
            service_description: "Avaliação".to_string(),
            boleto: issued(),
        };

        let (first, created) = adapter.insert_or_get_existing(invoice.clone()).await.unwrap();
        assert!(created);

        let (second, created_again) = adapter.insert_or_get_existing(invoice).await.unwrap();
        assert!(!created_again);
        assert_eq!(first.id, second.id);

        let err = adapter.delete_entry(contract_entry.id).await.unwrap_err();
        assert!(matches!(err, PortError::Conflict { .. }));
    }

    #[tokio::test]
    #[ignore = "requires docker"]
    async fn test_issuance_is_idempotent_against_postgres() {
        let (_db, adapter, ports) = setup().await;
        let packages = TreatmentPackageService::new(ports.clone());
        let ledger = LedgerService::new(ports.clone());
        let package = packages
            .create(TreatmentPackageDraftBuilder::new().build())
            .await
            .unwrap();
        let entry = ledger
            .create(
                LedgerEntryDraftBuilder::receivable()
                    .for_package(package.id)
                    .with_amount(dec!(1500.50))
                    .build(),
            )
            .await
            .unwrap();

        let provider = Arc::new(MockBoletoProvider::new());
        let service = InvoiceIssuanceService::new(ports, provider.clone());
        let request = IssueBoletoRequest::new(entry.id, "Microagulhamento", "Sessão 1");

        let first = service.issue(request.clone()).await.unwrap();
        let second = service.issue(request).await.unwrap();

        assert!(first.is_new());
        assert!(!second.is_new());
        assert_eq!(first.invoice().id, second.invoice().id);
        assert_eq!(provider.call_count(), 1);
        assert_eq!(adapter.list_invoices().await.unwrap().len(), 1);
    }
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
#[ignore = "requires docker"]
async fn test_health_check_reports_healthy() {
    let (_db, adapter, _ports) = setup().await;
    let result = adapter.health_check().await;
    assert_eq!(result.status, AdapterHealth::Healthy);
    assert_eq!(result.adapter_id, "postgres-billing-adapter");
}
