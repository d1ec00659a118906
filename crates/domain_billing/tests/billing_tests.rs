//! Tests for the domain_billing public API

use chrono::{NaiveDate, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use core_kernel::{
    BudgetCategoryId, ContractId, LedgerEntryId, Money, PatientId, SupplierId,
    TreatmentPackageId, TreatmentTypeId,
};

use domain_billing::invoice::{BoletoRequest, IssueBoletoRequest, DEFAULT_STATE};
use domain_billing::treatment_package::NewTreatmentPackage;
use domain_billing::party::digits_only;
use domain_billing::{
    BillingError, EntryKind, EntryStatus, ErrorCategory, FundingOrigin, LedgerEntry,
    LedgerEntryDraft, LedgerEntryPatch, PackageStatus, Patient, TreatmentPackage,
    TreatmentPackagePatch,
};
use test_utils::{
    amount_minor_strategy, assert_error_category, assert_funded_by, assert_money_eq,
    assert_quota_consistent, cpf_strategy, entry_kind_strategy, kind_with_origin_strategy,
    open_quota_strategy, package_status_strategy, positive_amount_strategy,
};

fn draft(
    kind: EntryKind,
    contract_id: Option<i64>,
    package_id: Option<i64>,
    supplier_id: Option<i64>,
) -> LedgerEntryDraft {
    LedgerEntryDraft {
        kind,
        contract_id: contract_id.map(ContractId::new),
        treatment_package_id: package_id.map(TreatmentPackageId::new),
        supplier_id: supplier_id.map(SupplierId::new),
        budget_category_id: BudgetCategoryId::new(1),
        due_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        paid_date: None,
        amount: dec!(200.00),
        status: EntryStatus::Pending,
        invoice_number: None,
        notes: None,
        payment_method: None,
    }
}

fn draft_for(kind: EntryKind, origin: FundingOrigin) -> LedgerEntryDraft {
    draft(
        kind,
        origin.contract_id().map(|id| id.value()),
        origin.treatment_package_id().map(|id| id.value()),
        origin.supplier_id().map(|id| id.value()),
    )
}

fn entry(draft: LedgerEntryDraft) -> LedgerEntry {
    draft
        .validate()
        .unwrap()
        .into_entry(LedgerEntryId::new(42), Utc::now())
}

fn package(contracted: i32, completed: i32) -> TreatmentPackage {
    NewTreatmentPackage {
        patient_id: PatientId::new(1),
        treatment_type_id: TreatmentTypeId::new(1),
        description: "Drenagem linfática".to_string(),
        start_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
        sessions_contracted: contracted,
        sessions_completed: completed,
        total_amount: Money::new(dec!(900)),
        status: PackageStatus::Active,
        notes: None,
    }
    .into_package(TreatmentPackageId::new(7), Utc::now())
}

// ============================================================================
// Ledger Entry Tests
// ============================================================================

mod ledger_tests {
    use super::*;

    #[test]
    fn test_receivable_for_package_is_pending() {
        let entry = entry(draft(EntryKind::Receivable, None, Some(7), None));
        assert_eq!(entry.status, EntryStatus::Pending);
        assert_funded_by(&entry, FundingOrigin::TreatmentPackage(TreatmentPackageId::new(7)));
        assert_money_eq(&entry.amount, dec!(200.00));
    }

    #[test]
    fn test_receivable_with_both_origins_is_rejected() {
        let err = draft(EntryKind::Receivable, Some(3), Some(7), None)
            .validate()
            .unwrap_err();
        assert_error_category(&err, ErrorCategory::Validation);
        assert!(err.to_string().contains("cannot link both"));
    }

    #[test]
    fn test_receivable_without_origin_is_rejected() {
        assert!(draft(EntryKind::Receivable, None, None, None).validate().is_err());
    }

    #[test]
    fn test_payable_with_contract_is_rejected() {
        assert!(draft(EntryKind::Payable, Some(3), None, Some(1)).validate().is_err());
    }

    #[test]
    fn test_paid_requires_paid_date() {
        let mut paid = draft(EntryKind::Payable, None, None, Some(1));
        paid.status = EntryStatus::Paid;
        assert!(paid.clone().validate().is_err());

        paid.paid_date = NaiveDate::from_ymd_opt(2024, 6, 2);
        assert!(paid.validate().is_ok());
    }

    #[test]
    fn test_negative_amount_is_rejected() {
        let mut negative = draft(EntryKind::Receivable, Some(3), None, None);
        negative.amount = dec!(-0.01);
        assert!(matches!(negative.validate(), Err(BillingError::Validation(_))));
    }

    #[test]
    fn test_patch_switching_origin_clears_the_other_key() {
        let contract_entry = entry(draft(EntryKind::Receivable, Some(3), None, None));
        let patch = LedgerEntryPatch {
            contract_id: Some(None),
            treatment_package_id: Some(Some(TreatmentPackageId::new(7))),
            ..Default::default()
        };

        let updated = patch.apply(&contract_entry).unwrap();
        assert_funded_by(&updated, FundingOrigin::TreatmentPackage(TreatmentPackageId::new(7)));
    }

    #[test]
    fn test_patch_adding_second_origin_is_rejected() {
        let contract_entry = entry(draft(EntryKind::Receivable, Some(3), None, None));
        let patch = LedgerEntryPatch {
            treatment_package_id: Some(Some(TreatmentPackageId::new(7))),
            ..Default::default()
        };
        assert!(patch.apply(&contract_entry).is_err());
    }

    #[test]
    fn test_patch_from_json_distinguishes_null_and_absent() {
        let patch: LedgerEntryPatch =
            serde_json::from_str(r#"{"notes": null, "status": "pago", "paid_date": "2024-06-02"}"#)
                .unwrap();
        assert_eq!(patch.notes, Some(None));
        assert_eq!(patch.invoice_number, None);
        assert_eq!(patch.status, Some(EntryStatus::Paid));
        assert!(!patch.touches_origin());
    }

    #[test]
    fn test_draft_accepts_legacy_kind_names() {
        let json = r#"{
            "kind": "a_receber",
            "treatment_package_id": 7,
            "budget_category_id": 1,
            "due_date": "2024-06-01",
            "amount": "200.00"
        }"#;
        let draft: LedgerEntryDraft = serde_json::from_str(json).unwrap();
        assert_eq!(draft.kind, EntryKind::Receivable);
        assert_eq!(draft.status, EntryStatus::Pending);
    }

    #[test]
    fn test_funding_origin_json_shape() {
        let origin = FundingOrigin::Contract(ContractId::new(3));
        let json = serde_json::to_value(origin).unwrap();
        assert_eq!(json, serde_json::json!({"type": "contract", "id": 3}));
    }
}

// ============================================================================
// Treatment Package Tests
// ============================================================================

mod package_tests {
    use super::*;

    #[test]
    fn test_last_session_completes_package() {
        let mut p = package(5, 4);
        p.increment_session().unwrap();
        assert_eq!(p.sessions_completed, 5);
        assert_eq!(p.status, PackageStatus::Completed);
    }

    #[test]
    fn test_increment_on_full_package_leaves_state() {
        let mut p = package(5, 5);
        let before = p.clone();
        assert!(matches!(p.increment_session(), Err(BillingError::DomainRule(_))));
        assert_eq!(p, before);
    }

    #[test]
    fn test_progress_figures() {
        let p = package(4, 1);
        assert_eq!(p.sessions_remaining(), 3);
        assert!((p.percent_complete() - 25.0).abs() < f64::EPSILON);
        assert!(p.has_pending_sessions());
    }

    #[test]
    fn test_patch_cannot_shrink_below_completed() {
        let p = package(5, 3);
        let patch = TreatmentPackagePatch {
            sessions_contracted: Some(2),
            ..Default::default()
        };
        assert!(matches!(patch.apply(&p), Err(BillingError::Validation(_))));
    }

    #[test]
    fn test_decrement_floors_at_zero() {
        let mut p = package(3, 0);
        p.decrement_session();
        assert_eq!(p.sessions_completed, 0);
    }

    #[test]
    fn test_patch_using_last_session_completes_package() {
        let p = package(4, 3);
        let patch = TreatmentPackagePatch {
            sessions_completed: Some(4),
            ..Default::default()
        };

        let updated = patch.apply(&p).unwrap();
        assert_eq!(updated.status, PackageStatus::Completed);
        assert_quota_consistent(&updated);
    }

    #[test]
    fn test_patch_cannot_reopen_completed_package() {
        let mut p = package(4, 4);
        p.status = PackageStatus::Completed;
        let patch = TreatmentPackagePatch {
            status: Some(PackageStatus::Active),
            ..Default::default()
        };

        let err = patch.apply(&p).unwrap_err();
        assert_error_category(&err, ErrorCategory::DomainRule);
    }
}

// ============================================================================
// Boleto Request Tests
// ============================================================================

mod boleto_tests {
    use super::*;

    #[test]
    fn test_amount_is_sent_in_centavos() {
        let mut d = draft(EntryKind::Receivable, None, Some(7), None);
        d.amount = dec!(1500.50);
        let patient = Patient::new(PatientId::new(1), "Ana Souza", "123.456.789-09");
        let request = IssueBoletoRequest::new(LedgerEntryId::new(42), "Peeling", "Sessão 1");

        let boleto = BoletoRequest::compose(&entry(d), &patient, &request, DEFAULT_STATE).unwrap();
        assert_eq!(boleto.service.amount_minor, 150050);
        assert_eq!(boleto.code, "LANC-42");
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

pub fn optional_id_strategy() -> impl Strategy<Value = Option<i64>> {
    prop::option::of(1i64..1000)
}

proptest! {
    #[test]
    fn prop_validated_entry_has_exactly_one_origin(
        kind in entry_kind_strategy(),
        contract in optional_id_strategy(),
        package in optional_id_strategy(),
        supplier in optional_id_strategy(),
    ) {
        let set = [contract, package, supplier].iter().filter(|id| id.is_some()).count();
        match draft(kind, contract, package, supplier).validate() {
            Ok(new_entry) => {
                prop_assert_eq!(set, 1);
                prop_assert!(new_entry.origin.allows(kind));
                if kind == EntryKind::Receivable {
                    prop_assert!(new_entry.origin.supplier_id().is_none());
                }
            }
            Err(e) => prop_assert!(matches!(e, BillingError::Validation(_))),
        }
    }

    #[test]
    fn prop_allowed_origin_is_kept(
        (kind, origin) in kind_with_origin_strategy(),
        amount in positive_amount_strategy(),
    ) {
        let mut d = draft_for(kind, origin);
        d.amount = amount;
        let entry = entry(d);
        assert_funded_by(&entry, origin);
        assert_money_eq(&entry.amount, amount);
    }

    #[test]
    fn prop_quota_stays_in_bounds(
        (contracted, completed) in open_quota_strategy(),
        ops in prop::collection::vec(any::<bool>(), 0..100),
    ) {
        let mut p = package(contracted, completed);
        for increment in ops {
            if increment {
                let _ = p.increment_session();
            } else {
                p.decrement_session();
            }
            assert_quota_consistent(&p);
        }
    }

    #[test]
    fn prop_patch_never_leaves_terminal_status(
        (contracted, completed) in open_quota_strategy(),
        current in package_status_strategy(),
        target in package_status_strategy(),
        patched_completed in 0i32..50,
    ) {
        let mut p = package(contracted, completed);
        p.status = current;
        let patch = TreatmentPackagePatch {
            sessions_completed: Some(patched_completed),
            status: Some(target),
            ..Default::default()
        };

        match patch.apply(&p) {
            Ok(updated) => {
                assert_quota_consistent(&updated);
                if current != PackageStatus::Active {
                    prop_assert_eq!(updated.status, current);
                }
            }
            Err(e) => {
                if current != PackageStatus::Active && target != current {
                    prop_assert!(matches!(e, BillingError::DomainRule(_)));
                } else {
                    prop_assert!(matches!(e, BillingError::Validation(_)));
                }
            }
        }
    }

    #[test]
    fn prop_amount_round_trips_through_centavos(centavos in amount_minor_strategy()) {
        let amount = Decimal::new(centavos, 2);
        let mut d = draft(EntryKind::Receivable, Some(3), None, None);
        d.amount = amount;
        let patient = Patient::new(PatientId::new(1), "Ana", "12345678909");
        let request = IssueBoletoRequest::new(LedgerEntryId::new(42), "Consulta", "Retorno");

        let boleto = BoletoRequest::compose(&entry(d), &patient, &request, DEFAULT_STATE).unwrap();
        prop_assert_eq!(boleto.service.amount_minor, centavos);
    }

    #[test]
    fn prop_customer_document_is_digits_only(cpf in cpf_strategy()) {
        let patient = Patient::new(PatientId::new(1), "Ana", cpf.as_str());
        let request = IssueBoletoRequest::new(LedgerEntryId::new(42), "Consulta", "Retorno");
        let receivable = entry(draft(EntryKind::Receivable, Some(3), None, None));

        let boleto = BoletoRequest::compose(&receivable, &patient, &request, DEFAULT_STATE).unwrap();
        prop_assert_eq!(boleto.customer.document, digits_only(&cpf));
    }
}
