//! Test Data Builders
//!
//! Provides builder patterns for constructing request drafts with sensible
//! defaults. Tests specify only the relevant fields and inherit the
//! fixture values for everything else.

use chrono::{NaiveDate, NaiveTime};
use core_kernel::{
    BudgetCategoryId, ContractId, PatientId, SessionAppointmentId, SupplierId,
    TreatmentPackageId, TreatmentTypeId,
};
use domain_billing::{
    ContractDraft, ContractStatus, EntryKind, EntryStatus, LedgerEntryDraft, PackageStatus,
    SessionDraft, TreatmentPackageDraft,
};
use rust_decimal::Decimal;

use crate::fixtures::{DateFixtures, IdFixtures, MoneyFixtures};

/// Builder for ledger entry drafts
///
/// Defaults to a pending receivable of one session price funded by
/// treatment package 1.
#[derive(Debug, Clone)]
pub struct LedgerEntryDraftBuilder {
    draft: LedgerEntryDraft,
}

impl Default for LedgerEntryDraftBuilder {
    fn default() -> Self {
        Self::receivable()
    }
}

impl LedgerEntryDraftBuilder {
    /// A receivable funded by treatment package 1
    pub fn receivable() -> Self {
        Self {
            draft: LedgerEntryDraft {
                kind: EntryKind::Receivable,
                contract_id: None,
                treatment_package_id: Some(TreatmentPackageId::new(1)),
                supplier_id: None,
                budget_category_id: IdFixtures::budget_category_id(),
                due_date: DateFixtures::due_date(),
                paid_date: None,
                amount: MoneyFixtures::session_price(),
                status: EntryStatus::Pending,
                invoice_number: None,
                notes: None,
                payment_method: None,
            },
        }
    }

    /// A payable owed to the fixture supplier
    pub fn payable() -> Self {
        let mut builder = Self::receivable();
        builder.draft.kind = EntryKind::Payable;
        builder.draft.treatment_package_id = None;
        builder.draft.supplier_id = Some(IdFixtures::supplier_id());
        builder
    }

    /// Funds the entry from a contract, clearing the other origins
    pub fn for_contract(mut self, id: ContractId) -> Self {
        self.draft.contract_id = Some(id);
        self.draft.treatment_package_id = None;
        self.draft.supplier_id = None;
        self
    }

    /// Funds the entry from a treatment package, clearing the other origins
    pub fn for_package(mut self, id: TreatmentPackageId) -> Self {
        self.draft.contract_id = None;
        self.draft.treatment_package_id = Some(id);
        self.draft.supplier_id = None;
        self
    }

    /// Owes the entry to a supplier, clearing the other origins
    pub fn for_supplier(mut self, id: SupplierId) -> Self {
        self.draft.contract_id = None;
        self.draft.treatment_package_id = None;
        self.draft.supplier_id = Some(id);
        self
    }

    /// Sets the contract reference without touching the other origins
    pub fn with_contract_id(mut self, id: Option<ContractId>) -> Self {
        self.draft.contract_id = id;
        self
    }

    /// Sets the package reference without touching the other origins
    pub fn with_treatment_package_id(mut self, id: Option<TreatmentPackageId>) -> Self {
        self.draft.treatment_package_id = id;
        self
    }

    pub fn with_budget_category(mut self, id: BudgetCategoryId) -> Self {
        self.draft.budget_category_id = id;
        self
    }

    pub fn with_amount(mut self, amount: Decimal) -> Self {
        self.draft.amount = amount;
        self
    }

    pub fn with_due_date(mut self, date: NaiveDate) -> Self {
        self.draft.due_date = date;
        self
    }

    /// Marks the entry paid on `date`
    pub fn paid_on(mut self, date: NaiveDate) -> Self {
        self.draft.status = EntryStatus::Paid;
        self.draft.paid_date = Some(date);
        self
    }

    pub fn with_status(mut self, status: EntryStatus) -> Self {
        self.draft.status = status;
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.draft.notes = Some(notes.into());
        self
    }

    pub fn build(self) -> LedgerEntryDraft {
        self.draft
    }
}

/// Builder for treatment package drafts
#[derive(Debug, Clone)]
pub struct TreatmentPackageDraftBuilder {
    draft: TreatmentPackageDraft,
}

impl Default for TreatmentPackageDraftBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TreatmentPackageDraftBuilder {
    /// A fresh five-session package for the fixture patient
    pub fn new() -> Self {
        Self {
            draft: TreatmentPackageDraft {
                patient_id: IdFixtures::patient_id(),
                treatment_type_id: IdFixtures::treatment_type_id(),
                description: "Microagulhamento facial - 5 sessões".to_string(),
                start_date: DateFixtures::package_start(),
                sessions_contracted: 5,
                sessions_completed: 0,
                total_amount: MoneyFixtures::package_total().amount(),
                status: PackageStatus::Active,
                notes: None,
            },
        }
    }

    pub fn with_patient(mut self, id: PatientId) -> Self {
        self.draft.patient_id = id;
        self
    }

    pub fn with_treatment_type(mut self, id: TreatmentTypeId) -> Self {
        self.draft.treatment_type_id = id;
        self
    }

    /// Sets the contracted and already completed session counts
    pub fn with_quota(mut self, contracted: i32, completed: i32) -> Self {
        self.draft.sessions_contracted = contracted;
        self.draft.sessions_completed = completed;
        self
    }

    pub fn with_total_amount(mut self, total: Decimal) -> Self {
        self.draft.total_amount = total;
        self
    }

    pub fn with_status(mut self, status: PackageStatus) -> Self {
        self.draft.status = status;
        self
    }

    pub fn build(self) -> TreatmentPackageDraft {
        self.draft
    }
}

/// Builder for session appointment drafts
#[derive(Debug, Clone)]
pub struct SessionDraftBuilder {
    draft: SessionDraft,
}

impl SessionDraftBuilder {
    /// A one-hour session for the fixture patient under `package_id`
    pub fn for_package(package_id: TreatmentPackageId) -> Self {
        Self {
            draft: SessionDraft {
                patient_id: IdFixtures::patient_id(),
                treatment_package_id: package_id,
                scheduled_date: DateFixtures::session_date(),
                start_time: DateFixtures::session_start(),
                end_time: Some(DateFixtures::session_end()),
                notes: None,
            },
        }
    }

    pub fn with_patient(mut self, id: PatientId) -> Self {
        self.draft.patient_id = id;
        self
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.draft.scheduled_date = date;
        self
    }

    pub fn with_times(mut self, start: NaiveTime, end: Option<NaiveTime>) -> Self {
        self.draft.start_time = start;
        self.draft.end_time = end;
        self
    }

    pub fn build(self) -> SessionDraft {
        self.draft
    }
}

/// Builder for contract drafts
#[derive(Debug, Clone)]
pub struct ContractDraftBuilder {
    draft: ContractDraft,
}

impl Default for ContractDraftBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ContractDraftBuilder {
    pub fn new() -> Self {
        Self {
            draft: ContractDraft {
                patient_id: IdFixtures::patient_id(),
                session_appointment_id: None,
                status: ContractStatus::Active,
                deposit_amount: None,
                remaining_amount: None,
            },
        }
    }

    pub fn with_patient(mut self, id: PatientId) -> Self {
        self.draft.patient_id = id;
        self
    }

    pub fn with_session(mut self, id: SessionAppointmentId) -> Self {
        self.draft.session_appointment_id = Some(id);
        self
    }

    /// Sets the deposit and the amount still owed
    pub fn with_amounts(mut self, deposit: Decimal, remaining: Decimal) -> Self {
        self.draft.deposit_amount = Some(deposit);
        self.draft.remaining_amount = Some(remaining);
        self
    }

    pub fn with_status(mut self, status: ContractStatus) -> Self {
        self.draft.status = status;
        self
    }

    pub fn build(self) -> ContractDraft {
        self.draft
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_receivable_validates() {
        let entry = LedgerEntryDraftBuilder::receivable().build().validate().unwrap();
        assert_eq!(entry.kind, EntryKind::Receivable);
    }

    #[test]
    fn test_payable_validates() {
        assert!(LedgerEntryDraftBuilder::payable().build().validate().is_ok());
    }

    #[test]
    fn test_switching_origin_clears_previous_one() {
        let draft = LedgerEntryDraftBuilder::receivable()
            .for_contract(ContractId::new(3))
            .build();
        assert!(draft.treatment_package_id.is_none());
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn test_package_builder_validates() {
        let package = TreatmentPackageDraftBuilder::new().with_quota(10, 2).build();
        assert!(package.validate().is_ok());
    }
}
