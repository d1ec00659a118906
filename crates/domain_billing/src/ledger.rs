//! Ledger entries (receivables and payables)
//!
//! A ledger entry is one financial obligation of the clinic: money owed to it
//! by a patient (receivable) or money it owes a supplier (payable). Every
//! entry is justified by exactly one [`FundingOrigin`]:
//!
//! | kind       | allowed origin                    |
//! |------------|-----------------------------------|
//! | Receivable | Contract or TreatmentPackage      |
//! | Payable    | Supplier                          |
//!
//! Requests still arrive as three nullable foreign keys, so
//! [`FundingOrigin::from_parts`] is the single place where the nullable shape
//! is folded into the sum type.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{
    BudgetCategoryId, ContractId, LedgerEntryId, Money, SupplierId, TreatmentPackageId,
};

use crate::error::BillingError;
use crate::serde_ext::deserialize_some;

/// Direction of a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// Money owed to the clinic
    #[serde(alias = "a_receber")]
    Receivable,
    /// Money owed by the clinic
    #[serde(alias = "a_pagar")]
    Payable,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Receivable => "receivable",
            EntryKind::Payable => "payable",
        }
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryKind {
    type Err = BillingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "receivable" | "a_receber" => Ok(EntryKind::Receivable),
            "payable" | "a_pagar" => Ok(EntryKind::Payable),
            other => Err(BillingError::validation(format!("unknown entry kind '{}'", other))),
        }
    }
}

/// Settlement status of a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    #[default]
    #[serde(alias = "pendente")]
    Pending,
    #[serde(alias = "pago")]
    Paid,
    #[serde(alias = "cancelado")]
    Cancelled,
}

impl EntryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryStatus::Pending => "pending",
            EntryStatus::Paid => "paid",
            EntryStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryStatus {
    type Err = BillingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" | "pendente" => Ok(EntryStatus::Pending),
            "paid" | "pago" => Ok(EntryStatus::Paid),
            "cancelled" | "cancelado" => Ok(EntryStatus::Cancelled),
            other => Err(BillingError::validation(format!("unknown entry status '{}'", other))),
        }
    }
}

/// The entity that funds or justifies a ledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum FundingOrigin {
    Contract(ContractId),
    TreatmentPackage(TreatmentPackageId),
    Supplier(SupplierId),
}

impl FundingOrigin {
    /// Folds the three nullable foreign keys of a request into an origin
    ///
    /// # Errors
    ///
    /// Returns `BillingError::Validation` when the set keys do not describe
    /// exactly one origin compatible with `kind`.
    pub fn from_parts(
        kind: EntryKind,
        contract_id: Option<ContractId>,
        treatment_package_id: Option<TreatmentPackageId>,
        supplier_id: Option<SupplierId>,
    ) -> Result<Self, BillingError> {
        match kind {
            EntryKind::Receivable => {
                if supplier_id.is_some() {
                    return Err(BillingError::validation(
                        "receivable entries cannot reference a supplier",
                    ));
                }
                match (contract_id, treatment_package_id) {
                    (Some(_), Some(_)) => Err(BillingError::validation(
                        "cannot link both a contract and a treatment package",
                    )),
                    (Some(contract), None) => Ok(FundingOrigin::Contract(contract)),
                    (None, Some(package)) => Ok(FundingOrigin::TreatmentPackage(package)),
                    (None, None) => Err(BillingError::validation(
                        "receivable entries must reference a contract or a treatment package",
                    )),
                }
            }
            EntryKind::Payable => {
                if contract_id.is_some() || treatment_package_id.is_some() {
                    return Err(BillingError::validation(
                        "payable entries can only reference a supplier",
                    ));
                }
                supplier_id.map(FundingOrigin::Supplier).ok_or_else(|| {
                    BillingError::validation("payable entries must reference a supplier")
                })
            }
        }
    }

    /// Storage discriminant
    pub fn discriminant(&self) -> &'static str {
        match self {
            FundingOrigin::Contract(_) => "contract",
            FundingOrigin::TreatmentPackage(_) => "treatment_package",
            FundingOrigin::Supplier(_) => "supplier",
        }
    }

    pub fn contract_id(&self) -> Option<ContractId> {
        match self {
            FundingOrigin::Contract(id) => Some(*id),
            _ => None,
        }
    }

    pub fn treatment_package_id(&self) -> Option<TreatmentPackageId> {
        match self {
            FundingOrigin::TreatmentPackage(id) => Some(*id),
            _ => None,
        }
    }

    pub fn supplier_id(&self) -> Option<SupplierId> {
        match self {
            FundingOrigin::Supplier(id) => Some(*id),
            _ => None,
        }
    }

    /// Returns true if this origin may fund an entry of `kind`
    pub fn allows(&self, kind: EntryKind) -> bool {
        matches!(
            (kind, self),
            (EntryKind::Receivable, FundingOrigin::Contract(_))
                | (EntryKind::Receivable, FundingOrigin::TreatmentPackage(_))
                | (EntryKind::Payable, FundingOrigin::Supplier(_))
        )
    }
}

/// A persisted ledger entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: LedgerEntryId,
    pub kind: EntryKind,
    pub origin: FundingOrigin,
    pub budget_category_id: BudgetCategoryId,
    pub due_date: NaiveDate,
    pub paid_date: Option<NaiveDate>,
    pub amount: Money,
    pub status: EntryStatus,
    pub invoice_number: Option<String>,
    pub notes: Option<String>,
    pub payment_method: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Checks the record-level invariants
    pub fn validate(&self) -> Result<(), BillingError> {
        check_invariants(self.kind, &self.origin, self.amount, self.status, self.paid_date)
    }

    /// Returns true if `other` changes any term that a boleto was issued for
    pub fn financial_terms_differ(&self, other: &LedgerEntry) -> bool {
        self.kind != other.kind
            || self.origin != other.origin
            || self.amount != other.amount
            || self.due_date != other.due_date
    }
}

fn check_invariants(
    kind: EntryKind,
    origin: &FundingOrigin,
    amount: Money,
    status: EntryStatus,
    paid_date: Option<NaiveDate>,
) -> Result<(), BillingError> {
    if !origin.allows(kind) {
        return Err(BillingError::validation(format!(
            "a {} entry cannot be funded by a {} origin",
            kind,
            origin.discriminant()
        )));
    }
    if amount.is_negative() {
        return Err(BillingError::validation("amount must not be negative"));
    }
    if status == EntryStatus::Paid && paid_date.is_none() {
        return Err(BillingError::validation("paid entries must have a paid date"));
    }
    Ok(())
}

/// A validated entry waiting for an identifier
#[derive(Debug, Clone, PartialEq)]
pub struct NewLedgerEntry {
    pub kind: EntryKind,
    pub origin: FundingOrigin,
    pub budget_category_id: BudgetCategoryId,
    pub due_date: NaiveDate,
    pub paid_date: Option<NaiveDate>,
    pub amount: Money,
    pub status: EntryStatus,
    pub invoice_number: Option<String>,
    pub notes: Option<String>,
    pub payment_method: Option<String>,
}

impl NewLedgerEntry {
    /// Materializes the entry once storage has assigned an id
    pub fn into_entry(self, id: LedgerEntryId, now: DateTime<Utc>) -> LedgerEntry {
        LedgerEntry {
            id,
            kind: self.kind,
            origin: self.origin,
            budget_category_id: self.budget_category_id,
            due_date: self.due_date,
            paid_date: self.paid_date,
            amount: self.amount,
            status: self.status,
            invoice_number: self.invoice_number,
            notes: self.notes,
            payment_method: self.payment_method,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Creation request for a ledger entry, in the nullable shape clients send
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntryDraft {
    pub kind: EntryKind,
    #[serde(default)]
    pub contract_id: Option<ContractId>,
    #[serde(default)]
    pub treatment_package_id: Option<TreatmentPackageId>,
    #[serde(default)]
    pub supplier_id: Option<SupplierId>,
    pub budget_category_id: BudgetCategoryId,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub paid_date: Option<NaiveDate>,
    pub amount: Decimal,
    #[serde(default)]
    pub status: EntryStatus,
    #[serde(default)]
    pub invoice_number: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub payment_method: Option<String>,
}

impl LedgerEntryDraft {
    /// Validates the draft and folds its origin keys
    ///
    /// # Errors
    ///
    /// Returns `BillingError::Validation` on any invariant violation
    pub fn validate(self) -> Result<NewLedgerEntry, BillingError> {
        let origin = FundingOrigin::from_parts(
            self.kind,
            self.contract_id,
            self.treatment_package_id,
            self.supplier_id,
        )?;
        let amount = Money::non_negative(self.amount)?;
        check_invariants(self.kind, &origin, amount, self.status, self.paid_date)?;

        Ok(NewLedgerEntry {
            kind: self.kind,
            origin,
            budget_category_id: self.budget_category_id,
            due_date: self.due_date,
            paid_date: self.paid_date,
            amount,
            status: self.status,
            invoice_number: self.invoice_number,
            notes: self.notes,
            payment_method: self.payment_method,
        })
    }
}

/// Partial update of a ledger entry
///
/// Absent keys leave the field unchanged. For nullable columns an explicit
/// `null` clears the value, which is why those fields are `Option<Option<T>>`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LedgerEntryPatch {
    #[serde(default)]
    pub kind: Option<EntryKind>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub contract_id: Option<Option<ContractId>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub treatment_package_id: Option<Option<TreatmentPackageId>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub supplier_id: Option<Option<SupplierId>>,
    #[serde(default)]
    pub budget_category_id: Option<BudgetCategoryId>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub paid_date: Option<Option<NaiveDate>>,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub status: Option<EntryStatus>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub invoice_number: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub notes: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub payment_method: Option<Option<String>>,
}

impl LedgerEntryPatch {
    /// Returns true if the patch carries any origin-related key
    pub fn touches_origin(&self) -> bool {
        self.kind.is_some()
            || self.contract_id.is_some()
            || self.treatment_package_id.is_some()
            || self.supplier_id.is_some()
    }

    /// Applies the patch to `entry` and re-validates the whole record
    ///
    /// # Errors
    ///
    /// Returns `BillingError::Validation` if the post-patch record breaks an
    /// invariant. `entry` itself is never modified.
    pub fn apply(&self, entry: &LedgerEntry) -> Result<LedgerEntry, BillingError> {
        let mut updated = entry.clone();

        if self.touches_origin() {
            let kind = self.kind.unwrap_or(entry.kind);
            let contract_id = self.contract_id.unwrap_or(entry.origin.contract_id());
            let treatment_package_id = self
                .treatment_package_id
                .unwrap_or(entry.origin.treatment_package_id());
            let supplier_id = self.supplier_id.unwrap_or(entry.origin.supplier_id());

            updated.kind = kind;
            updated.origin =
                FundingOrigin::from_parts(kind, contract_id, treatment_package_id, supplier_id)?;
        }

        if let Some(budget_category_id) = self.budget_category_id {
            updated.budget_category_id = budget_category_id;
        }
        if let Some(due_date) = self.due_date {
            updated.due_date = due_date;
        }
        if let Some(paid_date) = self.paid_date {
            updated.paid_date = paid_date;
        }
        if let Some(amount) = self.amount {
            updated.amount = Money::non_negative(amount)?;
        }
        if let Some(status) = self.status {
            updated.status = status;
        }
        if let Some(ref invoice_number) = self.invoice_number {
            updated.invoice_number = invoice_number.clone();
        }
        if let Some(ref notes) = self.notes {
            updated.notes = notes.clone();
        }
        if let Some(ref payment_method) = self.payment_method {
            updated.payment_method = payment_method.clone();
        }

        updated.validate()?;
        updated.updated_at = Utc::now();
        Ok(updated)
    }
}

/// Listing filter; every set field must match
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerFilter {
    pub contract_id: Option<ContractId>,
    pub treatment_package_id: Option<TreatmentPackageId>,
    pub supplier_id: Option<SupplierId>,
    pub kind: Option<EntryKind>,
}

impl LedgerFilter {
    pub fn by_contract(contract_id: ContractId) -> Self {
        Self {
            contract_id: Some(contract_id),
            ..Default::default()
        }
    }

    pub fn by_supplier(supplier_id: SupplierId) -> Self {
        Self {
            supplier_id: Some(supplier_id),
            ..Default::default()
        }
    }

    pub fn by_treatment_package(treatment_package_id: TreatmentPackageId) -> Self {
        Self {
            treatment_package_id: Some(treatment_package_id),
            ..Default::default()
        }
    }

    /// Returns true if `entry` satisfies every set criterion
    pub fn matches(&self, entry: &LedgerEntry) -> bool {
        if let Some(contract_id) = self.contract_id {
            if entry.origin.contract_id() != Some(contract_id) {
                return false;
            }
        }
        if let Some(package_id) = self.treatment_package_id {
            if entry.origin.treatment_package_id() != Some(package_id) {
                return false;
            }
        }
        if let Some(supplier_id) = self.supplier_id {
            if entry.origin.supplier_id() != Some(supplier_id) {
                return false;
            }
        }
        if let Some(kind) = self.kind {
            if entry.kind != kind {
                return false;
            }
        }
        true
    }
}
