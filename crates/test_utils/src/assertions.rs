//! Custom Test Assertions
//!
//! Provides specialized assertion helpers for billing types that give
//! more meaningful error messages than standard assertions.

use core_kernel::Money;
use domain_billing::{
    BillingError, ErrorCategory, FundingOrigin, LedgerEntry, PackageStatus, TreatmentPackage,
};
use rust_decimal::Decimal;

/// Asserts that a Money value has the expected amount
pub fn assert_money_eq(actual: &Money, expected: Decimal) {
    assert_eq!(
        actual.amount(),
        expected,
        "Money amount mismatch: actual={}, expected={}",
        actual.amount(),
        expected
    );
}

/// Asserts that an entry is funded by exactly `expected`
pub fn assert_funded_by(entry: &LedgerEntry, expected: FundingOrigin) {
    assert_eq!(
        entry.origin, expected,
        "Ledger entry {} is funded by {:?}, expected {:?}",
        entry.id, entry.origin, expected
    );
    assert!(
        entry.origin.allows(entry.kind),
        "Ledger entry {} has origin {:?} which a {:?} entry may not use",
        entry.id,
        entry.origin,
        entry.kind
    );
}

/// Asserts the quota bounds and the status they imply
///
/// # Panics
///
/// Panics if the completed count is out of bounds or an exhausted package
/// is still active
pub fn assert_quota_consistent(package: &TreatmentPackage) {
    assert!(
        package.sessions_completed >= 0,
        "Package {} has negative completed sessions: {}",
        package.id,
        package.sessions_completed
    );
    assert!(
        package.sessions_completed <= package.sessions_contracted,
        "Package {} exceeded its quota: {} of {}",
        package.id,
        package.sessions_completed,
        package.sessions_contracted
    );
    if package.is_quota_exhausted() {
        assert_ne!(
            package.status,
            PackageStatus::Active,
            "Package {} is exhausted but still active",
            package.id
        );
    }
}

/// Asserts that an error falls in the expected category
pub fn assert_error_category(error: &BillingError, expected: ErrorCategory) {
    assert_eq!(
        error.category(),
        expected,
        "Expected {:?} error, got {:?}: {}",
        expected,
        error.category(),
        error
    );
}
