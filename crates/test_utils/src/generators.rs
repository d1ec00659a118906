//! Property-Based Test Generators
//!
//! Provides proptest strategies for generating random billing data that
//! maintains domain invariants.

use core_kernel::{ContractId, SupplierId, TreatmentPackageId};
use domain_billing::{EntryKind, FundingOrigin, PackageStatus};
use proptest::prelude::*;
use rust_decimal::Decimal;

/// Strategy for non-negative amounts in centavos
pub fn amount_minor_strategy() -> impl Strategy<Value = i64> {
    0i64..100_000_000i64
}

/// Strategy for strictly positive two-decimal amounts
pub fn positive_amount_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..100_000_000i64).prop_map(|centavos| Decimal::new(centavos, 2))
}

pub fn entry_kind_strategy() -> impl Strategy<Value = EntryKind> {
    prop_oneof![Just(EntryKind::Receivable), Just(EntryKind::Payable)]
}

pub fn package_status_strategy() -> impl Strategy<Value = PackageStatus> {
    prop_oneof![
        Just(PackageStatus::Active),
        Just(PackageStatus::Completed),
        Just(PackageStatus::Cancelled),
    ]
}

/// Strategy for any funding origin
pub fn funding_origin_strategy() -> impl Strategy<Value = FundingOrigin> {
    prop_oneof![
        (1i64..10_000).prop_map(|id| FundingOrigin::Contract(ContractId::new(id))),
        (1i64..10_000).prop_map(|id| FundingOrigin::TreatmentPackage(TreatmentPackageId::new(id))),
        (1i64..10_000).prop_map(|id| FundingOrigin::Supplier(SupplierId::new(id))),
    ]
}

/// Strategy for an entry kind paired with an origin it allows
pub fn kind_with_origin_strategy() -> impl Strategy<Value = (EntryKind, FundingOrigin)> {
    funding_origin_strategy().prop_map(|origin| {
        let kind = if origin.supplier_id().is_some() {
            EntryKind::Payable
        } else {
            EntryKind::Receivable
        };
        (kind, origin)
    })
}

/// Strategy for a package quota with sessions left: `(contracted, completed)`
pub fn open_quota_strategy() -> impl Strategy<Value = (i32, i32)> {
    (1i32..50).prop_flat_map(|contracted| (Just(contracted), 0..contracted))
}

/// Strategy for CPF strings, with or without punctuation
pub fn cpf_strategy() -> impl Strategy<Value = String> {
    (any::<bool>(), proptest::collection::vec(0u8..10, 11)).prop_map(|(punctuated, digits)| {
        let d: String = digits.iter().map(|d| char::from(b'0' + d)).collect();
        if punctuated {
            format!("{}.{}.{}-{}", &d[0..3], &d[3..6], &d[6..9], &d[9..11])
        } else {
            d
        }
    })
}
