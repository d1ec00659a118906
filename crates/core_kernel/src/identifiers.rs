//! Strongly-typed identifiers for persisted entities
//!
//! Every table in the billing schema uses a `BIGSERIAL` primary key. Wrapping
//! the raw `i64` in a newtype keeps a contract id from being passed where a
//! treatment package id is expected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

macro_rules! define_id {
    ($name:ident, $prefix:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wraps a database-assigned key
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            /// Returns the raw database key
            pub fn value(&self) -> i64 {
                self.0
            }

            /// Returns the identifier prefix used in external codes
            pub fn prefix() -> &'static str {
                $prefix
            }

            /// Returns the prefixed code, e.g. `LANC-42`
            pub fn code(&self) -> String {
                format!("{}-{}", $prefix, self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                // Accept both the bare key and the prefixed code
                let raw = s.strip_prefix(concat!($prefix, "-")).unwrap_or(s);
                Ok(Self(raw.parse()?))
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> i64 {
                id.0
            }
        }
    };
}

// Ledger
define_id!(LedgerEntryId, "LANC");
define_id!(BudgetCategoryId, "NAT");
define_id!(InvoiceId, "BOL");

// Funding origins
define_id!(ContractId, "CTR");
define_id!(TreatmentPackageId, "PKG");
define_id!(SupplierId, "FORN");

// Clinical references
define_id!(PatientId, "PAC");
define_id!(TreatmentTypeId, "TT");
define_id!(SessionAppointmentId, "SES");
