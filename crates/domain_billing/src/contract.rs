//! Patient contracts
//!
//! A contract covers a single procedure for one patient and tracks the
//! deposit paid at signing and the balance still owed.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use core_kernel::{ContractId, Money, PatientId, SessionAppointmentId};

use crate::error::BillingError;
use crate::serde_ext::deserialize_some;

/// Prefix of generated contract identifiers
pub const CONTRACT_IDENTIFIER_PREFIX: &str = "CONT";

/// Contract status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractStatus {
    #[default]
    #[serde(alias = "ativo")]
    Active,
    #[serde(alias = "concluido")]
    Completed,
    #[serde(alias = "cancelado")]
    Cancelled,
}

impl ContractStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContractStatus::Active => "active",
            ContractStatus::Completed => "completed",
            ContractStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ContractStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContractStatus {
    type Err = BillingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" | "ativo" => Ok(ContractStatus::Active),
            "completed" | "concluido" => Ok(ContractStatus::Completed),
            "cancelled" | "cancelado" => Ok(ContractStatus::Cancelled),
            other => Err(BillingError::validation(format!(
                "unknown contract status '{}'",
                other
            ))),
        }
    }
}

/// A contract with a patient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    pub id: ContractId,
    /// Human-readable identifier, fixed at creation
    pub identifier: String,
    pub patient_id: PatientId,
    pub session_appointment_id: Option<SessionAppointmentId>,
    pub status: ContractStatus,
    /// Deposit paid at signing
    pub deposit_amount: Option<Money>,
    pub remaining_amount: Option<Money>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Generates a new contract identifier such as `CONT-3F9A0B1C`
pub fn generate_identifier() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("{}-{}", CONTRACT_IDENTIFIER_PREFIX, hex[..8].to_uppercase())
}

/// A validated contract waiting for an identifier
#[derive(Debug, Clone, PartialEq)]
pub struct NewContract {
    pub identifier: String,
    pub patient_id: PatientId,
    pub session_appointment_id: Option<SessionAppointmentId>,
    pub status: ContractStatus,
    pub deposit_amount: Option<Money>,
    pub remaining_amount: Option<Money>,
}

impl NewContract {
    pub fn into_contract(self, id: ContractId, now: DateTime<Utc>) -> Contract {
        Contract {
            id,
            identifier: self.identifier,
            patient_id: self.patient_id,
            session_appointment_id: self.session_appointment_id,
            status: self.status,
            deposit_amount: self.deposit_amount,
            remaining_amount: self.remaining_amount,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Creation request for a contract
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractDraft {
    pub patient_id: PatientId,
    #[serde(default)]
    pub session_appointment_id: Option<SessionAppointmentId>,
    #[serde(default)]
    pub status: ContractStatus,
    #[serde(default)]
    pub deposit_amount: Option<Decimal>,
    #[serde(default)]
    pub remaining_amount: Option<Decimal>,
}

impl ContractDraft {
    /// Validates the draft and assigns a fresh identifier
    pub fn validate(self) -> Result<NewContract, BillingError> {
        Ok(NewContract {
            identifier: generate_identifier(),
            patient_id: self.patient_id,
            session_appointment_id: self.session_appointment_id,
            status: self.status,
            deposit_amount: optional_amount(self.deposit_amount)?,
            remaining_amount: optional_amount(self.remaining_amount)?,
        })
    }
}

fn optional_amount(amount: Option<Decimal>) -> Result<Option<Money>, BillingError> {
    amount
        .map(Money::non_negative)
        .transpose()
        .map_err(BillingError::from)
}

/// Partial update of a contract; the identifier is not patchable
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ContractPatch {
    #[serde(default)]
    pub patient_id: Option<PatientId>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub session_appointment_id: Option<Option<SessionAppointmentId>>,
    #[serde(default)]
    pub status: Option<ContractStatus>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub deposit_amount: Option<Option<Decimal>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub remaining_amount: Option<Option<Decimal>>,
}

impl ContractPatch {
    pub fn apply(&self, contract: &Contract) -> Result<Contract, BillingError> {
        let mut updated = contract.clone();
        if let Some(patient_id) = self.patient_id {
            updated.patient_id = patient_id;
        }
        if let Some(session_appointment_id) = self.session_appointment_id {
            updated.session_appointment_id = session_appointment_id;
        }
        if let Some(status) = self.status {
            updated.status = status;
        }
        if let Some(deposit_amount) = self.deposit_amount {
            updated.deposit_amount = optional_amount(deposit_amount)?;
        }
        if let Some(remaining_amount) = self.remaining_amount {
            updated.remaining_amount = optional_amount(remaining_amount)?;
        }
        updated.updated_at = Utc::now();
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_identifier_format() {
        let identifier = generate_identifier();
        assert_eq!(identifier.len(), 13);
        assert!(identifier.starts_with("CONT-"));
        assert!(identifier[5..]
            .chars()
            .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c)));
    }

    #[test]
    fn test_identifiers_are_distinct() {
        assert_ne!(generate_identifier(), generate_identifier());
    }

    #[test]
    fn test_draft_rejects_negative_deposit() {
        let draft = ContractDraft {
            patient_id: PatientId::new(1),
            session_appointment_id: None,
            status: ContractStatus::Active,
            deposit_amount: Some(dec!(-10)),
            remaining_amount: None,
        };
        assert!(matches!(draft.validate(), Err(BillingError::Validation(_))));
    }

    #[test]
    fn test_patch_keeps_identifier() {
        let contract = ContractDraft {
            patient_id: PatientId::new(1),
            session_appointment_id: None,
            status: ContractStatus::Active,
            deposit_amount: Some(dec!(500)),
            remaining_amount: Some(dec!(1500)),
        }
        .validate()
        .unwrap()
        .into_contract(ContractId::new(3), Utc::now());

        let patch: ContractPatch =
            serde_json::from_str(r#"{"status": "concluido", "remaining_amount": null}"#).unwrap();
        let updated = patch.apply(&contract).unwrap();

        assert_eq!(updated.identifier, contract.identifier);
        assert_eq!(updated.status, ContractStatus::Completed);
        assert_eq!(updated.remaining_amount, None);
        assert_eq!(updated.deposit_amount, Some(Money::new(dec!(500))));
    }
}
