//! Reference data read by the billing core
//!
//! Patients, suppliers, budget categories and treatment types are maintained
//! elsewhere; billing only reads them to validate references and to build the
//! boleto customer block.

use serde::{Deserialize, Serialize};

use core_kernel::{BudgetCategoryId, PatientId, SupplierId, TreatmentTypeId};

/// A patient, as far as billing needs to know
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub id: PatientId,
    pub name: String,
    /// CPF as typed, possibly with punctuation
    pub cpf: String,
    pub email: Option<String>,
    pub street: Option<String>,
    pub number: Option<String>,
    pub district: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub complement: Option<String>,
    pub zip_code: Option<String>,
}

impl Patient {
    /// Creates a patient with no email or address on file
    pub fn new(id: PatientId, name: impl Into<String>, cpf: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            cpf: cpf.into(),
            email: None,
            street: None,
            number: None,
            district: None,
            city: None,
            state: None,
            complement: None,
            zip_code: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// CPF with punctuation stripped
    pub fn cpf_digits(&self) -> String {
        digits_only(&self.cpf)
    }
}

/// Short patient view embedded in API responses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientSummary {
    pub id: PatientId,
    pub name: String,
}

impl From<&Patient> for PatientSummary {
    fn from(patient: &Patient) -> Self {
        Self {
            id: patient.id,
            name: patient.name.clone(),
        }
    }
}

/// A supplier the clinic pays
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supplier {
    pub id: SupplierId,
    pub name: String,
    /// CPF or CNPJ
    pub document: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetCategory {
    pub id: BudgetCategoryId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreatmentType {
    pub id: TreatmentTypeId,
    pub name: String,
}

/// Keeps ASCII digits only
pub fn digits_only(value: &str) -> String {
    value.chars().filter(|c| c.is_ascii_digit()).collect()
}
