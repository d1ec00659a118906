//! Pre-built Test Fixtures
//!
//! Provides ready-to-use test data for the billing entities. These fixtures
//! are consistent and predictable for unit tests; the identifiers match the
//! rows inserted by [`crate::database::TestDatabase::seed_reference_data`]
//! and by [`crate::stores::seeded_store`].

use chrono::{NaiveDate, NaiveTime};
use core_kernel::{BudgetCategoryId, Money, PatientId, SupplierId, TreatmentTypeId};
use domain_billing::{BudgetCategory, Patient, Supplier, TreatmentType};
use fake::faker::internet::en::SafeEmail;
use fake::faker::name::en::Name;
use fake::Fake;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Fixture for identifier test data
pub struct IdFixtures;

impl IdFixtures {
    /// The patient every default draft refers to
    pub fn patient_id() -> PatientId {
        PatientId::new(1)
    }

    /// A second patient, for ownership mismatch tests
    pub fn other_patient_id() -> PatientId {
        PatientId::new(2)
    }

    pub fn supplier_id() -> SupplierId {
        SupplierId::new(1)
    }

    pub fn budget_category_id() -> BudgetCategoryId {
        BudgetCategoryId::new(1)
    }

    pub fn treatment_type_id() -> TreatmentTypeId {
        TreatmentTypeId::new(1)
    }
}

/// Fixture for Money test data
pub struct MoneyFixtures;

impl MoneyFixtures {
    /// Price of a single session
    pub fn session_price() -> Decimal {
        dec!(200.00)
    }

    /// Total of a standard five-session package
    pub fn package_total() -> Money {
        Money::new(dec!(900.00))
    }

    /// An amount with centavos, for minor-unit conversion tests
    pub fn boleto_amount() -> Decimal {
        dec!(1500.50)
    }
}

/// Fixture for date and time test data
pub struct DateFixtures;

impl DateFixtures {
    /// Standard package start date (May 1, 2024)
    pub fn package_start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    /// Standard ledger entry due date (June 1, 2024)
    pub fn due_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    /// A payment date one day after the due date
    pub fn paid_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 2).unwrap()
    }

    /// Standard session date
    pub fn session_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 10).unwrap()
    }

    pub fn session_start() -> NaiveTime {
        NaiveTime::from_hms_opt(14, 0, 0).unwrap()
    }

    pub fn session_end() -> NaiveTime {
        NaiveTime::from_hms_opt(15, 0, 0).unwrap()
    }
}

/// Fixture for reference data
pub struct PartyFixtures;

impl PartyFixtures {
    /// A patient with a complete address, ready for boleto issuance
    pub fn patient() -> Patient {
        Patient {
            street: Some("Rua das Flores".to_string()),
            number: Some("120".to_string()),
            district: Some("Centro".to_string()),
            city: Some("Belo Horizonte".to_string()),
            state: Some("MG".to_string()),
            complement: Some("Sala 3".to_string()),
            zip_code: Some("30110-012".to_string()),
            ..Patient::new(IdFixtures::patient_id(), "Ana Souza", "123.456.789-09")
                .with_email("ana.souza@example.com")
        }
    }

    /// A patient with only the mandatory fields
    pub fn other_patient() -> Patient {
        Patient::new(IdFixtures::other_patient_id(), "Bruno Lima", "987.654.321-00")
    }

    /// A patient with a generated name and email
    pub fn random_patient(id: PatientId) -> Patient {
        let name: String = Name().fake();
        let email: String = SafeEmail().fake();
        let cpf = format!("{:011}", (10_000_000_000u64..99_999_999_999u64).fake::<u64>());
        Patient::new(id, name, cpf).with_email(email)
    }

    pub fn supplier() -> Supplier {
        Supplier {
            id: IdFixtures::supplier_id(),
            name: "Dermo Supply Ltda".to_string(),
            document: "12.345.678/0001-90".to_string(),
            email: Some("financeiro@dermosupply.example.com".to_string()),
        }
    }

    pub fn budget_category() -> BudgetCategory {
        BudgetCategory {
            id: IdFixtures::budget_category_id(),
            name: "Receitas de tratamento".to_string(),
        }
    }

    pub fn treatment_type() -> TreatmentType {
        TreatmentType {
            id: IdFixtures::treatment_type_id(),
            name: "Microagulhamento".to_string(),
        }
    }
}
