//! Read-only access to reference data
//!
//! Patients, suppliers, budget categories and treatment types are owned by
//! other back-office modules; billing never writes them.

use sqlx::PgPool;

use core_kernel::{BudgetCategoryId, PatientId, SupplierId, TreatmentTypeId};
use domain_billing::{BudgetCategory, Patient, Supplier, TreatmentType};

use crate::error::DatabaseError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PatientRow {
    pub id: i64,
    pub name: String,
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

impl From<PatientRow> for Patient {
    fn from(row: PatientRow) -> Self {
        Patient {
            id: PatientId::new(row.id),
            name: row.name,
            cpf: row.cpf,
            email: row.email,
            street: row.street,
            number: row.number,
            district: row.district,
            city: row.city,
            state: row.state,
            complement: row.complement,
            zip_code: row.zip_code,
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SupplierRow {
    pub id: i64,
    pub name: String,
    pub document: String,
    pub email: Option<String>,
}

impl From<SupplierRow> for Supplier {
    fn from(row: SupplierRow) -> Self {
        Supplier {
            id: SupplierId::new(row.id),
            name: row.name,
            document: row.document,
            email: row.email,
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BudgetCategoryRow {
    pub id: i64,
    pub name: String,
}

impl From<BudgetCategoryRow> for BudgetCategory {
    fn from(row: BudgetCategoryRow) -> Self {
        BudgetCategory {
            id: BudgetCategoryId::new(row.id),
            name: row.name,
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TreatmentTypeRow {
    pub id: i64,
    pub name: String,
}

impl From<TreatmentTypeRow> for TreatmentType {
    fn from(row: TreatmentTypeRow) -> Self {
        TreatmentType {
            id: TreatmentTypeId::new(row.id),
            name: row.name,
        }
    }
}

/// Repository for reference lookups
#[derive(Debug, Clone)]
pub struct ReferenceRepository {
    pool: PgPool,
}

impl ReferenceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_patient(&self, id: i64) -> Result<PatientRow, DatabaseError> {
        sqlx::query_as::<_, PatientRow>(
            "SELECT id, name, cpf, email, street, number, district, city, state, \
             complement, zip_code FROM patients WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Patient", id))
    }

    pub async fn get_supplier(&self, id: i64) -> Result<SupplierRow, DatabaseError> {
        sqlx::query_as::<_, SupplierRow>(
            "SELECT id, name, document, email FROM suppliers WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("Supplier", id))
    }

    pub async fn get_budget_category(&self, id: i64) -> Result<BudgetCategoryRow, DatabaseError> {
        sqlx::query_as::<_, BudgetCategoryRow>(
            "SELECT id, name FROM budget_categories WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DatabaseError::not_found("BudgetCategory", id))
    }

    pub async fn get_treatment_type(&self, id: i64) -> Result<TreatmentTypeRow, DatabaseError> {
        sqlx::query_as::<_, TreatmentTypeRow>("SELECT id, name FROM treatment_types WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("TreatmentType", id))
    }
}
