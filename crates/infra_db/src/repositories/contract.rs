//! Contract repository implementation

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use core_kernel::{ContractId, Money, PatientId, SessionAppointmentId};
use domain_billing::contract::NewContract;
use domain_billing::Contract;

use super::decode;
use crate::error::DatabaseError;

const CONTRACT_COLUMNS: &str = "id, identifier, patient_id, session_appointment_id, status, \
    deposit_amount, remaining_amount, created_at, updated_at";

/// Database row for a contract
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ContractRow {
    pub id: i64,
    pub identifier: String,
    pub patient_id: i64,
    pub session_appointment_id: Option<i64>,
    pub status: String,
    pub deposit_amount: Option<Decimal>,
    pub remaining_amount: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ContractRow> for Contract {
    type Error = DatabaseError;

    fn try_from(row: ContractRow) -> Result<Self, Self::Error> {
        Ok(Contract {
            id: ContractId::new(row.id),
            identifier: row.identifier,
            patient_id: PatientId::new(row.patient_id),
            session_appointment_id: row.session_appointment_id.map(SessionAppointmentId::new),
            status: decode("status", &row.status)?,
            deposit_amount: row.deposit_amount.map(Money::new),
            remaining_amount: row.remaining_amount.map(Money::new),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Repository for contracts
#[derive(Debug, Clone)]
pub struct ContractRepository {
    pool: PgPool,
}

impl ContractRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a contract; a taken identifier raises `DuplicateEntry`
    pub async fn insert(&self, contract: &NewContract) -> Result<ContractRow, DatabaseError> {
        let sql = format!(
            r#"
            INSERT INTO contracts (
                identifier, patient_id, session_appointment_id, status,
                deposit_amount, remaining_amount
            ) VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {CONTRACT_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, ContractRow>(&sql)
            .bind(&contract.identifier)
            .bind(contract.patient_id.value())
            .bind(contract.session_appointment_id.map(|id| id.value()))
            .bind(contract.status.as_str())
            .bind(contract.deposit_amount.map(|m| m.amount()))
            .bind(contract.remaining_amount.map(|m| m.amount()))
            .fetch_one(&self.pool)
            .await?;

        Ok(row)
    }

    pub async fn get(&self, id: i64) -> Result<ContractRow, DatabaseError> {
        let sql = format!("SELECT {CONTRACT_COLUMNS} FROM contracts WHERE id = $1");
        sqlx::query_as::<_, ContractRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("Contract", id))
    }

    pub async fn list(&self) -> Result<Vec<ContractRow>, DatabaseError> {
        let sql = format!("SELECT {CONTRACT_COLUMNS} FROM contracts ORDER BY created_at DESC, id DESC");
        let rows = sqlx::query_as::<_, ContractRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Overwrites the mutable columns; the identifier never changes
    pub async fn update(&self, contract: &Contract) -> Result<ContractRow, DatabaseError> {
        let sql = format!(
            r#"
            UPDATE contracts SET
                patient_id = $2, session_appointment_id = $3, status = $4,
                deposit_amount = $5, remaining_amount = $6, updated_at = now()
            WHERE id = $1
            RETURNING {CONTRACT_COLUMNS}
            "#
        );

        sqlx::query_as::<_, ContractRow>(&sql)
            .bind(contract.id.value())
            .bind(contract.patient_id.value())
            .bind(contract.session_appointment_id.map(|id| id.value()))
            .bind(contract.status.as_str())
            .bind(contract.deposit_amount.map(|m| m.amount()))
            .bind(contract.remaining_amount.map(|m| m.amount()))
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("Contract", contract.id))
    }

    pub async fn delete(&self, id: i64) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM contracts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Contract", id));
        }
        Ok(())
    }
}
