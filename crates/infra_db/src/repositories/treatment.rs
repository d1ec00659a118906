//! Treatment package and session appointment repository
//!
//! Quota changes are single guarded `UPDATE ... RETURNING` statements, so two
//! concurrent schedulings can never push `sessions_completed` past the
//! contracted total.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use core_kernel::{Money, PatientId, SessionAppointmentId, TreatmentPackageId, TreatmentTypeId};
use domain_billing::session::NewSessionAppointment;
use domain_billing::treatment_package::NewTreatmentPackage;
use domain_billing::{SessionAppointment, SessionStatus, TreatmentPackage};

use super::decode;
use crate::error::DatabaseError;

const PACKAGE_COLUMNS: &str = "id, patient_id, treatment_type_id, description, start_date, \
    sessions_contracted, sessions_completed, total_amount, status, notes, created_at, updated_at";

const SESSION_COLUMNS: &str = "id, patient_id, treatment_package_id, scheduled_date, start_time, \
    end_time, status, session_number, notes, created_at, updated_at";

/// Database row for a treatment package
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TreatmentPackageRow {
    pub id: i64,
    pub patient_id: i64,
    pub treatment_type_id: i64,
    pub description: String,
    pub start_date: NaiveDate,
    pub sessions_contracted: i32,
    pub sessions_completed: i32,
    pub total_amount: Decimal,
    pub status: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<TreatmentPackageRow> for TreatmentPackage {
    type Error = DatabaseError;

    fn try_from(row: TreatmentPackageRow) -> Result<Self, Self::Error> {
        Ok(TreatmentPackage {
            id: TreatmentPackageId::new(row.id),
            patient_id: PatientId::new(row.patient_id),
            treatment_type_id: TreatmentTypeId::new(row.treatment_type_id),
            description: row.description,
            start_date: row.start_date,
            sessions_contracted: row.sessions_contracted,
            sessions_completed: row.sessions_completed,
            total_amount: Money::new(row.total_amount),
            status: decode("status", &row.status)?,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Database row for a session appointment
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SessionAppointmentRow {
    pub id: i64,
    pub patient_id: i64,
    pub treatment_package_id: i64,
    pub scheduled_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: Option<NaiveTime>,
    pub status: String,
    pub session_number: i32,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<SessionAppointmentRow> for SessionAppointment {
    type Error = DatabaseError;

    fn try_from(row: SessionAppointmentRow) -> Result<Self, Self::Error> {
        Ok(SessionAppointment {
            id: SessionAppointmentId::new(row.id),
            patient_id: PatientId::new(row.patient_id),
            treatment_package_id: TreatmentPackageId::new(row.treatment_package_id),
            scheduled_date: row.scheduled_date,
            start_time: row.start_time,
            end_time: row.end_time,
            status: decode("status", &row.status)?,
            session_number: row.session_number,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Repository for treatment packages and their session appointments
#[derive(Debug, Clone)]
pub struct TreatmentRepository {
    pool: PgPool,
}

impl TreatmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ------------------------------------------------------------------------
    // Packages
    // ------------------------------------------------------------------------

    pub async fn insert_package(
        &self,
        package: &NewTreatmentPackage,
    ) -> Result<TreatmentPackageRow, DatabaseError> {
        let sql = format!(
            r#"
            INSERT INTO treatment_packages (
                patient_id, treatment_type_id, description, start_date,
                sessions_contracted, sessions_completed, total_amount, status, notes
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {PACKAGE_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, TreatmentPackageRow>(&sql)
            .bind(package.patient_id.value())
            .bind(package.treatment_type_id.value())
            .bind(&package.description)
            .bind(package.start_date)
            .bind(package.sessions_contracted)
            .bind(package.sessions_completed)
            .bind(package.total_amount.amount())
            .bind(package.status.as_str())
            .bind(&package.notes)
            .fetch_one(&self.pool)
            .await?;

        Ok(row)
    }

    pub async fn get_package(&self, id: i64) -> Result<TreatmentPackageRow, DatabaseError> {
        let sql = format!("SELECT {PACKAGE_COLUMNS} FROM treatment_packages WHERE id = $1");
        sqlx::query_as::<_, TreatmentPackageRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("TreatmentPackage", id))
    }

    pub async fn list_packages(&self) -> Result<Vec<TreatmentPackageRow>, DatabaseError> {
        let sql = format!(
            "SELECT {PACKAGE_COLUMNS} FROM treatment_packages ORDER BY start_date DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, TreatmentPackageRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn list_packages_by_patient(
        &self,
        patient_id: i64,
    ) -> Result<Vec<TreatmentPackageRow>, DatabaseError> {
        let sql = format!(
            "SELECT {PACKAGE_COLUMNS} FROM treatment_packages \
             WHERE patient_id = $1 ORDER BY start_date DESC, id DESC"
        );
        let rows = sqlx::query_as::<_, TreatmentPackageRow>(&sql)
            .bind(patient_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    /// Active packages that still have sessions left
    pub async fn list_pending_packages(&self) -> Result<Vec<TreatmentPackageRow>, DatabaseError> {
        let sql = format!(
            "SELECT {PACKAGE_COLUMNS} FROM treatment_packages \
             WHERE status = 'active' AND sessions_completed < sessions_contracted \
             ORDER BY start_date, id"
        );
        let rows = sqlx::query_as::<_, TreatmentPackageRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn update_package(
        &self,
        package: &TreatmentPackage,
    ) -> Result<TreatmentPackageRow, DatabaseError> {
        let sql = format!(
            r#"
            UPDATE treatment_packages SET
                patient_id = $2, treatment_type_id = $3, description = $4, start_date = $5,
                sessions_contracted = $6, sessions_completed = $7, total_amount = $8,
                status = $9, notes = $10, updated_at = now()
            WHERE id = $1
            RETURNING {PACKAGE_COLUMNS}
            "#
        );

        sqlx::query_as::<_, TreatmentPackageRow>(&sql)
            .bind(package.id.value())
            .bind(package.patient_id.value())
            .bind(package.treatment_type_id.value())
            .bind(&package.description)
            .bind(package.start_date)
            .bind(package.sessions_contracted)
            .bind(package.sessions_completed)
            .bind(package.total_amount.amount())
            .bind(package.status.as_str())
            .bind(&package.notes)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("TreatmentPackage", package.id))
    }

    pub async fn delete_package(&self, id: i64) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM treatment_packages WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("TreatmentPackage", id));
        }
        Ok(())
    }

    /// Consumes one session if the quota allows it
    ///
    /// # Returns
    ///
    /// The updated row, `None` if the package is full or cancelled, or
    /// `NotFound` if it does not exist
    pub async fn increment_session(
        &self,
        id: i64,
    ) -> Result<Option<TreatmentPackageRow>, DatabaseError> {
        let sql = format!(
            r#"
            UPDATE treatment_packages SET
                sessions_completed = sessions_completed + 1,
                status = CASE
                    WHEN sessions_completed + 1 >= sessions_contracted THEN 'completed'
                    ELSE status
                END,
                updated_at = now()
            WHERE id = $1
              AND status <> 'cancelled'
              AND sessions_completed < sessions_contracted
            RETURNING {PACKAGE_COLUMNS}
            "#
        );

        let updated = sqlx::query_as::<_, TreatmentPackageRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match updated {
            Some(row) => Ok(Some(row)),
            None => {
                self.get_package(id).await?;
                Ok(None)
            }
        }
    }

    /// Releases one session, flooring at zero
    pub async fn decrement_session(&self, id: i64) -> Result<TreatmentPackageRow, DatabaseError> {
        let sql = format!(
            r#"
            UPDATE treatment_packages SET
                sessions_completed = GREATEST(sessions_completed - 1, 0),
                updated_at = now()
            WHERE id = $1
            RETURNING {PACKAGE_COLUMNS}
            "#
        );

        sqlx::query_as::<_, TreatmentPackageRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("TreatmentPackage", id))
    }

    // ------------------------------------------------------------------------
    // Session appointments
    // ------------------------------------------------------------------------

    pub async fn insert_session(
        &self,
        session: &NewSessionAppointment,
    ) -> Result<SessionAppointmentRow, DatabaseError> {
        let sql = format!(
            r#"
            INSERT INTO session_appointments (
                patient_id, treatment_package_id, scheduled_date, start_time,
                end_time, status, session_number, notes
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {SESSION_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, SessionAppointmentRow>(&sql)
            .bind(session.patient_id.value())
            .bind(session.treatment_package_id.value())
            .bind(session.scheduled_date)
            .bind(session.start_time)
            .bind(session.end_time)
            .bind(session.status.as_str())
            .bind(session.session_number)
            .bind(&session.notes)
            .fetch_one(&self.pool)
            .await?;

        Ok(row)
    }

    pub async fn get_session(&self, id: i64) -> Result<SessionAppointmentRow, DatabaseError> {
        let sql = format!("SELECT {SESSION_COLUMNS} FROM session_appointments WHERE id = $1");
        sqlx::query_as::<_, SessionAppointmentRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("SessionAppointment", id))
    }

    pub async fn list_sessions_by_package(
        &self,
        package_id: i64,
    ) -> Result<Vec<SessionAppointmentRow>, DatabaseError> {
        let sql = format!(
            "SELECT {SESSION_COLUMNS} FROM session_appointments \
             WHERE treatment_package_id = $1 ORDER BY session_number, id"
        );
        let rows = sqlx::query_as::<_, SessionAppointmentRow>(&sql)
            .bind(package_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn delete_session(&self, id: i64) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM session_appointments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("SessionAppointment", id));
        }
        Ok(())
    }

    pub async fn update_session_status(
        &self,
        id: i64,
        status: SessionStatus,
    ) -> Result<SessionAppointmentRow, DatabaseError> {
        let sql = format!(
            "UPDATE session_appointments SET status = $2, updated_at = now() \
             WHERE id = $1 RETURNING {SESSION_COLUMNS}"
        );
        sqlx::query_as::<_, SessionAppointmentRow>(&sql)
            .bind(id)
            .bind(status.as_str())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("SessionAppointment", id))
    }

    pub async fn count_realized(&self, package_id: i64) -> Result<i64, DatabaseError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM session_appointments \
             WHERE treatment_package_id = $1 AND status = 'realized'",
        )
        .bind(package_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}
