//! Session appointments under a treatment package

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{PatientId, SessionAppointmentId, TreatmentPackageId};

use crate::error::BillingError;

/// Appointment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    #[serde(alias = "agendada")]
    Scheduled,
    #[serde(alias = "realizada")]
    Realized,
    #[serde(alias = "cancelada")]
    Cancelled,
    #[serde(alias = "remarcada")]
    Rescheduled,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Scheduled => "scheduled",
            SessionStatus::Realized => "realized",
            SessionStatus::Cancelled => "cancelled",
            SessionStatus::Rescheduled => "rescheduled",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = BillingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" | "agendada" => Ok(SessionStatus::Scheduled),
            "realized" | "realizada" => Ok(SessionStatus::Realized),
            "cancelled" | "cancelada" => Ok(SessionStatus::Cancelled),
            "rescheduled" | "remarcada" => Ok(SessionStatus::Rescheduled),
            other => Err(BillingError::validation(format!(
                "unknown session status '{}'",
                other
            ))),
        }
    }
}

/// One scheduled session of a treatment package
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionAppointment {
    pub id: SessionAppointmentId,
    pub patient_id: PatientId,
    pub treatment_package_id: TreatmentPackageId,
    pub scheduled_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: Option<NaiveTime>,
    pub status: SessionStatus,
    /// 1-based position of this session within the package
    pub session_number: i32,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Scheduling request for a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionDraft {
    pub patient_id: PatientId,
    pub treatment_package_id: TreatmentPackageId,
    pub scheduled_date: NaiveDate,
    pub start_time: NaiveTime,
    #[serde(default)]
    pub end_time: Option<NaiveTime>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl SessionDraft {
    /// Validates the draft and numbers it within its package
    pub fn validate(
        self,
        session_number: i32,
        sessions_contracted: i32,
    ) -> Result<NewSessionAppointment, BillingError> {
        if let Some(end_time) = self.end_time {
            if end_time <= self.start_time {
                return Err(BillingError::validation("end time must be after start time"));
            }
        }
        if session_number <= 0 {
            return Err(BillingError::validation("session number must be greater than zero"));
        }
        if session_number > sessions_contracted {
            return Err(BillingError::validation(format!(
                "session number ({}) cannot exceed the contracted total ({})",
                session_number, sessions_contracted
            )));
        }

        Ok(NewSessionAppointment {
            patient_id: self.patient_id,
            treatment_package_id: self.treatment_package_id,
            scheduled_date: self.scheduled_date,
            start_time: self.start_time,
            end_time: self.end_time,
            status: SessionStatus::Scheduled,
            session_number,
            notes: self.notes,
        })
    }
}

/// A validated appointment waiting for an identifier
#[derive(Debug, Clone, PartialEq)]
pub struct NewSessionAppointment {
    pub patient_id: PatientId,
    pub treatment_package_id: TreatmentPackageId,
    pub scheduled_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: Option<NaiveTime>,
    pub status: SessionStatus,
    pub session_number: i32,
    pub notes: Option<String>,
}

impl NewSessionAppointment {
    pub fn into_appointment(self, id: SessionAppointmentId, now: DateTime<Utc>) -> SessionAppointment {
        SessionAppointment {
            id,
            patient_id: self.patient_id,
            treatment_package_id: self.treatment_package_id,
            scheduled_date: self.scheduled_date,
            start_time: self.start_time,
            end_time: self.end_time,
            status: self.status,
            session_number: self.session_number,
            notes: self.notes,
            created_at: now,
            updated_at: now,
        }
    }
}
