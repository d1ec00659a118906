//! Treatment packages and their session quota
//!
//! A package is a prepaid bundle of sessions for one patient. The quota state
//! machine is:
//!
//! ```text
//! Active ──(sessions_completed reaches sessions_contracted)──▶ Completed
//!   │
//!   └──(external cancellation)──▶ Cancelled
//! ```
//!
//! Both terminal states are final: nothing in this module moves a package
//! out of `Completed` or `Cancelled`.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use core_kernel::{Money, PatientId, TreatmentPackageId, TreatmentTypeId};

use crate::error::BillingError;
use crate::serde_ext::deserialize_some;

/// Package status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageStatus {
    #[default]
    #[serde(alias = "ativo")]
    Active,
    #[serde(alias = "concluido")]
    Completed,
    #[serde(alias = "cancelado")]
    Cancelled,
}

impl PackageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PackageStatus::Active => "active",
            PackageStatus::Completed => "completed",
            PackageStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for PackageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PackageStatus {
    type Err = BillingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" | "ativo" => Ok(PackageStatus::Active),
            "completed" | "concluido" => Ok(PackageStatus::Completed),
            "cancelled" | "cancelado" => Ok(PackageStatus::Cancelled),
            other => Err(BillingError::validation(format!(
                "package status must be active, completed or cancelled, got '{}'",
                other
            ))),
        }
    }
}

/// A prepaid bundle of treatment sessions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreatmentPackage {
    pub id: TreatmentPackageId,
    pub patient_id: PatientId,
    pub treatment_type_id: TreatmentTypeId,
    pub description: String,
    pub start_date: NaiveDate,
    pub sessions_contracted: i32,
    pub sessions_completed: i32,
    pub total_amount: Money,
    pub status: PackageStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TreatmentPackage {
    /// Sessions still available under the quota
    pub fn sessions_remaining(&self) -> i32 {
        self.sessions_contracted - self.sessions_completed
    }

    /// Share of the quota already used, as a percentage
    ///
    /// Returns 0 when no sessions were contracted.
    pub fn percent_complete(&self) -> f64 {
        if self.sessions_contracted == 0 {
            return 0.0;
        }
        f64::from(self.sessions_completed) / f64::from(self.sessions_contracted) * 100.0
    }

    /// Returns true if the quota is used up
    pub fn is_quota_exhausted(&self) -> bool {
        self.sessions_completed >= self.sessions_contracted
    }

    /// Active with at least one session left
    pub fn has_pending_sessions(&self) -> bool {
        self.status == PackageStatus::Active && !self.is_quota_exhausted()
    }

    /// Checks the package invariants
    ///
    /// # Errors
    ///
    /// Returns `BillingError::Validation` with the first rule that fails
    pub fn validate(&self) -> Result<(), BillingError> {
        validate_quota(self.sessions_contracted, self.sessions_completed, self.total_amount)
    }

    /// Consumes one session of the quota
    ///
    /// Completes the package when the last session is consumed.
    ///
    /// # Errors
    ///
    /// Returns `BillingError::DomainRule` if the package is cancelled or the
    /// quota is exhausted; the package is left unchanged in both cases.
    pub fn increment_session(&mut self) -> Result<(), BillingError> {
        if self.status == PackageStatus::Cancelled {
            return Err(BillingError::rule(format!(
                "treatment package {} is cancelled",
                self.id
            )));
        }
        if self.is_quota_exhausted() {
            return Err(BillingError::rule(format!(
                "treatment package {} has no sessions left ({} of {} used)",
                self.id, self.sessions_completed, self.sessions_contracted
            )));
        }

        self.sessions_completed += 1;
        if self.is_quota_exhausted() {
            debug!(package_id = %self.id, "Session quota reached, completing package");
            self.status = PackageStatus::Completed;
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Releases one session back to the quota, never going below zero
    pub fn decrement_session(&mut self) {
        self.sessions_completed = (self.sessions_completed - 1).max(0);
        self.updated_at = Utc::now();
    }

    /// Completes an active package once enough sessions were realized
    ///
    /// Returns true if the status changed.
    pub fn record_realized_sessions(&mut self, realized: i64) -> bool {
        if self.status == PackageStatus::Active && realized >= i64::from(self.sessions_contracted) {
            self.status = PackageStatus::Completed;
            self.updated_at = Utc::now();
            return true;
        }
        false
    }
}

fn validate_quota(contracted: i32, completed: i32, total_amount: Money) -> Result<(), BillingError> {
    if contracted <= 0 {
        return Err(BillingError::validation(
            "sessions contracted must be greater than zero",
        ));
    }
    if completed < 0 {
        return Err(BillingError::validation("sessions completed cannot be negative"));
    }
    if completed > contracted {
        return Err(BillingError::validation(
            "sessions completed cannot exceed sessions contracted",
        ));
    }
    if !total_amount.is_positive() {
        return Err(BillingError::validation(
            "package total amount must be greater than zero",
        ));
    }
    Ok(())
}

/// A validated package waiting for an identifier
#[derive(Debug, Clone, PartialEq)]
pub struct NewTreatmentPackage {
    pub patient_id: PatientId,
    pub treatment_type_id: TreatmentTypeId,
    pub description: String,
    pub start_date: NaiveDate,
    pub sessions_contracted: i32,
    pub sessions_completed: i32,
    pub total_amount: Money,
    pub status: PackageStatus,
    pub notes: Option<String>,
}

impl NewTreatmentPackage {
    pub fn into_package(self, id: TreatmentPackageId, now: DateTime<Utc>) -> TreatmentPackage {
        TreatmentPackage {
            id,
            patient_id: self.patient_id,
            treatment_type_id: self.treatment_type_id,
            description: self.description,
            start_date: self.start_date,
            sessions_contracted: self.sessions_contracted,
            sessions_completed: self.sessions_completed,
            total_amount: self.total_amount,
            status: self.status,
            notes: self.notes,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Creation request for a treatment package
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreatmentPackageDraft {
    pub patient_id: PatientId,
    pub treatment_type_id: TreatmentTypeId,
    pub description: String,
    pub start_date: NaiveDate,
    pub sessions_contracted: i32,
    #[serde(default)]
    pub sessions_completed: i32,
    pub total_amount: Decimal,
    #[serde(default)]
    pub status: PackageStatus,
    #[serde(default)]
    pub notes: Option<String>,
}

impl TreatmentPackageDraft {
    pub fn validate(self) -> Result<NewTreatmentPackage, BillingError> {
        let description = self.description.trim().to_string();
        if description.is_empty() {
            return Err(BillingError::validation("description is required"));
        }
        let total_amount = Money::new(self.total_amount);
        validate_quota(self.sessions_contracted, self.sessions_completed, total_amount)?;

        let status = if self.status == PackageStatus::Active
            && self.sessions_completed == self.sessions_contracted
        {
            PackageStatus::Completed
        } else {
            self.status
        };

        Ok(NewTreatmentPackage {
            patient_id: self.patient_id,
            treatment_type_id: self.treatment_type_id,
            description,
            start_date: self.start_date,
            sessions_contracted: self.sessions_contracted,
            sessions_completed: self.sessions_completed,
            total_amount,
            status,
            notes: self.notes,
        })
    }
}

/// Partial update of a treatment package
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TreatmentPackagePatch {
    #[serde(default)]
    pub patient_id: Option<PatientId>,
    #[serde(default)]
    pub treatment_type_id: Option<TreatmentTypeId>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub sessions_contracted: Option<i32>,
    #[serde(default)]
    pub sessions_completed: Option<i32>,
    #[serde(default)]
    pub total_amount: Option<Decimal>,
    #[serde(default)]
    pub status: Option<PackageStatus>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub notes: Option<Option<String>>,
}

impl TreatmentPackagePatch {
    /// Applies the patch and re-validates the whole package
    ///
    /// An active package whose quota ends up exhausted is completed.
    ///
    /// # Errors
    ///
    /// Returns `BillingError::DomainRule` if the patch moves a completed or
    /// cancelled package to another status, and `BillingError::Validation`
    /// if the patched package breaks a quota rule.
    pub fn apply(&self, package: &TreatmentPackage) -> Result<TreatmentPackage, BillingError> {
        if let Some(status) = self.status {
            if package.status != PackageStatus::Active && status != package.status {
                return Err(BillingError::rule(format!(
                    "treatment package {} is {} and cannot become {}",
                    package.id, package.status, status
                )));
            }
        }

        let mut updated = package.clone();
        if let Some(patient_id) = self.patient_id {
            updated.patient_id = patient_id;
        }
        if let Some(treatment_type_id) = self.treatment_type_id {
            updated.treatment_type_id = treatment_type_id;
        }
        if let Some(ref description) = self.description {
            let description = description.trim();
            if description.is_empty() {
                return Err(BillingError::validation("description is required"));
            }
            updated.description = description.to_string();
        }
        if let Some(start_date) = self.start_date {
            updated.start_date = start_date;
        }
        if let Some(sessions_contracted) = self.sessions_contracted {
            updated.sessions_contracted = sessions_contracted;
        }
        if let Some(sessions_completed) = self.sessions_completed {
            updated.sessions_completed = sessions_completed;
        }
        if let Some(total_amount) = self.total_amount {
            updated.total_amount = Money::new(total_amount);
        }
        if let Some(status) = self.status {
            updated.status = status;
        }
        if let Some(ref notes) = self.notes {
            updated.notes = notes.clone();
        }

        updated.validate()?;
        if updated.status == PackageStatus::Active && updated.is_quota_exhausted() {
            debug!(package_id = %updated.id, "Patched quota is exhausted, completing package");
            updated.status = PackageStatus::Completed;
        }
        updated.updated_at = Utc::now();
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn package(contracted: i32, completed: i32) -> TreatmentPackage {
        TreatmentPackageDraft {
            patient_id: PatientId::new(1),
            treatment_type_id: TreatmentTypeId::new(1),
            description: "Microagulhamento facial".to_string(),
            start_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            sessions_contracted: contracted,
            sessions_completed: completed,
            total_amount: dec!(1200.00),
            status: PackageStatus::Active,
            notes: None,
        }
        .validate()
        .unwrap()
        .into_package(TreatmentPackageId::new(7), Utc::now())
    }

    #[test]
    fn test_derived_values() {
        let p = package(10, 4);
        assert_eq!(p.sessions_remaining(), 6);
        assert!((p.percent_complete() - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_percent_complete_zero_quota() {
        let mut p = package(1, 0);
        p.sessions_contracted = 0;
        assert_eq!(p.percent_complete(), 0.0);
    }

    #[test]
    fn test_last_increment_completes_package() {
        let mut p = package(5, 4);
        p.increment_session().unwrap();
        assert_eq!(p.sessions_completed, 5);
        assert_eq!(p.status, PackageStatus::Completed);
    }

    #[test]
    fn test_increment_on_exhausted_quota_leaves_state() {
        let mut p = package(5, 5);
        let before = p.clone();
        let err = p.increment_session().unwrap_err();
        assert!(matches!(err, BillingError::DomainRule(_)));
        assert_eq!(p, before);
    }

    #[test]
    fn test_increment_on_cancelled_package_fails() {
        let mut p = package(5, 1);
        p.status = PackageStatus::Cancelled;
        assert!(matches!(p.increment_session(), Err(BillingError::DomainRule(_))));
        assert_eq!(p.sessions_completed, 1);
    }

    #[test]
    fn test_decrement_floors_at_zero() {
        let mut p = package(5, 0);
        p.decrement_session();
        assert_eq!(p.sessions_completed, 0);
    }

    #[test]
    fn test_decrement_does_not_reopen() {
        let mut p = package(2, 1);
        p.increment_session().unwrap();
        p.decrement_session();
        assert_eq!(p.sessions_completed, 1);
        assert_eq!(p.status, PackageStatus::Completed);
    }

    #[test]
    fn test_realized_count_completes_active_only() {
        let mut p = package(3, 3);
        p.status = PackageStatus::Cancelled;
        assert!(!p.record_realized_sessions(3));
        assert_eq!(p.status, PackageStatus::Cancelled);

        let mut q = package(3, 3);
        assert!(!q.record_realized_sessions(2));
        assert!(q.record_realized_sessions(3));
        assert_eq!(q.status, PackageStatus::Completed);
    }

    #[test]
    fn test_validate_rules() {
        let mut p = package(5, 0);
        p.sessions_completed = 6;
        assert!(p.validate().is_err());

        let mut p = package(5, 0);
        p.total_amount = Money::zero();
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_unknown_status_rejected() {
        assert!("pausado".parse::<PackageStatus>().is_err());
        assert_eq!("concluido".parse::<PackageStatus>().unwrap(), PackageStatus::Completed);
    }

    #[test]
    fn test_patch_revalidates() {
        let p = package(5, 3);
        let patch = TreatmentPackagePatch {
            sessions_contracted: Some(2),
            ..Default::default()
        };
        assert!(patch.apply(&p).is_err());
    }

    #[test]
    fn test_patch_exhausting_quota_completes_package() {
        let p = package(4, 3);
        let patch = TreatmentPackagePatch {
            sessions_completed: Some(4),
            ..Default::default()
        };

        let updated = patch.apply(&p).unwrap();
        assert_eq!(updated.sessions_completed, 4);
        assert_eq!(updated.status, PackageStatus::Completed);
    }

    #[test]
    fn test_patch_cannot_reopen_terminal_package() {
        let completed = package(4, 4);
        assert_eq!(completed.status, PackageStatus::Completed);
        let reopen = TreatmentPackagePatch {
            status: Some(PackageStatus::Active),
            ..Default::default()
        };
        assert!(matches!(reopen.apply(&completed), Err(BillingError::DomainRule(_))));

        let mut cancelled = package(4, 1);
        cancelled.status = PackageStatus::Cancelled;
        assert!(matches!(reopen.apply(&cancelled), Err(BillingError::DomainRule(_))));

        let complete = TreatmentPackagePatch {
            status: Some(PackageStatus::Completed),
            ..Default::default()
        };
        assert!(matches!(complete.apply(&cancelled), Err(BillingError::DomainRule(_))));
    }

    #[test]
    fn test_patch_on_terminal_package_keeps_status() {
        let completed = package(4, 4);
        let patch = TreatmentPackagePatch {
            status: Some(PackageStatus::Completed),
            notes: Some(Some("Alta".to_string())),
            sessions_completed: Some(3),
            ..Default::default()
        };

        let updated = patch.apply(&completed).unwrap();
        assert_eq!(updated.status, PackageStatus::Completed);
        assert_eq!(updated.notes.as_deref(), Some("Alta"));
    }

    #[test]
    fn test_patch_can_cancel_active_package() {
        let p = package(4, 1);
        let patch = TreatmentPackagePatch {
            status: Some(PackageStatus::Cancelled),
            ..Default::default()
        };
        assert_eq!(patch.apply(&p).unwrap().status, PackageStatus::Cancelled);
    }
}
