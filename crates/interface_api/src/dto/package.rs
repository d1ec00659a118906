//! Treatment package DTOs

use serde::Serialize;

use domain_billing::TreatmentPackage;

/// A package with its derived progress values
#[derive(Debug, Serialize)]
pub struct PackageResponse {
    #[serde(flatten)]
    pub package: TreatmentPackage,
    pub sessions_remaining: i32,
    pub percent_complete: f64,
}

impl From<TreatmentPackage> for PackageResponse {
    fn from(package: TreatmentPackage) -> Self {
        Self {
            sessions_remaining: package.sessions_remaining(),
            percent_complete: package.percent_complete(),
            package,
        }
    }
}
