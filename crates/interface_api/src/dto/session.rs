//! Session appointment DTOs

use serde::Serialize;

use domain_billing::SessionAppointment;

use super::package::PackageResponse;

/// Outcome of marking a session realized
#[derive(Debug, Serialize)]
pub struct MarkRealizedResponse {
    pub session: SessionAppointment,
    /// The package after the realized count was applied
    pub package: PackageResponse,
}
