//! Session appointment handlers

use axum::{extract::State, http::StatusCode, Extension, Json};

use core_kernel::{SessionAppointmentId, TreatmentPackageId};
use domain_billing::{SessionAppointment, SessionDraft};

use crate::auth::{permissions, require, Claims};
use crate::dto::session::MarkRealizedResponse;
use crate::dto::DeleteResponse;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath};
use crate::AppState;

/// Schedules a session, consuming one unit of the package quota
pub async fn schedule_session(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(draft): ApiJson<SessionDraft>,
) -> Result<(StatusCode, Json<SessionAppointment>), ApiError> {
    require(&claims, permissions::SESSION_WRITE)?;
    let session = state.sessions.schedule(draft).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

pub async fn get_session(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(id): ApiPath<SessionAppointmentId>,
) -> Result<Json<SessionAppointment>, ApiError> {
    require(&claims, permissions::PACKAGE_READ)?;
    Ok(Json(state.sessions.get(id).await?))
}

pub async fn list_by_package(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(package_id): ApiPath<TreatmentPackageId>,
) -> Result<Json<Vec<SessionAppointment>>, ApiError> {
    require(&claims, permissions::PACKAGE_READ)?;
    Ok(Json(state.sessions.list_by_package(package_id).await?))
}

/// Deletes a session and releases its quota unit
pub async fn delete_session(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(id): ApiPath<SessionAppointmentId>,
) -> Result<Json<DeleteResponse>, ApiError> {
    require(&claims, permissions::SESSION_WRITE)?;
    state.sessions.delete(id).await?;
    Ok(Json(DeleteResponse::new("session deleted")))
}

pub async fn mark_realized(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(id): ApiPath<SessionAppointmentId>,
) -> Result<Json<MarkRealizedResponse>, ApiError> {
    require(&claims, permissions::SESSION_WRITE)?;
    let (session, package) = state.sessions.mark_realized(id).await?;
    Ok(Json(MarkRealizedResponse {
        session,
        package: package.into(),
    }))
}
