//! Treatment package handlers

use axum::{extract::State, http::StatusCode, Extension, Json};

use core_kernel::{PatientId, TreatmentPackageId};
use domain_billing::{TreatmentPackage, TreatmentPackageDraft, TreatmentPackagePatch};

use crate::auth::{permissions, require, Claims};
use crate::dto::package::PackageResponse;
use crate::dto::DeleteResponse;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath};
use crate::AppState;

fn responses(packages: Vec<TreatmentPackage>) -> Vec<PackageResponse> {
    packages.into_iter().map(PackageResponse::from).collect()
}

pub async fn list_packages(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<PackageResponse>>, ApiError> {
    require(&claims, permissions::PACKAGE_READ)?;
    Ok(Json(responses(state.packages.list().await?)))
}

/// Active packages with sessions left to schedule
pub async fn list_pending(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<PackageResponse>>, ApiError> {
    require(&claims, permissions::PACKAGE_READ)?;
    Ok(Json(responses(state.packages.list_pending().await?)))
}

pub async fn list_by_patient(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(patient_id): ApiPath<PatientId>,
) -> Result<Json<Vec<PackageResponse>>, ApiError> {
    require(&claims, permissions::PACKAGE_READ)?;
    Ok(Json(responses(state.packages.list_by_patient(patient_id).await?)))
}

pub async fn get_package(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(id): ApiPath<TreatmentPackageId>,
) -> Result<Json<PackageResponse>, ApiError> {
    require(&claims, permissions::PACKAGE_READ)?;
    Ok(Json(state.packages.get(id).await?.into()))
}

pub async fn create_package(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(draft): ApiJson<TreatmentPackageDraft>,
) -> Result<(StatusCode, Json<PackageResponse>), ApiError> {
    require(&claims, permissions::PACKAGE_WRITE)?;
    let package = state.packages.create(draft).await?;
    Ok((StatusCode::CREATED, Json(package.into())))
}

pub async fn update_package(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(id): ApiPath<TreatmentPackageId>,
    ApiJson(patch): ApiJson<TreatmentPackagePatch>,
) -> Result<Json<PackageResponse>, ApiError> {
    require(&claims, permissions::PACKAGE_WRITE)?;
    Ok(Json(state.packages.update(id, patch).await?.into()))
}

pub async fn delete_package(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(id): ApiPath<TreatmentPackageId>,
) -> Result<Json<DeleteResponse>, ApiError> {
    require(&claims, permissions::PACKAGE_WRITE)?;
    state.packages.delete(id).await?;
    Ok(Json(DeleteResponse::new("treatment package deleted")))
}

/// Consumes one session of the package quota
///
/// # Errors
///
/// * 400 when the quota is exhausted or the package is cancelled
/// * 404 when the package does not exist
pub async fn increment_session(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(id): ApiPath<TreatmentPackageId>,
) -> Result<Json<PackageResponse>, ApiError> {
    require(&claims, permissions::PACKAGE_WRITE)?;
    Ok(Json(state.packages.increment_session(id).await?.into()))
}
