//! Contract handlers

use axum::{extract::State, http::StatusCode, Extension, Json};

use core_kernel::ContractId;
use domain_billing::{Contract, ContractDraft, ContractPatch};

use crate::auth::{permissions, require, Claims};
use crate::dto::DeleteResponse;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath};
use crate::AppState;

pub async fn list_contracts(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Contract>>, ApiError> {
    require(&claims, permissions::CONTRACT_READ)?;
    Ok(Json(state.contracts.list().await?))
}

pub async fn get_contract(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(id): ApiPath<ContractId>,
) -> Result<Json<Contract>, ApiError> {
    require(&claims, permissions::CONTRACT_READ)?;
    Ok(Json(state.contracts.get(id).await?))
}

/// Creates a contract; its `CONT-` identifier is generated here and never changes
pub async fn create_contract(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(draft): ApiJson<ContractDraft>,
) -> Result<(StatusCode, Json<Contract>), ApiError> {
    require(&claims, permissions::CONTRACT_WRITE)?;
    let contract = state.contracts.create(draft).await?;
    Ok((StatusCode::CREATED, Json(contract)))
}

pub async fn update_contract(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(id): ApiPath<ContractId>,
    ApiJson(patch): ApiJson<ContractPatch>,
) -> Result<Json<Contract>, ApiError> {
    require(&claims, permissions::CONTRACT_WRITE)?;
    Ok(Json(state.contracts.update(id, patch).await?))
}

/// Deletes a contract that no ledger entry references
pub async fn delete_contract(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(id): ApiPath<ContractId>,
) -> Result<Json<DeleteResponse>, ApiError> {
    require(&claims, permissions::CONTRACT_WRITE)?;
    state.contracts.delete(id).await?;
    Ok(Json(DeleteResponse::new("contract deleted")))
}
