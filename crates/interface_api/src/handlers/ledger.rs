//! Ledger entry handlers

use axum::{extract::State, http::StatusCode, Extension, Json};

use core_kernel::{ContractId, LedgerEntryId, SupplierId};
use domain_billing::{LedgerEntry, LedgerEntryDraft, LedgerEntryPatch};

use crate::auth::{permissions, require, Claims};
use crate::dto::ledger::{LedgerEntryOriginResponse, LedgerEntryQuery};
use crate::dto::DeleteResponse;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::AppState;

/// Lists entries, optionally filtered by origin and kind
pub async fn list_entries(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiQuery(query): ApiQuery<LedgerEntryQuery>,
) -> Result<Json<Vec<LedgerEntry>>, ApiError> {
    require(&claims, permissions::LEDGER_READ)?;
    let entries = state.ledger.list(query.into()).await?;
    Ok(Json(entries))
}

pub async fn get_entry(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(id): ApiPath<LedgerEntryId>,
) -> Result<Json<LedgerEntry>, ApiError> {
    require(&claims, permissions::LEDGER_READ)?;
    Ok(Json(state.ledger.get(id).await?))
}

/// Creates an entry
///
/// # Errors
///
/// * 400 when the origin keys do not name exactly one origin or a field is
///   invalid
/// * 404 when the referenced origin or budget category does not exist
pub async fn create_entry(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(draft): ApiJson<LedgerEntryDraft>,
) -> Result<(StatusCode, Json<LedgerEntry>), ApiError> {
    require(&claims, permissions::LEDGER_WRITE)?;
    let entry = state.ledger.create(draft).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn update_entry(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(id): ApiPath<LedgerEntryId>,
    ApiJson(patch): ApiJson<LedgerEntryPatch>,
) -> Result<Json<LedgerEntry>, ApiError> {
    require(&claims, permissions::LEDGER_WRITE)?;
    Ok(Json(state.ledger.update(id, patch).await?))
}

pub async fn delete_entry(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(id): ApiPath<LedgerEntryId>,
) -> Result<Json<DeleteResponse>, ApiError> {
    require(&claims, permissions::LEDGER_WRITE)?;
    state.ledger.delete(id).await?;
    Ok(Json(DeleteResponse::new("ledger entry deleted")))
}

/// Returns the entry with a readable description of its origin
pub async fn get_entry_origin(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(id): ApiPath<LedgerEntryId>,
) -> Result<Json<LedgerEntryOriginResponse>, ApiError> {
    require(&claims, permissions::LEDGER_READ)?;
    let (entry, origin) = state.ledger.resolve_origin(id).await?;
    Ok(Json(LedgerEntryOriginResponse {
        entry,
        origin: origin.into(),
    }))
}

pub async fn list_by_contract(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(contract_id): ApiPath<ContractId>,
) -> Result<Json<Vec<LedgerEntry>>, ApiError> {
    require(&claims, permissions::LEDGER_READ)?;
    Ok(Json(state.ledger.list_by_contract(contract_id).await?))
}

pub async fn list_by_supplier(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(supplier_id): ApiPath<SupplierId>,
) -> Result<Json<Vec<LedgerEntry>>, ApiError> {
    require(&claims, permissions::LEDGER_READ)?;
    Ok(Json(state.ledger.list_by_supplier(supplier_id).await?))
}
