//! Boleto handlers

use axum::{extract::State, http::StatusCode, Extension, Json};
use tracing::info;
use validator::Validate;

use core_kernel::LedgerEntryId;
use domain_billing::Invoice;

use crate::auth::{permissions, require, Claims};
use crate::dto::boleto::EmitBoletoRequest;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath};
use crate::AppState;

/// Issues the boleto of a ledger entry
///
/// Answers 201 with the new boleto, or 200 with the stored one when the entry
/// was already invoiced. The provider is called at most once per entry.
///
/// # Errors
///
/// * 400 for missing or blank fields and entries that cannot be invoiced
/// * 404 when the ledger entry does not exist
/// * 500 with the provider status and body when issuance fails
pub async fn issue_boleto(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(request): ApiJson<EmitBoletoRequest>,
) -> Result<(StatusCode, Json<Invoice>), ApiError> {
    require(&claims, permissions::BOLETO_ISSUE)?;
    request.validate()?;

    let outcome = state.boletos.issue(request.into()).await?;
    let status = if outcome.is_new() {
        StatusCode::CREATED
    } else {
        info!(ledger_entry_id = %outcome.invoice().ledger_entry_id, "Returning existing boleto");
        StatusCode::OK
    };
    Ok((status, Json(outcome.into_invoice())))
}

pub async fn list_boletos(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Invoice>>, ApiError> {
    require(&claims, permissions::LEDGER_READ)?;
    Ok(Json(state.boletos.list().await?))
}

/// Returns the boleto issued for a ledger entry
pub async fn get_by_ledger_entry(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiPath(ledger_entry_id): ApiPath<LedgerEntryId>,
) -> Result<Json<Invoice>, ApiError> {
    require(&claims, permissions::LEDGER_READ)?;
    state
        .boletos
        .find_by_ledger_entry(ledger_entry_id)
        .await?
        .map(Json)
        .ok_or_else(|| {
            ApiError::NotFound(format!("no boleto for ledger entry {}", ledger_entry_id))
        })
}
