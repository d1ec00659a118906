//! HTTP API Layer
//!
//! This crate provides the REST API of the clinic billing core using Axum.
//!
//! # Architecture
//!
//! - **Handlers**: Request handlers for each resource
//! - **Middleware**: JWT authentication and audit logging
//! - **DTOs**: Query strings and response shapes the domain does not define
//! - **Error Handling**: `ApiError` turns billing errors into status codes
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::{create_router, AppState};
//!
//! let state = AppState::postgres(pool, config)?;
//! axum::serve(listener, create_router(state)).await?;
//! ```

pub mod auth;
pub mod config;
pub mod dto;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;

use std::sync::Arc;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use core_kernel::{HealthCheckable, PortError};
use domain_billing::{
    BillingPorts, BoletoProviderPort, ContractService, CoraBoletoProvider, InvoiceIssuanceService,
    LedgerService, SessionService, TreatmentPackageService,
};
use infra_db::{DatabasePool, PostgresBillingAdapter};

use crate::config::ApiConfig;
use crate::handlers::{boletos, contracts, health, ledger, packages, sessions};
use crate::middleware::{audit_middleware, auth_middleware};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub ledger: LedgerService,
    pub contracts: ContractService,
    pub packages: TreatmentPackageService,
    pub sessions: SessionService,
    pub boletos: InvoiceIssuanceService,
    /// Storage probe used by the readiness endpoint
    pub health: Arc<dyn HealthCheckable>,
}

impl AppState {
    /// Builds the services over the given ports and provider
    pub fn new(
        ports: BillingPorts,
        provider: Arc<dyn BoletoProviderPort>,
        health: Arc<dyn HealthCheckable>,
        config: ApiConfig,
    ) -> Self {
        let boletos = InvoiceIssuanceService::new(ports.clone(), provider)
            .with_default_state(config.provider.default_state.clone());
        Self {
            ledger: LedgerService::new(ports.clone()),
            contracts: ContractService::new(ports.clone()),
            packages: TreatmentPackageService::new(ports.clone()),
            sessions: SessionService::new(ports),
            boletos,
            health,
            config,
        }
    }

    /// Wires PostgreSQL storage and the Cora provider from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the provider's client certificate or key cannot
    /// be loaded
    pub fn postgres(pool: DatabasePool, config: ApiConfig) -> Result<Self, PortError> {
        let adapter = Arc::new(PostgresBillingAdapter::new(pool));
        let provider = Arc::new(CoraBoletoProvider::new(
            config.provider.to_provider_config(),
        )?);
        Ok(Self::new(
            BillingPorts::from_adapter(adapter.clone()),
            provider,
            adapter,
            config,
        ))
    }
}

/// Creates the main API router
///
/// # Arguments
///
/// * `state` - Services and configuration shared by the handlers
///
/// # Returns
///
/// Configured Axum router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    let ledger_routes = Router::new()
        .route("/", get(ledger::list_entries).post(ledger::create_entry))
        .route(
            "/:id",
            get(ledger::get_entry)
                .put(ledger::update_entry)
                .delete(ledger::delete_entry),
        )
        .route("/:id/origin", get(ledger::get_entry_origin))
        .route("/contract/:id", get(ledger::list_by_contract))
        .route("/supplier/:id", get(ledger::list_by_supplier));

    let contract_routes = Router::new()
        .route("/", get(contracts::list_contracts).post(contracts::create_contract))
        .route(
            "/:id",
            get(contracts::get_contract)
                .put(contracts::update_contract)
                .delete(contracts::delete_contract),
        );

    let package_routes = Router::new()
        .route("/", get(packages::list_packages).post(packages::create_package))
        .route("/pendentes", get(packages::list_pending))
        .route("/paciente/:id", get(packages::list_by_patient))
        .route(
            "/:id",
            get(packages::get_package)
                .put(packages::update_package)
                .delete(packages::delete_package),
        )
        .route("/:id/incrementar-sessao", post(packages::increment_session));

    let session_routes = Router::new()
        .route("/", post(sessions::schedule_session))
        .route(
            "/:id",
            get(sessions::get_session).delete(sessions::delete_session),
        )
        .route("/pacote/:id", get(sessions::list_by_package))
        .route("/:id/marcar-realizada", post(sessions::mark_realized));

    let boleto_routes = Router::new()
        .route("/", get(boletos::list_boletos))
        .route("/emitir", post(boletos::issue_boleto))
        .route("/lancamento/:id", get(boletos::get_by_ledger_entry));

    // Protected API routes
    let api_routes = Router::new()
        .nest("/ledger-entries", ledger_routes)
        .nest("/contracts", contract_routes)
        .nest("/pacotes-tratamento", package_routes)
        .nest("/agendamentos-sessao", session_routes)
        .nest("/boletos", boleto_routes)
        .layer(
            ServiceBuilder::new()
                .layer(axum_middleware::from_fn_with_state(
                    state.clone(),
                    auth_middleware,
                ))
                .layer(axum_middleware::from_fn(audit_middleware)),
        );

    // Combine all routes
    Router::new()
        .merge(public_routes)
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
