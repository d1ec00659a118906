//! Cora Boleto Provider Adapter
//!
//! Issues boletos through the Cora invoicing API. Every call is made over
//! mutual TLS with the clinic's client certificate; invoice creation also
//! needs a bearer token obtained with the `client_credentials` grant.
//!
//! # Token cache
//!
//! The adapter owns its token. A cached token is reused until
//! `expires_in - token_safety_margin_secs` seconds after it was issued. The
//! cache lock is held across a refresh, so concurrent callers trigger a
//! single token request.
//!
//! # Error Handling
//!
//! Provider responses are mapped to `PortError` variants:
//! - token request not answered with 200 -> `PortError::Unauthorized`
//! - invoice request not answered with 200/201 -> `PortError::Upstream`
//! - client timeout -> `PortError::Timeout`
//! - other transport failures -> `PortError::Connection`

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Utc};
use reqwest::{Client, Identity, StatusCode};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument};

use core_kernel::{DomainPort, PortError};

use crate::invoice::{BoletoRequest, IssuedBoleto};
use crate::ports::BoletoProviderPort;

/// Token lifetime assumed when the provider omits `expires_in`
const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

/// Configuration for the Cora adapter
#[derive(Debug, Clone)]
pub struct BoletoProviderConfig {
    /// Base URL of the API (e.g., "https://matls-clients.api.stage.cora.com.br")
    pub base_url: String,

    /// Path of the token endpoint
    pub token_path: String,

    /// Path of the invoice creation endpoint
    pub invoice_path: String,

    /// Integration client identifier
    pub client_id: String,

    /// PEM client certificate
    pub certificate_path: Option<PathBuf>,

    /// PEM private key matching the certificate
    pub private_key_path: Option<PathBuf>,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Seconds subtracted from the token lifetime before it is refreshed
    pub token_safety_margin_secs: i64,
}

impl Default for BoletoProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://matls-clients.api.stage.cora.com.br".to_string(),
            token_path: "/token/".to_string(),
            invoice_path: "/v2/invoices".to_string(),
            client_id: String::new(),
            certificate_path: None,
            private_key_path: None,
            timeout_secs: 30,
            token_safety_margin_secs: 60,
        }
    }
}

impl BoletoProviderConfig {
    pub fn new(base_url: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client_id: client_id.into(),
            ..Self::default()
        }
    }

    /// Sets the client certificate and key used for mutual TLS
    pub fn with_client_identity(
        mut self,
        certificate_path: impl Into<PathBuf>,
        private_key_path: impl Into<PathBuf>,
    ) -> Self {
        self.certificate_path = Some(certificate_path.into());
        self.private_key_path = Some(private_key_path.into());
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn with_token_safety_margin_secs(mut self, margin: i64) -> Self {
        self.token_safety_margin_secs = margin;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

/// An access token and the instant after which it must not be reused
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedToken {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

impl CachedToken {
    /// Builds the cache entry for a token issued at `issued_at`
    pub fn issued(
        access_token: impl Into<String>,
        issued_at: DateTime<Utc>,
        expires_in_secs: i64,
        safety_margin_secs: i64,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            expires_at: issued_at + ChronoDuration::seconds(expires_in_secs - safety_margin_secs),
        }
    }

    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Boleto provider backed by the Cora HTTPS API
pub struct CoraBoletoProvider {
    config: BoletoProviderConfig,
    client: Client,
    token: Mutex<Option<CachedToken>>,
}

impl CoraBoletoProvider {
    /// Builds the HTTP client, loading the client identity if configured
    ///
    /// # Errors
    ///
    /// `PortError::Internal` if the certificate or key cannot be read or
    /// parsed, or the client cannot be built
    pub fn new(config: BoletoProviderConfig) -> Result<Self, PortError> {
        let mut builder = Client::builder().timeout(Duration::from_secs(config.timeout_secs));

        match (&config.certificate_path, &config.private_key_path) {
            (Some(certificate), Some(key)) => {
                builder = builder.identity(load_identity(certificate, key)?);
            }
            (None, None) => {
                debug!("No client certificate configured for the boleto provider");
            }
            _ => {
                return Err(PortError::internal(
                    "boleto provider needs both a certificate and a private key",
                ));
            }
        }

        let client = builder
            .build()
            .map_err(|e| PortError::internal(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            config,
            client,
            token: Mutex::new(None),
        })
    }

    /// Returns a valid access token, refreshing it when needed
    async fn access_token(&self) -> Result<String, PortError> {
        let mut cached = self.token.lock().await;

        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(Utc::now())) {
            debug!(expires_at = %token.expires_at, "Reusing cached provider token");
            return Ok(token.access_token.clone());
        }

        let token = self.request_token().await?;
        let access_token = token.access_token.clone();
        *cached = Some(token);
        Ok(access_token)
    }

    #[instrument(skip(self), fields(client_id = %self.config.client_id))]
    async fn request_token(&self) -> Result<CachedToken, PortError> {
        let url = self.config.url(&self.config.token_path);
        let issued_at = Utc::now();

        let response = self
            .client
            .post(&url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.config.client_id.as_str()),
            ])
            .send()
            .await
            .map_err(|e| self.transport_error("token request", e))?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            error!(provider_status = status.as_u16(), "Provider token request rejected");
            return Err(PortError::Unauthorized {
                message: format!("token request returned {}: {}", status.as_u16(), body),
            });
        }

        let token: TokenResponse = response.json().await.map_err(|e| PortError::Unauthorized {
            message: format!("malformed token response: {}", e),
        })?;

        let expires_in = token.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS);
        info!(expires_in, "Provider token refreshed");
        Ok(CachedToken::issued(
            token.access_token,
            issued_at,
            expires_in,
            self.config.token_safety_margin_secs,
        ))
    }

    fn transport_error(&self, operation: &str, e: reqwest::Error) -> PortError {
        if e.is_timeout() {
            PortError::Timeout {
                operation: operation.to_string(),
                duration_ms: self.config.timeout_secs * 1000,
            }
        } else {
            PortError::Connection {
                message: format!("{} failed: {}", operation, e),
                source: Some(Box::new(e)),
            }
        }
    }
}

fn load_identity(certificate: &Path, key: &Path) -> Result<Identity, PortError> {
    let mut pem = std::fs::read(certificate).map_err(|e| {
        PortError::internal(format!(
            "failed to read client certificate {}: {}",
            certificate.display(),
            e
        ))
    })?;
    let key_pem = std::fs::read(key).map_err(|e| {
        PortError::internal(format!("failed to read private key {}: {}", key.display(), e))
    })?;
    pem.push(b'\n');
    pem.extend_from_slice(&key_pem);

    Identity::from_pem(&pem)
        .map_err(|e| PortError::internal(format!("invalid client identity: {}", e)))
}

impl DomainPort for CoraBoletoProvider {}

#[async_trait]
impl BoletoProviderPort for CoraBoletoProvider {
    #[instrument(skip(self, request), fields(code = %request.code))]
    async fn issue_boleto(&self, request: &BoletoRequest) -> Result<IssuedBoleto, PortError> {
        let token = self.access_token().await?;
        let url = self.config.url(&self.config.invoice_path);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&token)
            .header("Idempotency-Key", request.idempotency_key.to_string())
            .json(&InvoicePayload::from(request))
            .send()
            .await
            .map_err(|e| self.transport_error("invoice request", e))?;

        let status = response.status();
        if status != StatusCode::OK && status != StatusCode::CREATED {
            let body = response.text().await.unwrap_or_default();
            error!(provider_status = status.as_u16(), body = %body, "Provider rejected invoice");
            return Err(PortError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let invoice: InvoiceResponse = response.json().await.map_err(|e| PortError::Upstream {
            status: status.as_u16(),
            body: format!("malformed invoice response: {}", e),
        })?;
        let slip = invoice.payment_options.bank_slip;

        debug!(external_invoice_id = ?invoice.id, "Provider accepted invoice");
        Ok(IssuedBoleto {
            external_invoice_id: invoice.id,
            barcode: slip.barcode,
            digitable_line: slip.digitable,
            pdf_link: slip.url,
        })
    }
}

// ============================================================================
// Wire format
// ============================================================================

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

#[derive(Debug, Serialize)]
struct InvoicePayload<'a> {
    code: &'a str,
    customer: CustomerPayload<'a>,
    services: Vec<ServicePayload<'a>>,
    payment_terms: PaymentTermsPayload,
    notifications: NotificationsPayload<'a>,
}

#[derive(Debug, Serialize)]
struct CustomerPayload<'a> {
    name: &'a str,
    email: Option<&'a str>,
    document: DocumentPayload<'a>,
    address: AddressPayload<'a>,
}

#[derive(Debug, Serialize)]
struct DocumentPayload<'a> {
    identity: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct AddressPayload<'a> {
    street: &'a str,
    number: &'a str,
    district: &'a str,
    city: &'a str,
    state: &'a str,
    complement: &'a str,
    zip_code: &'a str,
}

#[derive(Debug, Serialize)]
struct ServicePayload<'a> {
    name: &'a str,
    description: &'a str,
    amount: i64,
}

#[derive(Debug, Serialize)]
struct PaymentTermsPayload {
    due_date: NaiveDate,
}

#[derive(Debug, Serialize)]
struct NotificationsPayload<'a> {
    channels: [&'static str; 1],
    destination: DestinationPayload<'a>,
    rules: [&'static str; 1],
}

#[derive(Debug, Serialize)]
struct DestinationPayload<'a> {
    name: &'a str,
    email: Option<&'a str>,
}

impl<'a> From<&'a BoletoRequest> for InvoicePayload<'a> {
    fn from(request: &'a BoletoRequest) -> Self {
        let customer = &request.customer;
        let address = &customer.address;
        Self {
            code: &request.code,
            customer: CustomerPayload {
                name: &customer.name,
                email: customer.email.as_deref(),
                document: DocumentPayload {
                    identity: &customer.document,
                    kind: "CPF",
                },
                address: AddressPayload {
                    street: &address.street,
                    number: &address.number,
                    district: &address.district,
                    city: &address.city,
                    state: &address.state,
                    complement: &address.complement,
                    zip_code: &address.zip_code,
                },
            },
            services: vec![ServicePayload {
                name: &request.service.name,
                description: &request.service.description,
                amount: request.service.amount_minor,
            }],
            payment_terms: PaymentTermsPayload {
                due_date: request.due_date,
            },
            notifications: NotificationsPayload {
                channels: ["EMAIL"],
                destination: DestinationPayload {
                    name: &customer.name,
                    email: customer.email.as_deref(),
                },
                rules: ["NOTIFY_TWO_DAYS_BEFORE_DUE_DATE"],
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct InvoiceResponse {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    payment_options: PaymentOptions,
}

#[derive(Debug, Default, Deserialize)]
struct PaymentOptions {
    #[serde(default)]
    bank_slip: BankSlip,
}

#[derive(Debug, Default, Deserialize)]
struct BankSlip {
    barcode: Option<String>,
    digitable: Option<String>,
    url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoice::{BoletoAddress, BoletoCustomer, BoletoService};
    use axum::extract::State;
    use axum::http::{HeaderMap, StatusCode as HttpStatus};
    use axum::routing::post;
    use axum::{Form, Json, Router};
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use uuid::Uuid;

    #[derive(Default)]
    struct Stub {
        token_calls: AtomicUsize,
        invoice_calls: AtomicUsize,
        expires_in: i64,
        token_delay: Duration,
        reject_token: bool,
        reject_invoice: bool,
        token_form: Mutex<Option<HashMap<String, String>>>,
        invoice_headers: Mutex<Option<HeaderMap>>,
        invoice_body: Mutex<Option<Value>>,
    }

    async fn token(
        State(stub): State<Arc<Stub>>,
        Form(form): Form<HashMap<String, String>>,
    ) -> (HttpStatus, Json<Value>) {
        let n = stub.token_calls.fetch_add(1, Ordering::SeqCst) + 1;
        *stub.token_form.lock().await = Some(form);
        if !stub.token_delay.is_zero() {
            tokio::time::sleep(stub.token_delay).await;
        }
        if stub.reject_token {
            return (HttpStatus::UNAUTHORIZED, Json(json!({"error": "invalid_client"})));
        }
        (
            HttpStatus::OK,
            Json(json!({"access_token": format!("token-{n}"), "expires_in": stub.expires_in})),
        )
    }

    async fn invoice(
        State(stub): State<Arc<Stub>>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> (HttpStatus, Json<Value>) {
        stub.invoice_calls.fetch_add(1, Ordering::SeqCst);
        *stub.invoice_headers.lock().await = Some(headers);
        *stub.invoice_body.lock().await = Some(body);
        if stub.reject_invoice {
            return (HttpStatus::BAD_REQUEST, Json(json!({"message": "invalid zip_code"})));
        }
        (
            HttpStatus::CREATED,
            Json(json!({
                "id": "inv_abc123",
                "payment_options": {
                    "bank_slip": {
                        "barcode": "23791234500000150050",
                        "digitable": "23790.12345 60000.000000 00000.000000 1 00000000150050",
                        "url": "https://stage.cora.com.br/boletos/inv_abc123.pdf"
                    }
                }
            })),
        )
    }

    async fn spawn_stub(stub: Stub) -> (Arc<Stub>, String) {
        let stub = Arc::new(stub);
        let app = Router::new()
            .route("/token/", post(token))
            .route("/v2/invoices", post(invoice))
            .with_state(stub.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (stub, format!("http://{}", addr))
    }

    fn provider(base_url: &str) -> CoraBoletoProvider {
        CoraBoletoProvider::new(BoletoProviderConfig::new(base_url, "int-test-client")).unwrap()
    }

    fn boleto_request() -> BoletoRequest {
        BoletoRequest {
            code: "LANC-42".to_string(),
            idempotency_key: Uuid::new_v5(&Uuid::NAMESPACE_OID, b"LANC-42"),
            customer: BoletoCustomer {
                name: "Ana Souza".to_string(),
                email: Some("ana@example.com".to_string()),
                document: "12345678909".to_string(),
                address: BoletoAddress {
                    street: "Rua das Flores".to_string(),
                    number: "100".to_string(),
                    district: "Centro".to_string(),
                    city: "Campinas".to_string(),
                    state: "SP".to_string(),
                    complement: "N/A".to_string(),
                    zip_code: "13010100".to_string(),
                },
            },
            service: BoletoService {
                name: "Microagulhamento".to_string(),
                description: "Sessão 1 de 4".to_string(),
                amount_minor: 150050,
            },
            due_date: NaiveDate::from_ymd_opt(2024, 6, 10).unwrap(),
        }
    }

    #[test]
    fn test_cached_token_freshness() {
        let issued_at = Utc::now();
        let token = CachedToken::issued("t", issued_at, 3600, 60);
        assert!(token.is_fresh(issued_at + ChronoDuration::seconds(3539)));
        assert!(!token.is_fresh(issued_at + ChronoDuration::seconds(3540)));
    }

    #[test]
    fn test_identity_requires_both_files() {
        let mut config = BoletoProviderConfig::new("http://localhost", "id");
        config.certificate_path = Some(PathBuf::from("/nonexistent/cert.pem"));
        assert!(CoraBoletoProvider::new(config).is_err());
    }

    #[tokio::test]
    async fn test_issue_sends_expected_payload() {
        let (stub, base_url) = spawn_stub(Stub {
            expires_in: 3600,
            ..Default::default()
        })
        .await;

        let boleto = provider(&base_url).issue_boleto(&boleto_request()).await.unwrap();

        assert_eq!(boleto.external_invoice_id.as_deref(), Some("inv_abc123"));
        assert_eq!(boleto.barcode.as_deref(), Some("23791234500000150050"));
        assert!(boleto.digitable_line.is_some());
        assert!(boleto.pdf_link.unwrap().ends_with(".pdf"));

        let form = stub.token_form.lock().await.clone().unwrap();
        assert_eq!(form["grant_type"], "client_credentials");
        assert_eq!(form["client_id"], "int-test-client");

        let headers = stub.invoice_headers.lock().await.clone().unwrap();
        assert_eq!(headers["authorization"], "Bearer token-1");
        assert_eq!(
            headers["idempotency-key"],
            boleto_request().idempotency_key.to_string().as_str()
        );

        let body = stub.invoice_body.lock().await.clone().unwrap();
        assert_eq!(body["code"], "LANC-42");
        assert_eq!(body["services"][0]["amount"], 150050);
        assert_eq!(body["customer"]["document"]["type"], "CPF");
        assert_eq!(body["customer"]["document"]["identity"], "12345678909");
        assert_eq!(body["payment_terms"]["due_date"], "2024-06-10");
        assert_eq!(body["notifications"]["channels"][0], "EMAIL");
        assert_eq!(body["notifications"]["rules"][0], "NOTIFY_TWO_DAYS_BEFORE_DUE_DATE");
    }

    #[tokio::test]
    async fn test_token_is_reused_while_fresh() {
        let (stub, base_url) = spawn_stub(Stub {
            expires_in: 3600,
            ..Default::default()
        })
        .await;
        let provider = provider(&base_url);

        provider.issue_boleto(&boleto_request()).await.unwrap();
        provider.issue_boleto(&boleto_request()).await.unwrap();

        assert_eq!(stub.token_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_issues_share_one_token_request() {
        let (stub, base_url) = spawn_stub(Stub {
            expires_in: 3600,
            token_delay: Duration::from_millis(100),
            ..Default::default()
        })
        .await;
        let provider = provider(&base_url);
        let request = boleto_request();

        let (a, b, c, d) = tokio::join!(
            provider.issue_boleto(&request),
            provider.issue_boleto(&request),
            provider.issue_boleto(&request),
            provider.issue_boleto(&request),
        );
        for result in [a, b, c, d] {
            assert!(result.is_ok());
        }

        assert_eq!(stub.token_calls.load(Ordering::SeqCst), 1);
        assert_eq!(stub.invoice_calls.load(Ordering::SeqCst), 4);
        let headers = stub.invoice_headers.lock().await.clone().unwrap();
        assert_eq!(headers["authorization"], "Bearer token-1");
    }

    #[tokio::test]
    async fn test_token_inside_safety_margin_is_refreshed() {
        let (stub, base_url) = spawn_stub(Stub {
            expires_in: 30,
            ..Default::default()
        })
        .await;
        let provider = provider(&base_url);

        provider.issue_boleto(&boleto_request()).await.unwrap();
        provider.issue_boleto(&boleto_request()).await.unwrap();

        assert_eq!(stub.token_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_token_rejection_is_unauthorized() {
        let (_, base_url) = spawn_stub(Stub {
            reject_token: true,
            ..Default::default()
        })
        .await;

        let err = provider(&base_url)
            .issue_boleto(&boleto_request())
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::Unauthorized { .. }));
    }

    #[tokio::test]
    async fn test_invoice_rejection_surfaces_status_and_body() {
        let (_, base_url) = spawn_stub(Stub {
            expires_in: 3600,
            reject_invoice: true,
            ..Default::default()
        })
        .await;

        let err = provider(&base_url)
            .issue_boleto(&boleto_request())
            .await
            .unwrap_err();
        match err {
            PortError::Upstream { status, body } => {
                assert_eq!(status, 400);
                assert!(body.contains("invalid zip_code"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unreachable_provider_is_connection_error() {
        let err = provider("http://127.0.0.1:9")
            .issue_boleto(&boleto_request())
            .await
            .unwrap_err();
        assert!(err.is_transient());
    }
}
