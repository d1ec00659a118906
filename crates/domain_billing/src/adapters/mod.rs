//! External Adapters for the Billing Domain
//!
//! This module provides the production implementation of
//! [`BoletoProviderPort`](crate::ports::BoletoProviderPort): an HTTPS client
//! for the Cora invoicing API authenticated with a client certificate and a
//! cached bearer token.
//!
//! # Usage
//!
//! ```rust,ignore
//! use domain_billing::adapters::{BoletoProviderConfig, CoraBoletoProvider};
//! use domain_billing::BoletoProviderPort;
//! use std::sync::Arc;
//!
//! let config = BoletoProviderConfig::new("https://matls-clients.api.cora.com.br", "int-client")
//!     .with_client_identity("certs/certificate.pem", "certs/private-key.key");
//!
//! let provider: Arc<dyn BoletoProviderPort> = Arc::new(CoraBoletoProvider::new(config)?);
//! ```

pub mod boleto_provider;

pub use boleto_provider::{BoletoProviderConfig, CachedToken, CoraBoletoProvider};
