//! Request and response bodies
//!
//! Creation and patch bodies reuse the domain drafts, which already carry
//! their serde shape; this module holds what the HTTP surface adds.

pub mod boleto;
pub mod ledger;
pub mod package;
pub mod session;

use serde::{Deserialize, Serialize};

/// Body returned by successful deletes
#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub message: String,
}

impl DeleteResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
