//! Request handlers, one module per resource

pub mod boletos;
pub mod contracts;
pub mod health;
pub mod ledger;
pub mod packages;
pub mod sessions;
