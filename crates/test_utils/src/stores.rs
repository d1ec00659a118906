//! Seeded In-Memory Ports
//!
//! Service-level tests run against `MockBillingStore` preloaded with the
//! fixture reference data.

use std::sync::Arc;

use domain_billing::ports::mock::{MockBillingStore, MockBoletoProvider};
use domain_billing::BillingPorts;

use crate::fixtures::PartyFixtures;

/// Creates an in-memory store holding both fixture patients, the supplier,
/// the budget category and the treatment type
pub async fn seeded_store() -> Arc<MockBillingStore> {
    let store = Arc::new(MockBillingStore::new());
    store.insert_patient(PartyFixtures::patient()).await;
    store.insert_patient(PartyFixtures::other_patient()).await;
    store.insert_supplier(PartyFixtures::supplier()).await;
    store.insert_budget_category(PartyFixtures::budget_category()).await;
    store.insert_treatment_type(PartyFixtures::treatment_type()).await;
    store
}

/// A seeded store, the ports over it and a succeeding boleto provider
pub async fn seeded_ports() -> (Arc<MockBillingStore>, BillingPorts, Arc<MockBoletoProvider>) {
    let store = seeded_store().await;
    let ports = BillingPorts::from_adapter(store.clone());
    (store, ports, Arc::new(MockBoletoProvider::new()))
}
