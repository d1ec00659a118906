//! Database Test Utilities
//!
//! Provides helpers for database testing including testcontainer management
//! and connection pooling for integration tests.

use sqlx::PgPool;
use std::sync::Arc;
use testcontainers::{
    core::{IntoContainerPort, WaitFor},
    runners::AsyncRunner,
    ContainerAsync, GenericImage, ImageExt,
};
use tokio::sync::OnceCell;

use infra_db::DatabaseConfig;

use crate::fixtures::PartyFixtures;

/// Default PostgreSQL image for testing
const POSTGRES_IMAGE: &str = "postgres";
const POSTGRES_TAG: &str = "16-alpine";
const POSTGRES_USER: &str = "test_user";
const POSTGRES_PASSWORD: &str = "test_password";
const POSTGRES_DB: &str = "clinic_billing_test";

type TestResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Configuration for test database
#[derive(Debug, Clone)]
pub struct TestDatabaseConfig {
    pub user: String,
    pub password: String,
    pub database: String,
    pub host: String,
    pub port: u16,
}

impl Default for TestDatabaseConfig {
    fn default() -> Self {
        Self {
            user: POSTGRES_USER.to_string(),
            password: POSTGRES_PASSWORD.to_string(),
            database: POSTGRES_DB.to_string(),
            host: "localhost".to_string(),
            port: 5432,
        }
    }
}

impl TestDatabaseConfig {
    /// Creates the database connection URL
    pub fn connection_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user, self.password, self.host, self.port, self.database
        )
    }
}

/// A wrapper around a PostgreSQL test container
pub struct TestDatabase {
    _container: ContainerAsync<GenericImage>,
    pub config: TestDatabaseConfig,
    pub pool: PgPool,
}

impl TestDatabase {
    /// Starts a new PostgreSQL container and applies the migrations
    ///
    /// # Errors
    ///
    /// Returns an error if the container fails to start or a migration fails
    pub async fn new() -> TestResult<Self> {
        let container = GenericImage::new(POSTGRES_IMAGE, POSTGRES_TAG)
            .with_exposed_port(5432.tcp())
            .with_wait_for(WaitFor::message_on_stderr(
                "database system is ready to accept connections",
            ))
            .with_env_var("POSTGRES_USER", POSTGRES_USER)
            .with_env_var("POSTGRES_PASSWORD", POSTGRES_PASSWORD)
            .with_env_var("POSTGRES_DB", POSTGRES_DB)
            .start()
            .await?;

        let port = container.get_host_port_ipv4(5432).await?;
        let host = container.get_host().await?.to_string();

        let config = TestDatabaseConfig {
            host,
            port,
            ..TestDatabaseConfig::default()
        };

        let pool = infra_db::create_pool(
            DatabaseConfig::new(config.connection_url())
                .max_connections(5)
                .min_connections(1),
        )
        .await?;

        infra_db::run_migrations(&pool).await?;

        Ok(Self {
            _container: container,
            config,
            pool,
        })
    }

    /// Returns a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Inserts the fixture reference rows with their fixture identifiers
    pub async fn seed_reference_data(&self) -> TestResult<()> {
        for patient in [PartyFixtures::patient(), PartyFixtures::other_patient()] {
            sqlx::query(
                "INSERT INTO patients (id, name, cpf, email, street, number, district, city, \
                 state, complement, zip_code) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
            )
            .bind(patient.id.value())
            .bind(&patient.name)
            .bind(&patient.cpf)
            .bind(&patient.email)
            .bind(&patient.street)
            .bind(&patient.number)
            .bind(&patient.district)
            .bind(&patient.city)
            .bind(&patient.state)
            .bind(&patient.complement)
            .bind(&patient.zip_code)
            .execute(&self.pool)
            .await?;
        }

        let supplier = PartyFixtures::supplier();
        sqlx::query("INSERT INTO suppliers (id, name, document, email) VALUES ($1, $2, $3, $4)")
            .bind(supplier.id.value())
            .bind(&supplier.name)
            .bind(&supplier.document)
            .bind(&supplier.email)
            .execute(&self.pool)
            .await?;

        let category = PartyFixtures::budget_category();
        sqlx::query("INSERT INTO budget_categories (id, name) VALUES ($1, $2)")
            .bind(category.id.value())
            .bind(&category.name)
            .execute(&self.pool)
            .await?;

        let treatment_type = PartyFixtures::treatment_type();
        sqlx::query("INSERT INTO treatment_types (id, name) VALUES ($1, $2)")
            .bind(treatment_type.id.value())
            .bind(&treatment_type.name)
            .execute(&self.pool)
            .await?;

        // Explicit ids leave the sequences behind
        for table in ["patients", "suppliers", "budget_categories", "treatment_types"] {
            sqlx::query(&format!(
                "SELECT setval(pg_get_serial_sequence('{table}', 'id'), (SELECT MAX(id) FROM {table}))"
            ))
            .execute(&self.pool)
            .await?;
        }

        Ok(())
    }

    /// Clears all data from the database while preserving the schema
    pub async fn clear_data(&self) -> TestResult<()> {
        let tables = [
            "boletos",
            "ledger_entries",
            "contracts",
            "session_appointments",
            "treatment_packages",
            "suppliers",
            "patients",
            "treatment_types",
            "budget_categories",
        ];

        for table in tables {
            sqlx::query(&format!("TRUNCATE TABLE {} RESTART IDENTITY CASCADE", table))
                .execute(&self.pool)
                .await?;
        }

        Ok(())
    }
}

/// Global test database for shared integration tests
static SHARED_TEST_DB: OnceCell<Arc<TestDatabase>> = OnceCell::const_new();

/// Gets or creates a shared test database instance
///
/// # Panics
///
/// Panics if the database fails to initialize
pub async fn get_shared_test_database() -> Arc<TestDatabase> {
    SHARED_TEST_DB
        .get_or_init(|| async {
            Arc::new(
                TestDatabase::new()
                    .await
                    .expect("Failed to create shared test database"),
            )
        })
        .await
        .clone()
}

/// Creates an isolated, seeded test database for a single test
pub async fn create_isolated_test_database() -> TestResult<TestDatabase> {
    let db = TestDatabase::new().await?;
    db.seed_reference_data().await?;
    Ok(db)
}
