//! Billing repository implementation
//!
//! This module provides database access for ledger entries and the boletos
//! issued for them.
//!
//! The funding origin is stored as an `origin_kind` discriminant plus one
//! foreign key column per origin; a CHECK constraint keeps exactly the
//! matching column set.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use core_kernel::{
    BudgetCategoryId, ContractId, InvoiceId, LedgerEntryId, Money, SupplierId, TreatmentPackageId,
};
use domain_billing::invoice::NewInvoice;
use domain_billing::ledger::NewLedgerEntry;
use domain_billing::{FundingOrigin, Invoice, LedgerEntry, LedgerFilter};

use super::decode;
use crate::error::DatabaseError;

const LEDGER_COLUMNS: &str = "id, kind, origin_kind, contract_id, treatment_package_id, \
    supplier_id, budget_category_id, due_date, paid_date, amount, status, invoice_number, \
    notes, payment_method, created_at, updated_at";

const BOLETO_COLUMNS: &str = "id, ledger_entry_id, service_name, service_description, barcode, \
    digitable_line, external_invoice_id, pdf_link, created_at";

/// Database row for a ledger entry
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LedgerEntryRow {
    pub id: i64,
    pub kind: String,
    pub origin_kind: String,
    pub contract_id: Option<i64>,
    pub treatment_package_id: Option<i64>,
    pub supplier_id: Option<i64>,
    pub budget_category_id: i64,
    pub due_date: NaiveDate,
    pub paid_date: Option<NaiveDate>,
    pub amount: Decimal,
    pub status: String,
    pub invoice_number: Option<String>,
    pub notes: Option<String>,
    pub payment_method: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<LedgerEntryRow> for LedgerEntry {
    type Error = DatabaseError;

    fn try_from(row: LedgerEntryRow) -> Result<Self, Self::Error> {
        let origin = match row.origin_kind.as_str() {
            "contract" => row.contract_id.map(|id| FundingOrigin::Contract(ContractId::new(id))),
            "treatment_package" => row
                .treatment_package_id
                .map(|id| FundingOrigin::TreatmentPackage(TreatmentPackageId::new(id))),
            "supplier" => row.supplier_id.map(|id| FundingOrigin::Supplier(SupplierId::new(id))),
            _ => None,
        }
        .ok_or_else(|| {
            DatabaseError::SerializationError(format!(
                "ledger entry {} has an inconsistent origin '{}'",
                row.id, row.origin_kind
            ))
        })?;

        Ok(LedgerEntry {
            id: LedgerEntryId::new(row.id),
            kind: decode("kind", &row.kind)?,
            origin,
            budget_category_id: BudgetCategoryId::new(row.budget_category_id),
            due_date: row.due_date,
            paid_date: row.paid_date,
            amount: Money::new(row.amount),
            status: decode("status", &row.status)?,
            invoice_number: row.invoice_number,
            notes: row.notes,
            payment_method: row.payment_method,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Database row for an issued boleto
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BoletoRow {
    pub id: i64,
    pub ledger_entry_id: i64,
    pub service_name: String,
    pub service_description: String,
    pub barcode: Option<String>,
    pub digitable_line: Option<String>,
    pub external_invoice_id: Option<String>,
    pub pdf_link: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<BoletoRow> for Invoice {
    fn from(row: BoletoRow) -> Self {
        Invoice {
            id: InvoiceId::new(row.id),
            ledger_entry_id: LedgerEntryId::new(row.ledger_entry_id),
            service_name: row.service_name,
            service_description: row.service_description,
            barcode: row.barcode,
            digitable_line: row.digitable_line,
            external_invoice_id: row.external_invoice_id,
            pdf_link: row.pdf_link,
            created_at: row.created_at,
        }
    }
}

/// Origin discriminant and the three foreign key columns
fn origin_columns(origin: &FundingOrigin) -> (&'static str, Option<i64>, Option<i64>, Option<i64>) {
    (
        origin.discriminant(),
        origin.contract_id().map(|id| id.value()),
        origin.treatment_package_id().map(|id| id.value()),
        origin.supplier_id().map(|id| id.value()),
    )
}

/// Repository for ledger entries and boletos
#[derive(Debug, Clone)]
pub struct BillingRepository {
    pool: PgPool,
}

impl BillingRepository {
    /// Creates a new BillingRepository with the given connection pool
    ///
    /// # Arguments
    ///
    /// * `pool` - The PostgreSQL connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a validated ledger entry
    pub async fn insert_entry(
        &self,
        entry: &NewLedgerEntry,
    ) -> Result<LedgerEntryRow, DatabaseError> {
        let (origin_kind, contract_id, package_id, supplier_id) = origin_columns(&entry.origin);
        let sql = format!(
            r#"
            INSERT INTO ledger_entries (
                kind, origin_kind, contract_id, treatment_package_id, supplier_id,
                budget_category_id, due_date, paid_date, amount, status,
                invoice_number, notes, payment_method
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {LEDGER_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, LedgerEntryRow>(&sql)
            .bind(entry.kind.as_str())
            .bind(origin_kind)
            .bind(contract_id)
            .bind(package_id)
            .bind(supplier_id)
            .bind(entry.budget_category_id.value())
            .bind(entry.due_date)
            .bind(entry.paid_date)
            .bind(entry.amount.amount())
            .bind(entry.status.as_str())
            .bind(&entry.invoice_number)
            .bind(&entry.notes)
            .bind(&entry.payment_method)
            .fetch_one(&self.pool)
            .await?;

        Ok(row)
    }

    /// Retrieves a ledger entry or NotFound
    pub async fn get_entry(&self, id: i64) -> Result<LedgerEntryRow, DatabaseError> {
        let sql = format!("SELECT {LEDGER_COLUMNS} FROM ledger_entries WHERE id = $1");
        sqlx::query_as::<_, LedgerEntryRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("LedgerEntry", id))
    }

    /// Lists ledger entries matching every set filter field
    pub async fn list_entries(
        &self,
        filter: &LedgerFilter,
    ) -> Result<Vec<LedgerEntryRow>, DatabaseError> {
        let sql = format!(
            r#"
            SELECT {LEDGER_COLUMNS}
            FROM ledger_entries
            WHERE ($1::BIGINT IS NULL OR contract_id = $1)
              AND ($2::BIGINT IS NULL OR treatment_package_id = $2)
              AND ($3::BIGINT IS NULL OR supplier_id = $3)
              AND ($4::TEXT IS NULL OR kind = $4)
            ORDER BY due_date, id
            "#
        );

        let rows = sqlx::query_as::<_, LedgerEntryRow>(&sql)
            .bind(filter.contract_id.map(|id| id.value()))
            .bind(filter.treatment_package_id.map(|id| id.value()))
            .bind(filter.supplier_id.map(|id| id.value()))
            .bind(filter.kind.map(|kind| kind.as_str()))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    /// Overwrites every mutable column of a ledger entry
    pub async fn update_entry(&self, entry: &LedgerEntry) -> Result<LedgerEntryRow, DatabaseError> {
        let (origin_kind, contract_id, package_id, supplier_id) = origin_columns(&entry.origin);
        let sql = format!(
            r#"
            UPDATE ledger_entries SET
                kind = $2, origin_kind = $3, contract_id = $4, treatment_package_id = $5,
                supplier_id = $6, budget_category_id = $7, due_date = $8, paid_date = $9,
                amount = $10, status = $11, invoice_number = $12, notes = $13,
                payment_method = $14, updated_at = now()
            WHERE id = $1
            RETURNING {LEDGER_COLUMNS}
            "#
        );

        sqlx::query_as::<_, LedgerEntryRow>(&sql)
            .bind(entry.id.value())
            .bind(entry.kind.as_str())
            .bind(origin_kind)
            .bind(contract_id)
            .bind(package_id)
            .bind(supplier_id)
            .bind(entry.budget_category_id.value())
            .bind(entry.due_date)
            .bind(entry.paid_date)
            .bind(entry.amount.amount())
            .bind(entry.status.as_str())
            .bind(&entry.invoice_number)
            .bind(&entry.notes)
            .bind(&entry.payment_method)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DatabaseError::not_found("LedgerEntry", entry.id))
    }

    /// Deletes a ledger entry; a referencing boleto raises a foreign key violation
    pub async fn delete_entry(&self, id: i64) -> Result<(), DatabaseError> {
        let result = sqlx::query("DELETE FROM ledger_entries WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("LedgerEntry", id));
        }
        Ok(())
    }

    /// Returns true if any entry is funded by `origin`
    pub async fn has_entries_for(&self, origin: &FundingOrigin) -> Result<bool, DatabaseError> {
        let (_, contract_id, package_id, supplier_id) = origin_columns(origin);
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM ledger_entries
                WHERE contract_id = $1 OR treatment_package_id = $2 OR supplier_id = $3
            )
            "#,
        )
        .bind(contract_id)
        .bind(package_id)
        .bind(supplier_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    /// Retrieves the boleto of a ledger entry, if any
    pub async fn find_boleto(
        &self,
        ledger_entry_id: i64,
    ) -> Result<Option<BoletoRow>, DatabaseError> {
        let sql = format!("SELECT {BOLETO_COLUMNS} FROM boletos WHERE ledger_entry_id = $1");
        let row = sqlx::query_as::<_, BoletoRow>(&sql)
            .bind(ledger_entry_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// Inserts a boleto unless its ledger entry already has one
    ///
    /// The unique constraint on `ledger_entry_id` decides the winner; the
    /// loser reads the stored row back.
    ///
    /// # Returns
    ///
    /// The stored row and `true` if this call inserted it
    pub async fn insert_boleto_or_get_existing(
        &self,
        invoice: &NewInvoice,
    ) -> Result<(BoletoRow, bool), DatabaseError> {
        let sql = format!(
            r#"
            INSERT INTO boletos (
                ledger_entry_id, service_name, service_description, barcode,
                digitable_line, external_invoice_id, pdf_link
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (ledger_entry_id) DO NOTHING
            RETURNING {BOLETO_COLUMNS}
            "#
        );

        let inserted = sqlx::query_as::<_, BoletoRow>(&sql)
            .bind(invoice.ledger_entry_id.value())
            .bind(&invoice.service_name)
            .bind(&invoice.service_description)
            .bind(&invoice.boleto.barcode)
            .bind(&invoice.boleto.digitable_line)
            .bind(&invoice.boleto.external_invoice_id)
            .bind(&invoice.boleto.pdf_link)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(row) = inserted {
            return Ok((row, true));
        }

        self.find_boleto(invoice.ledger_entry_id.value())
            .await?
            .map(|row| (row, false))
            .ok_or_else(|| {
                DatabaseError::QueryFailed(format!(
                    "boleto for ledger entry {} conflicted but could not be read back",
                    invoice.ledger_entry_id
                ))
            })
    }

    /// Lists every boleto, newest first
    pub async fn list_boletos(&self) -> Result<Vec<BoletoRow>, DatabaseError> {
        let sql = format!("SELECT {BOLETO_COLUMNS} FROM boletos ORDER BY created_at DESC, id DESC");
        let rows = sqlx::query_as::<_, BoletoRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use domain_billing::EntryKind;

    fn row(origin_kind: &str, contract_id: Option<i64>) -> LedgerEntryRow {
        LedgerEntryRow {
            id: 1,
            kind: "receivable".to_string(),
            origin_kind: origin_kind.to_string(),
            contract_id,
            treatment_package_id: None,
            supplier_id: None,
            budget_category_id: 1,
            due_date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            paid_date: None,
            amount: Decimal::new(20000, 2),
            status: "pending".to_string(),
            invoice_number: None,
            notes: None,
            payment_method: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_row_to_entry() {
        let entry = LedgerEntry::try_from(row("contract", Some(3))).unwrap();
        assert_eq!(entry.kind, EntryKind::Receivable);
        assert_eq!(entry.origin, FundingOrigin::Contract(ContractId::new(3)));
    }

    #[test]
    fn test_row_with_inconsistent_origin_is_rejected() {
        let err = LedgerEntry::try_from(row("treatment_package", Some(3))).unwrap_err();
        assert!(matches!(err, DatabaseError::SerializationError(_)));
    }

    #[test]
    fn test_origin_columns() {
        let origin = FundingOrigin::Supplier(SupplierId::new(9));
        assert_eq!(origin_columns(&origin), ("supplier", None, None, Some(9)));
    }
}
