// Invoice store access.
//
// Inserts rely on the store-level uniqueness constraints: one invoice per
// customer (partial index, studio invoices exempt) and a unique invoice
// number. Both violations surface as `AppError::Conflict`; the issuer decides
// whether that means "already invoiced" or "retry with a fresh number".

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use crate::core::{AppError, Result};
use crate::modules::invoices::models::Invoice;

/// Store access for invoices.
#[async_trait]
pub trait InvoiceRepository: Send + Sync {
    /// Insert a new invoice. Uniqueness violations surface as `Conflict`.
    async fn insert(&self, invoice: &Invoice) -> Result<()>;

    /// Whether any invoice exists for this customer. Fast-path idempotency
    /// check only; the unique index is the authoritative guard.
    async fn exists_for_customer(&self, customer_id: &str) -> Result<bool>;

    async fn find_by_customer(&self, customer_id: &str) -> Result<Vec<Invoice>>;

    /// Invoices issued in `[start, end)`, oldest first.
    async fn list_between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<Invoice>>;

    /// Number of invoices issued in `[start, end)`.
    async fn count_between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<i64>;

    async fn list_by_tattooist(&self, tattooist: &str) -> Result<Vec<Invoice>>;

    /// Sum of wages on unpaid invoices for a tattooist.
    async fn open_wage_sum(&self, tattooist: &str) -> Result<i64>;

    /// Sum of wages across all invoices for a tattooist.
    async fn total_wage_sum(&self, tattooist: &str) -> Result<i64>;

    /// Sum of final billed amounts across all invoices.
    async fn amount_sum(&self) -> Result<i64>;

    /// Mark every open invoice of a tattooist paid, in one conditional
    /// update. Returns how many rows were updated.
    async fn mark_payouts_done(&self, tattooist: &str) -> Result<u64>;
}

pub struct SqliteInvoiceRepository {
    pool: SqlitePool,
}

impl SqliteInvoiceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

const SELECT_COLUMNS: &str = "SELECT id, invoice_number, date, tattooist, customer_id, \
     customer_name, tattoo_name, placement, sessions, tax_rate, net_amount, amount, \
     material_cost, tattooist_wage, discount, custom_amount, payout_done FROM invoices";

#[async_trait]
impl InvoiceRepository for SqliteInvoiceRepository {
    async fn insert(&self, invoice: &Invoice) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO invoices (
                id, invoice_number, date, tattooist, customer_id, customer_name,
                tattoo_name, placement, sessions, tax_rate, net_amount, amount,
                material_cost, tattooist_wage, discount, custom_amount, payout_done
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&invoice.id)
        .bind(&invoice.invoice_number)
        .bind(invoice.date)
        .bind(&invoice.tattooist)
        .bind(&invoice.customer_id)
        .bind(&invoice.customer_name)
        .bind(&invoice.tattoo_name)
        .bind(&invoice.placement)
        .bind(invoice.sessions)
        .bind(invoice.tax_rate.to_string())
        .bind(invoice.net_amount)
        .bind(invoice.amount)
        .bind(invoice.material_cost)
        .bind(invoice.tattooist_wage)
        .bind(invoice.discount.map(|d| d.to_string()))
        .bind(invoice.custom_amount)
        .bind(invoice.payout_done)
        .execute(&self.pool)
        .await
        .map_err(into_insert_error)?;

        debug!(number = %invoice.invoice_number, "invoice stored");
        Ok(())
    }

    async fn exists_for_customer(&self, customer_id: &str) -> Result<bool> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM invoices WHERE customer_id = ?")
                .bind(customer_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count > 0)
    }

    async fn find_by_customer(&self, customer_id: &str) -> Result<Vec<Invoice>> {
        let rows: Vec<InvoiceRow> =
            sqlx::query_as(&format!("{SELECT_COLUMNS} WHERE customer_id = ? ORDER BY date"))
                .bind(customer_id)
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter().map(Invoice::try_from).collect()
    }

    async fn list_between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<Invoice>> {
        let rows: Vec<InvoiceRow> =
            sqlx::query_as(&format!("{SELECT_COLUMNS} WHERE date >= ? AND date < ? ORDER BY date"))
                .bind(start)
                .bind(end)
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter().map(Invoice::try_from).collect()
    }

    async fn count_between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<i64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM invoices WHERE date >= ? AND date < ?")
                .bind(start)
                .bind(end)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    async fn list_by_tattooist(&self, tattooist: &str) -> Result<Vec<Invoice>> {
        let rows: Vec<InvoiceRow> =
            sqlx::query_as(&format!("{SELECT_COLUMNS} WHERE tattooist = ? ORDER BY date"))
                .bind(tattooist)
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter().map(Invoice::try_from).collect()
    }

    async fn open_wage_sum(&self, tattooist: &str) -> Result<i64> {
        let (sum,): (i64,) = sqlx::query_as(
            "SELECT COALESCE(SUM(tattooist_wage), 0) FROM invoices \
             WHERE tattooist = ? AND payout_done = 0",
        )
        .bind(tattooist)
        .fetch_one(&self.pool)
        .await?;
        Ok(sum)
    }

    async fn total_wage_sum(&self, tattooist: &str) -> Result<i64> {
        let (sum,): (i64,) = sqlx::query_as(
            "SELECT COALESCE(SUM(tattooist_wage), 0) FROM invoices WHERE tattooist = ?",
        )
        .bind(tattooist)
        .fetch_one(&self.pool)
        .await?;
        Ok(sum)
    }

    async fn amount_sum(&self) -> Result<i64> {
        let (sum,): (i64,) =
            sqlx::query_as("SELECT COALESCE(SUM(amount), 0) FROM invoices")
                .fetch_one(&self.pool)
                .await?;
        Ok(sum)
    }

    async fn mark_payouts_done(&self, tattooist: &str) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE invoices SET payout_done = 1 WHERE tattooist = ? AND payout_done = 0",
        )
        .bind(tattooist)
        .execute(&self.pool)
        .await?;

        debug!(tattooist, updated = result.rows_affected(), "payouts marked done");
        Ok(result.rows_affected())
    }
}

fn into_insert_error(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(ref db) = e {
        if db.is_unique_violation() {
            return AppError::conflict(db.message().to_string());
        }
    }
    AppError::Store(e)
}

/// Row shape as stored; decimals travel as TEXT in SQLite.
#[derive(FromRow)]
struct InvoiceRow {
    id: String,
    invoice_number: String,
    date: DateTime<Utc>,
    tattooist: Option<String>,
    customer_id: Option<String>,
    customer_name: String,
    tattoo_name: String,
    placement: String,
    sessions: i64,
    tax_rate: String,
    net_amount: i64,
    amount: i64,
    material_cost: i64,
    tattooist_wage: i64,
    discount: Option<String>,
    custom_amount: Option<i64>,
    payout_done: bool,
}

impl TryFrom<InvoiceRow> for Invoice {
    type Error = AppError;

    fn try_from(row: InvoiceRow) -> Result<Self> {
        let tax_rate = Decimal::from_str(&row.tax_rate).map_err(|e| {
            AppError::internal(format!("Stored tax rate '{}' is not a number: {e}", row.tax_rate))
        })?;
        let discount = row
            .discount
            .map(|d| {
                Decimal::from_str(&d).map_err(|e| {
                    AppError::internal(format!("Stored discount '{d}' is not a number: {e}"))
                })
            })
            .transpose()?;

        Ok(Invoice {
            id: row.id,
            invoice_number: row.invoice_number,
            date: row.date,
            tattooist: row.tattooist,
            customer_id: row.customer_id,
            customer_name: row.customer_name,
            tattoo_name: row.tattoo_name,
            placement: row.placement,
            sessions: row.sessions,
            tax_rate,
            net_amount: row.net_amount,
            amount: row.amount,
            material_cost: row.material_cost,
            tattooist_wage: row.tattooist_wage,
            discount,
            custom_amount: row.custom_amount,
            payout_done: row.payout_done,
        })
    }
}
