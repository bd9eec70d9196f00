//! Integration tests for invoice issuance against an in-memory SQLite store.
//!
//! Exercises the idempotency guard, sequential numbering, the tax snapshot,
//! the admin manual/studio path, and the abort-on-store-failure behavior.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, TimeZone, Utc};
use rust_decimal_macros::dec;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use inktrust::config::database::MIGRATOR;
use inktrust::config::PricingConfig;
use inktrust::core::{Actor, AppError, Result};
use inktrust::customers::Customer;
use inktrust::invoices::models::{Invoice, IssueOutcome, ManualInvoiceRequest};
use inktrust::invoices::repositories::{InvoiceRepository, SqliteInvoiceRepository};
use inktrust::invoices::services::{InvoiceIssuer, InvoiceNumberSequencer};
use inktrust::taxes::repositories::{SqliteTaxRepository, TaxRepository};

async fn setup() -> (
    InvoiceIssuer,
    Arc<SqliteInvoiceRepository>,
    Arc<SqliteTaxRepository>,
) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "inktrust=debug".into()),
        )
        .with_test_writer()
        .try_init()
        .ok();

    let pool: SqlitePool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory pool");
    MIGRATOR.run(&pool).await.expect("migrations");

    let invoices = Arc::new(SqliteInvoiceRepository::new(pool.clone()));
    let taxes = Arc::new(SqliteTaxRepository::new(pool));
    let issuer = InvoiceIssuer::new(invoices.clone(), taxes.clone(), PricingConfig::default());
    (issuer, invoices, taxes)
}

fn customer(id: &str, tattooist: &str, sessions: i64) -> Customer {
    let mut c = Customer::new(id, "Kim Novak", tattooist, sessions);
    c.tattoo_name = "Raven".to_string();
    c.placement = "Forearm".to_string();
    c
}

fn issued(outcome: IssueOutcome) -> Invoice {
    match outcome {
        IssueOutcome::Issued(invoice) => invoice,
        IssueOutcome::AlreadyInvoiced => panic!("expected a fresh invoice"),
    }
}

#[tokio::test]
async fn issue_creates_invoice_with_full_breakdown() {
    let (issuer, _invoices, taxes) = setup().await;
    taxes.set_tax_rate(dec!(19)).await.unwrap();

    let invoice = issued(issuer.issue(&customer("c-1", "bacon", 2)).await.unwrap());

    assert_eq!(invoice.invoice_number, format!("SKE-{}-001", Utc::now().year()));
    assert_eq!(invoice.tattooist.as_deref(), Some("bacon"));
    assert_eq!(invoice.customer_id.as_deref(), Some("c-1"));
    assert_eq!(invoice.customer_name, "Kim Novak");
    assert_eq!(invoice.tattoo_name, "Raven");
    assert_eq!(invoice.placement, "Forearm");
    assert_eq!(invoice.sessions, 2);
    assert_eq!(invoice.tax_rate, dec!(19));
    assert_eq!(invoice.net_amount, 3000);
    assert_eq!(invoice.amount, 3570);
    assert_eq!(invoice.material_cost, 1000);
    assert_eq!(invoice.tattooist_wage, 2000);
    assert!(!invoice.payout_done);
    assert!(!invoice.is_studio());
}

#[tokio::test]
async fn issuing_twice_stores_exactly_one_invoice() {
    let (issuer, invoices, _taxes) = setup().await;

    let first = issuer.issue(&customer("c-1", "bacon", 2)).await.unwrap();
    assert!(matches!(first, IssueOutcome::Issued(_)));

    let second = issuer.issue(&customer("c-1", "bacon", 2)).await.unwrap();
    assert_eq!(second, IssueOutcome::AlreadyInvoiced);

    let stored = invoices.find_by_customer("c-1").await.unwrap();
    assert_eq!(stored.len(), 1);
}

#[tokio::test]
async fn numbers_are_sequential_across_tattooists() {
    let (issuer, _invoices, _taxes) = setup().await;
    let year = Utc::now().year();

    let first = issued(issuer.issue(&customer("c-1", "bacon", 1)).await.unwrap());
    let second = issued(issuer.issue(&customer("c-2", "mira", 1)).await.unwrap());

    assert_eq!(first.invoice_number, format!("SKE-{year}-001"));
    assert_eq!(second.invoice_number, format!("SKE-{year}-002"));
}

#[tokio::test]
async fn numbering_resets_each_year() {
    let (_issuer, invoices, _taxes) = setup().await;
    let sequencer = InvoiceNumberSequencer::new(invoices.clone());

    let mut prior = stored_invoice("SKE-2024-001", Some("bacon"));
    prior.date = Utc.with_ymd_and_hms(2024, 5, 20, 14, 0, 0).unwrap();
    invoices.insert(&prior).await.unwrap();

    assert_eq!(sequencer.next_for_year(2025).await.unwrap(), "SKE-2025-001");
    assert_eq!(sequencer.next_for_year(2024).await.unwrap(), "SKE-2024-002");
}

#[tokio::test]
async fn default_tax_applies_when_setting_is_missing() {
    let (issuer, _invoices, taxes) = setup().await;
    assert_eq!(taxes.tax_rate().await.unwrap(), None);

    let invoice = issued(issuer.issue(&customer("c-1", "bacon", 1)).await.unwrap());

    // round(1500 × 1.19)
    assert_eq!(invoice.tax_rate, dec!(19));
    assert_eq!(invoice.amount, 1785);
}

#[tokio::test]
async fn issued_invoices_keep_their_tax_snapshot() {
    let (issuer, invoices, taxes) = setup().await;

    taxes.set_tax_rate(dec!(19)).await.unwrap();
    issuer.issue(&customer("c-1", "bacon", 2)).await.unwrap();

    taxes.set_tax_rate(dec!(25)).await.unwrap();
    let second = issued(issuer.issue(&customer("c-2", "mira", 2)).await.unwrap());

    let first = &invoices.find_by_customer("c-1").await.unwrap()[0];
    assert_eq!(first.tax_rate, dec!(19));
    assert_eq!(first.amount, 3570);
    assert_eq!(second.tax_rate, dec!(25));
    assert_eq!(second.amount, 3750);
}

#[tokio::test]
async fn customer_custom_amount_overrides_the_formula() {
    let (issuer, _invoices, taxes) = setup().await;
    taxes.set_tax_rate(dec!(19)).await.unwrap();

    let mut c = customer("c-1", "bacon", 1);
    c.custom_amount = Some(2000);
    let invoice = issued(issuer.issue(&c).await.unwrap());

    assert_eq!(invoice.amount, 2000);
    assert_eq!(invoice.material_cost, 500);
    assert_eq!(invoice.tattooist_wage, 1500);
    assert_eq!(invoice.custom_amount, Some(2000));
}

#[tokio::test]
async fn customer_discount_is_stamped_and_applied() {
    let (issuer, _invoices, taxes) = setup().await;
    taxes.set_tax_rate(dec!(19)).await.unwrap();

    let mut c = customer("c-1", "bacon", 2);
    c.discount = Some(dec!(50));
    let invoice = issued(issuer.issue(&c).await.unwrap());

    assert_eq!(invoice.net_amount, 1500);
    assert_eq!(invoice.amount, 1785);
    assert_eq!(invoice.discount, Some(dec!(50)));
    // The wage stays session-based; the discount is the studio's to absorb.
    assert_eq!(invoice.tattooist_wage, 2000);
}

#[tokio::test]
async fn manual_studio_invoice_carries_no_wage_or_material() {
    let (issuer, _invoices, taxes) = setup().await;
    taxes.set_tax_rate(dec!(19)).await.unwrap();
    let admin = Actor::admin("boss");

    let request = ManualInvoiceRequest {
        tattooist: None,
        customer_name: "Walk-in".to_string(),
        tattoo_name: "Flash".to_string(),
        placement: "Calf".to_string(),
        sessions: Some(3),
        discount: None,
        custom_amount: None,
    };
    let invoice = issuer.issue_manual(&admin, request.clone()).await.unwrap();

    assert!(invoice.is_studio());
    assert_eq!(invoice.amount, 5355);
    assert_eq!(invoice.material_cost, 0);
    assert_eq!(invoice.tattooist_wage, 0);
    assert_eq!(invoice.customer_id, None);

    // The manual path has no idempotency key: a second identical entry is a
    // second invoice with the next number.
    let again = issuer.issue_manual(&admin, request).await.unwrap();
    assert_ne!(again.invoice_number, invoice.invoice_number);
}

#[tokio::test]
async fn manual_invoice_with_tattooist_pays_the_session_wage() {
    let (issuer, _invoices, _taxes) = setup().await;
    let admin = Actor::admin("boss");

    let invoice = issuer
        .issue_manual(
            &admin,
            ManualInvoiceRequest {
                tattooist: Some("bacon".to_string()),
                customer_name: "Walk-in".to_string(),
                tattoo_name: "Flash".to_string(),
                placement: "Calf".to_string(),
                sessions: Some(3),
                discount: None,
                custom_amount: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(invoice.tattooist_wage, 3000);
    assert_eq!(invoice.material_cost, 1500);
}

#[tokio::test]
async fn manual_invoice_requires_admin() {
    let (issuer, _invoices, _taxes) = setup().await;

    let result = issuer
        .issue_manual(
            &Actor::tattooist("bacon"),
            ManualInvoiceRequest {
                tattooist: Some("bacon".to_string()),
                customer_name: "Walk-in".to_string(),
                tattoo_name: "Flash".to_string(),
                placement: "Calf".to_string(),
                sessions: Some(1),
                discount: None,
                custom_amount: None,
            },
        )
        .await;

    assert!(matches!(result, Err(AppError::Unauthorized(_))));
}

#[tokio::test]
async fn lost_customer_race_resolves_to_already_invoiced() {
    let (issuer, invoices, taxes) = setup().await;

    // A competing session already issued for this customer.
    issuer.issue(&customer("c-1", "bacon", 2)).await.unwrap();

    // Second issuer whose fast-path check misses that invoice once, as a
    // concurrent pre-insert check would; the partial unique index on
    // customer_id has to catch the duplicate instead.
    let stale = Arc::new(StaleReadInvoiceRepository::new(invoices.clone()));
    let racing_issuer = InvoiceIssuer::new(stale, taxes, PricingConfig::default());

    let outcome = racing_issuer
        .issue(&customer("c-1", "bacon", 2))
        .await
        .unwrap();

    assert_eq!(outcome, IssueOutcome::AlreadyInvoiced);
    assert_eq!(invoices.find_by_customer("c-1").await.unwrap().len(), 1);
}

#[tokio::test]
async fn number_collision_retries_with_next_candidate() {
    let (issuer, invoices, _taxes) = setup().await;
    let year = Utc::now().year();

    // An invoice dated last year already owns this year's first number, so
    // the year count suggests 001 and the number index rejects it.
    let mut squatter = stored_invoice(&format!("SKE-{year}-001"), Some("mira"));
    squatter.date = Utc.with_ymd_and_hms(year - 1, 11, 5, 10, 0, 0).unwrap();
    invoices.insert(&squatter).await.unwrap();

    let invoice = issued(issuer.issue(&customer("c-1", "bacon", 1)).await.unwrap());

    assert_eq!(invoice.invoice_number, format!("SKE-{year}-002"));
}

#[tokio::test]
async fn missing_customer_id_aborts_before_any_write() {
    let (issuer, invoices, _taxes) = setup().await;

    let result = issuer.issue(&customer("  ", "bacon", 2)).await;
    assert!(matches!(result, Err(AppError::Validation(_))));

    let year = Utc::now().year();
    let (start, end) = inktrust::invoices::services::year_bounds(year);
    assert_eq!(invoices.count_between(start, end).await.unwrap(), 0);
}

#[tokio::test]
async fn store_failure_during_numbering_writes_nothing() {
    let failing = Arc::new(FailingInvoiceRepository::default());
    let taxes: Arc<dyn TaxRepository> = Arc::new(StaticTaxRepository);
    let issuer = InvoiceIssuer::new(failing.clone(), taxes, PricingConfig::default());

    let result = issuer.issue(&customer("c-1", "bacon", 2)).await;

    assert!(matches!(result, Err(AppError::Store(_))));
    assert!(!failing.inserted.load(Ordering::SeqCst));
}

/// Invoice store whose year-count read fails, as a closed pool would.
#[derive(Default)]
struct FailingInvoiceRepository {
    inserted: AtomicBool,
}

#[async_trait]
impl InvoiceRepository for FailingInvoiceRepository {
    async fn insert(&self, _invoice: &Invoice) -> Result<()> {
        self.inserted.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn exists_for_customer(&self, _customer_id: &str) -> Result<bool> {
        Ok(false)
    }

    async fn find_by_customer(&self, _customer_id: &str) -> Result<Vec<Invoice>> {
        Ok(vec![])
    }

    async fn list_between(
        &self,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<Vec<Invoice>> {
        Ok(vec![])
    }

    async fn count_between(&self, _start: DateTime<Utc>, _end: DateTime<Utc>) -> Result<i64> {
        Err(AppError::Store(sqlx::Error::PoolClosed))
    }

    async fn list_by_tattooist(&self, _tattooist: &str) -> Result<Vec<Invoice>> {
        Ok(vec![])
    }

    async fn open_wage_sum(&self, _tattooist: &str) -> Result<i64> {
        Ok(0)
    }

    async fn total_wage_sum(&self, _tattooist: &str) -> Result<i64> {
        Ok(0)
    }

    async fn amount_sum(&self) -> Result<i64> {
        Ok(0)
    }

    async fn mark_payouts_done(&self, _tattooist: &str) -> Result<u64> {
        Ok(0)
    }
}

/// Invoice store whose first idempotency check reports no invoice, as a
/// check raced by a concurrent insert would. Everything else hits SQLite.
struct StaleReadInvoiceRepository {
    inner: Arc<SqliteInvoiceRepository>,
    first_check: AtomicBool,
}

impl StaleReadInvoiceRepository {
    fn new(inner: Arc<SqliteInvoiceRepository>) -> Self {
        Self {
            inner,
            first_check: AtomicBool::new(true),
        }
    }
}

#[async_trait]
impl InvoiceRepository for StaleReadInvoiceRepository {
    async fn insert(&self, invoice: &Invoice) -> Result<()> {
        self.inner.insert(invoice).await
    }

    async fn exists_for_customer(&self, customer_id: &str) -> Result<bool> {
        if self.first_check.swap(false, Ordering::SeqCst) {
            return Ok(false);
        }
        self.inner.exists_for_customer(customer_id).await
    }

    async fn find_by_customer(&self, customer_id: &str) -> Result<Vec<Invoice>> {
        self.inner.find_by_customer(customer_id).await
    }

    async fn list_between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<Invoice>> {
        self.inner.list_between(start, end).await
    }

    async fn count_between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<i64> {
        self.inner.count_between(start, end).await
    }

    async fn list_by_tattooist(&self, tattooist: &str) -> Result<Vec<Invoice>> {
        self.inner.list_by_tattooist(tattooist).await
    }

    async fn open_wage_sum(&self, tattooist: &str) -> Result<i64> {
        self.inner.open_wage_sum(tattooist).await
    }

    async fn total_wage_sum(&self, tattooist: &str) -> Result<i64> {
        self.inner.total_wage_sum(tattooist).await
    }

    async fn amount_sum(&self) -> Result<i64> {
        self.inner.amount_sum().await
    }

    async fn mark_payouts_done(&self, tattooist: &str) -> Result<u64> {
        self.inner.mark_payouts_done(tattooist).await
    }
}

struct StaticTaxRepository;

#[async_trait]
impl TaxRepository for StaticTaxRepository {
    async fn tax_rate(&self) -> Result<Option<rust_decimal::Decimal>> {
        Ok(Some(dec!(19)))
    }

    async fn set_tax_rate(&self, _rate: rust_decimal::Decimal) -> Result<()> {
        Ok(())
    }
}

fn stored_invoice(number: &str, tattooist: Option<&str>) -> Invoice {
    Invoice {
        id: uuid::Uuid::new_v4().to_string(),
        invoice_number: number.to_string(),
        date: Utc::now(),
        tattooist: tattooist.map(str::to_string),
        customer_id: None,
        customer_name: "Kim Novak".to_string(),
        tattoo_name: "Raven".to_string(),
        placement: "Forearm".to_string(),
        sessions: 1,
        tax_rate: dec!(19),
        net_amount: 1500,
        amount: 1785,
        material_cost: 500,
        tattooist_wage: 1000,
        discount: None,
        custom_amount: None,
        payout_done: false,
    }
}
