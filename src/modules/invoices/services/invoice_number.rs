use std::sync::Arc;

use chrono::{DateTime, Datelike, NaiveDate, Utc};

use crate::core::Result;
use crate::modules::invoices::repositories::InvoiceRepository;

/// Prefix on every invoice number.
pub const INVOICE_NUMBER_PREFIX: &str = "SKE";

/// Derives the next sequential invoice number for a calendar year.
///
/// The sequence is `1 + count(invoices issued that year)`, recomputed from
/// the stored invoices on every call. There is no separate counter to drift
/// when invoices are deleted elsewhere, and a failed write never "wastes" a
/// number. The numbering resets at the first invoice of each new year.
///
/// Counting and writing is still a read-then-write race; the unique index on
/// `invoice_number` is the authoritative guard, and the issuer retries with a
/// skipped candidate when one collides.
pub struct InvoiceNumberSequencer {
    invoices: Arc<dyn InvoiceRepository>,
}

impl InvoiceNumberSequencer {
    pub fn new(invoices: Arc<dyn InvoiceRepository>) -> Self {
        Self { invoices }
    }

    /// Next invoice number for the current year.
    pub async fn next(&self) -> Result<String> {
        self.next_for_year(Utc::now().year()).await
    }

    /// Next invoice number for an explicit year.
    pub async fn next_for_year(&self, year: i32) -> Result<String> {
        self.next_for_year_skipping(year, 0).await
    }

    /// Next invoice number, skipping `skip` candidates past the stored count.
    /// Used by the issuer to advance beyond a number that just collided.
    pub async fn next_for_year_skipping(&self, year: i32, skip: u32) -> Result<String> {
        let (start, end) = year_bounds(year);
        let count = self.invoices.count_between(start, end).await?;
        Ok(format_invoice_number(year, count + 1 + i64::from(skip)))
    }
}

/// `SKE-<year>-<seq>`, sequence zero-padded to 3 digits (wider past 999).
pub fn format_invoice_number(year: i32, seq: i64) -> String {
    format!("{INVOICE_NUMBER_PREFIX}-{year}-{seq:03}")
}

/// Half-open UTC range `[Jan 1 of year, Jan 1 of year+1)`.
pub fn year_bounds(year: i32) -> (DateTime<Utc>, DateTime<Utc>) {
    (jan_first(year), jan_first(year.saturating_add(1)))
}

fn jan_first(year: i32) -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(year, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        // saturate outside chrono's representable year range
        .unwrap_or(if year > 0 {
            DateTime::<Utc>::MAX_UTC
        } else {
            DateTime::<Utc>::MIN_UTC
        })
}
