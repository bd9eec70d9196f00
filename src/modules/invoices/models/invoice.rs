use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An issued invoice.
///
/// Serializes with camelCase field names because downstream export and
/// reporting read the record shape verbatim (`invoiceNumber`,
/// `tattooistWage`, `payoutDone`, ...). Monetary fields are whole currency
/// units; `tax_rate` is the percentage that was in force at issue time.
///
/// The only mutation an invoice ever sees is the `payout_done` flip performed
/// by the payout ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: String,
    /// Sequential human-readable number, unique per calendar year.
    pub invoice_number: String,
    pub date: DateTime<Utc>,
    /// Owning tattooist; `None` marks a studio invoice with no individual
    /// payout attached.
    pub tattooist: Option<String>,
    /// Customer this invoice was issued for; `None` on the manual path.
    pub customer_id: Option<String>,
    pub customer_name: String,
    pub tattoo_name: String,
    pub placement: String,
    pub sessions: i64,
    /// Tax percentage stamped at issue time.
    pub tax_rate: Decimal,
    /// Amount before tax, after discount.
    pub net_amount: i64,
    /// Final tax-inclusive billed amount.
    pub amount: i64,
    pub material_cost: i64,
    pub tattooist_wage: i64,
    /// Discount audit value, as entered on the customer record.
    pub discount: Option<Decimal>,
    /// Admin override audit value.
    pub custom_amount: Option<i64>,
    pub payout_done: bool,
}

impl Invoice {
    /// Whether this is a manually entered studio invoice.
    pub fn is_studio(&self) -> bool {
        self.tattooist.is_none()
    }
}

/// Admin manual-entry invoice, not tied to any customer record.
///
/// Leaving `tattooist` unset makes it a studio invoice: no wage, no material
/// cost, exempt from the per-customer idempotency rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualInvoiceRequest {
    pub tattooist: Option<String>,
    pub customer_name: String,
    pub tattoo_name: String,
    pub placement: String,
    pub sessions: Option<i64>,
    pub discount: Option<Decimal>,
    pub custom_amount: Option<i64>,
}

/// Result of an issuance attempt for a customer.
#[derive(Debug, Clone, PartialEq)]
pub enum IssueOutcome {
    /// A new invoice was written.
    Issued(Invoice),
    /// The customer already has an invoice; nothing was written.
    AlreadyInvoiced,
}
