use serde::Serialize;

/// Per-tattooist wage totals shown on the dashboard.
///
/// Derived from the invoice store on demand, never persisted, so it cannot
/// drift from the invoices it summarizes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutSummary {
    pub tattooist: String,
    /// Lifetime wage across all invoices, paid or not.
    pub total_earned: i64,
    /// Wage still owed, summed over unpaid invoices.
    pub open_balance: i64,
}
