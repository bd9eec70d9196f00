use std::sync::Arc;

use tracing::info;

use crate::core::{Actor, AppError, Result};
use crate::modules::invoices::repositories::InvoiceRepository;
use crate::modules::payouts::models::PayoutSummary;

/// Role-agnostic wage aggregation over the invoice store.
///
/// Balances are recomputed from stored invoices on every call — there is no
/// cached aggregate that a failed operation could leave stale.
pub struct PayoutLedger {
    invoices: Arc<dyn InvoiceRepository>,
}

impl PayoutLedger {
    pub fn new(invoices: Arc<dyn InvoiceRepository>) -> Self {
        Self { invoices }
    }

    /// Unpaid wage for a tattooist. 0 when they have no invoices.
    pub async fn open_balance(&self, tattooist: &str) -> Result<i64> {
        self.invoices.open_wage_sum(tattooist).await
    }

    /// Lifetime wage regardless of payout state. Reporting only — never used
    /// to decide what is payable.
    pub async fn total_earned(&self, tattooist: &str) -> Result<i64> {
        self.invoices.total_wage_sum(tattooist).await
    }

    /// Mark every open invoice of a tattooist paid.
    ///
    /// One conditional bulk update: an invoice arriving mid-batch is simply
    /// not included, and a concurrent second call degrades to a no-op.
    /// Returns how many invoices were updated; 0 is a successful no-op.
    pub async fn pay_all(&self, tattooist: &str) -> Result<u64> {
        self.invoices.mark_payouts_done(tattooist).await
    }

    /// Sum of final billed amounts across all invoices.
    pub async fn total_revenue(&self) -> Result<i64> {
        self.invoices.amount_sum().await
    }
}

/// Capability boundary in front of [`PayoutLedger`].
///
/// The ledger itself stays role-agnostic; this wrapper enforces who may see
/// or pay whose wages. Admins see everyone and may pay out; a tattooist may
/// read only their own numbers.
pub struct PayoutService {
    ledger: PayoutLedger,
}

impl PayoutService {
    pub fn new(invoices: Arc<dyn InvoiceRepository>) -> Self {
        Self {
            ledger: PayoutLedger::new(invoices),
        }
    }

    pub async fn open_balance(&self, actor: &Actor, tattooist: &str) -> Result<i64> {
        self.authorize_view(actor, tattooist)?;
        self.ledger.open_balance(tattooist).await
    }

    pub async fn total_earned(&self, actor: &Actor, tattooist: &str) -> Result<i64> {
        self.authorize_view(actor, tattooist)?;
        self.ledger.total_earned(tattooist).await
    }

    /// Dashboard totals for one tattooist.
    pub async fn summary(&self, actor: &Actor, tattooist: &str) -> Result<PayoutSummary> {
        self.authorize_view(actor, tattooist)?;

        Ok(PayoutSummary {
            tattooist: tattooist.to_string(),
            total_earned: self.ledger.total_earned(tattooist).await?,
            open_balance: self.ledger.open_balance(tattooist).await?,
        })
    }

    /// Mark a tattooist's open wage as paid. Admin only.
    pub async fn pay_all(&self, actor: &Actor, tattooist: &str) -> Result<u64> {
        if !actor.is_admin() {
            return Err(AppError::unauthorized(
                "Only administrators may mark payouts as done",
            ));
        }

        let updated = self.ledger.pay_all(tattooist).await?;
        info!(tattooist, updated, "payout batch completed");
        Ok(updated)
    }

    /// Studio-wide revenue. Admin only.
    pub async fn total_revenue(&self, actor: &Actor) -> Result<i64> {
        if !actor.is_admin() {
            return Err(AppError::unauthorized(
                "Only administrators may read studio revenue",
            ));
        }
        self.ledger.total_revenue().await
    }

    fn authorize_view(&self, actor: &Actor, tattooist: &str) -> Result<()> {
        if actor.can_view(tattooist) {
            Ok(())
        } else {
            Err(AppError::unauthorized(format!(
                "{} may not view payouts of {tattooist}",
                actor.username
            )))
        }
    }
}
