use std::sync::Arc;

use chrono::{Datelike, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::PricingConfig;
use crate::core::{Actor, AppError, Result};
use crate::modules::customers::Customer;
use crate::modules::invoices::models::{Invoice, IssueOutcome, ManualInvoiceRequest};
use crate::modules::invoices::repositories::InvoiceRepository;
use crate::modules::invoices::services::amount_calculator::{AmountCalculator, AmountInput};
use crate::modules::invoices::services::invoice_number::InvoiceNumberSequencer;
use crate::modules::taxes::repositories::{default_tax_rate, TaxRepository};

/// How many fresh candidates the issuer tries when an invoice number collides
/// with a concurrent issuance.
const NUMBER_RETRY_LIMIT: u32 = 3;

enum PersistOutcome {
    Written(Invoice),
    /// A concurrent issuance for the same customer won the race.
    CustomerRace,
}

/// Issues invoices for newly created customers and admin manual entries.
///
/// One invoice write per successful call, never a customer mutation. The tax
/// rate is read from the settings store at the moment of issuance and stamped
/// onto the invoice.
pub struct InvoiceIssuer {
    invoices: Arc<dyn InvoiceRepository>,
    taxes: Arc<dyn TaxRepository>,
    sequencer: InvoiceNumberSequencer,
    calculator: AmountCalculator,
}

impl InvoiceIssuer {
    pub fn new(
        invoices: Arc<dyn InvoiceRepository>,
        taxes: Arc<dyn TaxRepository>,
        pricing: PricingConfig,
    ) -> Self {
        Self {
            sequencer: InvoiceNumberSequencer::new(invoices.clone()),
            calculator: AmountCalculator::new(pricing),
            invoices,
            taxes,
        }
    }

    /// Issue the invoice for a customer, exactly once.
    ///
    /// Repeated calls for the same customer return `AlreadyInvoiced` without
    /// writing anything, so customer edits can trigger this freely. A lost
    /// race against a concurrent issuance resolves the same way, never as an
    /// error.
    pub async fn issue(&self, customer: &Customer) -> Result<IssueOutcome> {
        if customer.id.trim().is_empty() {
            return Err(AppError::validation("Customer id is required for issuance"));
        }

        // Fast path; the partial unique index on customer_id is the
        // authoritative guard.
        if self.invoices.exists_for_customer(&customer.id).await? {
            return Ok(IssueOutcome::AlreadyInvoiced);
        }

        let tax_rate = self.taxes.tax_rate().await?.unwrap_or_else(default_tax_rate);
        let breakdown = self.calculator.compute(&AmountInput {
            sessions: customer.sessions,
            tax_rate_percent: tax_rate,
            discount: customer.discount,
            custom_amount: customer.custom_amount,
        });

        let draft = Invoice {
            id: Uuid::new_v4().to_string(),
            invoice_number: String::new(),
            date: Utc::now(),
            tattooist: Some(customer.tattooist.clone()),
            customer_id: Some(customer.id.clone()),
            customer_name: customer.name.clone(),
            tattoo_name: customer.tattoo_name.clone(),
            placement: customer.placement.clone(),
            sessions: customer.sessions.unwrap_or(0).max(0),
            tax_rate,
            net_amount: breakdown.net_amount,
            amount: breakdown.final_amount,
            material_cost: breakdown.material_cost,
            tattooist_wage: breakdown.tattooist_wage,
            discount: customer.discount,
            custom_amount: customer.custom_amount,
            payout_done: false,
        };

        match self.persist_with_fresh_number(draft).await? {
            PersistOutcome::Written(invoice) => {
                info!(
                    number = %invoice.invoice_number,
                    customer = %customer.id,
                    amount = invoice.amount,
                    "invoice issued"
                );
                Ok(IssueOutcome::Issued(invoice))
            }
            PersistOutcome::CustomerRace => Ok(IssueOutcome::AlreadyInvoiced),
        }
    }

    /// Enter an invoice by hand, admin only.
    ///
    /// Bypasses the per-customer idempotency rule entirely; the invoice is
    /// keyed by nothing but its own number. Without a tattooist it is a
    /// studio invoice: zero wage and zero material cost regardless of the
    /// session count.
    pub async fn issue_manual(
        &self,
        actor: &Actor,
        request: ManualInvoiceRequest,
    ) -> Result<Invoice> {
        if !actor.is_admin() {
            return Err(AppError::unauthorized(
                "Only administrators may enter manual invoices",
            ));
        }

        let tax_rate = self.taxes.tax_rate().await?.unwrap_or_else(default_tax_rate);
        let mut breakdown = self.calculator.compute(&AmountInput {
            sessions: request.sessions,
            tax_rate_percent: tax_rate,
            discount: request.discount,
            custom_amount: request.custom_amount,
        });
        if request.tattooist.is_none() {
            // Studio invoice: nothing owed to an individual, no material
            // accounting either.
            breakdown.material_cost = 0;
            breakdown.tattooist_wage = 0;
        }

        let draft = Invoice {
            id: Uuid::new_v4().to_string(),
            invoice_number: String::new(),
            date: Utc::now(),
            tattooist: request.tattooist.clone(),
            customer_id: None,
            customer_name: request.customer_name.clone(),
            tattoo_name: request.tattoo_name.clone(),
            placement: request.placement.clone(),
            sessions: request.sessions.unwrap_or(0).max(0),
            tax_rate,
            net_amount: breakdown.net_amount,
            amount: breakdown.final_amount,
            material_cost: breakdown.material_cost,
            tattooist_wage: breakdown.tattooist_wage,
            discount: request.discount,
            custom_amount: request.custom_amount,
            payout_done: false,
        };

        match self.persist_with_fresh_number(draft).await? {
            PersistOutcome::Written(invoice) => {
                info!(number = %invoice.invoice_number, "manual invoice issued");
                Ok(invoice)
            }
            // Unreachable without a customer_id; the race check is guarded on it.
            PersistOutcome::CustomerRace => {
                Err(AppError::conflict("Manual invoice lost a uniqueness race"))
            }
        }
    }

    /// Allocate a number and insert, retrying with skipped candidates while
    /// the number index rejects them.
    async fn persist_with_fresh_number(&self, mut invoice: Invoice) -> Result<PersistOutcome> {
        let year = invoice.date.year();

        for attempt in 0..=NUMBER_RETRY_LIMIT {
            invoice.invoice_number = self.sequencer.next_for_year_skipping(year, attempt).await?;

            match self.invoices.insert(&invoice).await {
                Ok(()) => return Ok(PersistOutcome::Written(invoice)),
                Err(AppError::Conflict(reason)) => {
                    if let Some(customer_id) = invoice.customer_id.as_deref() {
                        if self.invoices.exists_for_customer(customer_id).await? {
                            return Ok(PersistOutcome::CustomerRace);
                        }
                    }
                    warn!(
                        number = %invoice.invoice_number,
                        %reason,
                        "invoice number collided, retrying"
                    );
                }
                Err(e) => return Err(e),
            }
        }

        Err(AppError::conflict(
            "Could not allocate a unique invoice number",
        ))
    }
}
