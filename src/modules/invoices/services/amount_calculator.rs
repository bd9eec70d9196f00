use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::config::{DiscountMode, PricingConfig};

/// Monetary breakdown of a single invoice, in whole currency units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmountBreakdown {
    /// Amount before tax, after any discount.
    pub net_amount: i64,
    /// Tax-inclusive billed amount, or the admin override.
    pub final_amount: i64,
    /// Studio material cost, independent of what is billed.
    pub material_cost: i64,
    /// Wage owed to the tattooist.
    pub tattooist_wage: i64,
}

/// Inputs to an amount computation, straight off the customer record.
#[derive(Debug, Clone, Copy, Default)]
pub struct AmountInput {
    pub sessions: Option<i64>,
    pub tax_rate_percent: Decimal,
    pub discount: Option<Decimal>,
    pub custom_amount: Option<i64>,
}

/// Computes invoice amounts from session counts and studio rates.
///
/// Pure and infallible: unusable session counts coerce to zero so a customer
/// record is never blocked by its billing. Negative tax rates clamp to zero.
pub struct AmountCalculator {
    pricing: PricingConfig,
}

impl AmountCalculator {
    pub fn new(pricing: PricingConfig) -> Self {
        Self { pricing }
    }

    pub fn compute(&self, input: &AmountInput) -> AmountBreakdown {
        let sessions = input.sessions.unwrap_or(0).max(0);
        let tax = input.tax_rate_percent.max(Decimal::ZERO);

        let base_net = sessions.saturating_mul(self.pricing.session_rate);
        let material_cost = sessions.saturating_mul(self.pricing.material_rate);
        let session_wage = sessions.saturating_mul(self.pricing.wage_rate);

        let net_amount = match input.discount {
            Some(discount) => self.apply_discount(base_net, discount),
            None => base_net,
        };

        if let Some(custom) = input.custom_amount {
            // Agreed final price: the wage is whatever remains after materials,
            // not the session formula.
            let final_amount = custom.max(0);
            return AmountBreakdown {
                net_amount,
                final_amount,
                material_cost,
                tattooist_wage: (final_amount - material_cost).max(0),
            };
        }

        let gross = Decimal::from(net_amount) * (Decimal::ONE + tax / Decimal::ONE_HUNDRED);
        AmountBreakdown {
            net_amount,
            final_amount: round_whole(gross),
            material_cost,
            tattooist_wage: session_wage,
        }
    }

    fn apply_discount(&self, net: i64, discount: Decimal) -> i64 {
        match self.pricing.discount_mode {
            DiscountMode::Percent => {
                let pct = discount.clamp(Decimal::ZERO, Decimal::ONE_HUNDRED);
                round_whole(Decimal::from(net) * (Decimal::ONE - pct / Decimal::ONE_HUNDRED))
            }
            DiscountMode::Flat => {
                let flat = round_whole(discount.max(Decimal::ZERO));
                (net - flat).max(0)
            }
        }
    }
}

/// Round to the nearest whole currency unit, ties away from zero.
fn round_whole(value: Decimal) -> i64 {
    value
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .unwrap_or(i64::MAX)
}
