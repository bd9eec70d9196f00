use std::env;

use serde::Deserialize;

use crate::core::{AppError, Result};

/// How a customer discount value is interpreted.
///
/// Exactly one mode is active at a time; supporting both per-invoice would
/// make the stored `discount` audit field ambiguous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountMode {
    /// Percentage of the net amount, clamped to 0..=100.
    Percent,
    /// Flat currency amount, clamped so the net amount stays non-negative.
    Flat,
}

/// Studio pricing rules applied at invoice issuance.
///
/// All rates are whole currency units per session. Material cost and wage are
/// studio cost accounting, derived independently of whatever ends up billed.
#[derive(Debug, Clone)]
pub struct PricingConfig {
    /// Billed to the customer per session.
    pub session_rate: i64,
    /// Studio material cost per session.
    pub material_rate: i64,
    /// Wage owed to the tattooist per session.
    pub wage_rate: i64,
    pub discount_mode: DiscountMode,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            session_rate: 1500,
            material_rate: 500,
            wage_rate: 1000,
            discount_mode: DiscountMode::Percent,
        }
    }
}

impl PricingConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        Ok(Self {
            session_rate: rate_from_env("SESSION_RATE", defaults.session_rate)?,
            material_rate: rate_from_env("MATERIAL_RATE", defaults.material_rate)?,
            wage_rate: rate_from_env("WAGE_RATE", defaults.wage_rate)?,
            discount_mode: match env::var("DISCOUNT_MODE").as_deref() {
                Ok("percent") | Err(_) => DiscountMode::Percent,
                Ok("flat") => DiscountMode::Flat,
                Ok(other) => {
                    return Err(AppError::Configuration(format!(
                        "Invalid DISCOUNT_MODE '{other}', expected 'percent' or 'flat'"
                    )))
                }
            },
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.session_rate < 0 || self.material_rate < 0 || self.wage_rate < 0 {
            return Err(AppError::Configuration(
                "Pricing rates must be non-negative".to_string(),
            ));
        }

        Ok(())
    }
}

fn rate_from_env(key: &str, default: i64) -> Result<i64> {
    match env::var(key) {
        Ok(value) => value
            .parse()
            .map_err(|_| AppError::Configuration(format!("Invalid {key}"))),
        Err(_) => Ok(default),
    }
}
