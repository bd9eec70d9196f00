use crate::core::Result;

pub mod database;
pub mod pricing;

pub use database::DatabaseConfig;
pub use pricing::{DiscountMode, PricingConfig};

/// Main application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub pricing: PricingConfig,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        Ok(Config {
            database: DatabaseConfig::from_env()?,
            pricing: PricingConfig::from_env()?,
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.pricing.validate()
    }
}
