use std::str::FromStr;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::SqlitePool;
use tracing::debug;

use crate::core::{AppError, Result};

/// Settings key under which the studio tax rate is stored.
pub const TAX_SETTING_KEY: &str = "tax";

/// Tax rate assumed when no setting has been stored yet.
pub fn default_tax_rate() -> Decimal {
    Decimal::from(19)
}

/// Read/write access to the studio tax setting.
///
/// The rate is read once per issuance and stamped onto the invoice, so later
/// changes never alter invoices that are already out the door.
#[async_trait]
pub trait TaxRepository: Send + Sync {
    /// Current tax rate percentage, or `None` if never configured.
    async fn tax_rate(&self) -> Result<Option<Decimal>>;

    /// Store a new tax rate percentage. Admin operation.
    async fn set_tax_rate(&self, rate: Decimal) -> Result<()>;
}

pub struct SqliteTaxRepository {
    pool: SqlitePool,
}

impl SqliteTaxRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaxRepository for SqliteTaxRepository {
    async fn tax_rate(&self) -> Result<Option<Decimal>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
            .bind(TAX_SETTING_KEY)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some((value,)) => {
                let rate = Decimal::from_str(&value).map_err(|e| {
                    AppError::internal(format!("Stored tax rate '{value}' is not a number: {e}"))
                })?;
                Ok(Some(rate))
            }
            None => Ok(None),
        }
    }

    async fn set_tax_rate(&self, rate: Decimal) -> Result<()> {
        if rate < Decimal::ZERO || rate > Decimal::ONE_HUNDRED {
            return Err(AppError::validation(format!(
                "Tax rate must be between 0 and 100, got {rate}"
            )));
        }

        sqlx::query(
            "INSERT INTO settings (key, value) VALUES (?, ?) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(TAX_SETTING_KEY)
        .bind(rate.to_string())
        .execute(&self.pool)
        .await?;

        debug!(%rate, "tax rate updated");
        Ok(())
    }
}
