use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Customer record as supplied by the studio's intake forms.
///
/// Issuance reads the identity, tattoo snapshot, session count and price
/// adjustments; the remaining fields travel with the record so its shape
/// matches the shared `customers` table. `done_sessions` may exceed
/// `sessions` upstream — billing tolerates that rather than policing it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub phone: Option<String>,
    pub tattoo_name: String,
    pub placement: String,
    /// Planned session count; missing or negative values are billed as zero.
    pub sessions: Option<i64>,
    pub done_sessions: Option<i64>,
    /// Owning tattooist username.
    pub tattooist: String,
    /// Optional discount, interpreted per the configured `DiscountMode`.
    pub discount: Option<Decimal>,
    /// Admin override of the final invoice amount.
    pub custom_amount: Option<i64>,
    pub is_archived: bool,
    pub date: Option<DateTime<Utc>>,
    pub last_session_date: Option<DateTime<Utc>>,
}

impl Customer {
    /// A fresh, unarchived customer with no price adjustments.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        tattooist: impl Into<String>,
        sessions: i64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            phone: None,
            tattoo_name: String::new(),
            placement: String::new(),
            sessions: Some(sessions),
            done_sessions: Some(0),
            tattooist: tattooist.into(),
            discount: None,
            custom_amount: None,
            is_archived: false,
            date: None,
            last_session_date: None,
        }
    }
}
