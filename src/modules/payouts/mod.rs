// Payouts module

pub mod models;
pub mod services;

pub use models::PayoutSummary;
pub use services::{PayoutLedger, PayoutService};
