pub mod payout_service;

pub use payout_service::{PayoutLedger, PayoutService};
