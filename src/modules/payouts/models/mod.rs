mod payout;

pub use payout::PayoutSummary;
