//! Inktrust — studio billing and payout core for Skeleton Ink.
//!
//! This library implements invoice issuance (sequential numbering, amount
//! computation, tax snapshotting) and the tattooist payout ledger against a
//! shared SQLite store. Customer intake, login and export live elsewhere and
//! only exchange records with this core.

pub mod config;
pub mod core;
pub mod modules;

// Re-export commonly used types
pub use modules::customers;
pub use modules::invoices;
pub use modules::payouts;
pub use modules::taxes;
