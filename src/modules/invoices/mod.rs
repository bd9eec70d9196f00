// Invoices module

pub mod models;
pub mod repositories;
pub mod services;

pub use models::{Invoice, IssueOutcome, ManualInvoiceRequest};
pub use repositories::{InvoiceRepository, SqliteInvoiceRepository};
pub use services::{AmountBreakdown, AmountCalculator, AmountInput, InvoiceIssuer, InvoiceNumberSequencer};
