pub mod amount_calculator;
pub mod invoice_number;
pub mod invoice_service;

pub use amount_calculator::{AmountBreakdown, AmountCalculator, AmountInput};
pub use invoice_number::{format_invoice_number, year_bounds, InvoiceNumberSequencer};
pub use invoice_service::InvoiceIssuer;
