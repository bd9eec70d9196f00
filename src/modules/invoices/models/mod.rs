mod invoice;

pub use invoice::{Invoice, IssueOutcome, ManualInvoiceRequest};
