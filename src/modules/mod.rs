pub mod customers;
pub mod invoices;
pub mod payouts;
pub mod taxes;
