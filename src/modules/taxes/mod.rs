// Taxes module

pub mod repositories;

pub use repositories::{default_tax_rate, SqliteTaxRepository, TaxRepository, TAX_SETTING_KEY};
