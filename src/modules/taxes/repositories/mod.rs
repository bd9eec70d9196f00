pub mod tax_repository;

pub use tax_repository::{default_tax_rate, SqliteTaxRepository, TaxRepository, TAX_SETTING_KEY};
