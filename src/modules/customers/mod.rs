// Customers module
//
// Customer records are owned by the intake side of the studio tool; the
// billing core only reads them, so this module carries the record shape and
// nothing else.

pub mod models;

pub use models::Customer;
