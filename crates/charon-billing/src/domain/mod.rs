pub mod types;

pub use types::{Currency, CustomerId, Invoice, InvoiceId, InvoiceStatus, Money};
