pub mod batch;
pub mod pipeline;

pub use batch::{BatchOutcome, BatchProcessor};
pub use pipeline::charge_invoice;
