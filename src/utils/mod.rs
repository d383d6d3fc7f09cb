pub mod batching;
pub mod logging;

pub use batching::create_batches;
