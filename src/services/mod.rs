pub mod csv_exporter;
pub mod deal_extractor;
pub mod failure_log;
pub mod field_extractor;

pub use csv_exporter::CsvExporter;
pub use deal_extractor::DealExtractor;
pub use failure_log::{FailureLog, FileFailureLog, MemoryFailureLog};
