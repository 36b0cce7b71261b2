//! Core domain logic for the Sidra portal: error taxonomy, report records,
//! upstream payload normalization and the format exporter.

pub mod error;
pub mod export;
pub mod normalize;
pub mod report;

pub use error::{CoreError, ErrorCategory, Result};
pub use export::{Export, ReportMeta, ReportWriter, TabularWriter, export, to_csv};
pub use normalize::{ValueSource, normalize_items, normalize_value};
pub use report::{ReportFormat, ReportRecord};
