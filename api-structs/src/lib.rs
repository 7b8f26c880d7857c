pub mod exporter;
pub mod time_conversion;
pub mod tracking;
pub mod ui;

pub use exporter::trace_exporting::TraceExport;
pub use tracking::{ChildCall, TraceDetails, TraceRecord};
