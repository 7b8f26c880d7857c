//! Responses of the query and ingestion endpoints. The repeated calls reports share
//! these shapes with the files written to the output directory.
pub mod ingestion;
pub mod repeated_calls;

use crate::tracking::{ChildCall, TraceDetails};

/// Every call made by the root calls matching a name fragment, concatenated.
/// `name` and `details` are the ones of the last matching record.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DirectChildren {
    pub name: String,
    pub details: Option<TraceDetails>,
    pub called_methods: Vec<ChildCall>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ProcessedCount {
    pub processed_count: usize,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ApiErrorBody {
    pub error: String,
}
