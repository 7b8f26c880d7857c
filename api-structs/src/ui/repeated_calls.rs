use crate::tracking::TraceDetails;
use indexmap::IndexMap;

/// Statistics of all calls sharing a group key, see [crate::ChildCall::group_key].
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AggregatedCallStat {
    pub call_count: usize,
    pub total_time_ms: f64,
    pub average_time_ms: f64,
    pub min_time_ms: f64,
    pub max_time_ms: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_statement: Option<String>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RepeatedCallsParent {
    pub name: String,
    #[serde(flatten)]
    pub details: TraceDetails,
    pub total_time_ms: f64,
}

/// Written once per matching root call. `calls` is ordered by total time, descending.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RepeatedCallsReport {
    pub parent: RepeatedCallsParent,
    pub calls: IndexMap<String, AggregatedCallStat>,
}
