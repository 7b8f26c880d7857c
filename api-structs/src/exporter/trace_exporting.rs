use crate::exporter::JsonInt;

/// A whole export file. Batch 0 carries the root call, batch 1 the calls it made.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TraceExport {
    #[serde(default)]
    pub batches: Vec<ExportBatch>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportBatch {
    /// Renamed to `scopeSpans` in newer OTLP versions
    #[serde(default, alias = "scopeSpans")]
    pub instrumentation_library_spans: Vec<SpanGroup>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SpanGroup {
    #[serde(default)]
    pub spans: Vec<ExportedSpan>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedSpan {
    pub name: String,
    #[serde(default)]
    pub trace_id: Option<String>,
    #[serde(default)]
    pub start_time_unix_nano: Option<JsonInt<u64>>,
    #[serde(default)]
    pub end_time_unix_nano: Option<JsonInt<u64>>,
    #[serde(default)]
    pub attributes: Vec<ExportedKeyValue>,
}

/// The value is kept raw: attributes we never look at may hold anything.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ExportedKeyValue {
    pub key: String,
    #[serde(default)]
    pub value: serde_json::Value,
}

impl ExportedSpan {
    pub fn attribute(&self, key: &str) -> Option<&ExportedKeyValue> {
        self.attributes.iter().find(|kv| kv.key == key)
    }
}

impl ExportBatch {
    pub fn spans(&self) -> impl Iterator<Item = &ExportedSpan> {
        self.instrumentation_library_spans
            .iter()
            .flat_map(|group| group.spans.iter())
    }
}
