//! The normalized documents kept in the record store.

/// One root call (batch 0 of an export) and the calls it made (batch 1).
/// Two records are the same record when `root_call_name` and `details` are equal.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TraceRecord {
    pub root_call_name: String,
    pub details: TraceDetails,
    pub called_methods: Vec<ChildCall>,
}

impl TraceRecord {
    pub fn is_same_record_as(&self, other: &TraceRecord) -> bool {
        self.root_call_name == other.root_call_name && self.details == other.details
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TraceDetails {
    pub trace_id: String,
    pub attributes: RootCallAttributes,
}

/// The root span attributes we keep, each stored as the full key/value pair.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RootCallAttributes {
    pub url_path: Option<SpanAttribute>,
    pub network_peer_address: Option<SpanAttribute>,
    pub server_address: Option<SpanAttribute>,
    pub http_response_status_code: Option<SpanAttribute>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SpanAttribute {
    pub key: String,
    pub value: AttributeValue,
}

/// Scalars are normalized, composite values are kept as exported.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AttributeValue {
    StringValue(String),
    BoolValue(bool),
    IntValue(i64),
    DoubleValue(f64),
    ArrayValue(serde_json::Value),
    KvlistValue(serde_json::Value),
    BytesValue(String),
}

/// A downstream call. HTTP calls carry `url`, database calls carry `db_statement`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ChildCall {
    pub name: String,
    pub duration_ms: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_statement: Option<String>,
}

impl ChildCall {
    /// HTTP calls with the same span name but different urls must not be merged,
    /// so their url becomes part of the key.
    pub fn group_key(&self) -> String {
        match &self.url {
            Some(url) => format!("{} {}", self.name, url),
            None => self.name.clone(),
        }
    }
}
