use api_structs::exporter::trace_exporting::{ExportBatch, ExportedSpan, TraceExport};
use api_structs::tracking::{ChildCall, RootCallAttributes, TraceDetails, TraceRecord};
use backtraced_error::SerdeJsonError;
use tracing::{debug, instrument, trace};

pub mod span_processing;

const ROOT_CALL_BATCH: usize = 0;
const CALLED_METHODS_BATCH: usize = 1;

#[derive(Debug, thiserror::Error)]
pub enum MalformedTraceError {
    #[error("Malformed trace: {cause}")]
    Invalid { cause: String },
    #[error("Malformed trace: not a trace export document")]
    NotAnExport {
        #[source]
        source: SerdeJsonError,
    },
}

impl MalformedTraceError {
    pub fn from_cause<S: Into<String>>(cause: S) -> Self {
        Self::Invalid {
            cause: cause.into(),
        }
    }
}

/// Parses the contents of an export file, see [parse_trace_export].
#[instrument(skip_all)]
pub fn parse_trace_export_json(contents: &str) -> Result<TraceRecord, MalformedTraceError> {
    let export: TraceExport = serde_json::from_str(contents).map_err(|e| {
        MalformedTraceError::NotAnExport {
            source: SerdeJsonError::from_serde_json_error(
                e,
                "deserializing trace export",
                contents.to_string(),
            ),
        }
    })?;
    parse_trace_export(&export)
}

/// Batch 0 must hold the root call as its first span. Every span of batch 1
/// becomes a child call, in export order.
#[instrument(skip_all)]
pub fn parse_trace_export(export: &TraceExport) -> Result<TraceRecord, MalformedTraceError> {
    let root_batch = batch(export, ROOT_CALL_BATCH)?;
    let children_batch = batch(export, CALLED_METHODS_BATCH)?;
    let root = root_batch
        .spans()
        .next()
        .ok_or(MalformedTraceError::from_cause("Root call batch has no spans"))?;
    let details = root_call_details(root)?;
    let called_methods = children_batch
        .spans()
        .map(child_call)
        .collect::<Result<Vec<ChildCall>, MalformedTraceError>>()?;
    debug!(
        "Parsed {} with {} called methods",
        root.name,
        called_methods.len()
    );
    trace!("details = {:?}", details);
    Ok(TraceRecord {
        root_call_name: root.name.clone(),
        details,
        called_methods,
    })
}

fn batch(export: &TraceExport, idx: usize) -> Result<&ExportBatch, MalformedTraceError> {
    let batch = export.batches.get(idx).ok_or_else(|| {
        MalformedTraceError::from_cause(format!(
            "Expected at least {} batches, got {}",
            idx + 1,
            export.batches.len()
        ))
    })?;
    if batch.instrumentation_library_spans.is_empty() {
        return Err(MalformedTraceError::from_cause(format!(
            "Batch {idx} has no span groups"
        )));
    }
    Ok(batch)
}

fn root_call_details(root: &ExportedSpan) -> Result<TraceDetails, MalformedTraceError> {
    let trace_id = root
        .trace_id
        .clone()
        .ok_or(MalformedTraceError::from_cause("Root span has no traceId"))?;
    Ok(TraceDetails {
        trace_id,
        attributes: RootCallAttributes {
            url_path: span_processing::span_attribute(root, span_processing::URL_PATH_KEY)?,
            network_peer_address: span_processing::span_attribute(
                root,
                span_processing::NETWORK_PEER_ADDRESS_KEY,
            )?,
            server_address: span_processing::span_attribute(
                root,
                span_processing::SERVER_ADDRESS_KEY,
            )?,
            http_response_status_code: span_processing::span_attribute(
                root,
                span_processing::HTTP_RESPONSE_STATUS_CODE_KEY,
            )?,
        },
    })
}

fn child_call(span: &ExportedSpan) -> Result<ChildCall, MalformedTraceError> {
    Ok(ChildCall {
        name: span.name.clone(),
        duration_ms: span_processing::span_duration_ms(span)?,
        url: span_processing::span_string_attribute(span, span_processing::URL_FULL_KEY)?,
        db_statement: span_processing::span_string_attribute(
            span,
            span_processing::DB_STATEMENT_KEY,
        )?,
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use api_structs::tracking::{AttributeValue, SpanAttribute};
    use serde_json::json;

    const GET_ORDERS: &str = include_str!("../test-data/get_orders.json");

    fn export(value: serde_json::Value) -> TraceExport {
        serde_json::from_value(value).unwrap()
    }

    fn root_batch() -> serde_json::Value {
        json!({"instrumentationLibrarySpans": [{"spans": [{
            "traceId": "abc",
            "name": "GET /orders",
            "attributes": [
                {"key": "url.path", "value": {"stringValue": "/orders"}},
                {"key": "http.response.status_code", "value": {"intValue": "200"}},
                {"key": "ignored", "value": {"arrayValue": {"values": []}}}
            ]
        }]}]})
    }

    #[test]
    fn parses_fixture_durations_and_child_kinds() {
        let record = parse_trace_export_json(GET_ORDERS).unwrap();
        assert_eq!(record.root_call_name, "GET /orders");
        assert_eq!(record.details.trace_id, "5b8efff798038103d269b633813fc60c");
        assert_eq!(record.called_methods.len(), 4);
        let durations: Vec<f64> = record.called_methods.iter().map(|c| c.duration_ms).collect();
        assert_eq!(durations, vec![5.0, 15.0, 12.5, 0.25]);
        assert_eq!(
            record.called_methods[0].db_statement.as_deref(),
            Some("SELECT * FROM orders")
        );
        assert_eq!(record.called_methods[0].url, None);
        assert_eq!(
            record.called_methods[2].url.as_deref(),
            Some("http://inventory/items")
        );
        assert_eq!(record.called_methods[3].url, None);
        assert_eq!(record.called_methods[3].db_statement, None);
    }

    #[test]
    fn missing_root_attributes_are_none() {
        let record = parse_trace_export(&export(json!({"batches": [
            root_batch(),
            {"instrumentationLibrarySpans": [{"spans": []}]}
        ]})))
        .unwrap();
        let attributes = record.details.attributes;
        assert_eq!(
            attributes.url_path,
            Some(SpanAttribute {
                key: "url.path".to_string(),
                value: AttributeValue::StringValue("/orders".to_string())
            })
        );
        assert_eq!(
            attributes.http_response_status_code.map(|a| a.value),
            Some(AttributeValue::IntValue(200))
        );
        assert_eq!(attributes.network_peer_address, None);
        assert_eq!(attributes.server_address, None);
        assert!(record.called_methods.is_empty());
    }

    #[test]
    fn composite_root_attributes_are_kept_raw() {
        let record = parse_trace_export(&export(json!({"batches": [
            {"instrumentationLibrarySpans": [{"spans": [{
                "traceId": "abc",
                "name": "GET /orders",
                "attributes": [
                    {"key": "url.path", "value": {"arrayValue": {"values": [{"stringValue": "/orders"}]}}},
                    {"key": "server.address", "value": {"bytesValue": "b3JkZXJz"}}
                ]
            }]}]},
            {"instrumentationLibrarySpans": [{"spans": []}]}
        ]})))
        .unwrap();
        let attributes = record.details.attributes;
        assert_eq!(
            attributes.url_path.map(|a| a.value),
            Some(AttributeValue::ArrayValue(
                json!({"values": [{"stringValue": "/orders"}]})
            ))
        );
        assert_eq!(
            attributes.server_address.map(|a| a.value),
            Some(AttributeValue::BytesValue("b3JkZXJz".to_string()))
        );
    }

    #[test]
    fn parsed_records_survive_a_json_round_trip() {
        let record = parse_trace_export_json(GET_ORDERS).unwrap();
        let document = serde_json::to_value(&record).unwrap();
        assert_eq!(document["called_methods"][3].get("url"), None);
        assert_eq!(
            document["details"]["attributes"]["http_response_status_code"]["value"],
            json!({"intValue": 200})
        );
        let read_back: TraceRecord = serde_json::from_value(document).unwrap();
        assert_eq!(read_back, record);
        assert!(read_back.is_same_record_as(&record));
    }

    #[test]
    fn child_with_url_and_statement_keeps_both() {
        let record = parse_trace_export(&export(json!({"batches": [
            root_batch(),
            {"scopeSpans": [{"spans": [{
                "name": "odd",
                "startTimeUnixNano": 1_000_000,
                "endTimeUnixNano": "3000000",
                "attributes": [
                    {"key": "url.full", "value": {"stringValue": "http://x"}},
                    {"key": "db.statement", "value": {"stringValue": "SELECT 1"}}
                ]
            }]}]}
        ]})))
        .unwrap();
        let child = &record.called_methods[0];
        assert_eq!(child.duration_ms, 2.0);
        assert_eq!(child.url.as_deref(), Some("http://x"));
        assert_eq!(child.db_statement.as_deref(), Some("SELECT 1"));
    }

    #[test]
    fn children_of_every_span_group_are_collected() {
        let span = |name: &str| json!({"name": name, "startTimeUnixNano": 0, "endTimeUnixNano": 1_000_000});
        let record = parse_trace_export(&export(json!({"batches": [
            root_batch(),
            {"instrumentationLibrarySpans": [
                {"spans": [span("a"), span("b")]},
                {"spans": [span("c")]}
            ]}
        ]})))
        .unwrap();
        let names: Vec<&str> = record.called_methods.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn missing_or_empty_batches_are_malformed() {
        let only_root = export(json!({"batches": [root_batch()]}));
        assert!(matches!(
            parse_trace_export(&only_root),
            Err(MalformedTraceError::Invalid { .. })
        ));
        let empty_children = export(json!({"batches": [root_batch(), {}]}));
        assert!(parse_trace_export(&empty_children).is_err());
        let empty_root = export(json!({"batches": [
            {"instrumentationLibrarySpans": [{"spans": []}]},
            {"instrumentationLibrarySpans": [{"spans": []}]}
        ]}));
        assert!(parse_trace_export(&empty_root).is_err());
        assert!(parse_trace_export(&export(json!({}))).is_err());
    }

    #[test]
    fn malformed_referenced_attributes_are_rejected() {
        let not_a_string_url = export(json!({"batches": [
            root_batch(),
            {"instrumentationLibrarySpans": [{"spans": [{
                "name": "svc",
                "startTimeUnixNano": 0,
                "endTimeUnixNano": 1,
                "attributes": [{"key": "url.full", "value": {"intValue": 3}}]
            }]}]}
        ]}));
        assert!(parse_trace_export(&not_a_string_url).is_err());
        let no_end_time = export(json!({"batches": [
            root_batch(),
            {"instrumentationLibrarySpans": [{"spans": [{"name": "svc", "startTimeUnixNano": 0}]}]}
        ]}));
        assert!(parse_trace_export(&no_end_time).is_err());
    }

    #[test]
    fn non_export_json_is_malformed() {
        assert!(matches!(
            parse_trace_export_json("[1, 2, 3]"),
            Err(MalformedTraceError::NotAnExport { .. })
        ));
        assert!(parse_trace_export_json("{\"batches\": ").is_err());
    }
}
