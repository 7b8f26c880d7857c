use crate::otel_trace_processing::MalformedTraceError;
use api_structs::exporter::trace_exporting::{ExportedKeyValue, ExportedSpan};
use api_structs::exporter::{AnyValue, JsonInt};
use api_structs::time_conversion::nanos_interval_to_millis;
use api_structs::tracking::{AttributeValue, SpanAttribute};

pub const URL_PATH_KEY: &str = "url.path";
pub const NETWORK_PEER_ADDRESS_KEY: &str = "network.peer.address";
pub const SERVER_ADDRESS_KEY: &str = "server.address";
pub const HTTP_RESPONSE_STATUS_CODE_KEY: &str = "http.response.status_code";
pub const URL_FULL_KEY: &str = "url.full";
pub const DB_STATEMENT_KEY: &str = "db.statement";

pub fn any_value_to_supported_value(
    kv: &ExportedKeyValue,
) -> Result<AttributeValue, MalformedTraceError> {
    let any_value: AnyValue = serde_json::from_value(kv.value.clone()).map_err(|e| {
        MalformedTraceError::from_cause(format!("Attribute {} has an invalid value: {e}", kv.key))
    })?;
    let supported = match any_value {
        AnyValue::StringValue(string) => AttributeValue::StringValue(string),
        AnyValue::BoolValue(boolean) => AttributeValue::BoolValue(boolean),
        AnyValue::DoubleValue(double) => AttributeValue::DoubleValue(double),
        AnyValue::IntValue(int) => AttributeValue::IntValue(int.value().ok_or_else(|| {
            MalformedTraceError::from_cause(format!("Attribute {} intValue is not an i64", kv.key))
        })?),
        AnyValue::ArrayValue(array) => AttributeValue::ArrayValue(array),
        AnyValue::KvlistValue(kvlist) => AttributeValue::KvlistValue(kvlist),
        AnyValue::BytesValue(bytes) => AttributeValue::BytesValue(bytes),
    };
    Ok(supported)
}

/// The attribute as a whole key/value pair, `None` if the span doesn't carry it.
pub fn span_attribute(
    span: &ExportedSpan,
    key: &str,
) -> Result<Option<SpanAttribute>, MalformedTraceError> {
    let Some(kv) = span.attribute(key) else {
        return Ok(None);
    };
    Ok(Some(SpanAttribute {
        key: kv.key.clone(),
        value: any_value_to_supported_value(kv)?,
    }))
}

/// Same as [span_attribute], but the value must be a string.
pub fn span_string_attribute(
    span: &ExportedSpan,
    key: &str,
) -> Result<Option<String>, MalformedTraceError> {
    match span_attribute(span, key)? {
        None => Ok(None),
        Some(SpanAttribute {
            value: AttributeValue::StringValue(value),
            ..
        }) => Ok(Some(value)),
        Some(_other) => Err(MalformedTraceError::from_cause(format!(
            "Span {} attribute {key} is not a string",
            span.name
        ))),
    }
}

pub fn span_duration_ms(span: &ExportedSpan) -> Result<f64, MalformedTraceError> {
    let timestamp = |raw: Option<&JsonInt<u64>>, which: &str| {
        raw.and_then(|t| t.value()).ok_or_else(|| {
            MalformedTraceError::from_cause(format!(
                "Span {} has a missing or invalid {which} time",
                span.name
            ))
        })
    };
    let start = timestamp(span.start_time_unix_nano.as_ref(), "start")?;
    let end = timestamp(span.end_time_unix_nano.as_ref(), "end")?;
    Ok(nanos_interval_to_millis(start, end))
}
