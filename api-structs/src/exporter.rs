//! Shape of the trace export files we ingest, as written by OTLP/JSON exporters.
//! Only the fields the tracker reads are modeled, everything else is ignored.
pub mod trace_exporting;

use std::str::FromStr;

/// OTLP/JSON encodes 64 bit integers as decimal strings, but plenty of exporters
/// write them as plain numbers. Accepts both.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum JsonInt<T> {
    Number(T),
    Decimal(String),
}

impl<T: FromStr + Copy> JsonInt<T> {
    pub fn value(&self) -> Option<T> {
        match self {
            JsonInt::Number(n) => Some(*n),
            JsonInt::Decimal(s) => s.trim().parse().ok(),
        }
    }
}

/// The OTLP `AnyValue`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AnyValue {
    StringValue(String),
    BoolValue(bool),
    IntValue(JsonInt<i64>),
    DoubleValue(f64),
    ArrayValue(serde_json::Value),
    KvlistValue(serde_json::Value),
    BytesValue(String),
}

#[test]
fn json_int_accepts_numbers_and_decimal_strings() {
    let from_number: JsonInt<u64> = serde_json::from_str("1700000000000000000").unwrap();
    let from_string: JsonInt<u64> = serde_json::from_str("\"1700000000000000000\"").unwrap();
    assert_eq!(from_number.value(), Some(1_700_000_000_000_000_000));
    assert_eq!(from_string.value(), Some(1_700_000_000_000_000_000));
    let garbage: JsonInt<u64> = serde_json::from_str("\"soon\"").unwrap();
    assert_eq!(garbage.value(), None);
}
