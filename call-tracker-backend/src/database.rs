use api_structs::TraceRecord;
use async_trait::async_trait;
use backtraced_error::SqlxError;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

#[cfg(test)]
pub mod memory;
pub mod postgres;

/// A flat collection of trace records. Callers only ever do full scans.
/// The store guarantees atomic single record writes, nothing more: checking for a record
/// and then inserting it is racy if two ingestions run at the same time.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn insert(&self, record: &TraceRecord) -> Result<(), StoreUnavailableError>;
    /// Every record, in insertion order
    async fn find_all(&self) -> Result<Vec<TraceRecord>, StoreUnavailableError>;
}

#[derive(Debug, thiserror::Error)]
#[error("Record store unavailable")]
pub struct StoreUnavailableError {
    #[from]
    source: SqlxError,
}

// Postgres truncates longer identifiers
const MAX_COLLECTION_NAME_LEN: usize = 63;

#[derive(Debug, thiserror::Error)]
#[error("Invalid collection name {name:?}: must be a plain identifier ([A-Za-z_][A-Za-z0-9_]*) of at most 63 chars")]
pub struct InvalidCollectionName {
    name: String,
}

/// Name of the table holding the records. It ends up formatted into SQL,
/// so only plain identifiers are accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionName(String);

impl FromStr for CollectionName {
    type Err = InvalidCollectionName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let valid_start = chars
            .next()
            .map(|c| c.is_ascii_alphabetic() || c == '_')
            .unwrap_or(false);
        let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
        if valid_start && valid_rest && s.len() <= MAX_COLLECTION_NAME_LEN {
            Ok(Self(s.to_string()))
        } else {
            Err(InvalidCollectionName {
                name: s.to_string(),
            })
        }
    }
}

impl Display for CollectionName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod test {
    use super::CollectionName;
    use std::str::FromStr;

    #[test]
    fn collection_names_must_be_plain_identifiers() {
        assert!(CollectionName::from_str("query_traces").is_ok());
        assert!(CollectionName::from_str("_Traces2").is_ok());
        assert!(CollectionName::from_str("").is_err());
        assert!(CollectionName::from_str("2traces").is_err());
        assert!(CollectionName::from_str("traces; drop table x").is_err());
        assert!(CollectionName::from_str("traçes").is_err());
        assert!(CollectionName::from_str(&"t".repeat(64)).is_err());
    }
}
