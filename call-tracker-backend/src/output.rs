use backtraced_error::{error_chain_to_pretty_formatted, IoError, SerdeJsonError};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{error, info, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    SubCalls,
    RepeatingSubCalls,
    Parents,
}

impl OutputKind {
    fn file_prefix(&self) -> &'static str {
        match self {
            OutputKind::SubCalls => "SearchSubCalls",
            OutputKind::RepeatingSubCalls => "SearchRepeatingSubCalls",
            OutputKind::Parents => "SearchParents",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("Failed to write query output")]
    Io(#[from] IoError),
    #[error("Failed to serialize query output")]
    Serialization(#[from] SerdeJsonError),
}

/// Keeps a pretty printed copy of query results around for debugging.
/// File names are only unique within one query, a later query of the same kind, name
/// and day overwrites the earlier file.
#[derive(Debug, Clone)]
pub struct OutputWriter {
    out_dir: PathBuf,
}

impl OutputWriter {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
        }
    }

    /// `<kind>_<name>_<local date>[_<counter>].json`, slashes replaced by dashes since both
    /// names and the locale date may contain them.
    pub fn file_name(kind: OutputKind, searched_name: &str, counter: Option<usize>) -> String {
        let date = chrono::Local::now().format("%x").to_string();
        let stem = match counter {
            None => format!("{}_{}_{}", kind.file_prefix(), searched_name, date),
            Some(counter) => format!("{}_{}_{}_{}", kind.file_prefix(), searched_name, date, counter),
        };
        format!("{}.json", stem.replace('/', "-"))
    }

    #[instrument(skip_all, fields(kind=?kind))]
    pub async fn write<T: Serialize>(
        &self,
        kind: OutputKind,
        searched_name: &str,
        counter: Option<usize>,
        content: &T,
    ) -> Result<PathBuf, OutputError> {
        let path = self
            .out_dir
            .join(Self::file_name(kind, searched_name, counter));
        let pretty = serde_json::to_string_pretty(content).map_err(|e| {
            SerdeJsonError::from_serde_json_error(e, "serializing query output", String::new())
        })?;
        tokio::fs::create_dir_all(&self.out_dir)
            .await
            .map_err(|e| IoError::from_io_error(e, "creating output directory", &self.out_dir))?;
        tokio::fs::write(&path, pretty)
            .await
            .map_err(|e| IoError::from_io_error(e, "writing query output", &path))?;
        info!("Wrote {}", path.display());
        Ok(path)
    }

    /// Output files are a debugging aid, failing to write one never fails the query.
    pub async fn write_logging_error<T: Serialize>(
        &self,
        kind: OutputKind,
        searched_name: &str,
        counter: Option<usize>,
        content: &T,
    ) -> Option<PathBuf> {
        match self.write(kind, searched_name, counter, content).await {
            Ok(path) => Some(path),
            Err(err) => {
                error!("{}", error_chain_to_pretty_formatted(err));
                None
            }
        }
    }
}
