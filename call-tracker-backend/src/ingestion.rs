use crate::database::{RecordStore, StoreUnavailableError};
use crate::otel_trace_processing::{parse_trace_export_json, MalformedTraceError};
use api_structs::ui::ingestion::{FileIngestion, FileIngestionResult, IngestionOutcome};
use api_structs::TraceRecord;
use backtraced_error::{error_chain_to_pretty_formatted, IoError};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, thiserror::Error)]
pub enum IngestionError {
    #[error("Failed to read trace file")]
    Read(#[from] IoError),
    #[error(transparent)]
    Malformed(#[from] MalformedTraceError),
    #[error(transparent)]
    Store(#[from] StoreUnavailableError),
}

impl IngestionError {
    /// One line, without backtraces, fit for the ingestion report.
    pub fn summary(&self) -> String {
        match self {
            IngestionError::Read(e) => format!("{self} {}: {}", e.path.display(), e.source),
            IngestionError::Malformed(MalformedTraceError::NotAnExport { source }) => {
                format!("{self}: {}", source.source)
            }
            IngestionError::Malformed(e) => e.to_string(),
            IngestionError::Store(e) => e.to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DirectoryIngestionError {
    #[error("Failed to list trace directory")]
    Listing(#[from] IoError),
    #[error(transparent)]
    Store(#[from] StoreUnavailableError),
}

pub struct IngestionService {
    store: Arc<dyn RecordStore>,
    data_path: PathBuf,
}

#[instrument]
pub async fn read_trace_file(path: &Path) -> Result<TraceRecord, IngestionError> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| IoError::from_io_error(e, "reading trace file", path))?;
    Ok(parse_trace_export_json(&contents)?)
}

impl IngestionService {
    pub fn new(store: Arc<dyn RecordStore>, data_path: impl Into<PathBuf>) -> Self {
        Self {
            store,
            data_path: data_path.into(),
        }
    }

    /// Directory scanned by default.
    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    /// Inserts the record unless one with the same root call name and details is stored.
    #[instrument(skip_all, fields(root_call_name=%record.root_call_name))]
    pub async fn ingest_record(
        &self,
        record: &TraceRecord,
    ) -> Result<IngestionOutcome, StoreUnavailableError> {
        let stored = self.store.find_all().await?;
        if stored.iter().any(|s| s.is_same_record_as(record)) {
            info!("Already present, skipping");
            return Ok(IngestionOutcome::AlreadyPresent);
        }
        self.store.insert(record).await?;
        info!("Inserted");
        Ok(IngestionOutcome::Inserted)
    }

    pub async fn ingest_one(&self, path: &Path) -> Result<IngestionOutcome, IngestionError> {
        let (_, outcome) = self.ingest_file(path).await?;
        Ok(outcome)
    }

    async fn ingest_file(
        &self,
        path: &Path,
    ) -> Result<(TraceRecord, IngestionOutcome), IngestionError> {
        let record = read_trace_file(path).await?;
        let outcome = self.ingest_record(&record).await?;
        Ok((record, outcome))
    }

    /// Every non hidden entry of `dir`, ordered by file name. Files that can't be read or
    /// parsed are reported as failed and don't stop the run, a store failure does.
    #[instrument(skip(self))]
    pub async fn ingest_directory(
        &self,
        dir: &Path,
    ) -> Result<Vec<FileIngestion>, DirectoryIngestionError> {
        let mut files = list_trace_files(dir).await?;
        files.sort();
        debug!("Found {} files", files.len());
        let mut report = Vec::with_capacity(files.len());
        for file_name in files {
            let path = dir.join(&file_name);
            let result = match self.ingest_file(&path).await {
                Ok((record, IngestionOutcome::Inserted)) => FileIngestionResult::Inserted {
                    root_call_name: record.root_call_name,
                },
                Ok((record, IngestionOutcome::AlreadyPresent)) => {
                    FileIngestionResult::AlreadyPresent {
                        root_call_name: record.root_call_name,
                        details: record.details,
                    }
                }
                Err(IngestionError::Store(e)) => return Err(e.into()),
                Err(e) => {
                    warn!("Skipping {file_name}: {}", error_chain_to_pretty_formatted(&e));
                    FileIngestionResult::Failed { error: e.summary() }
                }
            };
            report.push(FileIngestion { file_name, result });
        }
        Ok(report)
    }
}

async fn list_trace_files(dir: &Path) -> Result<Vec<String>, IoError> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| IoError::from_io_error(e, "listing trace directory", dir))?;
    let mut files = vec![];
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| IoError::from_io_error(e, "listing trace directory", dir))?
    {
        let file_name = entry.file_name().to_string_lossy().into_owned();
        if file_name.starts_with('.') {
            continue;
        }
        files.push(file_name);
    }
    Ok(files)
}
