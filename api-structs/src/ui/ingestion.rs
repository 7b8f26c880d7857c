use crate::tracking::TraceDetails;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestionOutcome {
    Inserted,
    AlreadyPresent,
}

/// One entry per file of the data directory, in listing order.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FileIngestion {
    pub file_name: String,
    #[serde(flatten)]
    pub result: FileIngestionResult,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileIngestionResult {
    Inserted {
        root_call_name: String,
    },
    AlreadyPresent {
        root_call_name: String,
        details: TraceDetails,
    },
    Failed {
        error: String,
    },
}

impl FileIngestion {
    pub fn outcome(&self) -> Option<IngestionOutcome> {
        match self.result {
            FileIngestionResult::Inserted { .. } => Some(IngestionOutcome::Inserted),
            FileIngestionResult::AlreadyPresent { .. } => Some(IngestionOutcome::AlreadyPresent),
            FileIngestionResult::Failed { .. } => None,
        }
    }
}
