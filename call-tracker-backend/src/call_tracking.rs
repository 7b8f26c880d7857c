pub mod repeated_calls;

use crate::database::{RecordStore, StoreUnavailableError};
use crate::output::{OutputKind, OutputWriter};
use api_structs::ui::{DirectChildren, ProcessedCount};
use api_structs::TraceRecord;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Read side over the stored records. Every query is a full scan with a case-insensitive
/// substring match, results are also written to the output directory.
pub struct QueryService {
    store: Arc<dyn RecordStore>,
    output: OutputWriter,
}

/// Unicode lowercasing, not full case folding: `"ß"` and `"ss"` don't match.
fn root_name_matches(record: &TraceRecord, fragment_lowercase: &str) -> bool {
    record
        .root_call_name
        .to_lowercase()
        .contains(fragment_lowercase)
}

impl QueryService {
    pub fn new(store: Arc<dyn RecordStore>, output: OutputWriter) -> Self {
        Self { store, output }
    }

    async fn records_matching(
        &self,
        name_fragment: &str,
    ) -> Result<Vec<TraceRecord>, StoreUnavailableError> {
        let fragment = name_fragment.to_lowercase();
        let records: Vec<TraceRecord> = self
            .store
            .find_all()
            .await?
            .into_iter()
            .filter(|record| root_name_matches(record, &fragment))
            .collect();
        debug!("{} records match {name_fragment:?}", records.len());
        Ok(records)
    }

    /// Calls of every matching record in one list. Nothing is written when no call was found.
    #[instrument(skip(self))]
    pub async fn find_direct_children(
        &self,
        name_fragment: &str,
    ) -> Result<DirectChildren, StoreUnavailableError> {
        let mut result = DirectChildren::default();
        for record in self.records_matching(name_fragment).await? {
            result.name = record.root_call_name;
            result.details = Some(record.details);
            result.called_methods.extend(record.called_methods);
        }
        if !result.called_methods.is_empty() {
            self.output
                .write_logging_error(OutputKind::SubCalls, name_fragment, None, &result)
                .await;
        }
        Ok(result)
    }

    /// One aggregated report file per matching record that made any call.
    #[instrument(skip(self))]
    pub async fn find_repeated_children(
        &self,
        name_fragment: &str,
    ) -> Result<ProcessedCount, StoreUnavailableError> {
        let mut processed_count = 0;
        for record in self.records_matching(name_fragment).await? {
            let Some(report) = repeated_calls::repeated_calls_report(&record) else {
                continue;
            };
            processed_count += 1;
            self.output
                .write_logging_error(
                    OutputKind::RepeatingSubCalls,
                    name_fragment,
                    Some(processed_count),
                    &report,
                )
                .await;
        }
        info!("Processed {processed_count} records");
        Ok(ProcessedCount { processed_count })
    }

    /// Root calls with a child whose lowercased name is contained in the lowercased
    /// fragment. Note the direction: `"postgres.query SELECT"` finds callers of
    /// `postgres.query`, `"postgres"` does not.
    #[instrument(skip(self))]
    pub async fn find_parents(
        &self,
        child_name_fragment: &str,
    ) -> Result<Vec<String>, StoreUnavailableError> {
        let fragment = child_name_fragment.to_lowercase();
        let mut parents: Vec<String> = vec![];
        for record in self.store.find_all().await? {
            let calls_child = record
                .called_methods
                .iter()
                .any(|call| fragment.contains(&call.name.to_lowercase()));
            if calls_child && !parents.contains(&record.root_call_name) {
                parents.push(record.root_call_name);
            }
        }
        if !parents.is_empty() {
            self.output
                .write_logging_error(OutputKind::Parents, child_name_fragment, None, &parents)
                .await;
        }
        Ok(parents)
    }
}
