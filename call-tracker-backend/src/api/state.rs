use crate::call_tracking::QueryService;
use crate::ingestion::IngestionService;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub ingestion: Arc<IngestionService>,
    pub queries: Arc<QueryService>,
}
