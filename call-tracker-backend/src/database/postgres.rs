use crate::database::{CollectionName, RecordStore, StoreUnavailableError};
use api_structs::TraceRecord;
use async_trait::async_trait;
use backtraced_error::SqlxError;
use futures::TryStreamExt;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::{debug, info, instrument, trace};

/// Keeps every record as one jsonb document in a single table.
#[derive(Debug, Clone)]
pub struct PgRecordStore {
    con: PgPool,
    collection: CollectionName,
}

impl PgRecordStore {
    pub fn new(con: PgPool, collection: CollectionName) -> Self {
        Self { con, collection }
    }

    #[instrument(skip_all, fields(collection=%self.collection))]
    pub async fn ensure_collection(&self) -> Result<(), StoreUnavailableError> {
        let sql = format!(
            "create table if not exists {} (id bigserial primary key, document jsonb not null);",
            self.collection
        );
        sqlx::query(&sql)
            .execute(&self.con)
            .await
            .map_err(|e| {
                SqlxError::from_sqlx_error(e, format!("creating collection {}", self.collection))
            })?;
        info!("Collection ready");
        Ok(())
    }
}

#[async_trait]
impl RecordStore for PgRecordStore {
    #[instrument(skip_all, fields(collection=%self.collection))]
    async fn insert(&self, record: &TraceRecord) -> Result<(), StoreUnavailableError> {
        let sql = format!("insert into {} (document) values ($1);", self.collection);
        let res = sqlx::query(&sql)
            .bind(Json(record))
            .execute(&self.con)
            .await
            .map_err(|e| {
                SqlxError::from_sqlx_error(e, format!("inserting {}", record.root_call_name))
            })?;
        debug!("Inserted ({} rows)", res.rows_affected());
        Ok(())
    }

    #[instrument(skip_all, fields(collection=%self.collection))]
    async fn find_all(&self) -> Result<Vec<TraceRecord>, StoreUnavailableError> {
        let sql = format!("select document from {} order by id;", self.collection);
        let records: Vec<TraceRecord> = sqlx::query_scalar::<_, Json<TraceRecord>>(&sql)
            .fetch(&self.con)
            .map_ok(|document| document.0)
            .try_collect()
            .await
            .map_err(|e| SqlxError::from_sqlx_error(e, "scanning all records"))?;
        debug!("Got {} records", records.len());
        trace!("Records: {:#?}", records);
        Ok(records)
    }
}
