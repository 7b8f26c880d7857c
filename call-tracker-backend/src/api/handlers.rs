use crate::api::{ApiError, AppState};
use api_structs::ui::ingestion::FileIngestion;
use api_structs::ui::{DirectChildren, ProcessedCount};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use tracing::{info, instrument};

#[instrument(skip_all)]
pub async fn root_get() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; charset=UTF-8",
        )],
        "Connection Successful".to_string(),
    )
}

#[instrument(skip(state), err(Debug))]
pub async fn sub_methods_get(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<DirectChildren>, ApiError> {
    Ok(Json(state.queries.find_direct_children(&name).await?))
}

#[instrument(skip_all, err(Debug))]
pub async fn insert_queries_get(
    State(state): State<AppState>,
) -> Result<Json<Vec<FileIngestion>>, ApiError> {
    let ingestion = &state.ingestion;
    let report = ingestion.ingest_directory(ingestion.data_path()).await?;
    info!("Ingested directory, {} files", report.len());
    Ok(Json(report))
}

#[instrument(skip(state), err(Debug))]
pub async fn parent_methods_get(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(state.queries.find_parents(&name).await?))
}

#[instrument(skip(state), err(Debug))]
pub async fn repeating_sub_methods_get(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ProcessedCount>, ApiError> {
    Ok(Json(state.queries.find_repeated_children(&name).await?))
}

/// Every stored record, the empty fragment matches all of them.
#[instrument(skip_all, err(Debug))]
pub async fn repeating_sub_methods_all_get(
    State(state): State<AppState>,
) -> Result<Json<ProcessedCount>, ApiError> {
    Ok(Json(state.queries.find_repeated_children("").await?))
}
