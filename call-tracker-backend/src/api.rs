use crate::database::StoreUnavailableError;
use crate::ingestion::DirectoryIngestionError;
use api_structs::ui::ApiErrorBody;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use backtraced_error::error_chain_to_pretty_formatted;
use std::net::SocketAddr;
use tokio::task::JoinHandle;
use tracing::{error, info, instrument};

pub mod handlers;
pub mod state;

pub use state::AppState;

pub fn router(app_state: AppState) -> axum::Router {
    axum::Router::new()
        .route("/", axum::routing::get(handlers::root_get))
        .route("/SubMethods/*name", axum::routing::get(handlers::sub_methods_get))
        .route("/insertQueries", axum::routing::get(handlers::insert_queries_get))
        .route(
            "/ParentMethods/:name",
            axum::routing::get(handlers::parent_methods_get),
        )
        .route(
            "/RepeatingSubMethods",
            axum::routing::get(handlers::repeating_sub_methods_all_get),
        )
        .route(
            "/RepeatingSubMethods/*name",
            axum::routing::get(handlers::repeating_sub_methods_get),
        )
        .with_state(app_state)
        .layer(tower_http::cors::CorsLayer::very_permissive())
}

#[instrument(skip_all)]
pub fn start(app_state: AppState, addr: SocketAddr) -> JoinHandle<()> {
    info!("Starting API on {addr}");
    let app = router(app_state);
    tokio::spawn(async move {
        if let Err(e) = axum::Server::bind(&addr)
            .serve(app.into_make_service())
            .await
        {
            error!("API server stopped: {:#?}", e);
        }
    })
}

#[derive(Debug)]
pub struct ApiError {
    pub code: StatusCode,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.code,
            Json(ApiErrorBody {
                error: self.message,
            }),
        )
            .into_response()
    }
}

impl From<StoreUnavailableError> for ApiError {
    fn from(value: StoreUnavailableError) -> Self {
        error!(
            "Error during api request: {}",
            error_chain_to_pretty_formatted(&value)
        );
        ApiError {
            code: StatusCode::INTERNAL_SERVER_ERROR,
            message: value.to_string(),
        }
    }
}

impl From<DirectoryIngestionError> for ApiError {
    fn from(value: DirectoryIngestionError) -> Self {
        error!(
            "Error during api request: {}",
            error_chain_to_pretty_formatted(&value)
        );
        let message = match &value {
            DirectoryIngestionError::Listing(e) => {
                format!("{value} {}: {}", e.path.display(), e.source)
            }
            DirectoryIngestionError::Store(e) => e.to_string(),
        };
        ApiError {
            code: StatusCode::INTERNAL_SERVER_ERROR,
            message,
        }
    }
}
