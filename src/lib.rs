pub mod api;
pub mod config;
pub mod entities;
pub mod infrastructure;
pub mod services;
pub mod utils;

use crate::config::DriveConfig;
use crate::services::changes::ChangeFeed;
use crate::services::favourites::FavouritesIndex;
use crate::services::file_store::FileStore;
use crate::services::query::QueryEngine;
use crate::services::reconciliation::ReconciliationService;
use crate::services::storage::StorageService;
use crate::services::upload::UploadCoordinator;
use axum::{
    Router,
    body::Body,
    http::{HeaderValue, Request, Response},
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post},
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::health::health_check,
        api::handlers::files::list::list_files,
        api::handlers::files::upload::upload_file,
        api::handlers::files::manage::delete_file,
        api::handlers::files::manage::restore_file,
        api::handlers::files::manage::purge_file,
        api::handlers::files::manage::toggle_favourite,
        api::handlers::files::events::file_events,
        api::handlers::favourites::list_favourites,
    ),
    components(
        schemas(
            api::handlers::health::HealthResponse,
            api::handlers::files::FileResponse,
            api::handlers::files::PurgeResponse,
            api::handlers::files::FavouriteResponse,
            api::handlers::files::UploadForm,
            services::changes::ChangeEvent,
            services::changes::ChangeKind,
            services::file_type::FileType,
        )
    ),
    tags(
        (name = "files", description = "File browsing, trash and favourites"),
        (name = "system", description = "Health and diagnostics")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub storage: Arc<dyn StorageService>,
    pub config: DriveConfig,
    pub changes: ChangeFeed,
    pub file_store: Arc<FileStore>,
    pub favourites: Arc<FavouritesIndex>,
    pub query_engine: Arc<QueryEngine>,
    pub uploads: Arc<UploadCoordinator>,
    pub reconciliation: Arc<ReconciliationService>,
}

impl AppState {
    pub fn new(db: DatabaseConnection, storage: Arc<dyn StorageService>, config: DriveConfig) -> Self {
        let changes = ChangeFeed::new(config.change_feed_capacity);
        let file_store = Arc::new(FileStore::new(db.clone(), storage.clone(), changes.clone()));
        let favourites = Arc::new(FavouritesIndex::new(
            db.clone(),
            changes.clone(),
            file_store.locks().clone(),
        ));
        let query_engine = Arc::new(QueryEngine::new(db.clone()));
        let uploads = Arc::new(UploadCoordinator::new(
            db.clone(),
            storage.clone(),
            file_store.clone(),
            config.clone(),
        ));
        let reconciliation = Arc::new(ReconciliationService::new(db.clone(), storage.clone()));

        Self {
            db,
            storage,
            config,
            changes,
            file_store,
            favourites,
            query_engine,
            uploads,
            reconciliation,
        }
    }
}

fn cors_layer(config: &DriveConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers(Any)
}

pub fn create_app(state: AppState) -> Router {
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<Body>| {
            let request_id = request
                .headers()
                .get("x-request-id")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("unknown");
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = %request_id,
            )
        })
        .on_request(|request: &Request<Body>, _span: &tracing::Span| {
            tracing::info!("📥 {} {}", request.method(), request.uri());
        })
        .on_response(
            |response: &Response<Body>, latency: Duration, _span: &tracing::Span| {
                tracing::info!(
                    "📤 Finished in {:?} with status {}",
                    latency,
                    response.status()
                );
            },
        );

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(api::handlers::health::health_check))
        .route(
            "/files",
            get(api::handlers::files::list_files).post(api::handlers::files::upload_file),
        )
        .route("/files/events", get(api::handlers::files::file_events))
        .route("/files/:id", delete(api::handlers::files::delete_file))
        .route(
            "/files/:id/restore",
            post(api::handlers::files::restore_file),
        )
        .route("/files/:id/purge", delete(api::handlers::files::purge_file))
        .route(
            "/files/:id/favourite",
            post(api::handlers::files::toggle_favourite),
        )
        .route(
            "/favourites",
            get(api::handlers::favourites::list_favourites),
        )
        .layer(from_fn_with_state(
            state.clone(),
            api::middleware::auth::identify_middleware,
        ))
        .layer(trace_layer)
        // Outside the trace layer so every span carries the id
        .layer(from_fn(api::middleware::request_id::request_id_middleware))
        .layer(cors_layer(&state.config))
        .layer(axum::extract::DefaultBodyLimit::max(
            state.config.max_file_size + 10 * 1024 * 1024, // Add 10MB buffer for multipart overhead
        ))
        .with_state(state)
}
