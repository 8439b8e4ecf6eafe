pub mod api;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod services;

use crate::config::GatewayConfig;
use crate::services::backend::ObjectBackend;
use crate::services::buckets::BucketRegistry;
use crate::services::grants::GrantIssuer;
use crate::services::staging::StagingArea;
use crate::services::transfer::TransferService;
use axum::{
    Router,
    middleware::from_fn,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::handlers::buckets::create_bucket,
        api::handlers::buckets::check_bucket,
        api::handlers::buckets::list_buckets,
        api::handlers::objects::upload_object,
        api::handlers::objects::download_object,
        api::handlers::grants::issue_grant,
        api::handlers::health::health_check,
    ),
    components(
        schemas(
            api::handlers::buckets::CreateBucketResponse,
            api::handlers::buckets::CheckBucketResponse,
            api::handlers::objects::UploadForm,
            api::handlers::objects::UploadResponse,
            api::handlers::objects::DownloadResponse,
            api::handlers::grants::GrantRequest,
            api::handlers::grants::GrantResponse,
            api::handlers::health::HealthResponse,
            services::backend::GrantMethod,
        )
    ),
    tags(
        (name = "buckets", description = "Bucket registry"),
        (name = "objects", description = "Object transfer through the gateway"),
        (name = "grants", description = "Presigned URLs for direct backend access"),
        (name = "system", description = "Health")
    )
)]
pub struct ApiDoc;

#[derive(Clone)]
pub struct AppState {
    pub buckets: Arc<BucketRegistry>,
    pub transfers: Arc<TransferService>,
    pub grants: Arc<GrantIssuer>,
    pub config: GatewayConfig,
}

impl AppState {
    pub fn new(backend: Arc<dyn ObjectBackend>, config: GatewayConfig) -> Self {
        let staging = StagingArea::for_destination(
            &config.destination_folder,
            config.unique_staging_names,
        );

        Self {
            buckets: Arc::new(BucketRegistry::new(
                backend.clone(),
                config.backend_timeout,
            )),
            transfers: Arc::new(TransferService::new(
                backend.clone(),
                staging,
                config.destination_folder.clone(),
                config.backend_timeout,
            )),
            grants: Arc::new(GrantIssuer::new(
                backend,
                config.max_grant_expiry,
                config.backend_timeout,
            )),
            config,
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(api::handlers::health::health_check))
        .route("/s3/create", post(api::handlers::buckets::create_bucket))
        .route(
            "/s3/check/:bucket_name",
            get(api::handlers::buckets::check_bucket),
        )
        .route("/s3/list", get(api::handlers::buckets::list_buckets))
        .route("/s3/upload", post(api::handlers::objects::upload_object))
        .route("/s3/download", post(api::handlers::objects::download_object))
        .route("/s3/grant", post(api::handlers::grants::issue_grant))
        .layer(from_fn(api::middleware::metrics::metrics_middleware))
        .layer(from_fn(api::middleware::request_id::request_id_middleware))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(axum::extract::DefaultBodyLimit::max(
            state.config.max_file_size + 10 * 1024 * 1024, // multipart overhead
        ))
        .with_state(state)
}
