use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue};
use axum::routing::{get, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::config::ContentConfig;
use crate::handler;
use crate::state::AppState;

/// Build the axum router with all ZapLink endpoints.
pub fn build_router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/api/health", get(handler::health_handler))
        .route("/api/info", get(handler::info_handler))
        .route("/api/zaps/upload", post(handler::upload_handler))
        .route("/api/zaps/:short_id", get(handler::resolve_handler));

    if let ContentConfig::Filesystem { root, .. } = &state.config.content {
        // Uploads share the API origin, so they are always downloaded, never rendered.
        let files = ServiceBuilder::new()
            .layer(SetResponseHeaderLayer::overriding(
                header::X_CONTENT_TYPE_OPTIONS,
                HeaderValue::from_static("nosniff"),
            ))
            .layer(SetResponseHeaderLayer::overriding(
                header::CONTENT_DISPOSITION,
                HeaderValue::from_static("attachment"),
            ))
            .layer(SetResponseHeaderLayer::overriding(
                header::CONTENT_SECURITY_POLICY,
                HeaderValue::from_static(handler::CONTENT_SECURITY_POLICY),
            ))
            .service(ServeDir::new(root));
        router = router.nest_service("/files", files);
    }

    router = router.layer(DefaultBodyLimit::max(state.config.max_upload_bytes));
    if state.config.cors_permissive {
        router = router.layer(CorsLayer::permissive());
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}
