use axum::{
    Router,
    http::{HeaderName, HeaderValue, Method},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use orchestrator_adapters::incoming::http_axum::routes::build_router;
use orchestrator_adapters::shared::app_state::AppState as AdaptersAppState;

use crate::bootstrap::state::AppState;

#[must_use]
pub fn create_router(state: AppState) -> Router {
    let cors_layer = create_cors_layer(&state.adapters);

    build_router(&state.adapters)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(cors_layer))
        .with_state(state.adapters)
}

fn create_cors_layer(state: &AdaptersAppState) -> CorsLayer {
    let base_cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            HeaderName::from_static("content-type"),
            HeaderName::from_static("authorization"),
            HeaderName::from_static("accept"),
            HeaderName::from_static("origin"),
            HeaderName::from_static("x-requested-with"),
        ])
        .allow_credentials(true);

    match &state.config.server.cors_origin {
        Some(origin) => base_cors.allow_origin(
            origin
                .parse::<HeaderValue>()
                .unwrap_or_else(|_| HeaderValue::from_static("http://localhost:3000")),
        ),
        None => base_cors.allow_origin(HeaderValue::from_static("http://localhost:3000")),
    }
}
