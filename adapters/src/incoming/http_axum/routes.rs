use std::net::SocketAddr;

use axum::extract::ConnectInfo;
use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::incoming::http_axum::handlers::{guard, health, repair, sessions, slaves};
use crate::incoming::http_axum::middleware::rate_limit::rate_limit_middleware;
use crate::incoming::http_axum::middleware::request_id::request_id_middleware;
use crate::incoming::ws_axum::endpoint::{slave_ws_handler, ui_ws_handler};
use crate::shared::app_state::AppState;

#[must_use]
pub fn build_router(state: &AppState) -> Router<AppState> {
    let router = Router::new()
        .route("/health", get(health::health_check))
        .route("/slaves", get(slaves::list_slaves))
        .route("/slaves/{id}/favorite", post(slaves::set_favorite))
        .route("/slaves/{id}/paint", post(slaves::paint))
        .route("/guard/config", get(guard::get_config).post(guard::update_config))
        .route("/guard/check", post(guard::check))
        .route("/guard/clear", post(guard::clear))
        .route("/guard/repair", post(guard::repair))
        .route("/guard/preview", get(guard::preview))
        .route("/guard/upload", post(guard::upload))
        .route("/repair/orders", post(repair::submit))
        .route("/repair/distribute", post(repair::distribute))
        .route("/sessions/{id}/start", post(sessions::start))
        .route("/sessions/{id}/pause", post(sessions::pause))
        .route("/sessions/{id}/stop", post(sessions::stop))
        .route("/sessions/{id}/one-batch", post(sessions::one_batch))
        .route("/ws/slave", get(slave_ws_handler))
        .route("/ws/ui", get(ui_ws_handler))
        .layer(middleware::from_fn(request_id_middleware));

    if let Some(limiter) = state.http_rate_limiter.clone() {
        router.layer(middleware::from_fn(
            move |addr: ConnectInfo<SocketAddr>, request, next| {
                rate_limit_middleware(limiter.clone(), addr, request, next)
            },
        ))
    } else {
        router
    }
}
