use std::net::SocketAddr;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{ConnectInfo, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use domain::worker::WorkerId;

use crate::shared::app_state::AppState;

use super::handler::{run_ui_socket, run_worker_socket};

#[derive(Debug, Deserialize)]
pub struct SlaveQuery {
    pub id: String,
}

pub async fn slave_ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Query(query): Query<SlaveQuery>,
) -> Response {
    if query.id.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, "missing worker id").into_response();
    }
    let worker_id = WorkerId::new(query.id);
    ws.on_upgrade(move |socket| run_worker_socket(socket, state, worker_id, addr.ip()))
}

pub async fn ui_ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| run_ui_socket(socket, state))
}
