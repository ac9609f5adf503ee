use std::net::IpAddr;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures::stream::StreamExt;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use domain::worker::WorkerId;
use orchestrator_application::ports::incoming::ingress::IngressUseCase;
use orchestrator_application::ports::outgoing::registry::{ConnectOutcome, RegistryPort};

use crate::incoming::http_axum::dto::responses::WorkerResponse;
use crate::incoming::http_axum::middleware::rate_limit::RateLimitResult;
use crate::outgoing::compression::maybe_decompress;
use crate::shared::app_state::AppState;

use super::protocol;

const PING_INTERVAL: Duration = Duration::from_secs(15);

/// Pushes guard config and the last uploaded guard data to `id`, mirroring
/// the favorite-election replay described in C8. Silently drops the send if
/// the worker disconnected in the meantime; `send_to_slave` already handles
/// eviction on write failure. Shared by the WS connect/reconnect/re-election
/// paths and the HTTP `set_favorite` handler.
pub(crate) async fn push_favorite_state(state: &AppState, id: &WorkerId) {
    let config = state.guard_config.snapshot();
    let _ = state
        .registry
        .send_to_slave(id, protocol::guard_config(&config, None))
        .await;
    if let Some((filename, data)) = state.registry.guard_data().await {
        let _ = state
            .registry
            .send_to_slave(id, protocol::guard_data(&filename, &data))
            .await;
    }
}

pub async fn run_worker_socket(socket: WebSocket, state: AppState, worker_id: WorkerId, peer_ip: IpAddr) {
    let outcome = match state.registry.connect_worker(worker_id.clone()).await {
        Ok(outcome) => outcome,
        Err(err) => {
            warn!(%worker_id, error = %err, "worker connection rejected");
            return;
        }
    };

    let (outbox_tx, mut outbox_rx) = mpsc::channel::<Value>(state.config.worker_ws.connection_buffer_size.max(1));
    state.registry.attach_worker_channel(&worker_id, outbox_tx);

    let _ = state
        .registry
        .send_to_slave(&worker_id, protocol::connected())
        .await;

    let is_favorite = state.registry.favorite_id().await.as_ref() == Some(&worker_id);
    let _ = state
        .registry
        .send_to_slave(&worker_id, protocol::favorite_status(is_favorite))
        .await;
    if is_favorite {
        push_favorite_state(&state, &worker_id).await;
    }

    let event_type = match outcome {
        ConnectOutcome::New => "slave_connected",
        ConnectOutcome::Reconnected => "slave_reconnected",
    };
    let _ = state
        .registry
        .broadcast_to_ui(json!({ "type": event_type, "slave_id": worker_id }))
        .await;
    if is_favorite {
        let _ = state
            .registry
            .broadcast_to_ui(json!({ "type": "slave_favorite", "slave_id": worker_id }))
            .await;
    }

    info!(%worker_id, ?outcome, "worker socket connected");

    let (mut sink, mut stream) = socket.split();
    let mut ping_interval = tokio::time::interval(PING_INTERVAL);
    ping_interval.tick().await;

    loop {
        tokio::select! {
            outbound = outbox_rx.recv() => {
                let Some(payload) = outbound else {
                    break;
                };
                if send_json(&mut sink, &payload).await.is_err() {
                    break;
                }
            }
            inbound = stream.next() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        if !handle_inbound(&state, &worker_id, peer_ip, text.as_str()).await {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        warn!(%worker_id, error = %err, "worker socket error");
                        break;
                    }
                }
            }
            _ = ping_interval.tick() => {
                if send_json(&mut sink, &protocol::ping()).await.is_err() {
                    break;
                }
            }
        }
    }

    let reelected = state.registry.disconnect_worker(&worker_id).await;
    let _ = state
        .registry
        .broadcast_to_ui(json!({ "type": "slave_disconnected", "slave_id": worker_id }))
        .await;
    if let Some(new_favorite) = reelected {
        push_favorite_state(&state, &new_favorite).await;
        let _ = state
            .registry
            .broadcast_to_ui(json!({ "type": "slave_favorite", "slave_id": new_favorite }))
            .await;
    }
    info!(%worker_id, "worker socket disconnected");
}

async fn handle_inbound(state: &AppState, worker_id: &WorkerId, peer_ip: IpAddr, text: &str) -> bool {
    if let Some(limiter) = &state.worker_rate_limiter
        && matches!(limiter.check_rate_limit(peer_ip), RateLimitResult::Denied(_))
    {
        debug!(%worker_id, "dropping worker message over rate limit");
        return true;
    }

    let Ok(raw) = serde_json::from_str::<Value>(text) else {
        debug!(%worker_id, "dropping malformed worker message");
        return true;
    };
    let message = maybe_decompress(raw);
    if let Err(err) = state.ingress.handle(worker_id, message).await {
        error!(%worker_id, error = %err, "ingress handling failed");
    }
    true
}

async fn send_json(
    sink: &mut futures::stream::SplitSink<WebSocket, Message>,
    payload: &Value,
) -> Result<(), axum::Error> {
    use futures::SinkExt;
    let text = serde_json::to_string(payload).unwrap_or_default();
    sink.send(Message::Text(text.into())).await
}

pub async fn run_ui_socket(socket: WebSocket, state: AppState) {
    let (outbox_tx, mut outbox_rx) = mpsc::channel::<Value>(state.config.ui_ws.connection_buffer_size.max(1));
    let Some(conn_id) = state.registry.attach_ui_channel(outbox_tx) else {
        warn!("ui connection limit reached");
        return;
    };

    let workers: Vec<WorkerResponse> = state
        .registry
        .list_workers()
        .await
        .into_iter()
        .map(WorkerResponse::from)
        .collect();
    let initial_state = json!({
        "type": "initial_state",
        "slaves": workers,
        "projects": Value::Array(Vec::new()),
        "sessions": Value::Array(Vec::new()),
    });

    let (mut sink, mut stream) = socket.split();
    if send_json(&mut sink, &initial_state).await.is_err() {
        state.registry.detach_ui_channel(conn_id);
        return;
    }

    loop {
        tokio::select! {
            outbound = outbox_rx.recv() => {
                let Some(payload) = outbound else {
                    break;
                };
                if send_json(&mut sink, &payload).await.is_err() {
                    break;
                }
            }
            inbound = stream.next() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        handle_ui_inbound(&state, text.as_str()).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(err)) => {
                        warn!(error = %err, "ui socket error");
                        break;
                    }
                }
            }
        }
    }

    state.registry.detach_ui_channel(conn_id);
}

async fn handle_ui_inbound(state: &AppState, text: &str) {
    let Ok(message) = serde_json::from_str::<Value>(text) else {
        return;
    };
    if message.get("type").and_then(Value::as_str) != Some("select_slaves") {
        return;
    }
    let ids = message.get("ids").cloned().unwrap_or(Value::Array(Vec::new()));
    let _ = state
        .registry
        .broadcast_to_ui(json!({ "type": "ui_selected_slaves", "ids": ids }))
        .await;
}
