use serde_json::{Value, json};
use time::OffsetDateTime;

use domain::guard_config::GuardConfig;

/// Builders for the outbound worker-transport message shapes (§6). Kept as
/// free functions rather than a typed enum because every payload is handed
/// straight to `serde_json::Value`-based registry sends and outbound
/// framing does not need to round-trip through a Rust type on this side.
pub fn connected() -> Value {
    json!({ "type": "connected" })
}

pub fn favorite_status(is_favorite: bool) -> Value {
    json!({ "type": "favorite_status", "isFavorite": is_favorite })
}

pub fn set_favorite(is_favorite: bool) -> Value {
    json!({ "type": "setFavorite", "isFavorite": is_favorite })
}

pub fn guard_config(config: &GuardConfig, changed: Option<&[&'static str]>) -> Value {
    json!({
        "type": "guardConfig",
        "config": config,
        "changed": changed,
        "timestamp": OffsetDateTime::now_utc().unix_timestamp(),
    })
}

pub fn guard_data(filename: &str, data: &Value) -> Value {
    json!({
        "type": "guardData",
        "filename": filename,
        "guardData": data,
        "timestamp": OffsetDateTime::now_utc().unix_timestamp(),
    })
}

pub fn guard_control(action: &str) -> Value {
    json!({ "type": "guardControl", "action": action })
}

pub fn control(action: &str) -> Value {
    json!({ "type": "control", "action": action })
}

pub fn ping() -> Value {
    json!({ "type": "ping", "timestamp": OffsetDateTime::now_utc().unix_timestamp() })
}
