// src/api/handlers.rs
//! Route handlers for the control API

use crate::api::AppState;
use crate::config::SettingsUpdate;
use crate::miner::ReloadOutcome;
use crate::types::ChannelRef;
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
};
use serde_json::{Map, Value, json};
use std::path::PathBuf;
use std::sync::PoisonError;

fn bad_request(error: Value) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": error }))).into_response()
}

fn parse_body(body: &Bytes) -> Result<Value, Response> {
    serde_json::from_slice(body).map_err(|_| bad_request(json!("Invalid JSON")))
}

/// `GET /api/health`
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "status": "ok", "running": state.service.is_running() }))
}

/// `GET /api/snapshot`
pub async fn snapshot(State(state): State<AppState>) -> Response {
    Json(state.service.get_snapshot()).into_response()
}

/// `GET /api/settings`
pub async fn get_settings(State(state): State<AppState>) -> Response {
    Json(state.service.get_snapshot().settings).into_response()
}

/// `GET /` serves the bundled web UI's entry page
pub async fn webui_index(index: PathBuf) -> Response {
    match tokio::fs::read_to_string(&index).await {
        Ok(page) => Html(page).into_response(),
        Err(_) => (StatusCode::NOT_FOUND, "Web UI is not available.").into_response(),
    }
}

/// Validates every field of a settings payload
///
/// # Returns
/// All updates, or every validation message if any field was rejected
pub fn validate_settings(payload: &Map<String, Value>) -> Result<Vec<SettingsUpdate>, Vec<String>> {
    let mut updates = Vec::with_capacity(payload.len());
    let mut errors = Vec::new();
    for (key, value) in payload {
        match SettingsUpdate::from_field(key, value) {
            Ok(update) => updates.push(update),
            Err(message) => errors.push(message),
        }
    }
    if errors.is_empty() {
        Ok(updates)
    } else {
        Err(errors)
    }
}

/// `PUT /api/settings`
///
/// Applies and saves the payload only if every field validates.
pub async fn put_settings(State(state): State<AppState>, body: Bytes) -> Response {
    let payload = match parse_body(&body) {
        Ok(payload) => payload,
        Err(response) => return response,
    };
    let Value::Object(fields) = payload else {
        return bad_request(json!("Payload must be an object"));
    };
    let updates = match validate_settings(&fields) {
        Ok(updates) => updates,
        Err(errors) => return bad_request(json!(errors)),
    };

    if !updates.is_empty() {
        let shared = state.service.settings();
        let mut settings = shared.write().unwrap_or_else(PoisonError::into_inner);
        for update in updates {
            settings.apply(update);
        }
        if let Err(e) = settings.save(false) {
            log::warn!(target: state.sink.target(), "Settings not saved: {}", e);
        }
        log::info!(target: state.sink.target(), "Settings updated");
    }
    Json(state.service.get_snapshot().settings).into_response()
}

/// `POST /api/actions/reload`
pub async fn reload(State(state): State<AppState>) -> Json<Value> {
    let status = match state.service.reload() {
        ReloadOutcome::Queued => "queued",
        ReloadOutcome::AlreadyInProgress => "already_in_progress",
    };
    Json(json!({ "status": status }))
}

/// `POST /api/actions/start`
pub async fn start(State(state): State<AppState>) -> Json<Value> {
    let status = if state.service.ensure_started() {
        "started"
    } else {
        "already_running"
    };
    Json(json!({ "status": status }))
}

/// `POST /api/actions/stop`
pub async fn stop(State(state): State<AppState>) -> Json<Value> {
    state.service.stop().await;
    Json(json!({ "status": "stopped" }))
}

/// Reads the `channel` field of a switch request
///
/// A payload that is not an object means "no preference".
pub fn channel_request(payload: &Value) -> Result<Option<ChannelRef>, String> {
    let channel = match payload {
        Value::Object(fields) => fields.get("channel").unwrap_or(&Value::Null),
        _ => &Value::Null,
    };
    match channel {
        Value::Null => Ok(None),
        Value::String(login) => Ok(Some(ChannelRef::Login(login.clone()))),
        Value::Number(n) => n
            .as_u64()
            .map(|id| Some(ChannelRef::Id(id)))
            .ok_or_else(|| "Channel must be int, str, or null".to_string()),
        _ => Err("Channel must be int, str, or null".to_string()),
    }
}

/// `POST /api/actions/switch-channel`
pub async fn switch_channel(State(state): State<AppState>, body: Bytes) -> Response {
    let payload = match parse_body(&body) {
        Ok(payload) => payload,
        Err(response) => return response,
    };
    let request = match channel_request(&payload) {
        Ok(request) => request,
        Err(message) => return bad_request(json!(message)),
    };
    let echo = request.clone();
    state.service.switch_channel(request);
    Json(json!({ "status": "queued", "channel": echo })).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_accepts_id_login_and_null() {
        assert_eq!(channel_request(&json!({"channel": 12345})), Ok(Some(ChannelRef::Id(12345))));
        assert_eq!(
            channel_request(&json!({"channel": "foo"})),
            Ok(Some(ChannelRef::Login("foo".into())))
        );
        assert_eq!(channel_request(&json!({"channel": null})), Ok(None));
        assert_eq!(channel_request(&json!({})), Ok(None));
        assert_eq!(channel_request(&json!([1, 2])), Ok(None));
    }

    #[test]
    fn channel_rejects_other_types() {
        for bad in [json!({"channel": -1}), json!({"channel": 1.5}), json!({"channel": true}), json!({"channel": []})] {
            assert!(channel_request(&bad).is_err(), "{} accepted", bad);
        }
    }

    #[test]
    fn settings_validation_reports_every_bad_field() {
        let payload = json!({
            "language": "Deutsch",
            "connection_quality": "high",
            "bogus": 1,
        });
        let errors = validate_settings(payload.as_object().unwrap()).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().any(|e| e.contains("connection_quality")));
        assert!(errors.iter().any(|e| e.contains("bogus")));
    }

    #[test]
    fn settings_validation_collects_updates() {
        let payload = json!({ "dark_mode": true });
        assert!(validate_settings(payload.as_object().unwrap()).is_err());
        let payload = json!({ "exclude": ["b", "a"], "autostart_tray": true });
        let updates = validate_settings(payload.as_object().unwrap()).unwrap();
        assert_eq!(updates.len(), 2);
    }
}
