use axum::{extract::State, Json};
use serde_json::{json, Value};
use tracing::warn;

use latch_core::AuthRepository;

use crate::errors::{WebError, WebResult};
use crate::state::AppState;

pub async fn health<R: AuthRepository + 'static>(
    State(state): State<AppState<R>>,
) -> WebResult<Json<Value>> {
    state.service.repository().health_check().await.map_err(|e| {
        warn!("Health check failed: {}", e);
        WebError::ServiceUnavailable {
            message: "store unreachable".to_string(),
        }
    })?;
    Ok(Json(json!({ "status": "ok" })))
}
