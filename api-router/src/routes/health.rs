use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use common::storage::types::corpus_settings::CorpusSettings;
use serde_json::json;

use crate::api_state::ApiState;

/// Health check: 200 when the database answers and the chunk collection has
/// been initialized, 503 with per-check detail otherwise.
pub async fn health(State(state): State<ApiState>) -> impl IntoResponse {
    let db_ok = state.db.ping().await.is_ok();
    let collection_ok = match CorpusSettings::get_current(&state.db).await {
        Ok(settings) => settings.is_some(),
        Err(_) => false,
    };

    let status = if db_ok && collection_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let body = json!({
        "status": if status == StatusCode::OK { "ok" } else { "error" },
        "checks": {
            "db": if db_ok { "ok" } else { "fail" },
            "collection": if collection_ok { "ok" } else { "fail" },
        }
    });

    (status, Json(body))
}
