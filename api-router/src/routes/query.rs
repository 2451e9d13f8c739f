use axum::{extract::State, response::IntoResponse, Json};
use common::storage::types::query_log::SourceCitation;
use retrieval_pipeline::QueryOutcome;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{api_state::ApiState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query_text: String,
    pub session_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct SelectedQueryRequest {
    pub query_text: String,
    pub selected_text: String,
    pub session_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub answer: String,
    pub sources: Vec<SourceCitation>,
    pub session_id: Uuid,
    pub query_mode: &'static str,
    pub response_time_ms: u64,
}

impl From<QueryOutcome> for QueryResponse {
    fn from(outcome: QueryOutcome) -> Self {
        Self {
            answer: outcome.answer,
            sources: outcome.citations,
            session_id: outcome.session_id,
            query_mode: outcome.mode.as_str(),
            response_time_ms: outcome.response_time_ms,
        }
    }
}

/// Full-book question answering.
pub async fn query_full_book(
    State(state): State<ApiState>,
    Json(request): Json<QueryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state
        .query
        .query_full_book(&request.query_text, request.session_id)
        .await?;

    Ok(Json(QueryResponse::from(outcome)))
}

/// Question answering scoped to a reader-selected passage.
pub async fn query_selected_text(
    State(state): State<ApiState>,
    Json(request): Json<SelectedQueryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let outcome = state
        .query
        .query_selected_text(
            &request.query_text,
            &request.selected_text,
            request.session_id,
        )
        .await?;

    Ok(Json(QueryResponse::from(outcome)))
}
