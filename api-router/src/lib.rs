use api_state::ApiState;
use axum::{
    extract::FromRef,
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use middleware_api_key::api_key_auth;
use middleware_rate_limit::rate_limit;
use routes::{
    health::health,
    index::{docs, index},
    query::{query_full_book, query_selected_text},
};

pub mod api_state;
pub mod error;
pub mod middleware_api_key;
pub mod middleware_rate_limit;
mod routes;

/// Router for the question-answering API. The identity and health endpoints
/// stay open and unthrottled; the query endpoints sit behind the optional
/// API key check and the rate limiter, in that order, so rejected requests
/// never consume quota.
pub fn api_routes<S>(app_state: &ApiState) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    ApiState: FromRef<S>,
{
    let public = Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/docs", get(docs))
        .route("/redoc", get(docs));

    let protected = Router::new()
        .route("/query", post(query_full_book))
        .route("/query-selected", post(query_selected_text))
        .route_layer(from_fn_with_state(app_state.clone(), rate_limit))
        .route_layer(from_fn_with_state(app_state.clone(), api_key_auth));

    public.merge(protected)
}
