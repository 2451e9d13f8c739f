use axum::{response::IntoResponse, Json};
use serde_json::json;

/// Service identity summary.
pub async fn index() -> impl IntoResponse {
    Json(json!({
        "service": "book-rag-backend",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": ["/", "/health", "/docs", "/redoc", "/query", "/query-selected"],
    }))
}

/// Static description of the API surface.
pub async fn docs() -> impl IntoResponse {
    Json(json!({
        "service": "book-rag-backend",
        "endpoints": {
            "GET /": "service identity summary",
            "GET /health": "dependency health checks",
            "GET /docs": "this document",
            "GET /redoc": "alias of /docs",
            "POST /query": {
                "description": "answer a question against the whole book",
                "request": {
                    "query_text": "string, required",
                    "session_id": "uuid, optional",
                },
                "response": {
                    "answer": "string",
                    "sources": "array of cited passages with /docs urls",
                    "session_id": "uuid",
                    "query_mode": "full_book",
                    "response_time_ms": "integer",
                },
            },
            "POST /query-selected": {
                "description": "answer a question about a selected passage only",
                "request": {
                    "query_text": "string, required",
                    "selected_text": "string, required",
                    "session_id": "uuid, optional",
                },
                "response": {
                    "answer": "string",
                    "sources": "always empty",
                    "session_id": "uuid",
                    "query_mode": "selected_text",
                    "response_time_ms": "integer",
                },
            },
        },
    }))
}
