//! Axum router configuration with middleware.
//!
//! Chat routes live under `/api/chat`; `/health` and `/api/info` report
//! liveness and configuration. Middleware: permissive CORS and request tracing.
//!
//! When `web_dir` is configured and exists, the directory is served as a
//! fallback so the browser client can be hosted by the same process. API
//! routes take priority; unknown paths fall through to `index.html`.

use axum::Router;
use axum::extract::State;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let web_dir = state.config.web_dir.clone();

    let mut router = Router::new()
        .route("/api/chat", post(handlers::chat::send_message))
        .route("/api/chat/stream", post(handlers::chat::stream_chat))
        .route("/api/chat/session", post(handlers::session::create_session))
        .route(
            "/api/chat/history/{session_id}",
            get(handlers::session::get_history).delete(handlers::session::delete_session),
        )
        .route(
            "/api/chat/history/{session_id}/clear",
            post(handlers::session::clear_session),
        )
        .route("/api/info", get(service_info))
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    if let Some(web_dir) = web_dir {
        if std::path::Path::new(&web_dir).is_dir() {
            let index_path = format!("{web_dir}/index.html");
            let serve_dir = ServeDir::new(&web_dir).fallback(ServeFile::new(index_path));
            router = router.fallback_service(serve_dir);
            tracing::info!(path = %web_dir, "Static file serving enabled");
        } else {
            tracing::warn!(path = %web_dir, "web_dir does not exist, static serving disabled");
        }
    }

    router
}

/// GET /health
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /api/info
async fn service_info(State(state): State<AppState>) -> axum::Json<serde_json::Value> {
    let capabilities = state.relay.capabilities();
    axum::Json(serde_json::json!({
        "service": "parley",
        "version": env!("CARGO_PKG_VERSION"),
        "provider": state.relay.provider_name(),
        "model": state.config.model,
        "sessions": state.relay.store().len(),
        "streaming": capabilities.streaming,
        "max_context_tokens": capabilities.max_context_tokens,
        "max_output_tokens": capabilities.max_output_tokens,
    }))
}
