//! HTTP API gateway for Mastermind.
//!
//! A thin JSON surface over the orchestrator, the knowledge engine and the
//! tool registry. Handlers only validate input and map errors to status
//! codes; all behavior lives in the library crates.

pub mod api;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::response::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{info, warn};

use mastermind_agent::Orchestrator;
use mastermind_config::AppConfig;
use mastermind_core::error::{Error, ToolError};
use mastermind_core::provider::CompletionProvider;
use mastermind_core::tool::ToolRegistry;
use mastermind_memory::KnowledgeEngine;
use mastermind_tools::Workspace;

const BODY_LIMIT_BYTES: usize = 1024 * 1024;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub config: AppConfig,
    pub engine: Arc<KnowledgeEngine>,
    pub orchestrator: Arc<Orchestrator>,
    pub provider: Arc<dyn CompletionProvider>,
    pub tools: Arc<ToolRegistry>,
    /// Tool workspace, also the source of message context resources
    pub workspace: Arc<Workspace>,
}

pub type SharedState = Arc<GatewayState>;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub(crate) type ApiError = (StatusCode, Json<ErrorResponse>);

pub(crate) fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

/// Map a domain error to a status code.
pub(crate) fn error_response(err: Error) -> ApiError {
    let status = if err.is_validation() {
        StatusCode::BAD_REQUEST
    } else if err.is_external() {
        StatusCode::BAD_GATEWAY
    } else {
        match &err {
            Error::Tool(ToolError::NotRegistered(_)) => StatusCode::NOT_FOUND,
            Error::Tool(ToolError::PermissionDenied { .. }) => StatusCode::FORBIDDEN,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    };
    if status.is_server_error() {
        warn!(status = status.as_u16(), error = %err, "Request failed");
    }
    api_error(status, err.to_string())
}

/// Build the router with all routes and layers.
///
/// Layers applied:
/// - CORS restricted to `gateway.allowed_origins` (any origin when empty)
/// - Request body size limit (1 MB)
/// - HTTP trace logging
pub fn build_router(state: SharedState) -> axum::Router {
    let cors = cors_layer(&state.config);
    api::router(state)
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let allowed = &config.gateway.allowed_origins;
    let allow_origin = if allowed.is_empty() || allowed.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(parse_origins(allowed))
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(Duration::from_secs(3600))
}

fn parse_origins(allowed: &[String]) -> Vec<HeaderValue> {
    allowed
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect()
}

/// Build every subsystem from `config` and serve until shutdown.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let embedder = mastermind_providers::build_embedder(&config)?;
    let engine = Arc::new(mastermind_agent::open_knowledge_engine(&config, embedder).await?);
    let provider = mastermind_providers::build_completion_provider(&config);
    let orchestrator = Arc::new(mastermind_agent::build_orchestrator(
        &config,
        provider.clone(),
        Some(engine.clone()),
    ));
    let workspace = Arc::new(Workspace::open(config.workspace_dir())?);
    let tools = Arc::new(mastermind_tools::default_registry(
        workspace.clone(),
        engine.clone(),
    ));

    if config.memory.cleanup_interval_secs > 0 {
        mastermind_memory::spawn_periodic_cleanup(
            engine.clone(),
            Duration::from_secs(config.memory.cleanup_interval_secs),
        );
    }

    let state = Arc::new(GatewayState {
        config,
        engine,
        orchestrator,
        provider,
        tools,
        workspace,
    });
    let app = build_router(state);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower::ServiceExt;

    #[test]
    fn invalid_origins_are_skipped() {
        let origins = parse_origins(&[
            "http://localhost:3000".to_string(),
            "bad\norigin".to_string(),
        ]);
        assert_eq!(origins, vec![HeaderValue::from_static("http://localhost:3000")]);
    }

    async fn allow_origin_header(allowed_origins: &[&str], origin: &str) -> Option<HeaderValue> {
        let mut config = AppConfig::default();
        config.gateway.allowed_origins = allowed_origins.iter().map(|o| o.to_string()).collect();
        let app = axum::Router::new()
            .route("/ping", axum::routing::get(|| async { "pong" }))
            .layer(cors_layer(&config));

        let req = axum::http::Request::builder()
            .uri("/ping")
            .header(header::ORIGIN, origin)
            .body(axum::body::Body::empty())
            .unwrap();
        let response = app.oneshot(req).await.unwrap();
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .cloned()
    }

    #[tokio::test]
    async fn default_cors_allows_any_origin() {
        assert_eq!(
            allow_origin_header(&[], "http://localhost:1420").await,
            Some(HeaderValue::from_static("*"))
        );
        assert_eq!(
            allow_origin_header(&["*"], "http://example.com").await,
            Some(HeaderValue::from_static("*"))
        );
    }

    #[tokio::test]
    async fn listed_cors_origins_only() {
        let allowed = ["http://localhost:3000"];
        assert_eq!(
            allow_origin_header(&allowed, "http://localhost:3000").await,
            Some(HeaderValue::from_static("http://localhost:3000"))
        );
        assert_eq!(allow_origin_header(&allowed, "http://evil.example").await, None);
    }

    #[test]
    fn error_status_mapping() {
        assert_eq!(
            error_response(Error::validation("bad")).0,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            error_response(Error::Completion(
                mastermind_core::error::CompletionError::Timeout("slow".into())
            ))
            .0,
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            error_response(Error::Tool(ToolError::NotRegistered("x".into()))).0,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            error_response(Error::Internal("boom".into())).0,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
