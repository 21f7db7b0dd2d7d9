//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use tars_store::SessionHistory;

use crate::handlers::{health, ws};
use crate::model::ModelBackend;
use crate::state::ServerState;

/// Create the server router with all routes and middleware.
///
/// # Routes
///
/// - `GET /health` - Health check
/// - `GET /ws/agent` - Chat WebSocket
pub fn create_router<M, H>(state: ServerState<M, H>) -> Router
where
    M: ModelBackend + 'static,
    H: SessionHistory + 'static,
{
    let cors = build_cors_layer(&state.config.cors_origins);
    let state = Arc::new(state);

    Router::new()
        .route("/health", get(health::health::<M, H>))
        .route("/ws/agent", get(ws::websocket_handler::<M, H>))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|o| match o.parse() {
                Ok(origin) => Some(origin),
                Err(_) => {
                    tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};

    use tars_store::MemoryHistory;

    use super::*;
    use crate::config::ServerConfig;
    use crate::model::EchoBackend;

    fn router() -> Router {
        router_with(ServerConfig::default())
    }

    fn router_with(config: ServerConfig) -> Router {
        create_router(ServerState::new(
            Arc::new(EchoBackend::new()),
            Arc::new(MemoryHistory::new()),
            config,
        ))
    }

    fn preflight(origin: &str) -> Request<Body> {
        Request::builder()
            .method(Method::OPTIONS)
            .uri("/health")
            .header(header::ORIGIN, origin)
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
            .body(Body::empty())
            .unwrap()
    }

    async fn serve(router: Router, request: Request<Body>) -> axum::response::Response {
        use tower::ServiceExt;
        router.oneshot(request).await.unwrap()
    }

    #[tokio::test]
    async fn wildcard_allows_any_origin() {
        let config = ServerConfig {
            cors_origins: vec!["*".to_string()],
            ..ServerConfig::default()
        };
        let response = serve(router_with(config), preflight("http://anywhere.test")).await;
        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .unwrap(),
            "*"
        );
    }

    #[tokio::test]
    async fn health_route_responds() {
        let response = serve(
            router(),
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let response = serve(
            router(),
            Request::builder()
                .uri("/v1/agents")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn configured_origin_is_allowed() {
        let response = serve(router(), preflight("http://localhost:5173")).await;
        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .unwrap(),
            "http://localhost:5173"
        );
    }

    #[tokio::test]
    async fn other_origin_is_not_allowed() {
        let response = serve(router(), preflight("http://evil.test")).await;
        assert!(response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none());
    }
}
