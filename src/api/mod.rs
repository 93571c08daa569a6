// HTTP surface of the gateway

use axum::{
    Json, Router,
    body::Body,
    http::{Request, StatusCode},
    middleware as axum_mw,
    routing::get,
};
use serde_json::Value;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

pub mod middleware;


pub use middleware::{AuthGate, AuthState, Authenticated, auth_middleware};

/// Gateway router: health check plus the protected auth status endpoint.
pub fn create_router(state: AuthState) -> Router {
    let routes = Router::new()
        .route("/health", get(health_check))
        .route("/api/auth/status", get(auth_status));

    protect(routes, state)
}

/// Wrap any router with request tracing and the authentication middleware.
///
/// The layer also covers the fallback, so unknown paths answer 401 rather
/// than 404 to unauthenticated callers.
pub fn protect<S>(router: Router<S>, state: AuthState) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(axum_mw::from_fn_with_state(state, auth_middleware)),
    )
}

async fn health_check() -> Result<Json<Value>, StatusCode> {
    Ok(Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}

/// Report who the caller authenticated as and how far their clock drifts.
///
/// With authentication disabled there is no identity to report.
async fn auth_status(req: Request<Body>) -> Json<Value> {
    match req.extensions().get::<Authenticated>() {
        Some(auth) => Json(serde_json::json!({
            "authenticated": true,
            "userId": auth.user_id,
            "windowOffset": auth.offset,
        })),
        None => Json(serde_json::json!({
            "authenticated": false,
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthSigner, DriftTolerance, FixedClock, RequestAuthenticator, SharedSecret};
    use crate::auth::WINDOW_TICKS;
    use axum::http::header;
    use std::sync::Arc;
    use tower::ServiceExt;

    const T: i64 = 638_396_640_000_000_000;

    fn app(now: i64) -> Router {
        let authenticator = RequestAuthenticator::new(
            SharedSecret::new("alice", "secret123"),
            DriftTolerance::default(),
        )
        .with_clock(Arc::new(FixedClock::new(now)));
        create_router(AuthState::new(
            AuthGate::Enforced(Arc::new(authenticator)),
            vec!["/health".into()],
        ))
    }

    async fn json_body(resp: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_is_public() {
        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let resp = app(T).oneshot(req).await.unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_body(resp).await["status"], "healthy");
    }

    #[tokio::test]
    async fn auth_status_reports_offset() {
        let header = AuthSigner::new(SharedSecret::new("alice", "secret123"))
            .header_value_at(T - WINDOW_TICKS);
        let req = Request::builder()
            .uri("/api/auth/status")
            .header(header::AUTHORIZATION, header)
            .body(Body::empty())
            .unwrap();

        let resp = app(T).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = json_body(resp).await;
        assert_eq!(body["authenticated"], true);
        assert_eq!(body["userId"], "alice");
        assert_eq!(body["windowOffset"], -1);
    }

    #[tokio::test]
    async fn auth_status_requires_auth() {
        let req = Request::builder()
            .uri("/api/auth/status")
            .body(Body::empty())
            .unwrap();
        let resp = app(T).oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn auth_status_without_auth_configured() {
        let router = create_router(AuthState::new(AuthGate::Disabled, Vec::new()));
        let req = Request::builder()
            .uri("/api/auth/status")
            .body(Body::empty())
            .unwrap();

        let resp = router.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_body(resp).await["authenticated"], false);
    }

    #[tokio::test]
    async fn protect_wraps_custom_routes() {
        let router = protect(
            Router::new().route("/api/vocabulary/themes", get(|| async { "themes" })),
            AuthState::new(AuthGate::Disabled, Vec::new()),
        );
        let req = Request::builder()
            .uri("/api/vocabulary/themes")
            .body(Body::empty())
            .unwrap();

        let resp = router.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
