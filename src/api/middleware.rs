//! Axum middleware guarding every route with the `HMAC-SHA256` scheme.

use std::sync::Arc;

use axum::{
    Json,
    body::Body,
    extract::State,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::{debug, warn};

use crate::auth::{AuthOutcome, HeaderError, RejectReason, RequestAuthenticator};
use crate::config::{AuthMode, AuthSettings, ConfigError};
use crate::types::UserId;

pub const MISSING_HEADER_MESSAGE: &str = "Missing Authorization header";
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid or expired credentials";

/// Identity attached to accepted requests as a request extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Authenticated {
    pub user_id: UserId,
    /// Window offset that matched; non-zero means the caller's clock drifts.
    pub offset: i64,
}

#[derive(Debug, Clone)]
pub enum AuthGate {
    Enforced(Arc<RequestAuthenticator>),
    Disabled,
}

/// State shared by every invocation of [`auth_middleware`].
#[derive(Debug, Clone)]
pub struct AuthState {
    gate: AuthGate,
    excluded_paths: Arc<[String]>,
}

impl AuthState {
    pub fn new(gate: AuthGate, excluded_paths: Vec<String>) -> Self {
        let excluded_paths: Vec<String> = excluded_paths
            .into_iter()
            .map(|p| p.to_ascii_lowercase())
            .collect();
        Self {
            gate,
            excluded_paths: excluded_paths.into(),
        }
    }

    /// Build from settings, failing closed on missing credentials.
    pub fn from_settings(settings: &AuthSettings) -> Result<Self, ConfigError> {
        let gate = match settings.resolve()? {
            AuthMode::Enforced { secret, tolerance } => {
                AuthGate::Enforced(Arc::new(RequestAuthenticator::new(secret, tolerance)))
            }
            AuthMode::Disabled => AuthGate::Disabled,
        };
        Ok(Self::new(gate, settings.excluded_paths.clone()))
    }

    pub fn gate(&self) -> &AuthGate {
        &self.gate
    }

    /// `path` must already be lower-cased.
    fn is_excluded(&self, path: &str) -> bool {
        self.excluded_paths.iter().any(|p| path.starts_with(p.as_str()))
    }
}

pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let path = req.uri().path().to_ascii_lowercase();

    if state.is_excluded(&path) {
        return next.run(req).await;
    }

    let authenticator = match &state.gate {
        AuthGate::Enforced(authenticator) => authenticator,
        AuthGate::Disabled => {
            warn!(
                path = %path,
                "Auth credentials not configured - allowing request without auth"
            );
            return next.run(req).await;
        }
    };

    let raw = req.headers().get(header::AUTHORIZATION);
    if raw.is_none_or(|v| v.is_empty()) {
        warn!(path = %path, "Missing Authorization header");
        return unauthorized(MISSING_HEADER_MESSAGE);
    }

    let outcome = match raw.and_then(|v| v.to_str().ok()) {
        Some(value) => authenticator.check(value),
        None => AuthOutcome::Rejected(RejectReason::Malformed(HeaderError::InvalidEncoding)),
    };

    match outcome {
        AuthOutcome::Accepted { user_id, offset } => {
            debug!(path = %path, offset, "Request authenticated");
            req.extensions_mut().insert(Authenticated { user_id, offset });
            next.run(req).await
        }
        AuthOutcome::Rejected(reason) => {
            warn!(path = %path, reason = %reason, "Invalid Authorization");
            unauthorized(INVALID_CREDENTIALS_MESSAGE)
        }
    }
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({
            "error": "Unauthorized",
            "message": message,
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthSigner, DriftTolerance, FixedClock, SharedSecret, WINDOW_TICKS};
    use axum::{Router, middleware as axum_mw, routing::get};
    use serde_json::Value;
    use tower::ServiceExt;

    const T: i64 = 638_396_640_000_000_000;

    fn secret() -> SharedSecret {
        SharedSecret::new("alice", "secret123")
    }

    fn enforced_state(now: i64) -> AuthState {
        let authenticator = RequestAuthenticator::new(secret(), DriftTolerance::default())
            .with_clock(Arc::new(FixedClock::new(now)));
        AuthState::new(
            AuthGate::Enforced(Arc::new(authenticator)),
            vec!["/health".into(), "/Swagger".into(), "/favicon.ico".into()],
        )
    }

    fn test_app(state: AuthState) -> Router {
        Router::new()
            .route("/health", get(|| async { "ok" }))
            .route("/swagger/index.html", get(|| async { "docs" }))
            .route(
                "/api/whoami",
                get(|req: Request<Body>| async move {
                    req.extensions()
                        .get::<Authenticated>()
                        .map(|a| a.user_id.to_string())
                        .unwrap_or_else(|| "anonymous".to_string())
                }),
            )
            .layer(axum_mw::from_fn_with_state(state, auth_middleware))
    }

    fn request(path: &str, authorization: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(path);
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn body_json(resp: Response) -> Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn body_text(resp: Response) -> String {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn excluded_paths_skip_auth() {
        let app = test_app(enforced_state(T));

        let resp = app.clone().oneshot(request("/health", None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = app
            .clone()
            .oneshot(request("/swagger/index.html", None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        // Exclusion matching is case-insensitive; routing is not.
        let resp = app
            .oneshot(request("/SWAGGER/index.html", None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn missing_header_is_unauthorized() {
        let app = test_app(enforced_state(T));
        let resp = app.oneshot(request("/api/whoami", None)).await.unwrap();

        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(resp).await;
        assert_eq!(body["error"], "Unauthorized");
        assert_eq!(body["message"], MISSING_HEADER_MESSAGE);
    }

    #[tokio::test]
    async fn empty_header_is_treated_as_missing() {
        let app = test_app(enforced_state(T));
        let resp = app.oneshot(request("/api/whoami", Some(""))).await.unwrap();

        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(resp).await["message"], MISSING_HEADER_MESSAGE);
    }

    #[tokio::test]
    async fn valid_header_passes_and_sets_identity() {
        let app = test_app(enforced_state(T));
        let header = AuthSigner::new(secret()).header_value_at(T);

        let resp = app
            .oneshot(request("/api/whoami", Some(&header)))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_text(resp).await, "alice");
    }

    #[tokio::test]
    async fn failures_share_one_generic_body() {
        let app = test_app(enforced_state(T));
        let signer = AuthSigner::new(secret());
        let stale = signer.header_value_at(T - 2 * WINDOW_TICKS);
        let wrong_user = stale.replacen("alice", "bob", 1);

        for header in [
            "Bearer abc".to_string(),
            "HMAC-SHA256 alice".to_string(),
            stale,
            wrong_user,
        ] {
            let resp = app
                .clone()
                .oneshot(request("/api/whoami", Some(&header)))
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{}", header);

            let body = body_json(resp).await;
            assert_eq!(body["error"], "Unauthorized");
            assert_eq!(body["message"], INVALID_CREDENTIALS_MESSAGE);
            assert!(!body.to_string().contains("alice"));
        }
    }

    #[tokio::test]
    async fn non_ascii_header_is_invalid_not_missing() {
        let app = test_app(enforced_state(T));
        let value = axum::http::HeaderValue::from_bytes(b"HMAC-SHA256 \xe9:abc").unwrap();
        let req = Request::builder()
            .uri("/api/whoami")
            .header(header::AUTHORIZATION, value)
            .body(Body::empty())
            .unwrap();

        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(resp).await["message"], INVALID_CREDENTIALS_MESSAGE);
    }

    #[tokio::test]
    async fn unknown_routes_still_require_auth() {
        let app = test_app(enforced_state(T));
        let resp = app.oneshot(request("/api/nope", None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn disabled_gate_allows_everything() {
        let app = test_app(AuthState::new(AuthGate::Disabled, Vec::new()));
        let resp = app.oneshot(request("/api/whoami", None)).await.unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_text(resp).await, "anonymous");
    }

    #[test]
    fn from_settings_fails_closed() {
        let settings = AuthSettings::default();
        assert!(matches!(
            AuthState::from_settings(&settings),
            Err(ConfigError::MissingCredentials)
        ));
    }

    #[test]
    fn from_settings_refuses_empty_excluded_path() {
        let settings = AuthSettings {
            user_id: Some("alice".into()),
            api_key: Some("secret123".into()),
            excluded_paths: vec!["/health".into(), String::new()],
            ..Default::default()
        };
        assert!(matches!(
            AuthState::from_settings(&settings),
            Err(ConfigError::InvalidExcludedPath(_))
        ));
    }

    #[test]
    fn from_settings_enforces_when_configured() {
        let settings = AuthSettings {
            user_id: Some("alice".into()),
            api_key: Some("secret123".into()),
            ..Default::default()
        };
        let state = AuthState::from_settings(&settings).unwrap();
        assert!(matches!(state.gate(), AuthGate::Enforced(_)));
        assert!(state.is_excluded("/health"));
        assert!(!state.is_excluded("/api/vocabulary"));
    }
}
