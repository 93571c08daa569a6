//! Gateway start-up.

use anyhow::Result;

use crate::api::{AuthGate, AuthState, create_router};
use crate::auth::mask_identity;
use crate::config::GatewayConfig;

/// Resolve auth settings and serve the gateway router on `config.bind`.
///
/// Fails before binding when credentials are missing and the development
/// bypass was not requested.
pub async fn start_gateway(config: GatewayConfig) -> Result<()> {
    let state = AuthState::from_settings(&config.auth)?;

    match state.gate() {
        AuthGate::Enforced(authenticator) => {
            tracing::info!(
                user = %mask_identity(authenticator.user_id().as_str()),
                drift_windows = authenticator.tolerance().windows(),
                "HMAC-SHA256 authentication enabled"
            );
        }
        AuthGate::Disabled => {
            tracing::warn!(
                "Authentication DISABLED (--allow-unauthenticated); do not run this in production"
            );
        }
    }

    let router = create_router(state);
    let listener = tokio::net::TcpListener::bind(&config.bind).await?;
    tracing::info!("Gateway listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router).await?;

    Ok(())
}
