use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use lingua_gateway::{
    AuthOutcome, AuthSigner, Clock, DriftTolerance, GatewayConfig, RequestAuthenticator,
    SharedSecret, SystemClock, logging, start_gateway,
};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "lingua-gateway")]
#[command(about = "Time-windowed HMAC-SHA256 authentication gateway for the LinguaAI API")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the gateway over HTTP
    Serve {
        /// JSON config file; flags and env vars override its values
        #[arg(long, env = "LINGUA_GATEWAY_CONFIG")]
        config: Option<PathBuf>,
        /// Bind address, e.g. 0.0.0.0:8080
        #[arg(long)]
        bind: Option<String>,
        #[arg(long, env = "AUTH_USER_ID")]
        user_id: Option<String>,
        #[arg(long, env = "AUTH_API_KEY", hide_env_values = true)]
        api_key: Option<String>,
        /// Windows of clock drift tolerated on each side of "now"
        #[arg(long, env = "AUTH_DRIFT_WINDOWS")]
        drift_windows: Option<u32>,
        /// Serve without authentication when no credentials are configured (development only)
        #[arg(long, env = "AUTH_ALLOW_UNAUTHENTICATED", default_value_t = false)]
        allow_unauthenticated: bool,
        /// Path prefix that skips authentication (repeatable; replaces the defaults)
        #[arg(long = "exclude-path")]
        exclude_paths: Vec<String>,
    },
    /// Print an Authorization header value for the given credentials
    Sign {
        #[arg(long, env = "AUTH_USER_ID")]
        user_id: String,
        #[arg(long, env = "AUTH_API_KEY", hide_env_values = true)]
        api_key: String,
        /// Tick reading to sign for (100ns since 0001-01-01); defaults to now
        #[arg(long, allow_hyphen_values = true)]
        ticks: Option<i64>,
    },
    /// Check an Authorization header value against the given credentials
    Verify {
        header: String,
        #[arg(long, env = "AUTH_USER_ID")]
        user_id: String,
        #[arg(long, env = "AUTH_API_KEY", hide_env_values = true)]
        api_key: String,
        #[arg(long, default_value_t = 1)]
        drift_windows: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            config,
            bind,
            user_id,
            api_key,
            drift_windows,
            allow_unauthenticated,
            exclude_paths,
        } => {
            let mut gateway_config = match config {
                Some(path) => {
                    info!("Loading gateway config from {}", path.display());
                    GatewayConfig::from_file(&path)?
                }
                None => GatewayConfig::default(),
            };

            if let Some(bind) = bind {
                gateway_config.bind = bind;
            }
            if user_id.is_some() {
                gateway_config.auth.user_id = user_id;
            }
            if api_key.is_some() {
                gateway_config.auth.api_key = api_key;
            }
            if let Some(n) = drift_windows {
                gateway_config.auth.drift_windows = n;
            }
            if allow_unauthenticated {
                gateway_config.auth.allow_unauthenticated = true;
            }
            if !exclude_paths.is_empty() {
                gateway_config.auth.excluded_paths = exclude_paths;
            }

            start_gateway(gateway_config).await?;
        }
        Commands::Sign {
            user_id,
            api_key,
            ticks,
        } => {
            let signer = AuthSigner::new(SharedSecret::new(user_id, api_key));
            let ticks = ticks.unwrap_or_else(|| SystemClock.now_ticks());
            println!("{}", signer.header_value_at(ticks));
        }
        Commands::Verify {
            header,
            user_id,
            api_key,
            drift_windows,
        } => {
            let Some(tolerance) = DriftTolerance::new(drift_windows) else {
                bail!("drift tolerance of {} windows is too large", drift_windows);
            };
            let authenticator =
                RequestAuthenticator::new(SharedSecret::new(user_id, api_key), tolerance);

            match authenticator.check(&header) {
                AuthOutcome::Accepted { user_id, offset } => {
                    println!("ACCEPTED user={} window_offset={}", user_id, offset);
                }
                AuthOutcome::Rejected(reason) => {
                    println!("REJECTED {}", reason);
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}
