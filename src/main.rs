//! Application entry point and server initialization
//!
//! Loads configuration, builds the intake pipeline and serves the share
//! domain with graceful shutdown support.

use std::sync::Arc;

use dotenvy::dotenv;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use unitune::config::AppConfig;
use unitune::resolver::OdesliResolver;
use unitune::route::create_app;
use unitune::state::init_state;

/// Application entry point
///
/// # Environment Variables
///
/// - `PORT` - Server port number (default: 8080)
/// - `SHARE_DOMAIN` - Host share links are issued on (default: unitune.art)
/// - `APP_SCHEME` - Custom URL scheme of the app (default: unitune)
/// - `PREFERRED_PLATFORM` - Platform id resolved links open on
/// - `RESOLVER_URL` / `USER_COUNTRY` - Link Resolution API settings
/// - `REPLAY_WINDOW_SECS` - Duplicate-suppression window (default: 3)
/// - `AUTHORIZATION` - Shared secret for `/api/*`
/// - `RUST_LOG` - Log filter (default: unitune=debug,tower_http=debug)
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("unitune=debug,tower_http=debug")),
        )
        .init();

    let config = AppConfig::from_env()?;
    let resolver = OdesliResolver::new(&config.resolver_url, &config.user_country)?;

    let port = config.port;
    info!(
        "Share domain {}, app scheme {}, resolver {}",
        config.policy.share_domain,
        config.policy.app_scheme,
        resolver.base_url()
    );

    let state = init_state(config, Arc::new(resolver));
    let app = create_app(state).layer(TraceLayer::new_for_http());

    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server running at http://localhost:{}", port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Resolves on SIGINT (Ctrl+C) or, on Unix, SIGTERM.
///
/// In-flight requests are allowed to complete before the server exits.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, stopping server");
}
