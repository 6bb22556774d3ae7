//! A backend that deploys ZIP archives to new Netlify sites on behalf of frontends, so the Netlify
//! token never has to leave the server.

mod config;
mod deploy;
mod netlify;
mod plain_error_response;
mod router;

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
pub(crate) use crate::plain_error_response::PlainErrorResponse;

/// The state shared by all request handlers.
#[derive(Clone, Debug)]
pub(crate) struct AppState {
    /// The server's configuration.
    pub(crate) config: Arc<Config>,

    /// The Netlify API client, or `None` if no Netlify token is configured.
    pub(crate) netlify: Option<netlify::Client>,
}

impl AppState {
    /// Constructs the [`AppState`] from the server's configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the Netlify API client can't be initialized.
    pub(crate) fn new(config: Config) -> reqwest::Result<Self> {
        let netlify = config
            .auth_token
            .as_deref()
            .map(|token| netlify::Client::new(&config.api_origin, token))
            .transpose()?;

        Ok(Self {
            config: Arc::new(config),
            netlify,
        })
    }
}

/// # Errors
///
/// See implementation.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    if config.auth_token.is_none() {
        warn!("`NETLIFY_AUTH_TOKEN` isn't set, so every deploy request will fail");
    }

    let address = config.address.clone();
    let state = AppState::new(config)?;

    info!("Listening to {address}...");

    let listener = TcpListener::bind(address).await?;

    info!(api_origin = %state.config.api_origin, "Ready!");

    axum::serve(listener, router::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Resolves when the process is asked to stop, by Ctrl+C or (on Unix) `SIGTERM`.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            warn!(%error, "couldn't listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                warn!(%error, "couldn't listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutting down...");
}
