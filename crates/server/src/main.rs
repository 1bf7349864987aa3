use std::future::IntoFuture;

use config::ConfigError;
use db::{DBService, DbErr};
use server::{AppState, http};
use thiserror::Error;
use todos::TodoError;
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, Registry, prelude::*, reload};

const GRACEFUL_SHUTDOWN_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum TodoServerError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Todo(#[from] TodoError),
    #[error("Invalid log filter: {0}")]
    LogFilter(String),
}

type LogFilterHandle = reload::Handle<EnvFilter, Registry>;

fn log_filter(log_level: &str) -> Result<EnvFilter, TodoServerError> {
    let filter_string = format!(
        "warn,server={level},todos={level},db={level},config={level},tower_http={level}",
        level = log_level
    );
    EnvFilter::try_new(filter_string).map_err(|err| TodoServerError::LogFilter(err.to_string()))
}

/// Installs the subscriber with the `RUST_LOG` level so config loading is logged.
fn init_tracing() -> Result<LogFilterHandle, TodoServerError> {
    let log_level = std::env::var("RUST_LOG")
        .ok()
        .filter(|level| !level.trim().is_empty())
        .unwrap_or_else(|| "info".to_string());
    let (filter, handle) = reload::Layer::new(log_filter(&log_level)?);
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
    Ok(handle)
}

fn apply_log_level(handle: &LogFilterHandle, log_level: &str) -> Result<(), TodoServerError> {
    handle
        .reload(log_filter(log_level)?)
        .map_err(|err| TodoServerError::LogFilter(err.to_string()))
}

#[tokio::main]
async fn main() -> Result<(), TodoServerError> {
    let log_handle = init_tracing()?;
    let config = config::load_config()?;
    apply_log_level(&log_handle, &config.log_level)?;
    tracing::info!(
        path = %config::config_path()?.display(),
        host = %config.host,
        port = config.port,
        "Configuration loaded"
    );

    let db = DBService::new(&config.database_url()?).await?;
    let state = AppState::new(db);
    for seed in &config.users {
        state.todos.ensure_user(seed.id, &seed.secret).await?;
    }
    tracing::info!(users = config.users.len(), "Seeded configured users");

    let app_router = http::router(state);

    let listener = tokio::net::TcpListener::bind(config.socket_addr()?).await?;
    let local_addr = listener.local_addr()?;
    tracing::info!("Server running on http://{local_addr}");

    let (shutdown_rx, force_exit_rx) = spawn_shutdown_watchers();

    let server = axum::serve(listener, app_router)
        .with_graceful_shutdown(wait_for_watch_true(shutdown_rx.clone()))
        .into_future();
    tokio::pin!(server);

    let serve_result = tokio::select! {
        res = &mut server => res,
        _ = wait_for_watch_true(force_exit_rx.clone()) => {
            tracing::warn!("Force shutdown requested (second signal), exiting immediately");
            std::process::exit(130);
        }
        _ = shutdown_deadline(shutdown_rx.clone(), GRACEFUL_SHUTDOWN_TIMEOUT) => {
            tracing::warn!(
                "Graceful shutdown timed out after {:?}, exiting immediately",
                GRACEFUL_SHUTDOWN_TIMEOUT
            );
            std::process::exit(130);
        }
    };

    serve_result?;
    tracing::info!("Server stopped");
    Ok(())
}

fn spawn_shutdown_watchers() -> (watch::Receiver<bool>, watch::Receiver<bool>) {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (force_exit_tx, force_exit_rx) = watch::channel(false);

    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};

            let mut shutdown_sent = false;

            let mut sigint = match signal(SignalKind::interrupt()) {
                Ok(sig) => sig,
                Err(e) => {
                    tracing::error!("Failed to install SIGINT handler: {e}");
                    return;
                }
            };

            let mut sigterm = match signal(SignalKind::terminate()) {
                Ok(sig) => Some(sig),
                Err(e) => {
                    tracing::error!("Failed to install SIGTERM handler: {e}");
                    None
                }
            };

            loop {
                tokio::select! {
                    _ = sigint.recv() => {},
                    _ = async {
                        if let Some(sigterm) = sigterm.as_mut() {
                            sigterm.recv().await;
                        } else {
                            std::future::pending::<()>().await;
                        }
                    } => {},
                }

                if !shutdown_sent {
                    shutdown_sent = true;
                    tracing::info!(
                        "Shutdown signal received, draining requests (press Ctrl+C again to force)"
                    );
                    let _ = shutdown_tx.send(true);
                } else {
                    tracing::warn!("Second shutdown signal received, forcing exit");
                    let _ = force_exit_tx.send(true);
                    break;
                }
            }
        }

        #[cfg(not(unix))]
        {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to install Ctrl+C handler: {e}");
                return;
            }

            tracing::info!(
                "Shutdown signal received, draining requests (press Ctrl+C again to force)"
            );
            let _ = shutdown_tx.send(true);

            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to install Ctrl+C handler: {e}");
                return;
            }

            tracing::warn!("Second shutdown signal received, forcing exit");
            let _ = force_exit_tx.send(true);
        }
    });

    (shutdown_rx, force_exit_rx)
}

async fn wait_for_watch_true(mut rx: watch::Receiver<bool>) {
    loop {
        if *rx.borrow() {
            return;
        }

        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

async fn shutdown_deadline(rx: watch::Receiver<bool>, timeout: std::time::Duration) {
    wait_for_watch_true(rx).await;
    tokio::time::sleep(timeout).await;
}
