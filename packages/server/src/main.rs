use anyhow::Context;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod config;

use config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    tracing::info!(?config, "Configuration loaded");

    let system = api::init_job_queue(config.job_queue, CancellationToken::new());
    let app = api::router(api::AppState::new(system.queue.clone()));

    let addr = config.socket_addr();
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("Server listening on {}", addr);

    let stop_http = CancellationToken::new();
    let mut server = tokio::spawn({
        let stop = stop_http.clone();
        async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(stop.cancelled_owned())
                .await
        }
    });

    tokio::select! {
        result = &mut server => {
            let err = match result {
                Ok(Ok(())) => anyhow::anyhow!("server exited unexpectedly"),
                Ok(Err(err)) => anyhow::Error::from(err).context("server error"),
                Err(err) => anyhow::Error::from(err).context("server task failed"),
            };
            tracing::error!(error = %err, "Server stopped unexpectedly");
            return Err(err);
        }
        () = shutdown_signal() => {}
    }

    tracing::info!("Shutting down server...");
    stop_http.cancel();
    match tokio::time::timeout(config.http_grace, server).await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(err))) => {
            tracing::error!(error = %err, "Error during shutdown");
            return Err(anyhow::Error::from(err).context("error during shutdown"));
        }
        Ok(Err(err)) => return Err(anyhow::Error::from(err).context("server task failed")),
        Err(_) => {
            tracing::error!(grace = ?config.http_grace, "Connections did not close in time");
            anyhow::bail!("HTTP server did not stop within {:?}", config.http_grace);
        }
    }

    if let Err(err) = system.shutdown(config.worker_grace).await {
        tracing::warn!(%err, "Exiting with jobs still running");
    }

    let stats = system.queue.store().stats();
    tracing::info!(
        pending = stats.pending,
        running = stats.running,
        "Server stopped"
    );
    Ok(())
}

/// Resolves on Ctrl+C or, on unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(%err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(%err, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
