//! Signal-driven graceful shutdown.

use std::future::Future;
use std::time::Duration;

use axum_server::Handle;

/// Spawn a task that drains the server once SIGINT or SIGTERM arrives.
///
/// After the signal no new connections are accepted. Open connections get
/// `grace` to finish before they are dropped.
pub fn setup_shutdown_handler(handle: Handle, grace: Duration) {
    tokio::spawn(drain_on(shutdown_signal(), handle, grace));
}

/// Start a graceful shutdown of `handle` when `signal` resolves.
async fn drain_on<F>(signal: F, handle: Handle, grace: Duration)
where
    F: Future<Output = &'static str>,
{
    let name = signal.await;
    tracing::info!(
        signal = name,
        grace_secs = grace.as_secs(),
        "Shutting down, draining open connections"
    );
    handle.graceful_shutdown(Some(grace));
}

/// Resolves with the name of the first termination signal received.
async fn shutdown_signal() -> &'static str {
    let interrupt = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = interrupt => "SIGINT",
        _ = terminate => "SIGTERM",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::get, Router};

    #[tokio::test]
    async fn test_server_stops_once_signal_resolves() {
        let handle = Handle::new();
        let app = Router::new().route("/", get(|| async { "ok" }));

        let server_handle = handle.clone();
        let server = tokio::spawn(async move {
            axum_server::bind("127.0.0.1:0".parse().unwrap())
                .handle(server_handle)
                .serve(app.into_make_service())
                .await
        });
        assert!(handle.listening().await.is_some());

        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let drain = tokio::spawn(drain_on(
            async move {
                let _ = rx.await;
                "test"
            },
            handle,
            Duration::from_millis(100),
        ));

        tx.send(()).unwrap();
        drain.await.unwrap();
        tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .expect("server stops after the signal")
            .unwrap()
            .unwrap();
    }
}
