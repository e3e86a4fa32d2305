mod routes;

use axum::{routing::get, Router};
use http::StatusCode;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::info;

use crate::{config::Config, handler::AlertHandler, Result};

pub struct Server {
    handler: Arc<AlertHandler>,
    request_timeout: Option<Duration>,
}

impl Server {
    pub fn new(config: &Config, handler: Arc<AlertHandler>) -> Self {
        Self {
            handler,
            request_timeout: config.server.request_timeout,
        }
    }

    pub fn build_router(self) -> Router {
        let mut router = Router::new()
            .route("/healthz", get(routes::healthz))
            .route(
                "/alerts",
                get(routes::acknowledge)
                    .post(routes::receive_alert)
                    .fallback(routes::unsupported_method),
            )
            .route("/metrics", get(routes::metrics))
            .with_state(self.handler);

        // Dropping the handler future on timeout or disconnect also drops in-flight API calls.
        if let Some(timeout) = self.request_timeout {
            router = router.layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                timeout,
            ));
        }

        router.layer(TraceLayer::new_for_http())
    }

    pub async fn start(self, addr: SocketAddr) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("Listening for webhooks on {}", addr);

        axum::serve(listener, self.build_router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("Webhook receiver stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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

    info!("Shutdown signal received, stopping server");
}
