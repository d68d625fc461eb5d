use std::sync::Arc;

use tokio::net::TcpListener;

use crate::{MediaService, router};

/// Serve `service` on `listener` until interrupted.
pub async fn serve(listener: TcpListener, service: Arc<MediaService>) -> std::io::Result<()> {
    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutting down"),
        Err(error) => {
            tracing::error!(%error, "Cannot listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}
