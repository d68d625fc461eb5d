use anyhow::Result;
use clap::Parser;
use folio_media::{MediaConfig, init_tracing, serve};
use tokio::net::TcpListener;

#[tokio::main]
pub async fn main() -> Result<()> {
    let config = MediaConfig::parse();
    init_tracing()?;

    let service = config.build().await?;
    let listener = TcpListener::bind(config.listen).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening");

    serve(listener, service.into_shared()).await?;
    Ok(())
}
