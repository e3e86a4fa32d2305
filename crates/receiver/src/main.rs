use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tracing::info;

use alert_job_receiver::{
    config::{Args, Config},
    definitions::ConfigMapDefinitionStore,
    handler::AlertHandler,
    jobs::KubeJobSubmitter,
    server::Server,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if it exists
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    // RUST_LOG wins over --log-level when set
    let log_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        format!(
            "alert_job_receiver={0},tower_http={0},warn",
            args.log_level.as_str()
        )
    });
    tracing_subscriber::fmt()
        .with_env_filter(log_filter)
        .init();

    info!("Starting webhook receiver");

    // In-cluster this reads the service account namespace
    let kube_config = kube::Config::infer()
        .await
        .context("Failed to load Kubernetes configuration")?;

    let config = Config::from_args(args, &kube_config.default_namespace)?;
    info!("Loaded configuration: {:?}", config);

    let client = kube::Client::try_from(kube_config).context("Failed to create Kubernetes client")?;

    let handler = Arc::new(AlertHandler::new(
        &config,
        Arc::new(ConfigMapDefinitionStore::new(client.clone())),
        Arc::new(KubeJobSubmitter::new(client)),
    ));

    let server = Server::new(&config, handler);
    server.start(config.server.addr).await?;

    Ok(())
}
