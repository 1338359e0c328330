use std::sync::Arc;

use anyhow::Context;

use rollstock_infra::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("invalid configuration")?;
    rollstock_observability::init(config.log_format);

    let services = rollstock_api::app::services::build_services(&config)
        .await
        .context("failed to open storage backend")?;
    let app = rollstock_api::app::build_app(Arc::new(services));

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
