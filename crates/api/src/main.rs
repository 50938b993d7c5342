use anyhow::Context;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    peerpay_observability::init();

    let config = peerpay_infra::ServerConfig::from_env()?;
    let services = peerpay_api::app::services::build_services(&config).await?;
    let app = peerpay_api::app::build_app(services);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("server error")
}
