use std::sync::Arc;

use anyhow::Context;

use social_picker::{server, Config, Picker};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let cfg = Config::load().context("failed to load configuration")?;
    let port = cfg.port;

    let picker = Arc::new(Picker::new(cfg).context("failed to build picker")?);
    let app = server::router(picker);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("failed to bind port {port}"))?;
    log::info!("social-picker listening on http://0.0.0.0:{port}/");

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
