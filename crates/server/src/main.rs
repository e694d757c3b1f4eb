use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use server_api::{
    mailer::{LogMailer, Mailer, WebhookMailer},
    ApiContext,
};
use storage::Storage;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use url::Url;

mod api;
mod app_state;
mod config;

use app_state::AppState;
use config::{load_settings, prepare_database_url, Settings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = load_settings();
    let database_url = prepare_database_url(&settings.database_url)?;
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(
            %database_url,
            %error,
            "failed to open SQLite database; verify parent directory exists and permissions are correct"
        );
        error
    })?;

    let mailer = build_mailer(&settings)?;
    let api = ApiContext::new(
        Arc::new(storage.clone()),
        settings.store_timeout(),
        mailer,
        settings.mailer_timeout(),
        settings.mailer_from.clone(),
    );
    let app = api::build_router(Arc::new(AppState { api, storage }));

    let addr: SocketAddr = settings
        .server_bind
        .parse()
        .with_context(|| format!("invalid bind address '{}'", settings.server_bind))?;
    info!(%addr, "contact service listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("contact service stopped");
    Ok(())
}

fn build_mailer(settings: &Settings) -> anyhow::Result<Arc<dyn Mailer>> {
    let Some(raw_url) = settings.mailer_webhook_url.as_deref() else {
        info!("no mail relay configured; intros will only be logged");
        return Ok(Arc::new(LogMailer));
    };
    let url = Url::parse(raw_url).with_context(|| format!("invalid mail relay url '{raw_url}'"))?;
    info!(relay = %url, "delivering intros through mail relay");
    Ok(Arc::new(WebhookMailer::new(url, settings.mailer_timeout())?))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
