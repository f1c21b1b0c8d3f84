//! facerate-ui - Face rating web service
//!
//! Serves the login/register and rating screens for a fixed folder of face
//! images and records one 1-10 rating per user and image.

use anyhow::{Context, Result};
use clap::Parser;
use facerate_common::config::{Settings, TomlConfig};
use facerate_common::{ImageCatalog, RatingWorkflow, Storage};
use facerate_ui::cli::Args;
use facerate_ui::{build_router, AppState};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "facerate_ui=info,facerate_common=info,tower_http=info".into()
            }),
        )
        .init();

    // Build identification first, before any slow startup work
    info!(
        "Starting Face Rating UI (facerate-ui) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let args = Args::parse();
    let file = TomlConfig::discover(args.config.as_deref()).context("Failed to load config file")?;
    let settings = Settings::resolve(args.overrides(), file).context("Invalid configuration")?;
    info!("Configuration: {:?}", settings);

    // A missing image folder cannot serve any session: halt
    let catalog = ImageCatalog::new(&settings.image_folder);
    let image_count = catalog
        .ensure_available()
        .await
        .context("Image folder unavailable")?;
    info!(
        "Image folder {} holds {} images",
        settings.image_folder.display(),
        image_count
    );

    let storage = Storage::open(&settings.store_url, settings.allow_memory_fallback)
        .await
        .context("Rating store unavailable")?;
    if !storage.persistent {
        warn!("Ratings will NOT survive a restart ({} store)", storage.backend);
    }

    let workflow = RatingWorkflow::new(catalog, storage, settings.shared_password.clone());
    let state = AppState::new(workflow, settings.session_idle_timeout);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", settings.bind_addr))?;
    info!("facerate-ui listening on http://{}", settings.bind_addr);
    info!("Health check: http://{}/health", settings.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
