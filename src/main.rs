//! EchoDownloader: paste a video URL, pick MP4 or MP3, and follow the request
//! until the prepared file is ready to download.

// Main window
mod app;
// Download card widget
mod card;
// Settings file
mod config;
// Error types
mod error;
// Log subscriber setup
mod logging;
// Data models for download records and status
mod model;
// Toast notification messages
mod notify;
// Submission flow and request lifecycle
mod orchestrator;
// In-memory download list
mod registry;
// Download-preparation endpoint client
mod service;
// Toast overlay widget
mod toast;
// URL validation and title derivation
mod video_url;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use eframe::egui::{self, Visuals};
use once_cell::sync::OnceCell;
use tokio::runtime::Runtime;
use tracing::info;

use app::EchoApp;
use config::{AppConfig, DEFAULT_CONFIG_FILE};
use service::{HttpPrepareService, PrepareService};

// Global Tokio runtime stored in a OnceCell so it outlives the window
static RUNTIME: OnceCell<Arc<Runtime>> = OnceCell::new();

#[derive(Debug, Parser)]
#[command(name = "echo_downloader")]
#[command(about = "Prepare MP4/MP3 downloads from YouTube links")]
struct Cli {
    /// Settings file, created with defaults if missing
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Override the download-preparation endpoint
    #[arg(long)]
    endpoint: Option<String>,

    /// Enable debug logging
    #[arg(long, default_value_t = false)]
    debug: bool,
}

/// Program entry point: loads settings, starts the runtime and launches the GUI
fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.debug)?;

    let mut config = AppConfig::load_or_create(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    if let Some(endpoint) = cli.endpoint {
        config.endpoint = endpoint;
        config.validate()?;
    }
    let endpoint = config.endpoint_url()?;
    info!(%endpoint, config = %cli.config.display(), "starting EchoDownloader");

    let rt = Arc::new(Runtime::new().context("starting tokio runtime")?);
    let handle = rt.handle().clone();
    RUNTIME
        .set(rt)
        .map_err(|_| anyhow!("runtime already initialized"))?;

    let service: Arc<dyn PrepareService> = Arc::new(HttpPrepareService::new(endpoint));

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([760.0, 640.0]),
        ..Default::default()
    };
    eframe::run_native(
        "EchoDownloader",
        options,
        Box::new(move |cc| {
            let visuals = if config.dark_mode { Visuals::dark() } else { Visuals::light() };
            cc.egui_ctx.set_visuals(visuals);
            Box::new(EchoApp::new(&config, service, handle))
        }),
    )
    .map_err(|e| anyhow!("window failed: {e}"))
}
