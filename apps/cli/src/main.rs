//! Command-line surface for an AssetDeck image service.

mod transport_adapter;

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use assetdeck_client::{Client, ClientConfig, ConfigError, Endpoints};
use assetdeck_lifecycle::{
    Dimension, LifecycleController, LifecycleEvent, LocalPreviews, Notification,
    NotificationKind, Outcome, SelectedFile,
};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing_subscriber::EnvFilter;

use transport_adapter::ClientTransport;

#[derive(Parser)]
#[command(name = "assetdeck")]
#[command(about = "Upload, list, resize and delete images on an AssetDeck service")]
#[command(version)]
struct Cli {
    /// Service base URL
    #[arg(long, env = "ASSETDECK_API_HOST", global = true)]
    api_host: Option<String>,

    /// JSON file overriding endpoint paths
    #[arg(long, env = "ASSETDECK_ENDPOINTS", global = true)]
    endpoints: Option<PathBuf>,

    /// Per-request timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List stored images in server order
    List,
    /// Upload one image file
    Upload {
        /// Local image path
        path: PathBuf,
    },
    /// Delete an image by content hash
    Delete {
        hash: String,
    },
    /// Request new dimensions for an image
    Resize {
        hash: String,
        #[arg(long, allow_negative_numbers = true)]
        width: Option<i64>,
        #[arg(long, allow_negative_numbers = true)]
        height: Option<i64>,
    },
    /// Open an image in the system viewer
    Preview {
        hash: String,
        /// Open the original instead of the display rendition
        #[arg(long, default_value_t = false)]
        original: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let config = build_config(&cli)?;
    let client = Client::new(config).context("failed to build HTTP client")?;

    let controller = LifecycleController::new(
        Arc::new(ClientTransport::new(client)),
        Arc::new(LocalPreviews::new()),
    );
    let events = controller
        .take_events()
        .context("event stream already taken")?;
    let renderer = tokio::spawn(render_events(events));

    let outcome = run(&controller, cli.command).await?;

    // Closing the controller ends the event stream.
    drop(controller);
    let _ = renderer.await;

    Ok(match outcome {
        Outcome::Failed => ExitCode::FAILURE,
        Outcome::Completed | Outcome::Skipped => ExitCode::SUCCESS,
    })
}

fn build_config(cli: &Cli) -> Result<ClientConfig> {
    let host = cli.api_host.as_deref().ok_or(ConfigError::MissingApiHost)?;
    let mut config = ClientConfig::new(host)?;
    if let Some(path) = &cli.endpoints {
        let endpoints = Endpoints::load(path)
            .with_context(|| format!("failed to load endpoints from {}", path.display()))?;
        config = config.with_endpoints(endpoints);
    }
    if let Some(secs) = cli.timeout {
        config = config.with_timeout(Duration::from_secs(secs));
    }
    Ok(config)
}

async fn run(controller: &LifecycleController, command: Commands) -> Result<Outcome> {
    match command {
        Commands::List => {
            let outcome = controller.refresh().await;
            if outcome == Outcome::Completed {
                print_assets(controller);
            }
            Ok(outcome)
        }
        Commands::Upload { path } => {
            let file = SelectedFile::from_path(&path)
                .await
                .with_context(|| format!("cannot read {}", path.display()))?;
            controller.select_file(file);
            let outcome = controller.start_upload().await;
            if outcome == Outcome::Completed {
                print_assets(controller);
            }
            Ok(outcome)
        }
        Commands::Delete { hash } => Ok(controller.delete_asset(&hash).await),
        Commands::Resize {
            hash,
            width,
            height,
        } => {
            if width.is_none() && height.is_none() {
                anyhow::bail!("resize needs --width and/or --height");
            }
            if let Some(w) = width {
                controller.set_pending_dimension(&hash, Dimension::Width, w);
            }
            if let Some(h) = height {
                controller.set_pending_dimension(&hash, Dimension::Height, h);
            }
            Ok(controller.commit_dimensions(&hash).await)
        }
        Commands::Preview { hash, original } => {
            if controller.refresh().await == Outcome::Failed {
                return Ok(Outcome::Failed);
            }
            let opened = if original {
                controller.open_original(&hash)
            } else {
                match controller.asset(&hash) {
                    Some(asset) => {
                        controller.open_preview(asset.display_url);
                        true
                    }
                    None => false,
                }
            };
            if !opened {
                anyhow::bail!("no image with hash {hash}");
            }
            if let Some(url) = controller.preview().url {
                println!("{url}");
                open::that(&url).with_context(|| format!("failed to open {url}"))?;
            }
            controller.close_preview();
            Ok(Outcome::Completed)
        }
    }
}

fn print_assets(controller: &LifecycleController) {
    let assets = controller.assets();
    if assets.is_empty() {
        println!("(no images)");
        return;
    }
    for a in assets {
        println!("{}  {}x{}  {}", a.content_hash, a.width, a.height, a.display_url);
    }
}

async fn render_events(mut events: UnboundedReceiver<LifecycleEvent>) {
    let mut uploading = false;
    while let Some(event) = events.recv().await {
        match event {
            LifecycleEvent::Loading(true) => uploading = true,
            LifecycleEvent::Progress(pct) if uploading => {
                eprint!("\ruploading {pct:>3}%");
                let _ = std::io::stderr().flush();
            }
            LifecycleEvent::Loading(false) => {
                if uploading {
                    eprintln!();
                }
                uploading = false;
            }
            LifecycleEvent::Notification(Some(n)) => print_notification(&n),
            _ => {}
        }
    }
}

fn print_notification(n: &Notification) {
    match (n.kind, &n.code) {
        (NotificationKind::Success, _) => println!("{}", n.message),
        (NotificationKind::Error, Some(code)) => eprintln!("error [{code}]: {}", n.message),
        (NotificationKind::Error, None) => eprintln!("error: {}", n.message),
    }
}
