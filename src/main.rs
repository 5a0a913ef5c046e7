use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use hateblock::classifier::ClassifierSlot;
use hateblock::config::Config;
use hateblock::engine::{Engine, Session};
use hateblock::output::terminal;
use hateblock::settings::{self, SettingsHandle};
use hateblock::{dom, storage};

/// HateBlock: find and blur hateful content in rendered pages.
///
/// Scans a page's text, groups it into posts/comments, and blocks the ones a
/// keyword filter or toxicity classifier flags, keeping an audit log of
/// everything blocked.
#[derive(Parser)]
#[command(name = "hateblock", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database and default settings
    Init,

    /// Download the ONNX toxicity model (~126 MB)
    DownloadModel,

    /// Scan an HTML page and block toxic content
    Scan {
        /// HTML file to scan
        file: PathBuf,

        /// Page URL recorded in the audit log (defaults to the file URL)
        #[arg(long)]
        url: Option<String>,

        /// Write the page with blocked content marked to this file
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Skip the classifier and use the keyword filter only
        #[arg(long)]
        keywords_only: bool,
    },

    /// Show recently blocked content
    Logs {
        /// Number of entries to show (default: 10)
        #[arg(long, default_value = "10")]
        limit: u32,

        /// Print entries as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show or change settings
    Settings {
        /// Turn blocking on
        #[arg(long, conflicts_with = "disable")]
        enable: bool,

        /// Turn blocking off
        #[arg(long)]
        disable: bool,

        /// Toxicity threshold between 0.0 and 1.0 (lower blocks more)
        #[arg(long)]
        threshold: Option<f64>,
    },

    /// Show database, settings and classifier status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("hateblock=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init => {
            let config = Config::load()?;
            let storage = storage::initialize_sqlite(&config.db_path)?;
            let defaults = settings::initialize_defaults(storage.as_ref()).await?;
            let table_count = storage.table_count().await?;
            info!("HateBlock installed: default settings initialized");
            println!("Database initialized at: {}", config.db_path);
            println!("Tables created: {table_count}");
            terminal::display_settings(&defaults);
            println!("\nNext step: run `hateblock download-model` to enable the classifier");
        }

        Commands::DownloadModel => {
            let config = Config::load()?;
            let model_dir = &config.model_dir;

            println!("Downloading ONNX model...");
            println!("  Destination: {}", model_dir.display());

            hateblock::classifier::download::download_model(model_dir).await?;

            println!("\n{}", "Model downloaded successfully.".bold());
        }

        Commands::Scan {
            file,
            url,
            output,
            keywords_only,
        } => {
            let config = Config::load()?;
            let storage = storage::open_sqlite(&config.db_path)?;
            let current = settings::load(storage.as_ref()).await?;
            if !current.enabled {
                println!("HateBlock is currently disabled.");
                println!("  Run `hateblock settings --enable` to turn it back on.");
                return Ok(());
            }

            let markup = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let page_url = url.unwrap_or_else(|| file_url(&file));
            let document = dom::share(dom::html::parse_html(&markup, &page_url)?);

            let classifier = if keywords_only {
                ClassifierSlot::disabled()
            } else {
                let (slot, load) = config.classifier_loader();
                tokio::spawn(load);
                slot
            };

            let handle = SettingsHandle::new(current)?;
            let engine = Arc::new(
                Engine::new(
                    Arc::clone(&document),
                    config.lexical_filter()?,
                    classifier,
                    Arc::clone(&storage),
                    handle.subscribe(),
                )
                .with_concurrency(config.scan_concurrency),
            );

            let pb = ProgressBar::new_spinner();
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("  {spinner} Scanning {msg}")
                    .expect("valid template"),
            );
            pb.set_message(hateblock::output::display_host(&page_url));
            pb.enable_steady_tick(std::time::Duration::from_millis(120));

            let session = Session::start(Arc::clone(&engine)).await;
            pb.finish_and_clear();

            terminal::display_classifier_state(&engine.classifier().state());
            let report = session.initial_scan().cloned().unwrap_or_default();
            terminal::display_scan_report(&report);

            if let Some(path) = output {
                let html = dom::lock(&document).to_html();
                std::fs::write(&path, html)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                println!("\n{}", format!("Marked page saved to: {}", path.display()).bold());
            }
        }

        Commands::Logs { limit, json } => {
            let config = Config::load()?;
            let storage = storage::open_sqlite(&config.db_path)?;
            let entries = storage.recent_audit_entries(limit).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                terminal::display_logs(&entries);
            }
        }

        Commands::Settings {
            enable,
            disable,
            threshold,
        } => {
            let config = Config::load()?;
            let storage = storage::open_sqlite(&config.db_path)?;
            let mut current = settings::load(storage.as_ref()).await?;
            let before = current;

            if enable {
                current.enabled = true;
            }
            if disable {
                current.enabled = false;
            }
            if let Some(t) = threshold {
                settings::validate_threshold(t)?;
                current.threshold = t;
            }

            if current != before {
                settings::save(storage.as_ref(), &current).await?;
                println!("{}", "Settings updated.".bold());
            }
            terminal::display_settings(&current);
        }

        Commands::Status => {
            let config = Config::load()?;
            if !Path::new(&config.db_path).exists() {
                println!("Database: not initialized");
                println!("\nRun `hateblock init` to set up the database.");
                return Ok(());
            }
            let storage = storage::open_sqlite(&config.db_path)?;
            hateblock::status::show(&storage, &config).await?;
        }
    }

    Ok(())
}

/// `file://` URL for a local page, used when no --url is given.
fn file_url(path: &Path) -> String {
    std::fs::canonicalize(path)
        .ok()
        .and_then(|abs| url::Url::from_file_path(abs).ok())
        .map(|u| u.to_string())
        .unwrap_or_else(|| format!("file://{}", path.display()))
}
