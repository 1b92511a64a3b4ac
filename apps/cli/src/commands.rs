//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::info;
use wikimirror_core::{FeedSite, PageInfoResponse, Pipeline, ProgressReporter};
use wikimirror_shared::{
    AppConfig, SiteConfig, connect_sid_from_env, init_config, load_config, load_config_from,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// wikimirror: mirror a wiki project into a publishable snapshot.
#[derive(Parser)]
#[command(
    name = "wikimirror",
    version,
    about = "Mirror a wiki project into a publishable JSON snapshot.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file (defaults to ~/.wikimirror/wikimirror.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Session cookie for private projects.
    #[arg(long, env = "WIKIMIRROR_CONNECT_SID", hide_env_values = true, global = true)]
    pub connect_sid: Option<String>,

    /// Write output to this file instead of stdout.
    #[arg(long, global = true)]
    pub out: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Every publishable page, newest created first.
    Pages,

    /// One publishable page.
    Page {
        /// Page title.
        title: String,
    },

    /// Publishable titles, newest updated first.
    Titles,

    /// JSON Feed of the publishable titles.
    Feed,

    /// Origin-hosted images referenced by publishable pages.
    Images {
        /// Download every listed image into this directory.
        #[arg(long)]
        download: Option<PathBuf>,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show the loaded configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr; stdout carries output.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "wikimirror=info",
        1 => "wikimirror=debug",
        _ => "wikimirror=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let out = cli.out.as_deref();
    match &cli.command {
        Command::Pages => cmd_pages(&cli, out).await,
        Command::Page { title } => cmd_page(&cli, title, out).await,
        Command::Titles => cmd_titles(&cli, out).await,
        Command::Feed => cmd_feed(&cli, out).await,
        Command::Images { download } => cmd_images(&cli, download.as_deref(), out).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show(&cli).await,
        },
    }
}

// ---------------------------------------------------------------------------
// Setup helpers
// ---------------------------------------------------------------------------

fn app_config(cli: &Cli) -> Result<AppConfig> {
    let config = match &cli.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    Ok(config)
}

fn pipeline(cli: &Cli, config: &AppConfig) -> Result<Pipeline> {
    let connect_sid = cli
        .connect_sid
        .clone()
        .or_else(|| connect_sid_from_env(config));
    let site = SiteConfig::resolve(config, connect_sid)?;
    info!(
        project = %site.project,
        partial = site.collection_page.is_some(),
        authenticated = site.connect_sid.is_some(),
        "site resolved"
    );
    Ok(Pipeline::new(site)?)
}

/// Pretty-print `value` as JSON to `out`, or stdout.
fn emit(value: &impl Serialize, out: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match out {
        Some(path) => {
            std::fs::write(path, json + "\n")
                .wrap_err_with(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), "output written");
        }
        None => println!("{json}"),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_pages(cli: &Cli, out: Option<&Path>) -> Result<()> {
    let config = app_config(cli)?;
    let pipeline = pipeline(cli, &config)?;

    let reporter = CliProgress::new();
    let result = pipeline.pages_with_progress(&reporter).await;
    reporter.finish();

    emit(&result?, out)
}

async fn cmd_page(cli: &Cli, title: &str, out: Option<&Path>) -> Result<()> {
    let config = app_config(cli)?;
    let pipeline = pipeline(cli, &config)?;

    match pipeline.page(title).await? {
        Some(page) => emit(&page, out),
        None => Err(eyre!("page not found or not published: {title}")),
    }
}

async fn cmd_titles(cli: &Cli, out: Option<&Path>) -> Result<()> {
    let config = app_config(cli)?;
    let pipeline = pipeline(cli, &config)?;

    let titles: Vec<PageInfoResponse> = pipeline
        .titles()
        .await?
        .into_iter()
        .map(PageInfoResponse::from)
        .collect();
    emit(&titles, out)
}

async fn cmd_feed(cli: &Cli, out: Option<&Path>) -> Result<()> {
    let config = app_config(cli)?;
    let feed_site = FeedSite::from_section(&config.site)?;
    let pipeline = pipeline(cli, &config)?;

    emit(&pipeline.feed(&feed_site).await?, out)
}

async fn cmd_images(cli: &Cli, download: Option<&Path>, out: Option<&Path>) -> Result<()> {
    let config = app_config(cli)?;
    let pipeline = pipeline(cli, &config)?;

    let images = pipeline.images().await?;

    if let Some(dir) = download {
        std::fs::create_dir_all(dir)
            .wrap_err_with(|| format!("failed to create {}", dir.display()))?;

        let reporter = CliProgress::new();
        reporter.phase("Downloading images");
        for (i, summary) in images.iter().enumerate() {
            match pipeline.image(&summary.name).await? {
                Some(image) => {
                    let path = dir.join(&image.name);
                    std::fs::write(&path, &image.data)
                        .wrap_err_with(|| format!("failed to write {}", path.display()))?;
                }
                None => tracing::warn!(url = %summary.url, "image no longer served"),
            }
            reporter.item_done(&summary.name, i + 1, images.len());
        }
        reporter.finish();
        info!(count = images.len(), dir = %dir.display(), "images downloaded");
    }

    emit(&images, out)
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show(cli: &Cli) -> Result<()> {
    let config = app_config(cli)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner, then a bar once the
/// batch size is known.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            bar.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]));
        }
        bar.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { bar }
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.bar.set_message(name.to_string());
    }

    fn total(&self, total: usize) {
        self.bar.set_length(total as u64);
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} [{pos}/{len}] {msg}") {
            self.bar.set_style(style);
        }
    }

    fn item_done(&self, name: &str, current: usize, _total: usize) {
        self.bar.set_position(current as u64);
        self.bar.set_message(name.to_string());
    }
}
