//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use docpilot_hooks::{HookCoordinator, PipelineContext, run_pipeline};
use docpilot_shared::{AppConfig, DocumentKind, init_config, load_config, validate_api_key};
use docpilot_storage::Storage;
use docpilot_suggest::{OpenRouterCapability, SuggestionEngine};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// DocPilot — keep onboarding docs synchronized with the repo.
#[derive(Parser)]
#[command(
    name = "docpilot",
    version,
    about = "Generate and synchronize onboarding tasks, FAQs, and quick-start guides.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
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
    /// Generate or refresh one artifact from a full re-analysis.
    Generate {
        /// Artifact kind: tasks, faq, or quick-start.
        kind: String,

        /// Documentation directory (overrides config).
        #[arg(long)]
        docs_dir: Option<String>,
    },

    /// Process a hook trigger.
    Hook {
        /// Hook subcommand.
        #[command(subcommand)]
        action: HookAction,
    },

    /// Show recent pipeline runs for an artifact.
    Status {
        /// Artifact key: tasks, faq, or quick-start.
        key: String,

        /// Number of records to show.
        #[arg(long, default_value = "10")]
        limit: u32,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Hook trigger subcommands.
#[derive(Subcommand)]
pub(crate) enum HookAction {
    /// A new feature file was created.
    FeatureCreated {
        /// Path to the new feature file.
        path: PathBuf,
    },
    /// A documentation file was saved.
    DocumentSaved {
        /// Path to the saved file. The run re-reads every source, so
        /// this is informational only.
        path: Option<PathBuf>,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "docpilot=info",
        1 => "docpilot=debug",
        _ => "docpilot=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt().with_env_filter(env_filter).with_target(false).init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Generate { kind, docs_dir } => cmd_generate(&kind, docs_dir.as_deref()).await,
        Command::Hook { action } => match action {
            HookAction::FeatureCreated { path } => cmd_hook_feature_created(&path).await,
            HookAction::DocumentSaved { path } => cmd_hook_document_saved(path.as_deref()).await,
        },
        Command::Status { key, limit } => cmd_status(&key, limit).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// Shared setup
// ---------------------------------------------------------------------------

/// Path to the execution-log database, relative to the working directory.
fn db_path() -> Result<PathBuf> {
    let cwd = std::env::current_dir().map_err(|e| eyre!("cannot determine working directory: {e}"))?;
    Ok(cwd.join("var").join("docpilot.db"))
}

/// Build the suggestion engine from config. Requires the API key.
fn build_engine(config: &AppConfig) -> Result<Arc<SuggestionEngine>> {
    validate_api_key(config)?;
    let api_key = std::env::var(&config.openrouter.api_key_env)
        .map_err(|_| eyre!("{} is not set", config.openrouter.api_key_env))?;

    let capability = OpenRouterCapability::new(
        api_key,
        config.openrouter.default_model.clone(),
        Duration::from_secs(config.openrouter.timeout_secs),
    )?;

    Ok(Arc::new(SuggestionEngine::new(
        Box::new(capability),
        &config.generation,
    )))
}

fn build_context(config: &AppConfig, docs_dir: Option<&str>) -> Result<PipelineContext> {
    let mut config = config.clone();
    if let Some(dir) = docs_dir {
        config.defaults.docs_dir = dir.to_string();
    }
    let engine = build_engine(&config)?;
    Ok(PipelineContext::from_config(&config, engine)?)
}

/// Spinner used while a pipeline run is in flight.
fn spinner(message: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap()
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    bar.enable_steady_tick(Duration::from_millis(80));
    bar.set_message(message.to_string());
    bar
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_generate(kind: &str, docs_dir: Option<&str>) -> Result<()> {
    let kind: DocumentKind = kind.parse().map_err(|e: String| eyre!(e))?;
    let config = load_config()?;
    let ctx = build_context(&config, docs_dir)?;
    let target = ctx
        .target_for(kind)
        .cloned()
        .ok_or_else(|| eyre!("no target configured for {kind}"))?;

    info!(%kind, docs_dir = %ctx.docs_dir.display(), "generating artifact");
    let bar = spinner(&format!("Generating {kind}..."));
    let report = run_pipeline(&ctx, &target, &docpilot_shared::Scope::Full).await;
    bar.finish_and_clear();
    let report = report?;

    println!();
    println!("  {} {}", kind.default_title(), if report.wrote { "updated" } else { "already up to date" });
    println!("  Sources:   {} read, {} skipped", report.sources_read, report.sources_skipped);
    println!("  Blocks:    {} added, {} updated, {} dropped", report.added, report.updated, report.dropped);
    if !report.conflicts.is_empty() {
        println!("  Preserved: {} human-edited block(s)", report.conflicts.len());
        for conflict in &report.conflicts {
            println!("    - {}", conflict.key);
        }
    }
    println!("  Path:      {}", target.path.display());
    println!();

    Ok(())
}

async fn cmd_hook_feature_created(path: &std::path::Path) -> Result<()> {
    let config = load_config()?;
    let coordinator = build_coordinator(&config).await?;

    info!(path = %path.display(), "feature-created hook");
    coordinator.on_feature_created(path).await?;
    coordinator.wait_idle().await;
    Ok(())
}

async fn cmd_hook_document_saved(path: Option<&std::path::Path>) -> Result<()> {
    let config = load_config()?;
    let coordinator = build_coordinator(&config).await?;

    info!(?path, "document-saved hook");
    coordinator.on_document_saved(path).await?;
    coordinator.wait_idle().await;
    Ok(())
}

async fn build_coordinator(config: &AppConfig) -> Result<HookCoordinator> {
    let ctx = build_context(config, None)?;
    let storage = Arc::new(Storage::open(&db_path()?).await?);
    Ok(HookCoordinator::new(ctx, storage, config.hooks.clone()))
}

async fn cmd_status(key: &str, limit: u32) -> Result<()> {
    // Parsing validates the key; the log is queried by its string form.
    let kind: DocumentKind = key.parse().map_err(|e: String| eyre!(e))?;

    let storage = Storage::open_readonly(&db_path()?).await?;
    let records = storage.recent_executions(kind.as_str(), limit).await?;

    if records.is_empty() {
        println!("No recorded runs for '{kind}'.");
        return Ok(());
    }

    println!();
    println!("  Recent runs for {kind}:");
    for record in records {
        let outcome = record
            .outcome
            .map(|o| o.as_str().to_string())
            .unwrap_or_else(|| "in flight".into());
        let duration = match record.finished_at {
            Some(end) => format!("{:.1}s", (end - record.started_at).as_seconds_f64()),
            None => "-".into(),
        };
        print!(
            "  {}  {:<16} {:<18} {}",
            record.started_at.format("%Y-%m-%d %H:%M:%S"),
            record.trigger.as_str(),
            outcome,
            duration
        );
        if let Some(error) = &record.error {
            print!("  {error}");
        }
        println!();
    }
    println!();

    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
