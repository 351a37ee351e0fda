//! Newswire - RSS, Atom and Google Alerts monitoring over MCP
//!
//! Serves feed management and news analysis tools to an MCP host on
//! stdin/stdout, or refreshes feeds and writes digests from the command line.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (bad arguments, unreadable config, I/O failure)

mod analysis;
mod cache;
mod cli;
mod config;
mod feeds;
mod llm;
mod mcp;
mod models;
mod report;
mod tools;

use anyhow::{Context, Result};
use cache::CacheManager;
use cli::{Args, OutputFormat};
use config::{Config, DEFAULT_CONFIG_FILE};
use feeds::{FeedRegistry, FeedService, HttpFetcher};
use indicatif::{ProgressBar, ProgressStyle};
use llm::NarrativeWriter;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    // Initialize logging
    init_logging(&config.general.log_level);

    info!("Newswire v{}", env!("CARGO_PKG_VERSION"));
    debug!("Configuration: {:?}", config);

    if let Err(e) = run(args, config).await {
        error!("Newswire failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }
    Ok(())
}

/// Handle --init-config: generate a default .newswire.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!("⚠️  {} already exists. Remove it first or edit it manually.", DEFAULT_CONFIG_FILE);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", DEFAULT_CONFIG_FILE);
    println!("   Edit it to customize feed registry, cache, HTTP and LLM settings.");
    Ok(())
}

/// Initialize logging. Everything goes to stderr so stdout stays free
/// for MCP messages.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|e| {
        eprintln!("Invalid log level '{}' ({}), using info", level, e);
        EnvFilter::new("info")
    });

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok(config),
        Ok(None) => Ok(Config::default()),
        Err(e) => {
            eprintln!("⚠️  Failed to load {}: {:#}", DEFAULT_CONFIG_FILE, e);
            Ok(Config::default())
        }
    }
}

/// Build the feed service from the merged configuration.
fn build_service(config: &Config) -> Result<Arc<FeedService>> {
    let registry = FeedRegistry::load(&config.feeds.config_path);
    info!(
        "Loaded {} feeds from {}",
        registry.all().len(),
        registry.path().display()
    );

    let cache = CacheManager::new(&config.cache.path, config.cache.ttl_hours);
    debug!(
        "Cache at {} (ttl {}h)",
        cache.path().display(),
        cache.ttl().num_hours()
    );
    let fetcher = HttpFetcher::new(config.http.timeout_seconds, &config.http.user_agent)
        .context("Failed to create HTTP client")?;

    Ok(Arc::new(FeedService::new(
        registry,
        cache,
        Arc::new(fetcher),
        config.http.concurrency,
    )))
}

async fn run(args: Args, config: Config) -> Result<()> {
    let service = build_service(&config)?;

    if args.refresh {
        return handle_refresh(&service).await;
    }

    let narrator = NarrativeWriter::from_config(
        config.llm_config(args.openai_api_key.clone(), args.openai_organization.clone()),
    )?;
    if let Some(ref writer) = narrator {
        info!("LLM narratives enabled (model: {})", writer.model());
    }

    if let Some(ref path) = args.digest {
        return handle_digest(&service, narrator.as_ref(), path, args.format, args.hours).await;
    }

    let executor = tools::ToolExecutor::new(service, narrator);
    let server = mcp::McpServer::new(executor);
    server
        .run_stdio()
        .await
        .context("MCP server I/O failed")
}

/// Handle --refresh: fetch every enabled feed once.
async fn handle_refresh(service: &FeedService) -> Result<()> {
    service.reload_registry().await;
    let total = service.enabled_feeds().await.len();
    println!("🔄 Refreshing {} enabled feeds...", total);

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );

    let report = service
        .refresh_all_with(|feed_id, result| {
            match result {
                Ok(data) => pb.set_message(format!("{} ({} articles)", feed_id, data.total_articles)),
                Err(_) => pb.set_message(format!("{} failed", feed_id)),
            }
            pb.inc(1);
        })
        .await;
    pb.finish_with_message("Refresh complete");

    println!("\n📊 Refresh Summary:");
    println!("   Successful: {}", report.successful);
    println!("   Failed: {}", report.failed);
    for err in &report.errors {
        println!("   - {}", err);
    }

    if report.failed > 0 {
        warn!("{} of {} feeds failed to refresh", report.failed, report.total_feeds);
    }
    Ok(())
}

/// Handle --digest: analyze the last `hours` and write the digest.
async fn handle_digest(
    service: &Arc<FeedService>,
    narrator: Option<&NarrativeWriter>,
    path: &std::path::Path,
    format: OutputFormat,
    hours: u32,
) -> Result<()> {
    println!("📰 Building digest for the last {} hours...", hours);

    let analyzer = analysis::NewsAnalyzer::new(Arc::clone(service));
    let mut digest = report::Digest::collect(&analyzer, hours).await;

    if let (Some(writer), Some(summary)) = (narrator, digest.summary.as_mut()) {
        match writer.write_summary(summary).await {
            Ok(text) => summary.narrative = Some(text),
            Err(e) => warn!("Narrative generation failed: {:#}", e),
        }
    }

    let output = match format {
        OutputFormat::Json => report::generate_json_digest(&digest)?,
        OutputFormat::Markdown => report::generate_markdown_digest(&digest),
    };

    std::fs::write(path, &output)
        .with_context(|| format!("Failed to write digest to {}", path.display()))?;

    let articles = digest.summary.as_ref().map_or(0, |s| s.total_articles);
    println!("   Articles: {}", articles);
    println!("   Trending topics: {}", digest.trends.len());
    println!("   Spikes: {}", digest.spikes.len());
    println!("\n✅ Digest saved to: {}", path.display());
    Ok(())
}
