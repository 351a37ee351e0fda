//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// Newswire - MCP server for RSS, Atom and Google Alerts monitoring
///
/// Runs as an MCP server on stdin/stdout by default. Feeds can also be
/// refreshed or summarized into a digest from the command line.
///
/// Examples:
///   newswire
///   newswire --feeds ./my_feeds.json --cache-ttl-hours 6
///   newswire --refresh
///   newswire --digest digest.md --hours 48
///   newswire --digest digest.json --format json
///   newswire --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Path to configuration file
    ///
    /// If not specified, looks for .newswire.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Feed registry JSON file
    #[arg(long, value_name = "FILE", env = "NEWSWIRE_FEEDS")]
    pub feeds: Option<PathBuf>,

    /// Hours a fetched feed stays cached
    #[arg(long, value_name = "HOURS", env = "CACHE_TTL_HOURS")]
    pub cache_ttl_hours: Option<u64>,

    /// Log filter (error, warn, info, debug, trace)
    #[arg(long, value_name = "LEVEL", env = "LOG_LEVEL")]
    pub log_level: Option<String>,

    /// API key for the optional LLM narrative in news summaries
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// Organization sent with LLM requests
    #[arg(long, env = "OPENAI_ORGANIZATION")]
    pub openai_organization: Option<String>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (errors only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Refresh every enabled feed once and exit
    #[arg(long, conflicts_with = "digest")]
    pub refresh: bool,

    /// Write a news digest to FILE and exit
    #[arg(long, value_name = "FILE")]
    pub digest: Option<PathBuf>,

    /// Digest format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Hours of news covered by the digest
    #[arg(long, default_value = "24", value_name = "HOURS")]
    pub hours: u32,

    /// Generate a default .newswire.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.hours == 0 {
            return Err("Hours must be at least 1".to_string());
        }

        if self.cache_ttl_hours == Some(0) {
            return Err("Cache TTL must be at least 1 hour".to_string());
        }

        if let Some(ref level) = self.log_level {
            if !LOG_LEVELS.contains(&level.to_lowercase().as_str()) {
                return Err(format!(
                    "Unknown log level '{}'. Use one of: {}",
                    level,
                    LOG_LEVELS.join(", ")
                ));
            }
        }

        if let Some(ref digest) = self.digest {
            if digest.is_dir() {
                return Err(format!("Digest path is a directory: {}", digest.display()));
            }
        }

        Ok(())
    }

    /// Log level forced by --verbose or --quiet.
    pub fn log_level_override(&self) -> Option<tracing::Level> {
        if self.quiet {
            Some(tracing::Level::ERROR)
        } else if self.verbose {
            Some(tracing::Level::DEBUG)
        } else {
            None
        }
    }
}
