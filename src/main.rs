mod cli;
mod server;
mod tools;

use anyhow::Result;
use clap::{Parser, Subcommand};
use scribetwin::config::ScribeConfig;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "scribetwin", version, about = "Rewrite blog drafts toward an author's writing style")]
struct Cli {
    /// Config file (defaults to ~/.scribetwin/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Refine a draft toward the closest author in a feed
    Refine {
        /// Draft file, or - for stdin
        #[arg(long)]
        draft: PathBuf,
        /// Author feed URL (rss2json format)
        #[arg(long)]
        feed: Option<String>,
        /// Similarity the blended score must reach
        #[arg(long)]
        threshold: Option<f64>,
        /// Maximum accepted rewrites
        #[arg(long)]
        max_attempts: Option<usize>,
        /// Print the full outcome as JSON
        #[arg(long)]
        json: bool,
    },
    /// Rank a feed's authors by embedding similarity to a text
    Match {
        /// Text file, or - for stdin
        #[arg(long)]
        text: PathBuf,
        /// Author feed URL (rss2json format)
        #[arg(long)]
        feed: Option<String>,
    },
    /// Show the stylistic features of a text
    Features {
        /// Text file, or - for stdin
        file: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Inspect or clear the on-disk cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
    /// Manage the embedding model
    Model {
        #[command(subcommand)]
        action: ModelAction,
    },
    /// Start the MCP server
    Serve {
        /// Transport: stdio or sse (defaults to the configured transport)
        #[arg(long)]
        transport: Option<String>,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// Entry counts per namespace
    Stats,
    /// Delete cached entries
    Clear {
        /// Only clear this namespace (rss or llm_sim)
        #[arg(long)]
        namespace: Option<String>,
    },
}

#[derive(Subcommand)]
enum ModelAction {
    /// Download the embedding model to ~/.scribetwin/models/
    Download,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ScribeConfig::load_from(path)?,
        None => ScribeConfig::load()?,
    };

    // Log to stderr so stdout stays clean for MCP JSON-RPC and --json output.
    let filter = EnvFilter::try_new(&config.server.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Refine {
            draft,
            feed,
            threshold,
            max_attempts,
            json,
        } => {
            cli::refine::refine(
                config,
                cli::refine::RefineArgs {
                    draft: &draft,
                    feed,
                    threshold,
                    max_attempts,
                    json,
                },
            )
            .await?;
        }
        Command::Match { text, feed } => {
            cli::matching::match_author(&config, &text, feed).await?;
        }
        Command::Features { file, json } => {
            cli::features::features(&file, json)?;
        }
        Command::Cache { action } => match action {
            CacheAction::Stats => cli::cache::stats(&config)?,
            CacheAction::Clear { namespace } => cli::cache::clear(&config, namespace.as_deref())?,
        },
        Command::Model { action } => match action {
            ModelAction::Download => {
                cli::model_download(&config.embedding).await?;
            }
        },
        Command::Serve { transport } => {
            let transport = transport.unwrap_or_else(|| config.server.transport.clone());
            match transport.as_str() {
                "stdio" => server::serve_stdio(config).await?,
                "sse" | "http" => server::serve_sse(config).await?,
                other => anyhow::bail!("unknown transport '{other}' (expected stdio or sse)"),
            }
        }
    }

    Ok(())
}
