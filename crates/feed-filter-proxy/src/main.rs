//! feed-filter proxy — entry point.

use std::sync::Arc;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use tokio::io::AsyncWriteExt;

use feed_filter_proxy::config::{resolve_port, resolve_request_config, FeedQuery, ProcessEnv};
use feed_filter_proxy::fetch::Fetcher;
use feed_filter_proxy::pipeline::{filter_source, FeedSource};
use feed_filter_proxy::server::{AppState, ProxyServer};

#[derive(Parser)]
#[command(
    name = "feed-filter-proxy",
    about = "RSS proxy that removes blocklisted items by creator or category",
    version
)]
struct Cli {
    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP proxy (default).
    Serve {
        /// Listen host.
        #[arg(long, default_value = "0.0.0.0")]
        host: String,

        /// Listen port. Also reads from PORT env var.
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Filter a feed once and write the result to stdout.
    ///
    /// SOURCE is an http(s) URL or a local file path. Blocklists not given
    /// here fall back to BLOCKED_CREATORS / BLOCKED_CATEGORIES and the
    /// built-in defaults.
    Filter {
        /// Feed URL or file path.
        source: String,

        /// Comma-separated creators to drop.
        #[arg(long)]
        blocked_creators: Option<String>,

        /// Comma-separated categories to drop.
        #[arg(long)]
        blocked_categories: Option<String>,
    },

    /// Print the resolved defaults as JSON.
    Info,

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   feed-filter-proxy completions bash > ~/.local/share/bash-completion/completions/feed-filter-proxy
    ///   feed-filter-proxy completions zsh > ~/.zfunc/_feed-filter-proxy
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let env = ProcessEnv;

    match cli.command.unwrap_or(Commands::Serve {
        host: "0.0.0.0".to_string(),
        port: None,
    }) {
        Commands::Serve { host, port } => {
            let port = resolve_port(port, &env)?;
            let state = AppState::new(Fetcher::new()?, Arc::new(env));
            let server = ProxyServer::new(state);
            server.run(&format!("{host}:{port}")).await?;
        }

        Commands::Filter {
            source,
            blocked_creators,
            blocked_categories,
        } => {
            let query = FeedQuery {
                url: Some(source.clone()),
                blocked_creators,
                blocked_categories,
            };
            let config = resolve_request_config(&query, &env);
            let source = FeedSource::parse(&source);

            let feed = filter_source(&Fetcher::new()?, &source, &config.filter).await?;
            tracing::info!("Removed {} items from {}", feed.removed, source.describe());

            let mut stdout = tokio::io::stdout();
            stdout.write_all(&feed.body).await?;
            stdout.flush().await?;
        }

        Commands::Info => {
            let config = resolve_request_config(&FeedQuery::default(), &env);
            let mut info = serde_json::to_value(&config)?;
            info["port"] = serde_json::json!(resolve_port(None, &env)?);
            info["version"] = serde_json::json!(env!("CARGO_PKG_VERSION"));
            println!("{}", serde_json::to_string_pretty(&info)?);
        }

        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "feed-filter-proxy", &mut std::io::stdout());
        }
    }

    Ok(())
}
