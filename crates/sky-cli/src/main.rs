//! skyhook CLI
//!
//! Publishes local servers to public hostnames over Cloudflare tunnels:
//! - `start` exposes a directory (or an already-running port) under a hostname
//! - `stop` tears the route down again
//! - `list` / `status` / `logs` inspect what is currently published

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sky_core::{
    CloudflaredCli, Config, Orchestrator, ProjectDetector, StartRequest,
};

mod output;

use output::{format_servers, format_status, print_error, print_info, print_success, print_warning};

#[derive(Parser)]
#[command(name = "skyhook")]
#[command(author, version, about = "Publish local servers to public hostnames")]
#[command(propagate_version = true)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Emit the result as a JSON document on stdout
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Publish a hostname, launching a local server for a directory
    Start {
        /// Name to publish ("demo" or "api.staging.example.io")
        name: String,
        /// Project directory (defaults to the current directory)
        #[arg(short, long)]
        dir: Option<PathBuf>,
        /// Give this hostname its own tunnel instead of the shared one
        #[arg(short = 'D', long)]
        dedicated: bool,
        /// Route to an already-running process on this port (nothing is spawned)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Stop a published server and remove its route
    Stop {
        /// Name, hostname, or key of the server
        name: String,
    },

    /// List published servers
    List,

    /// Show tunnels and servers with process liveness
    Status,

    /// Show the tail of a server's log sink
    Logs {
        /// Name, hostname, or key of the server
        name: String,
        /// Number of lines to show
        #[arg(short = 'n', long, default_value_t = 20)]
        lines: usize,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration
    Show,
    /// Show config file path
    Path,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Diagnostics go to stderr; stdout carries only the result payload
    let log_level = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        (false, _) => "trace",
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.into()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    if let Err(e) = run(cli).await {
        print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("failed to load config from {:?}", path))?,
        None => Config::load().context("failed to load configuration")?,
    };

    tracing::debug!("using data dir {:?}", config.data_dir);

    let control = CloudflaredCli::new(&config.cloudflared_binary);
    let detector = ProjectDetector;
    let orchestrator = Orchestrator::new(&config, &control, &detector);

    match cli.command {
        Commands::Start {
            name,
            dir,
            dedicated,
            port,
        } => {
            if !cli.quiet {
                print_info(&format!("publishing {}...", name));
            }
            let descriptor = orchestrator
                .start(StartRequest {
                    name,
                    directory: dir,
                    dedicated,
                    external_port: port,
                })
                .await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&descriptor)?);
            } else {
                print_success(&format!(
                    "{} is live at {} (port {}, {} tunnel)",
                    descriptor.hostname, descriptor.url, descriptor.port, descriptor.mode
                ));
                println!("{}", format_servers(&[descriptor]));
            }
        }

        Commands::Stop { name } => {
            let stopped = orchestrator.stop(&name).await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&stopped)?);
            } else {
                print_success(&format!("stopped {} ({})", stopped.hostname, stopped.key));
            }
        }

        Commands::List => {
            let servers = orchestrator.list()?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&servers)?);
            } else {
                println!("{}", format_servers(&servers));
            }
        }

        Commands::Status => {
            let report = orchestrator.status()?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", format_status(&report));
            }
        }

        Commands::Logs { name, lines } => {
            let (key, path) = orchestrator.log_sink(&name)?;
            if !path.exists() {
                print_warning(&format!("no log output captured yet for {}", key));
                return Ok(());
            }
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read log sink {:?}", path))?;
            let all: Vec<&str> = content.lines().collect();
            let start = all.len().saturating_sub(lines);
            for line in &all[start..] {
                println!("{}", line);
            }
        }

        Commands::Config { action } => match action {
            ConfigAction::Show => {
                if cli.json {
                    println!("{}", serde_json::to_string_pretty(&config)?);
                } else {
                    println!("{}", toml::to_string_pretty(&config)?);
                }
            }
            ConfigAction::Path => {
                println!("{}", sky_core::config::default_config_path().display());
            }
        },
    }

    Ok(())
}
