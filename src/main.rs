//! # DitchPouch
//!
//! Single-user WhatsApp tracker that tapers nicotine pouch use down to zero.
//!
//! Usage:
//!   ditchpouch                       # Start the webhook server (same as `serve`)
//!   ditchpouch tick                  # Run the daily boundary now
//!   ditchpouch status                # Print the stored progress
//!   ditchpouch send "20"             # Feed a message through the tracker
//!   ditchpouch --config ./dp.toml    # Use a specific config file

use anyhow::Result;
use clap::{Parser, Subcommand};
use ditchpouch_core::config::DitchPouchConfig;
use ditchpouch_core::types::{AdminCommand, Event, Outbound};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const CRATES: &[&str] = &[
    "ditchpouch",
    "ditchpouch_core",
    "ditchpouch_engine",
    "ditchpouch_store",
    "ditchpouch_channels",
    "ditchpouch_scheduler",
    "ditchpouch_gateway",
];

#[derive(Parser)]
#[command(
    name = "ditchpouch",
    version,
    about = "🫙 DitchPouch: taper your snus habit one day at a time"
)]
struct Cli {
    /// Config file (default: $DITCHPOUCH_CONFIG or ~/.ditchpouch/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Start the HTTP gateway and the daily boundary timer
    Serve {
        /// Override the configured port
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Run the daily boundary immediately
    Tick,
    /// Print the stored progress as JSON
    Status,
    /// Wipe all progress
    Reset,
    /// Decode a message as if the user had sent it on WhatsApp
    Send {
        /// Message text, e.g. "20", "I failed", "status"
        text: String,
    },
    /// Write a default config file if none exists
    Init,
}

fn log_filter(verbose: bool) -> String {
    let level = if verbose { "debug" } else { "info" };
    let mut directives: Vec<String> = CRATES.iter().map(|c| format!("{c}={level}")).collect();
    if verbose {
        directives.push("tower_http=debug".into());
    }
    directives.join(",")
}

fn load_config(path: Option<&PathBuf>) -> Result<DitchPouchConfig> {
    let config = match path {
        Some(path) => DitchPouchConfig::load_from(path)?,
        None => DitchPouchConfig::load()?,
    };
    config.validate()?;
    Ok(config)
}

fn print_outbound(outbound: &[Outbound]) {
    for message in outbound {
        println!("{}\n", ditchpouch_channels::log::render(message));
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_filter(cli.verbose))),
        )
        .with_target(false)
        .init();

    let config = || load_config(cli.config.as_ref());

    match cli.command.unwrap_or(Command::Serve { port: None }) {
        Command::Serve { port } => {
            let mut config = config()?;
            if let Some(port) = port {
                config.gateway.port = port;
            }
            tracing::info!("🫙 DitchPouch v{} starting", env!("CARGO_PKG_VERSION"));
            ditchpouch_gateway::start(config).await?;
        }
        Command::Tick => {
            let tracker = ditchpouch_gateway::build_tracker(&config()?)?;
            print_outbound(&tracker.handle(Event::DailyTick).await?);
        }
        Command::Status => {
            let tracker = ditchpouch_gateway::build_tracker(&config()?)?;
            let progress = tracker.snapshot().await?;
            println!("{}", serde_json::to_string_pretty(&progress)?);
        }
        Command::Reset => {
            let tracker = ditchpouch_gateway::build_tracker(&config()?)?;
            let event = Event::Admin { command: AdminCommand::ResetAll };
            print_outbound(&tracker.handle(event).await?);
        }
        Command::Send { text } => {
            let tracker = ditchpouch_gateway::build_tracker(&config()?)?;
            let event = ditchpouch_channels::decode::decode_text(&text);
            tracing::debug!("Decoded {:?} as {:?}", text, event);
            print_outbound(&tracker.handle(event).await?);
        }
        Command::Init => {
            let path = cli.config.clone().unwrap_or_else(DitchPouchConfig::default_path);
            if path.exists() {
                println!("Config already exists at {}", path.display());
            } else {
                DitchPouchConfig::default().save_to(&path)?;
                println!("✅ Wrote default config to {}", path.display());
            }
        }
    }

    Ok(())
}
