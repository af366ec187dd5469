//! # Sahayaka Mitra CLI (`sahayaka`)
//!
//! Runs the portal server and provides operator commands for checking the
//! deployment without starting it.
//!
//! ## Usage
//!
//! ```bash
//! sahayaka --config ./config/portal.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `sahayaka serve` | Load data files and start the HTTP server |
//! | `sahayaka check` | Load data files and credential, report readiness |
//! | `sahayaka lookup <rtc>` | One-shot record lookup, printed as JSON |

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use sahayaka_mitra::completion::{CompletionBackend, GeminiBackend};
use sahayaka_mitra::config;
use sahayaka_mitra::knowledge::KnowledgeBase;
use sahayaka_mitra::records::RecordStore;
use sahayaka_mitra::server;

/// Sahayaka Mitra — farmer advisory portal backend.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file; when the file is absent, built-in defaults apply.
#[derive(Parser)]
#[command(
    name = "sahayaka",
    about = "Sahayaka Mitra — soil record lookup and scheme chatbot backend",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/portal.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Start the portal HTTP server.
    ///
    /// Loads the schemes document, the farmer CSV, and the completion
    /// credential, then binds to `[server].bind`. A data file that fails to
    /// load disables its feature; the server still starts.
    Serve,

    /// Check deployment readiness without serving.
    ///
    /// Loads both data files and probes for the API key, then prints the
    /// same three readiness flags `/health` would report.
    Check,

    /// Look up one farmer record by RTC number.
    ///
    /// Normalizes the identifier exactly as the server does and prints the
    /// matching record as pretty JSON.
    Lookup {
        /// RTC number, in any human-entered shape (e.g. `"123/ABC-45"`).
        rtc: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    let filter =
        EnvFilter::try_new(&cfg.server.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Serve => {
            server::run_server(cfg).await?;
        }
        Commands::Check => {
            run_check(&cfg);
        }
        Commands::Lookup { rtc } => {
            run_lookup(&cfg, &rtc)?;
        }
    }

    Ok(())
}

/// Load every component and print a readiness table.
fn run_check(cfg: &config::Config) {
    println!("{:<16} {}", "COMPONENT", "STATUS");

    match KnowledgeBase::load(&cfg.data.schemes_path) {
        Ok(_) => println!("{:<16} ok", "schemes"),
        Err(e) => println!("{:<16} failed: {e:#}", "schemes"),
    }

    match RecordStore::load(&cfg.data.farmer_csv_path) {
        Ok(store) => println!("{:<16} ok ({} rows)", "farmer data", store.len()),
        Err(e) => println!("{:<16} failed: {e:#}", "farmer data"),
    }

    match GeminiBackend::from_env(&cfg.completion) {
        Some(backend) => println!("{:<16} configured ({})", "completion", backend.model()),
        None => println!(
            "{:<16} not configured ({} not set)",
            "completion", cfg.completion.api_key_env
        ),
    }
}

/// One-shot lookup against the configured farmer CSV.
fn run_lookup(cfg: &config::Config, rtc: &str) -> anyhow::Result<()> {
    let store = RecordStore::load(&cfg.data.farmer_csv_path)?;

    match store.lookup(rtc) {
        Ok(fields) => {
            let value = serde_json::Value::Object(fields);
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(())
        }
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
