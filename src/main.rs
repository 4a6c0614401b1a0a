//! wolfies-broadcast - paced, verified batch messaging
//!
//! Sends go through the session bridge over a Unix socket. Every contact in
//! the batch gets an explicit outcome; the exit status is non-zero iff some
//! contact failed or the session dropped mid-batch.
//!
//! CHANGELOG:
//! - 10/18/2026 - Media items in batch files
//! - 10/16/2026 - Dry-run mode
//! - 10/14/2026 - Initial CLI

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;
use std::process::ExitCode;

use wolfies_broadcast::batch::{load_items, BatchRunner};
use wolfies_broadcast::config::BroadcastConfig;
use wolfies_broadcast::contacts::resolve_transport_identity;
use wolfies_broadcast::error::BatchError;
use wolfies_broadcast::output::{self, OutputControls, ProgressPrinter};
use wolfies_broadcast::transport::{BridgeTransport, DryRunTransport, Transport};

/// Paced, verified batch messaging over a session bridge.
#[derive(Parser, Debug)]
#[command(name = "wolfies-broadcast")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Compact JSON output (no whitespace)
    #[arg(long, global = true)]
    compact: bool,

    /// Comma-separated field allowlist for per-contact results
    #[arg(long, global = true)]
    fields: Option<String>,

    /// Truncate text fields to this length
    #[arg(long, global = true)]
    max_text_chars: Option<u32>,

    /// Config file (default: $WOLFIES_BROADCAST_CONFIG or ~/.wolfies-broadcast/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Session bridge socket path
    #[arg(long, global = true)]
    socket: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Send every message in a batch file
    Send {
        /// JSON file: [{"contact": "...", "message": "..."} or {"contact": "...", "media": {"path": "..."}}, ...]
        file: PathBuf,

        /// Minimum pause before each contact (ms)
        #[arg(long)]
        min_delay_ms: Option<u64>,

        /// Maximum pause before each contact (ms)
        #[arg(long)]
        max_delay_ms: Option<u64>,

        /// Give up on a send after this long (ms)
        #[arg(long)]
        send_timeout_ms: Option<u64>,

        /// Wait before reading back a sent message (ms)
        #[arg(long)]
        verify_delay_ms: Option<u64>,

        /// Extra attempts after a failed or unverified send
        #[arg(long)]
        max_retries: Option<u32>,

        /// Send without reading the message back
        #[arg(long)]
        skip_verify: bool,

        /// Do not check for an identical earlier message
        #[arg(long)]
        no_already_sent_check: bool,

        /// Allow contacts we messaged before (at most once per day)
        #[arg(long)]
        allow_repeat: bool,

        /// Send regardless of history
        #[arg(long)]
        force: bool,

        /// Rehearse against an in-memory transport
        #[arg(long)]
        dry_run: bool,

        /// Print every delivery step to stderr
        #[arg(short, long)]
        verbose: bool,
    },

    /// Show the canonical identity for contacts (no bridge needed)
    Normalize {
        /// Raw contact strings
        contacts: Vec<String>,
    },

    /// Resolve the identity the bridge will actually address
    Resolve {
        /// Raw contact string
        contact: String,
    },

    /// Check the session bridge
    Health,
}

fn main() -> ExitCode {
    // Initialize tracing/logging
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to start runtime: {}", e);
            return ExitCode::from(1);
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let mut config = match &cli.config {
        Some(path) => BroadcastConfig::load(path)?,
        None => BroadcastConfig::load_default()?,
    };
    if let Some(socket) = cli.socket.clone() {
        config.socket_path = socket;
    }

    let output_controls = OutputControls {
        json: cli.json,
        compact: cli.compact,
        fields: cli.fields.clone(),
        max_text_chars: cli.max_text_chars,
    };

    match cli.command {
        Command::Send {
            file,
            min_delay_ms,
            max_delay_ms,
            send_timeout_ms,
            verify_delay_ms,
            max_retries,
            skip_verify,
            no_already_sent_check,
            allow_repeat,
            force,
            dry_run,
            verbose,
        } => {
            if let Some(v) = min_delay_ms {
                config.min_delay_ms = v;
            }
            if let Some(v) = max_delay_ms {
                config.max_delay_ms = v;
            }
            if let Some(v) = send_timeout_ms {
                config.send_timeout_ms = v;
            }
            if let Some(v) = verify_delay_ms {
                config.verify_delay_ms = v;
            }
            if let Some(v) = max_retries {
                config.max_verify_retries = v;
            }
            config.skip_verify |= skip_verify;
            config.check_already_sent &= !no_already_sent_check;
            config.skip_if_ever_sent &= !allow_repeat;
            config.force |= force;

            let items = load_items(&file).with_context(|| format!("Failed to load batch {:?}", file))?;
            let progress = ProgressPrinter { verbose };

            if dry_run {
                let transport = DryRunTransport::new();
                send_batch(&transport, &config, &items, &progress, &output_controls).await
            } else {
                let transport = BridgeTransport::new(config.socket_path(), config.bridge_timeout());
                send_batch(&transport, &config, &items, &progress, &output_controls).await
            }
        }

        Command::Normalize { contacts } => {
            let mut rows = Vec::with_capacity(contacts.len());
            let mut any_invalid = false;
            for contact in &contacts {
                match config.country.to_canonical_identity(contact) {
                    Ok(identity) => rows.push(json!({ "contact": contact, "identity": identity })),
                    Err(e) => {
                        any_invalid = true;
                        rows.push(json!({ "contact": contact, "error": e.to_string() }));
                    }
                }
            }

            if output_controls.json {
                output_controls.print(&rows);
            } else {
                for row in &rows {
                    let resolved = row
                        .get("identity")
                        .or_else(|| row.get("error"))
                        .and_then(|v| v.as_str())
                        .unwrap_or_default();
                    println!("{} -> {}", row["contact"].as_str().unwrap_or_default(), resolved);
                }
            }
            Ok(if any_invalid { ExitCode::from(1) } else { ExitCode::SUCCESS })
        }

        Command::Resolve { contact } => {
            let canonical = config.country.to_canonical_identity(&contact)?;
            let transport = BridgeTransport::new(config.socket_path(), config.bridge_timeout());
            let resolution = resolve_transport_identity(&transport, &canonical).await;

            if output_controls.json {
                output_controls.print(&json!({
                    "contact": contact,
                    "canonical": canonical,
                    "identity": resolution.identity,
                    "source": resolution.source,
                }));
            } else {
                println!("{} -> {} (via {:?})", canonical, resolution.identity, resolution.source);
            }
            Ok(ExitCode::SUCCESS)
        }

        Command::Health => {
            let transport = BridgeTransport::new(config.socket_path(), config.bridge_timeout());
            match transport.health().await {
                Ok(health) => {
                    output_controls.print(&health);
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => {
                    if output_controls.json {
                        println!("{}", output::format_error(&e.to_string()));
                    } else {
                        eprintln!("Bridge unavailable: {}", e);
                    }
                    Ok(ExitCode::from(1))
                }
            }
        }
    }
}

async fn send_batch<T: Transport>(
    transport: &T,
    config: &BroadcastConfig,
    items: &[wolfies_broadcast::BatchItem],
    progress: &ProgressPrinter,
    output_controls: &OutputControls,
) -> Result<ExitCode> {
    let runner = BatchRunner::new(transport, config.batch_options()).with_observer(progress);

    match runner.run(items).await {
        Ok(report) => {
            output_controls.print_report(&report);
            Ok(if report.has_failures() {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            })
        }
        Err(BatchError::Disconnected { reason, total, report }) => {
            output_controls.print_report(&report);
            eprintln!(
                "Session disconnected after {} of {} contacts: {}",
                report.results.len(),
                total,
                reason
            );
            Ok(ExitCode::from(2))
        }
        Err(e) => Err(e.into()),
    }
}
