//! CLI interface for waybill.
//!
//! Commands split into two groups:
//!
//! - `waybill verify|scan|deliveries`: one-shot: arguments in, outcome out.
//! - `waybill session`: an interactive scanner screen over stdin.
//!
//! Notifications go to stderr; attempts and listings go to stdout.

mod format;
mod session;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio::io::{self, BufReader};

use crate::acquire::{CommandDecoder, LineDecoder, ScanOutcome, ScanPanel};
use crate::config::Config;
use crate::locate::FixedPosition;
use crate::model::Coordinate;
use crate::verify::{RadiusPolicy, Verifier};
use crate::workflow::{Station, WorkflowError};

use format::{format_attempt, format_delivery, format_delivery_summary, format_notification};

/// Waybill: verify deliveries by QR code and location.
#[derive(Debug, Parser)]
#[command(name = "waybill", after_long_help = WORKFLOW_HELP)]
pub struct Cli {
    /// Config file. Defaults to `$WAYBILL_CONFIG`, then `~/.waybill/config.toml`.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

const WORKFLOW_HELP: &str = r"Workflow: verifying a drop-off
  1. waybill deliveries
     → lists known deliveries and their destinations
  2. waybill verify DEL-001 --at 12.9756,77.6050
     → acquires the position, verifies, prints the attempt
  3. zbarcam --raw --nodisplay | waybill scan --stdin --at 12.9756,77.6050
     → verifies the first QR code read

Interactive:
  waybill session
  > scan            (opens the configured scanner; `close` to stop)
  > locate
  > verify
  > history";

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Verify a delivery ID typed on the command line.
    Verify {
        /// Delivery ID (e.g. `DEL-001`).
        id: String,

        /// Device position as `LAT,LNG`. Overrides the configured position source.
        #[arg(long, allow_hyphen_values = true)]
        at: Option<Coordinate>,

        /// Print the attempt as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Scan a QR code, then verify it.
    ///
    /// Uses the configured scanner program, or reads decoded lines
    /// (zbar format) from stdin with `--stdin`.
    Scan {
        /// Read decoded payloads from stdin instead of starting the scanner.
        #[arg(long)]
        stdin: bool,

        /// Device position as `LAT,LNG`. Overrides the configured position source.
        #[arg(long, allow_hyphen_values = true)]
        at: Option<Coordinate>,

        /// Print the attempt as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Interactive verification session over stdin.
    Session,

    /// List the deliveries this station can verify.
    Deliveries {
        /// Print as JSON.
        #[arg(long)]
        json: bool,
    },
}

/// Build the station for a session from config.
pub fn station(config: &Config) -> Station {
    let verifier = Verifier::new(
        config.catalog(),
        RadiusPolicy::new(config.radius_meters),
        config.verification_delay(),
    );
    Station::new(verifier, config.locator())
}

/// Run a parsed command, returning an error message on failure.
pub async fn run(cli: Cli, config: &Config) -> Result<(), String> {
    let station = station(config);

    match cli.command {
        Command::Verify { id, at, json } => cmd_verify(&station, &id, at, json).await,
        Command::Scan { stdin, at, json } => cmd_scan(&station, config, stdin, at, json).await,
        Command::Session => {
            let input = BufReader::new(io::stdin());
            let mut out = std::io::stdout();
            session::run(&station, config, input, &mut out).await
        }
        Command::Deliveries { json } => cmd_deliveries(&station, json),
    }
}

async fn cmd_verify(
    station: &Station,
    id: &str,
    at: Option<Coordinate>,
    json: bool,
) -> Result<(), String> {
    station.enter(id).map_err(|e| e.to_string())?;
    locate_and_verify(station, at, json).await
}

async fn cmd_scan(
    station: &Station,
    config: &Config,
    stdin: bool,
    at: Option<Coordinate>,
    json: bool,
) -> Result<(), String> {
    let mut panel = if stdin {
        ScanPanel::open(LineDecoder::new(BufReader::new(io::stdin())))
    } else {
        let scanner = config.scanner.as_ref().ok_or(
            "no scanner configured: add a [scanner] table to the config or pass --stdin",
        )?;
        match CommandDecoder::spawn(&scanner.program, &scanner.args) {
            Ok(decoder) => ScanPanel::open(decoder),
            Err(e) => {
                // Surface it the same way a failed session would.
                let result = station.apply_scan(ScanOutcome::Failed(e));
                print_notifications(station);
                return result.map_err(|e| e.to_string());
            }
        }
    };

    eprintln!("Scanning… point the camera at a QR code");
    let outcome = panel.wait().await;
    let result = station.apply_scan(outcome);
    print_notifications(station);
    result.map_err(|e| e.to_string())?;

    locate_and_verify(station, at, json).await
}

/// Acquire a position (best effort), then verify the current candidate.
async fn locate_and_verify(
    station: &Station,
    at: Option<Coordinate>,
    json: bool,
) -> Result<(), String> {
    let located = match at {
        Some(c) => station.locate_with(&FixedPosition(c)).await,
        None => station.locate().await,
    };
    // A failed fix is already a notification; verification proceeds without it.
    if let Err(e) = located {
        tracing::debug!("continuing without location: {e}");
    }
    print_notifications(station);

    eprintln!("Verifying…");
    let attempt = match station.verify().await {
        Ok(attempt) => attempt,
        Err(WorkflowError::EmptyInput(e)) => return Err(e.to_string()),
        Err(e) => return Err(format!("verification failed: {e}")),
    };
    print_notifications(station);

    if json {
        let json = serde_json::to_string_pretty(&attempt)
            .map_err(|e| format!("failed to serialize attempt: {e}"))?;
        println!("{json}");
    } else {
        println!("{}", format_attempt(&attempt));
    }

    Ok(())
}

fn cmd_deliveries(station: &Station, json: bool) -> Result<(), String> {
    let records = station.catalog().records();

    if json {
        let json = serde_json::to_string_pretty(records)
            .map_err(|e| format!("failed to serialize deliveries: {e}"))?;
        println!("{json}");
        return Ok(());
    }

    if records.is_empty() {
        println!("No deliveries");
        return Ok(());
    }
    for record in records {
        println!("{}", format_delivery(record));
    }
    println!("{}", format_delivery_summary(records));
    Ok(())
}

fn print_notifications(station: &Station) {
    for note in station.take_notifications() {
        eprintln!("{}", format_notification(&note));
    }
}
