//! Interactive session: the scanner screen, one command per line.
//!
//! While a scan panel is open the loop waits on both the panel and the next
//! input line, so `close` can cancel a scan that has not read anything yet.

use std::io::Write;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::acquire::{CommandDecoder, ScanOutcome, ScanPanel};
use crate::config::Config;
use crate::locate::FixedPosition;
use crate::model::Coordinate;
use crate::workflow::{Station, WorkflowError};

use super::format::{
    format_attempt, format_delivery, format_delivery_summary, format_location,
    format_notification, format_snapshot,
};

const SESSION_HELP: &str = "\
commands:
  enter <id>        set the delivery ID
  scan              open the camera scanner
  close             close the scanner
  locate [LAT,LNG]  acquire the device position
  location          show the acquired position
  verify            verify the current delivery ID
  status            show the current state
  history           show past attempts, newest first
  deliveries        list known deliveries
  help              show this help
  quit              end the session";

enum Input {
    Line(Option<String>),
    Scanned(ScanOutcome),
}

/// Run a session until `quit` or end of input.
pub(super) async fn run<R, W>(
    station: &Station,
    config: &Config,
    input: R,
    out: &mut W,
) -> Result<(), String>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    let mut panel: Option<ScanPanel> = None;

    say(out, "waybill session. Type `help` for commands.")?;

    loop {
        let next = match panel.as_mut() {
            Some(open) => tokio::select! {
                outcome = open.wait() => Input::Scanned(outcome),
                line = lines.next_line() => Input::Line(line.map_err(read_error)?),
            },
            None => Input::Line(lines.next_line().await.map_err(read_error)?),
        };

        let line = match next {
            Input::Scanned(outcome) => {
                panel = None;
                // A failed scan is reported through its notification.
                let _ = station.apply_scan(outcome);
                flush_notifications(station, out)?;
                continue;
            }
            Input::Line(None) => break,
            Input::Line(Some(line)) => line,
        };

        let (command, rest) = match line.trim().split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (line.trim(), ""),
        };

        match command {
            "" => {}
            "quit" | "exit" => break,
            "help" => say(out, SESSION_HELP)?,
            "enter" => {
                if let Err(e) = station.enter(rest) {
                    say(out, &format!("error: {e}"))?;
                }
            }
            "scan" => {
                if panel.is_some() {
                    say(out, "scanner already open; `close` to stop it")?;
                } else {
                    panel = open_scanner(station, config, out)?;
                }
            }
            "close" => match panel.take() {
                Some(open) => {
                    open.close().await;
                    say(out, "scanner closed")?;
                }
                None => say(out, "scanner is not open")?,
            },
            "locate" => {
                let result = if rest.is_empty() {
                    station.locate().await
                } else {
                    match rest.parse::<Coordinate>() {
                        Ok(c) => station.locate_with(&FixedPosition(c)).await,
                        Err(e) => {
                            say(out, &format!("error: {e}"))?;
                            continue;
                        }
                    }
                };
                // Failures surface as notifications; busy is reported inline.
                if let Err(e @ WorkflowError::Busy(_)) = result {
                    say(out, &format!("error: {e}"))?;
                }
            }
            "verify" => {
                say(out, "Verifying…")?;
                match station.verify().await {
                    Ok(attempt) => {
                        flush_notifications(station, out)?;
                        say(out, &format_attempt(&attempt))?;
                    }
                    Err(e) => say(out, &format!("error: {e}"))?,
                }
            }
            "status" => say(out, &format_snapshot(&station.snapshot()))?,
            "location" => say(out, &format_location(station.snapshot().location))?,
            "history" => {
                let history = station.history();
                if history.is_empty() {
                    say(out, "No scans yet")?;
                }
                for attempt in &history {
                    say(out, &format_attempt(attempt))?;
                }
            }
            "deliveries" => {
                let records = station.catalog().records();
                for record in records {
                    say(out, &format_delivery(record))?;
                }
                say(out, &format_delivery_summary(records))?;
            }
            other => say(out, &format!("unknown command '{other}'; try `help`"))?,
        }

        flush_notifications(station, out)?;
    }

    if let Some(open) = panel {
        open.close().await;
    }
    Ok(())
}

fn open_scanner<W: Write>(
    station: &Station,
    config: &Config,
    out: &mut W,
) -> Result<Option<ScanPanel>, String> {
    let Some(scanner) = &config.scanner else {
        say(out, "no scanner configured: add a [scanner] table to the config")?;
        return Ok(None);
    };

    match CommandDecoder::spawn(&scanner.program, &scanner.args) {
        Ok(decoder) => {
            say(out, "scanner open; point the camera at a QR code (`close` to stop)")?;
            Ok(Some(ScanPanel::open(decoder)))
        }
        Err(e) => {
            let _ = station.apply_scan(ScanOutcome::Failed(e));
            Ok(None)
        }
    }
}

fn flush_notifications<W: Write>(station: &Station, out: &mut W) -> Result<(), String> {
    for note in station.take_notifications() {
        say(out, &format_notification(&note))?;
    }
    Ok(())
}

fn say<W: Write>(out: &mut W, text: &str) -> Result<(), String> {
    writeln!(out, "{text}").map_err(|e| format!("failed to write output: {e}"))
}

fn read_error(e: std::io::Error) -> String {
    format!("failed to read input: {e}")
}
