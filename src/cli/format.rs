//! Output formatting for CLI display.

use crate::model::{
    Coordinate, DeliveryRecord, DeliveryStatus, Notification, ScanAttempt, ScanStatus, Tone,
};
use crate::workflow::Snapshot;

/// One ledger line: mark, id, status, customer, address, time, and position if any.
pub(super) fn format_attempt(attempt: &ScanAttempt) -> String {
    let mark = match attempt.status {
        ScanStatus::Success => "✔",
        ScanStatus::Failure => "✘",
    };
    let time = attempt.timestamp.strftime("%Y-%m-%d %H:%M:%S UTC");
    let mut line = format!(
        "{mark} {}  [{}]  {} · {}  {time}",
        attempt.delivery_id,
        attempt.status.as_str(),
        attempt.customer,
        attempt.address,
    );
    if let Some(location) = attempt.location {
        line.push_str(&format!("  @ {location}"));
    }
    line
}

pub(super) fn format_notification(note: &Notification) -> String {
    let mark = match note.tone {
        Tone::Success => "✔",
        Tone::Failure => "✘",
    };
    format!("{mark} {}: {}", note.title, note.description)
}

pub(super) fn format_delivery(record: &DeliveryRecord) -> String {
    let time = match &record.actual_time {
        Some(actual) => format!("ETA {} (arrived {actual})", record.eta),
        None => format!("ETA {}", record.eta),
    };
    format!(
        "{}  [{}]  {} · {} items · {}  driver {}  {time}",
        record.id,
        record.status.as_str(),
        record.customer,
        record.items,
        record.destination,
        record.driver,
    )
}

/// Catalog totals: all deliveries, then in transit, delivered, and pending.
pub(super) fn format_delivery_summary(records: &[DeliveryRecord]) -> String {
    let count = |status: DeliveryStatus| records.iter().filter(|r| r.status == status).count();
    format!(
        "{} deliveries · {} in transit · {} delivered · {} pending",
        records.len(),
        count(DeliveryStatus::InTransit),
        count(DeliveryStatus::Delivered),
        count(DeliveryStatus::Pending),
    )
}

pub(super) fn format_location(location: Option<Coordinate>) -> String {
    match location {
        Some(c) => c.to_string(),
        None => "Location not acquired".to_string(),
    }
}

pub(super) fn format_snapshot(snapshot: &Snapshot) -> String {
    let candidate = if snapshot.candidate.is_empty() {
        "(none)"
    } else {
        snapshot.candidate.as_str()
    };
    format!(
        "phase: {}\ncandidate: {candidate}\nlocation: {}\nattempts: {}",
        snapshot.phase,
        format_location(snapshot.location),
        snapshot.attempts,
    )
}
