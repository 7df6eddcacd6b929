//! The verification workflow: state, transitions, and the station that drives them.
//!
//! [`WorkflowState`] holds everything the scanner screen mutates: the
//! candidate identifier, the acquired position, the ledger, the phase, and
//! the pending notifications. Its transitions are plain methods so they can
//! be tested without a runtime:
//!
//! ```text
//! Idle ──begin_acquire──▶ Acquiring ──finish_acquire──▶ Idle
//! Idle ──begin_decide───▶ Deciding  ──finish_decide───▶ Idle
//! ```
//!
//! [`Station`] owns one state and runs the async collaborators (location
//! provider, verifier) against it. The phase doubles as the busy flag: an
//! operation that starts outside `Idle` is rejected with
//! [`WorkflowError::Busy`].

use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::acquire::{CameraError, CandidateSlot, ScanOutcome};
use crate::ledger::HistoryLedger;
use crate::locate::{LocationError, LocationProvider};
use crate::model::{Catalog, Coordinate, DeliveryId, EmptyInput, Notification, ScanAttempt, Tone};
use crate::verify::{Verdict, Verifier};

/// Where the workflow stands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    Acquiring,
    Deciding,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Acquiring => "location acquisition",
            Self::Deciding => "verification",
        })
    }
}

/// Errors surfaced by workflow operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkflowError {
    #[error(transparent)]
    EmptyInput(#[from] EmptyInput),

    #[error("busy: {0} in progress")]
    Busy(Phase),

    #[error(transparent)]
    Location(#[from] LocationError),
}

/// Everything the scanner screen mutates, in one place.
#[derive(Debug, Default)]
pub struct WorkflowState {
    phase: Phase,
    candidate: CandidateSlot,
    location: Option<Coordinate>,
    ledger: HistoryLedger,
    outbox: Vec<Notification>,
}

impl WorkflowState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn candidate(&self) -> &CandidateSlot {
        &self.candidate
    }

    pub fn location(&self) -> Option<Coordinate> {
        self.location
    }

    pub fn ledger(&self) -> &HistoryLedger {
        &self.ledger
    }

    /// Manual entry. Rejected while a verification is outstanding.
    pub fn enter(&mut self, text: &str) -> Result<(), WorkflowError> {
        if self.phase == Phase::Deciding {
            return Err(WorkflowError::Busy(self.phase));
        }
        self.candidate.write(text);
        Ok(())
    }

    /// Apply the result of a camera scan session.
    pub fn apply_scan(&mut self, outcome: ScanOutcome) -> Result<(), CameraError> {
        match outcome {
            ScanOutcome::Decoded(text) => {
                self.notify(Notification::success(
                    "QR Code Scanned",
                    format!("Scanned: {text}"),
                ));
                self.candidate.write(text);
                Ok(())
            }
            ScanOutcome::Failed(e) => {
                self.notify(Notification::failure(
                    "QR Scan Error",
                    format!("Could not access camera or scan QR code: {e}"),
                ));
                Err(e)
            }
        }
    }

    pub fn begin_acquire(&mut self) -> Result<(), WorkflowError> {
        self.require_idle()?;
        self.phase = Phase::Acquiring;
        Ok(())
    }

    /// Store a new position, or leave the old one untouched on failure.
    pub fn finish_acquire(
        &mut self,
        result: Result<Coordinate, LocationError>,
    ) -> Result<Coordinate, LocationError> {
        self.phase = Phase::Idle;
        match result {
            Ok(coordinate) => {
                tracing::debug!(
                    latitude = coordinate.latitude(),
                    longitude = coordinate.longitude(),
                    "position fix"
                );
                self.location = Some(coordinate);
                self.notify(Notification::success(
                    "Location Acquired",
                    format!("GPS coordinates captured: {coordinate}"),
                ));
                Ok(coordinate)
            }
            Err(e) => {
                let title = match e {
                    LocationError::Unsupported => "Geolocation Not Supported",
                    _ => "Location Error",
                };
                self.notify(Notification::failure(
                    title,
                    format!("Unable to get current location: {e}"),
                ));
                Err(e)
            }
        }
    }

    /// Validate the candidate and enter `Deciding`.
    ///
    /// Returns what the verifier needs. A busy workflow is reported before
    /// an empty candidate.
    pub fn begin_decide(&mut self) -> Result<(DeliveryId, Option<Coordinate>), WorkflowError> {
        self.require_idle()?;
        let id = self.candidate.candidate()?;
        self.phase = Phase::Deciding;
        Ok((id, self.location))
    }

    /// Record the attempt, notify, and return to `Idle`.
    pub fn finish_decide(&mut self, attempt: ScanAttempt, verdict: &Verdict) {
        // Only clear the slot if it still holds what was submitted.
        if self.candidate.candidate().as_ref() == Ok(&attempt.delivery_id) {
            self.candidate.clear();
        }
        self.ledger.record(attempt);
        self.notify(verdict.notification());
        self.phase = Phase::Idle;
    }

    /// Drop an in-flight operation without recording anything.
    pub fn abort(&mut self) {
        self.phase = Phase::Idle;
    }

    /// Drain pending notifications, oldest first.
    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.outbox)
    }

    fn require_idle(&self) -> Result<(), WorkflowError> {
        match self.phase {
            Phase::Idle => Ok(()),
            busy => Err(WorkflowError::Busy(busy)),
        }
    }

    fn notify(&mut self, notification: Notification) {
        match notification.tone {
            Tone::Success => tracing::info!(
                title = %notification.title,
                "{}",
                notification.description
            ),
            Tone::Failure => tracing::warn!(
                title = %notification.title,
                "{}",
                notification.description
            ),
        }
        self.outbox.push(notification);
    }
}

/// A point-in-time view of the workflow for display.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub phase: Phase,
    pub candidate: String,
    pub location: Option<Coordinate>,
    pub attempts: usize,
}

/// One verification session: workflow state plus its collaborators.
///
/// The state lock is never held across an await point.
pub struct Station {
    state: Mutex<WorkflowState>,
    verifier: Verifier,
    locator: Box<dyn LocationProvider>,
}

impl Station {
    pub fn new(verifier: Verifier, locator: Box<dyn LocationProvider>) -> Self {
        Self {
            state: Mutex::new(WorkflowState::new()),
            verifier,
            locator,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        self.verifier.catalog()
    }

    pub fn enter(&self, text: &str) -> Result<(), WorkflowError> {
        self.state().enter(text)
    }

    pub fn apply_scan(&self, outcome: ScanOutcome) -> Result<(), CameraError> {
        self.state().apply_scan(outcome)
    }

    /// Acquire a position from the station's own provider.
    pub async fn locate(&self) -> Result<Coordinate, WorkflowError> {
        self.locate_with(self.locator.as_ref()).await
    }

    /// Acquire a position from `provider`.
    pub async fn locate_with(
        &self,
        provider: &dyn LocationProvider,
    ) -> Result<Coordinate, WorkflowError> {
        self.state().begin_acquire()?;
        let mut guard = InFlight::new(&self.state);
        tracing::debug!("acquiring location");

        let result = provider.acquire().await;

        guard.disarm();
        Ok(self.state().finish_acquire(result)?)
    }

    /// Verify the current candidate.
    ///
    /// At most one verification runs at a time; a second call while one is
    /// outstanding fails with [`WorkflowError::Busy`] and records nothing.
    pub async fn verify(&self) -> Result<ScanAttempt, WorkflowError> {
        let (id, location) = self.state().begin_decide()?;
        let mut guard = InFlight::new(&self.state);
        tracing::info!(delivery = %id, has_location = location.is_some(), "verifying delivery");

        let (attempt, verdict) = self.verifier.verify(id, location).await;

        guard.disarm();
        tracing::info!(
            delivery = %attempt.delivery_id,
            status = attempt.status.as_str(),
            "verification decided"
        );
        self.state().finish_decide(attempt.clone(), &verdict);
        Ok(attempt)
    }

    /// The ledger, most recent first.
    pub fn history(&self) -> Vec<ScanAttempt> {
        self.state().ledger().all().cloned().collect()
    }

    pub fn snapshot(&self) -> Snapshot {
        let state = self.state();
        Snapshot {
            phase: state.phase(),
            candidate: state.candidate().value().to_string(),
            location: state.location(),
            attempts: state.ledger().len(),
        }
    }

    pub fn take_notifications(&self) -> Vec<Notification> {
        self.state().take_notifications()
    }

    fn state(&self) -> MutexGuard<'_, WorkflowState> {
        // No invariant spans a panic here; keep serving after one.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Returns the workflow to `Idle` if an in-flight operation is dropped.
struct InFlight<'a> {
    state: &'a Mutex<WorkflowState>,
    armed: bool,
}

impl<'a> InFlight<'a> {
    fn new(state: &'a Mutex<WorkflowState>) -> Self {
        Self { state, armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.armed {
            tracing::debug!("in-flight operation cancelled");
            self.state
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use async_trait::async_trait;

    use crate::locate::{FixedPosition, NoPositioning};
    use crate::model::ScanStatus;
    use crate::verify::RadiusPolicy;

    const DELAY: Duration = Duration::from_secs(2);

    struct Denied;

    #[async_trait]
    impl LocationProvider for Denied {
        async fn acquire(&self) -> Result<Coordinate, LocationError> {
            Err(LocationError::PermissionDenied)
        }
    }

    fn mg_road() -> Coordinate {
        Coordinate::new(12.9756, 77.6050).unwrap()
    }

    fn station(locator: Box<dyn LocationProvider>) -> Station {
        let verifier = Verifier::new(Catalog::sample(), RadiusPolicy::new(150.0), DELAY);
        Station::new(verifier, locator)
    }

    #[tokio::test(start_paused = true)]
    async fn verify_records_one_entry_for_the_submitted_id() {
        let station = station(Box::new(FixedPosition(mg_road())));
        station.locate().await.unwrap();
        station.enter("DEL-001").unwrap();
        station.take_notifications();

        let attempt = station.verify().await.unwrap();

        let history = station.history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].delivery_id.as_str(), "DEL-001");
        assert_eq!(history[0], attempt);
        assert_eq!(attempt.status, ScanStatus::Success);

        let notes = station.take_notifications();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].title, "Delivery Verified");
        assert_eq!(notes[0].tone, Tone::Success);
    }

    #[tokio::test(start_paused = true)]
    async fn successive_verifications_are_newest_first() {
        let station = station(Box::new(FixedPosition(mg_road())));
        for id in ["DEL-001", "DEL-002", "DEL-003"] {
            station.enter(id).unwrap();
            station.verify().await.unwrap();
        }

        let ids: Vec<_> = station
            .history()
            .iter()
            .map(|a| a.delivery_id.to_string())
            .collect();
        assert_eq!(ids, ["DEL-003", "DEL-002", "DEL-001"]);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_verify_is_rejected_while_busy() {
        let station = station(Box::new(FixedPosition(mg_road())));
        station.enter("DEL-001").unwrap();

        let (first, second) = tokio::join!(station.verify(), station.verify());

        assert!(first.is_ok());
        assert_eq!(second, Err(WorkflowError::Busy(Phase::Deciding)));
        assert_eq!(station.history().len(), 1);
        assert_eq!(station.snapshot().phase, Phase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn blank_candidate_cannot_be_verified() {
        let station = station(Box::new(FixedPosition(mg_road())));
        station.enter("   ").unwrap();

        assert_eq!(
            station.verify().await,
            Err(WorkflowError::EmptyInput(EmptyInput))
        );
        assert!(station.history().is_empty());
        assert!(station.take_notifications().is_empty());
        assert_eq!(station.snapshot().phase, Phase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn radius_policy_drives_status() {
        let near = Coordinate::new(12.9760, 77.6050).unwrap();
        let far = Coordinate::new(12.9900, 77.6050).unwrap();

        let station = station(Box::new(NoPositioning));

        station.locate_with(&FixedPosition(near)).await.unwrap();
        station.enter("DEL-001").unwrap();
        assert_eq!(station.verify().await.unwrap().status, ScanStatus::Success);

        station.locate_with(&FixedPosition(far)).await.unwrap();
        station.enter("DEL-001").unwrap();
        assert_eq!(station.verify().await.unwrap().status, ScanStatus::Failure);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_location_fails_verification() {
        let station = station(Box::new(NoPositioning));
        station.enter("DEL-001").unwrap();

        let attempt = station.verify().await.unwrap();
        assert_eq!(attempt.status, ScanStatus::Failure);
        assert_eq!(attempt.location, None);
    }

    #[tokio::test]
    async fn decoded_payload_fills_candidate() {
        let station = station(Box::new(NoPositioning));
        station.enter("DEL-001").unwrap();

        station
            .apply_scan(ScanOutcome::Decoded("DEL-999".into()))
            .unwrap();

        assert_eq!(station.snapshot().candidate, "DEL-999");
        let notes = station.take_notifications();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].description, "Scanned: DEL-999");
    }

    #[tokio::test]
    async fn camera_failure_notifies_and_keeps_candidate() {
        let station = station(Box::new(NoPositioning));
        station.enter("DEL-002").unwrap();

        let err = station
            .apply_scan(ScanOutcome::Failed(CameraError::Access("denied".into())))
            .unwrap_err();
        assert_eq!(err, CameraError::Access("denied".into()));
        assert_eq!(station.snapshot().candidate, "DEL-002");

        let notes = station.take_notifications();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].tone, Tone::Failure);
    }

    #[tokio::test]
    async fn location_failure_leaves_coordinate_unset() {
        let station = station(Box::new(Denied));

        let err = station.locate().await.unwrap_err();
        assert_eq!(err, WorkflowError::Location(LocationError::PermissionDenied));
        assert_eq!(station.snapshot().location, None);

        let notes = station.take_notifications();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].title, "Location Error");
        assert_eq!(notes[0].tone, Tone::Failure);
    }

    #[tokio::test]
    async fn location_failure_keeps_previous_fix() {
        let station = station(Box::new(Denied));
        station
            .locate_with(&FixedPosition(mg_road()))
            .await
            .unwrap();

        assert!(station.locate().await.is_err());
        assert_eq!(station.snapshot().location, Some(mg_road()));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_verification_records_nothing() {
        let station = station(Box::new(FixedPosition(mg_road())));
        station.enter("DEL-001").unwrap();

        let result = tokio::time::timeout(DELAY / 2, station.verify()).await;
        assert!(result.is_err());

        let snapshot = station.snapshot();
        assert_eq!(snapshot.phase, Phase::Idle);
        assert_eq!(snapshot.attempts, 0);
        assert_eq!(snapshot.candidate, "DEL-001");
    }

    #[tokio::test(start_paused = true)]
    async fn candidate_cleared_after_verification() {
        let station = station(Box::new(FixedPosition(mg_road())));
        station.enter("DEL-001").unwrap();
        station.verify().await.unwrap();

        assert_eq!(station.snapshot().candidate, "");
    }

    #[test]
    fn state_transitions_without_runtime() {
        let mut state = WorkflowState::new();
        state.enter("DEL-004").unwrap();

        let (id, location) = state.begin_decide().unwrap();
        assert_eq!(id.as_str(), "DEL-004");
        assert_eq!(location, None);
        assert_eq!(state.phase(), Phase::Deciding);

        assert_eq!(state.enter("DEL-005"), Err(WorkflowError::Busy(Phase::Deciding)));
        assert_eq!(state.begin_acquire(), Err(WorkflowError::Busy(Phase::Deciding)));

        state.abort();
        assert_eq!(state.phase(), Phase::Idle);
        assert_eq!(state.ledger().len(), 0);
    }
}
