//! Verification decision: is this scan a valid delivery confirmation?
//!
//! The policy is a radius check. A scan succeeds only when the device
//! position is within `radius_meters` of the delivery's registered
//! destination. A scan with no position, or for a delivery the catalog
//! does not know, fails.

use std::time::Duration;

use jiff::Timestamp;
use uuid::Uuid;

use crate::model::{Catalog, Coordinate, DeliveryId, Notification, ScanAttempt, ScanStatus};

/// Recorded when the catalog has no record for the scanned id.
pub const UNKNOWN_CUSTOMER: &str = "Unknown customer";
pub const UNKNOWN_ADDRESS: &str = "Unknown address";

/// Why a scan was rejected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rejection {
    /// No device position had been acquired.
    NoLocation,

    /// The id is not in the catalog.
    UnknownDelivery,

    /// The device was too far from the destination.
    OutsideRadius { distance_meters: f64 },
}

/// The decision for one scan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Verdict {
    pub status: ScanStatus,
    pub rejection: Option<Rejection>,
}

impl Verdict {
    fn accept() -> Self {
        Self {
            status: ScanStatus::Success,
            rejection: None,
        }
    }

    fn reject(rejection: Rejection) -> Self {
        Self {
            status: ScanStatus::Failure,
            rejection: Some(rejection),
        }
    }

    /// The user-facing notification for this verdict.
    pub fn notification(&self) -> Notification {
        match self.rejection {
            None => Notification::success("Delivery Verified", "Package delivery has been confirmed"),
            Some(Rejection::NoLocation) => Notification::failure(
                "Verification Failed",
                "No GPS location - acquire a location before verifying",
            ),
            Some(Rejection::UnknownDelivery) => Notification::failure(
                "Verification Failed",
                "Delivery ID not found",
            ),
            Some(Rejection::OutsideRadius { distance_meters }) => Notification::failure(
                "Verification Failed",
                format!(
                    "Location verification failed - outside delivery radius ({distance_meters:.0} m away)"
                ),
            ),
        }
    }
}

/// Deterministic radius check against the registered destination.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadiusPolicy {
    pub radius_meters: f64,
}

impl RadiusPolicy {
    pub fn new(radius_meters: f64) -> Self {
        Self { radius_meters }
    }

    /// Decide a scan. Order matters: a missing position fails before the
    /// catalog lookup, matching what the user can fix first.
    pub fn decide(&self, destination: Option<&Coordinate>, location: Option<&Coordinate>) -> Verdict {
        let Some(location) = location else {
            return Verdict::reject(Rejection::NoLocation);
        };
        let Some(destination) = destination else {
            return Verdict::reject(Rejection::UnknownDelivery);
        };

        let distance_meters = location.distance_meters(destination);
        if distance_meters <= self.radius_meters {
            Verdict::accept()
        } else {
            Verdict::reject(Rejection::OutsideRadius { distance_meters })
        }
    }
}

/// Turns a candidate id and optional position into a recorded attempt.
#[derive(Debug, Clone)]
pub struct Verifier {
    catalog: Catalog,
    policy: RadiusPolicy,
    delay: Duration,
}

impl Verifier {
    pub fn new(catalog: Catalog, policy: RadiusPolicy, delay: Duration) -> Self {
        Self {
            catalog,
            policy,
            delay,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Decide and build the attempt, after the simulated service round-trip.
    pub async fn verify(
        &self,
        delivery_id: DeliveryId,
        location: Option<Coordinate>,
    ) -> (ScanAttempt, Verdict) {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let record = self.catalog.get(&delivery_id);
        let verdict = self
            .policy
            .decide(record.map(|r| &r.location), location.as_ref());

        let (customer, address) = match record {
            Some(r) => (r.customer.clone(), r.destination.clone()),
            None => (UNKNOWN_CUSTOMER.to_string(), UNKNOWN_ADDRESS.to_string()),
        };

        let attempt = ScanAttempt {
            id: Uuid::new_v4(),
            delivery_id,
            customer,
            address,
            status: verdict.status,
            timestamp: Timestamp::now(),
            location,
        };

        (attempt, verdict)
    }
}
