//! Core data model for waybill.
//!
//! These types carry the verification workflow:
//! coordinates, delivery records, scan attempts, and notifications.

mod attempt;
mod coordinate;
mod delivery;
mod notice;

pub use attempt::{DeliveryId, EmptyInput, ScanAttempt, ScanStatus};
pub use coordinate::Coordinate;
pub use delivery::{Catalog, DeliveryRecord, DeliveryStatus};
pub use notice::{Notification, Tone};
