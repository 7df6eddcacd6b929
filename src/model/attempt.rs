//! Scan attempts: the immutable records kept in the history ledger.

use std::fmt;
use std::str::FromStr;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Coordinate;

/// The candidate identifier was empty or whitespace-only.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("enter a delivery ID or scan a QR code")]
pub struct EmptyInput;

/// A delivery identifier: trimmed and never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeliveryId(pub(super) String);

impl DeliveryId {
    /// Parse a candidate, trimming surrounding whitespace.
    pub fn parse(raw: &str) -> Result<Self, EmptyInput> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(EmptyInput);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for DeliveryId {
    type Err = EmptyInput;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for DeliveryId {
    type Error = EmptyInput;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<DeliveryId> for String {
    fn from(id: DeliveryId) -> Self {
        id.0
    }
}

impl fmt::Display for DeliveryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of a verification attempt. Exactly two values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    Success,
    Failure,
}

impl ScanStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }
}

/// One verification attempt, as recorded in the history ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanAttempt {
    /// Unique per attempt, minted at creation.
    pub id: Uuid,

    pub delivery_id: DeliveryId,

    /// Customer on the delivery record, or a placeholder for unknown deliveries.
    pub customer: String,

    /// Destination address on the delivery record, or a placeholder.
    pub address: String,

    pub status: ScanStatus,

    /// When the decision was made.
    pub timestamp: Timestamp,

    /// Device position used for the decision, if one had been acquired.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Coordinate>,
}
