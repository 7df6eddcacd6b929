//! Delivery records and the catalog the verifier checks scans against.

use serde::{Deserialize, Serialize};

use super::{Coordinate, DeliveryId};

/// A delivery known to this session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DeliveryRecord {
    pub id: DeliveryId,
    pub order_id: String,
    pub customer: String,
    pub driver: String,
    pub status: DeliveryStatus,
    pub items: u32,

    /// Human-readable destination address.
    pub destination: String,

    /// Registered destination position; scans are checked against it.
    pub location: Coordinate,

    /// Estimated arrival, free-form (e.g. `"2:30 PM"`).
    pub eta: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_time: Option<String>,
}

/// Where a delivery stands. Display-only; verification never changes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeliveryStatus {
    Pending,
    PickedUp,
    InTransit,
    Delivered,
    Failed,
}

impl DeliveryStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::PickedUp => "picked-up",
            Self::InTransit => "in-transit",
            Self::Delivered => "delivered",
            Self::Failed => "failed",
        }
    }
}

/// The deliveries a session can verify, looked up by exact id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    records: Vec<DeliveryRecord>,
}

impl Catalog {
    /// Build a catalog. Callers are expected to have rejected duplicate ids;
    /// on a duplicate, lookups return the first record.
    pub fn new(records: Vec<DeliveryRecord>) -> Self {
        Self { records }
    }

    pub fn get(&self, id: &DeliveryId) -> Option<&DeliveryRecord> {
        self.records.iter().find(|r| &r.id == id)
    }

    pub fn records(&self) -> &[DeliveryRecord] {
        &self.records
    }

    /// The built-in catalog used when no deliveries are configured.
    pub fn sample() -> Self {
        Self::new(sample_records())
    }
}

fn sample_records() -> Vec<DeliveryRecord> {
    let record = |id: &str,
                  order_id: &str,
                  customer: &str,
                  driver: &str,
                  status: DeliveryStatus,
                  items: u32,
                  destination: &str,
                  (lat, lng): (f64, f64),
                  eta: &str,
                  actual_time: Option<&str>| {
        DeliveryRecord {
            id: DeliveryId(id.to_string()),
            order_id: order_id.to_string(),
            customer: customer.to_string(),
            driver: driver.to_string(),
            status,
            items,
            destination: destination.to_string(),
            location: Coordinate {
                latitude: lat,
                longitude: lng,
            },
            eta: eta.to_string(),
            actual_time: actual_time.map(String::from),
        }
    };

    vec![
        record(
            "DEL-001",
            "ORD-2024-001",
            "Reliance Retail",
            "Amit Sharma",
            DeliveryStatus::Delivered,
            5,
            "123 MG Road, Bengaluru",
            (12.975_6, 77.605_0),
            "2:30 PM",
            Some("2:25 PM"),
        ),
        record(
            "DEL-002",
            "ORD-2024-002",
            "Tata Consultancy",
            "Priya Singh",
            DeliveryStatus::InTransit,
            12,
            "456 IT Park, Hyderabad",
            (17.447_8, 78.376_2),
            "4:15 PM",
            None,
        ),
        record(
            "DEL-003",
            "ORD-2024-003",
            "Big Bazaar",
            "Rahul Verma",
            DeliveryStatus::PickedUp,
            8,
            "789 Market Street, Mumbai",
            (18.946_7, 72.831_0),
            "5:45 PM",
            None,
        ),
        record(
            "DEL-004",
            "ORD-2024-004",
            "Spencer's Retail",
            "Neha Patel",
            DeliveryStatus::Pending,
            3,
            "321 Mall Road, Delhi",
            (28.704_1, 77.102_5),
            "6:30 PM",
            None,
        ),
    ]
}
