//! Location providers: ask the platform where the device is.
//!
//! Each provider answers a single query with one coordinate or one
//! [`LocationError`]. Providers never retry; the user asks again.

mod position_file;

pub use position_file::PositionFile;

use async_trait::async_trait;

use crate::model::Coordinate;

/// Why a position could not be acquired.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocationError {
    #[error("location permission denied")]
    PermissionDenied,

    #[error("position unavailable: {0}")]
    PositionUnavailable(String),

    #[error("positioning is not supported on this device")]
    Unsupported,
}

/// A source of the device's current position.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// Query the current position once.
    ///
    /// May suspend for as long as the platform takes to get a fix.
    async fn acquire(&self) -> Result<Coordinate, LocationError>;
}

/// A position supplied up front (command line or config).
#[derive(Debug, Clone, Copy)]
pub struct FixedPosition(pub Coordinate);

#[async_trait]
impl LocationProvider for FixedPosition {
    async fn acquire(&self) -> Result<Coordinate, LocationError> {
        Ok(self.0)
    }
}

/// No positioning capability at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPositioning;

#[async_trait]
impl LocationProvider for NoPositioning {
    async fn acquire(&self) -> Result<Coordinate, LocationError> {
        Err(LocationError::Unsupported)
    }
}
