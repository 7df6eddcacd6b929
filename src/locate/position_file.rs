//! Position file: the latest fix as written by a GPS daemon.
//!
//! Accepts either `LAT,LNG` text or `{"latitude": .., "longitude": ..}` JSON.

use std::io;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;

use super::{LocationError, LocationProvider};
use crate::model::Coordinate;

/// Reads the current position from a file on each query.
#[derive(Debug, Clone)]
pub struct PositionFile {
    path: PathBuf,
}

impl PositionFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl LocationProvider for PositionFile {
    async fn acquire(&self) -> Result<Coordinate, LocationError> {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(s) => s,
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                return Err(LocationError::PermissionDenied);
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(LocationError::PositionUnavailable(format!(
                    "no fix at {}",
                    self.path.display()
                )));
            }
            Err(e) => {
                return Err(LocationError::PositionUnavailable(format!(
                    "failed to read {}: {e}",
                    self.path.display()
                )));
            }
        };

        parse_fix(&contents).map_err(|reason| {
            LocationError::PositionUnavailable(format!(
                "invalid fix in {}: {reason}",
                self.path.display()
            ))
        })
    }
}

fn parse_fix(contents: &str) -> Result<Coordinate, String> {
    let trimmed = contents.trim();
    if trimmed.starts_with('{') {
        serde_json::from_str::<Coordinate>(trimmed).map_err(|e| e.to_string())
    } else {
        trimmed
            .parse::<Coordinate>()
            .map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    #[tokio::test]
    async fn reads_plain_text_fix() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fix");
        std::fs::write(&path, "12.9756,77.6050\n").unwrap();

        let c = PositionFile::new(&path).acquire().await.unwrap();
        assert_eq!(c, Coordinate::new(12.9756, 77.605).unwrap());
    }

    #[tokio::test]
    async fn reads_json_fix() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fix.json");
        std::fs::write(&path, r#"{"latitude": 17.4478, "longitude": 78.3762}"#).unwrap();

        let c = PositionFile::new(&path).acquire().await.unwrap();
        assert_eq!(c, Coordinate::new(17.4478, 78.3762).unwrap());
    }

    #[tokio::test]
    async fn missing_file_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let err = PositionFile::new(dir.path().join("absent"))
            .acquire()
            .await
            .unwrap_err();
        assert!(matches!(err, LocationError::PositionUnavailable(_)));
    }

    #[tokio::test]
    async fn out_of_range_fix_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fix");
        std::fs::write(&path, "123.0,10.0").unwrap();

        let err = PositionFile::new(&path).acquire().await.unwrap_err();
        assert!(matches!(err, LocationError::PositionUnavailable(_)));
    }
}
