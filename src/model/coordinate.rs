//! Coordinate: a validated latitude/longitude pair.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Mean Earth radius in metres (IUGG).
const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

/// Errors from building or parsing a coordinate.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CoordinateError {
    #[error("latitude {0} is outside [-90, 90]")]
    Latitude(f64),

    #[error("longitude {0} is outside [-180, 180]")]
    Longitude(f64),

    #[error("expected `LAT,LNG`, got '{0}'")]
    Malformed(String),
}

/// A position on the Earth's surface, in decimal degrees.
///
/// Both components are finite and in range; deserialization goes through
/// [`Coordinate::new`] so the invariant also holds for data read from disk.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinate")]
pub struct Coordinate {
    pub(super) latitude: f64,
    pub(super) longitude: f64,
}

#[derive(Deserialize)]
struct RawCoordinate {
    latitude: f64,
    longitude: f64,
}

impl TryFrom<RawCoordinate> for Coordinate {
    type Error = CoordinateError;

    fn try_from(raw: RawCoordinate) -> Result<Self, Self::Error> {
        Self::new(raw.latitude, raw.longitude)
    }
}

impl Coordinate {
    /// Build a coordinate, rejecting out-of-range or non-finite components.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoordinateError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(CoordinateError::Latitude(latitude));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(CoordinateError::Longitude(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Great-circle distance to `other` in metres (haversine formula).
    pub fn distance_meters(&self, other: &Coordinate) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let dlat = (other.latitude - self.latitude).to_radians();
        let dlng = (other.longitude - self.longitude).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
        // Clamp guards against rounding pushing `a` just past 1.0 for antipodes.
        let c = 2.0 * a.sqrt().min(1.0).asin();
        EARTH_RADIUS_METERS * c
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}, {:.6}", self.latitude, self.longitude)
    }
}

impl FromStr for Coordinate {
    type Err = CoordinateError;

    /// Parses `LAT,LNG` (whitespace around either part is ignored).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || CoordinateError::Malformed(s.to_string());
        let (lat, lng) = s.split_once(',').ok_or_else(malformed)?;
        let lat: f64 = lat.trim().parse().map_err(|_| malformed())?;
        let lng: f64 = lng.trim().parse().map_err(|_| malformed())?;
        Self::new(lat, lng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_components() {
        assert_eq!(
            Coordinate::new(90.5, 0.0).unwrap_err(),
            CoordinateError::Latitude(90.5)
        );
        assert_eq!(
            Coordinate::new(0.0, -180.1).unwrap_err(),
            CoordinateError::Longitude(-180.1)
        );
        assert!(Coordinate::new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn accepts_boundaries() {
        assert!(Coordinate::new(-90.0, 180.0).is_ok());
        assert!(Coordinate::new(90.0, -180.0).is_ok());
    }

    #[test]
    fn parses_lat_lng_pair() {
        let c: Coordinate = " 12.9716 , 77.5946 ".parse().unwrap();
        assert!((c.latitude() - 12.9716).abs() < 1e-12);
        assert!((c.longitude() - 77.5946).abs() < 1e-12);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(matches!(
            "12.97".parse::<Coordinate>(),
            Err(CoordinateError::Malformed(_))
        ));
        assert!(matches!(
            "north,east".parse::<Coordinate>(),
            Err(CoordinateError::Malformed(_))
        ));
        assert!(matches!(
            "95,10".parse::<Coordinate>(),
            Err(CoordinateError::Latitude(_))
        ));
    }

    #[test]
    fn displays_six_decimals() {
        let c = Coordinate::new(12.9716, 77.5946).unwrap();
        assert_eq!(c.to_string(), "12.971600, 77.594600");
    }

    #[test]
    fn distance_to_self_is_zero() {
        let c = Coordinate::new(17.385, 78.4867).unwrap();
        assert!(c.distance_meters(&c).abs() < 1e-6);
    }

    #[test]
    fn distance_bengaluru_to_hyderabad() {
        let blr = Coordinate::new(12.9716, 77.5946).unwrap();
        let hyd = Coordinate::new(17.3850, 78.4867).unwrap();
        let d = blr.distance_meters(&hyd);
        // Roughly 500 km as the crow flies.
        assert!((495_000.0..505_000.0).contains(&d), "got {d}");
        assert!((d - hyd.distance_meters(&blr)).abs() < 1e-6);
    }

    #[test]
    fn deserialize_validates_range() {
        let ok: Coordinate = serde_json::from_str(r#"{"latitude":1.0,"longitude":2.0}"#).unwrap();
        assert_eq!(ok, Coordinate::new(1.0, 2.0).unwrap());

        let bad = serde_json::from_str::<Coordinate>(r#"{"latitude":100.0,"longitude":2.0}"#);
        assert!(bad.is_err());
    }
}
