//! Waybill configuration.
//!
//! Loaded from a TOML file located through a tiered chain:
//!
//! 1. `--config <path>`: explicit per-command override
//! 2. `WAYBILL_CONFIG` env var: process/session level
//! 3. `~/.waybill/config.toml`: global default
//!
//! A file named by (1) or (2) must exist. The default file is optional:
//! when it is missing, built-in defaults apply, including the sample
//! delivery catalog.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs, io};

use serde::Deserialize;

use crate::locate::{FixedPosition, LocationProvider, NoPositioning, PositionFile};
use crate::model::{Catalog, Coordinate, DeliveryRecord};

const DEFAULT_RADIUS_METERS: f64 = 150.0;
const DEFAULT_DELAY_MS: u64 = 2000;

/// Errors from locating, reading, or validating the config file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("invalid config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid config at {}: {reason}", path.display())]
    Invalid { path: PathBuf, reason: String },
}

/// Waybill configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct Config {
    /// How close to the destination a scan must be to verify, in metres.
    pub radius_meters: f64,

    /// Simulated round-trip to the verification service.
    pub verification_delay_ms: u64,

    /// Where the device position comes from. Unset means no positioning.
    pub position: Option<PositionSource>,

    /// Scanner program for camera decoding.
    pub scanner: Option<ScannerCommand>,

    /// Deliveries to verify against. Empty means the built-in sample catalog.
    pub deliveries: Vec<DeliveryRecord>,
}

/// A configured position source.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum PositionSource {
    /// A fixed position, e.g. for a depot terminal.
    Fixed { latitude: f64, longitude: f64 },

    /// A file holding the latest GPS fix.
    File { path: PathBuf },
}

/// A scanner program that prints one decoded payload per line.
#[derive(Debug, Clone, Deserialize)]
pub struct ScannerCommand {
    pub program: String,

    #[serde(default)]
    pub args: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            radius_meters: DEFAULT_RADIUS_METERS,
            verification_delay_ms: DEFAULT_DELAY_MS,
            position: None,
            scanner: None,
            deliveries: Vec::new(),
        }
    }
}

impl Config {
    /// Load config through the resolution chain.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        // 1. Explicit --config flag.
        if let Some(path) = explicit {
            return Self::read(path);
        }

        // 2. WAYBILL_CONFIG environment variable.
        if let Ok(path) = env::var("WAYBILL_CONFIG")
            && !path.is_empty()
        {
            return Self::read(Path::new(&path));
        }

        // 3. ~/.waybill/config.toml, optional.
        let Some(path) = Self::default_path() else {
            return Ok(Self::default());
        };
        match fs::read_to_string(&path) {
            Ok(contents) => Self::parse(&contents, &path),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Read { path, source }),
        }
    }

    /// The default config file path: `~/.waybill/config.toml`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".waybill").join("config.toml"))
    }

    /// Read and validate a config file that must exist.
    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&contents, path)
    }

    /// Parse and validate config text. `path` is only used in error messages.
    pub fn parse(contents: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate().map_err(|reason| ConfigError::Invalid {
            path: path.to_path_buf(),
            reason,
        })?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), String> {
        if !self.radius_meters.is_finite() || self.radius_meters <= 0.0 {
            return Err(format!(
                "radius-meters must be a positive number, got {}",
                self.radius_meters
            ));
        }

        if let Some(PositionSource::Fixed {
            latitude,
            longitude,
        }) = self.position
        {
            Coordinate::new(latitude, longitude).map_err(|e| format!("position: {e}"))?;
        }

        if let Some(scanner) = &self.scanner
            && scanner.program.trim().is_empty()
        {
            return Err("scanner.program is empty".to_string());
        }

        let mut seen = HashSet::new();
        for record in &self.deliveries {
            if !seen.insert(record.id.as_str()) {
                return Err(format!("duplicate delivery id '{}'", record.id));
            }
        }

        Ok(())
    }

    pub fn verification_delay(&self) -> Duration {
        Duration::from_millis(self.verification_delay_ms)
    }

    /// The delivery catalog: configured deliveries, or the sample set.
    pub fn catalog(&self) -> Catalog {
        if self.deliveries.is_empty() {
            Catalog::sample()
        } else {
            Catalog::new(self.deliveries.clone())
        }
    }

    /// The configured location provider.
    pub fn locator(&self) -> Box<dyn LocationProvider> {
        match &self.position {
            Some(PositionSource::Fixed {
                latitude,
                longitude,
            }) => match Coordinate::new(*latitude, *longitude) {
                Ok(c) => Box::new(FixedPosition(c)),
                // Unreachable after validation; degrade to no positioning.
                Err(_) => Box::new(NoPositioning),
            },
            Some(PositionSource::File { path }) => Box::new(PositionFile::new(path)),
            None => Box::new(NoPositioning),
        }
    }
}
