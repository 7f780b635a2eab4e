//! Application settings
//!
//! Loaded from an optional TOML file layered with `AMDAR__*` environment
//! variables. Every knob has a default so the collector runs against local
//! decoders out of the box.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

// Default reference point: Tokyo Station
const DEFAULT_REFERENCE_LAT: f64 = 35.682677;
const DEFAULT_REFERENCE_LON: f64 = 139.762230;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub reference: ReferenceConfig,
    #[serde(default)]
    pub source: SourceConfig,
    /// Altitude-backfill window for VDL2 weather (seconds)
    #[serde(default = "default_window_seconds")]
    pub window_seconds: f64,
    #[serde(default = "default_fragment_buf_size")]
    pub fragment_buf_size: usize,
    #[serde(default)]
    pub outlier: OutlierConfig,
    #[serde(default)]
    pub reconnect: ReconnectConfig,
    #[serde(default)]
    pub channels: ChannelConfig,
    #[serde(default)]
    pub liveness: LivenessConfig,
    /// Absent means log-only operation
    #[serde(default)]
    pub database: Option<DatabaseConfig>,
    /// Absent disables failure notifications
    #[serde(default)]
    pub slack: Option<SlackConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReferenceConfig {
    pub lat_deg: f64,
    pub lon_deg: f64,
    /// Distance-filter radius (km)
    pub distance_km: f64,
}

impl Default for ReferenceConfig {
    fn default() -> Self {
        Self {
            lat_deg: DEFAULT_REFERENCE_LAT,
            lon_deg: DEFAULT_REFERENCE_LON,
            distance_km: 100.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub mode_s: Endpoint,
    /// VDL2 is optional; Mode-S alone is a valid deployment
    #[serde(default)]
    pub vdl2: Option<Endpoint>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            mode_s: Endpoint {
                host: "localhost".to_string(),
                port: 30002,
            },
            vdl2: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutlierConfig {
    pub history_size: usize,
    pub min_samples: usize,
    pub n_neighbors: usize,
    pub deviation_threshold_c: f64,
    pub sigma_threshold: f64,
    pub tolerance_factor: f64,
}

impl Default for OutlierConfig {
    fn default() -> Self {
        Self {
            history_size: 30000,
            min_samples: 100,
            n_neighbors: 200,
            deviation_threshold_c: 20.0,
            sigma_threshold: 4.0,
            tolerance_factor: 2.5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReconnectConfig {
    pub base_delay_s: f64,
    pub factor: f64,
    pub max_delay_s: f64,
    pub max_retries: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base_delay_s: 1.0,
            factor: 2.0,
            max_delay_s: 60.0,
            max_retries: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChannelConfig {
    /// Ingest to assembler
    pub event_buffer: usize,
    /// Assembler to store
    pub observation_buffer: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            event_buffer: 1000,
            observation_buffer: 1000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LivenessConfig {
    pub mode_s: PathBuf,
    pub vdl2: PathBuf,
    pub store: PathBuf,
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            mode_s: PathBuf::from("data/liveness/mode_s"),
            vdl2: PathBuf::from("data/liveness/vdl2"),
            store: PathBuf::from("data/liveness/store"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlackConfig {
    pub bot_token: String,
    pub channel: String,
    #[serde(default = "default_slack_from")]
    pub from_name: String,
}

fn default_window_seconds() -> f64 {
    60.0
}

fn default_fragment_buf_size() -> usize {
    100
}

fn default_slack_from() -> String {
    "amdar-collector".to_string()
}

impl Settings {
    /// Load from `path` (optional file) layered with environment
    /// variables, e.g. `AMDAR__SOURCE__MODE_S__PORT=30002`.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }
        builder
            .add_source(config::Environment::with_prefix("AMDAR").separator("__"))
            .build()
            .context("failed to assemble configuration")?
            .try_deserialize()
            .context("invalid configuration")
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            reference: ReferenceConfig::default(),
            source: SourceConfig::default(),
            window_seconds: default_window_seconds(),
            fragment_buf_size: default_fragment_buf_size(),
            outlier: OutlierConfig::default(),
            reconnect: ReconnectConfig::default(),
            channels: ChannelConfig::default(),
            liveness: LivenessConfig::default(),
            database: None,
            slack: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert_eq!(s.window_seconds, 60.0);
        assert_eq!(s.fragment_buf_size, 100);
        assert_eq!(s.outlier.history_size, 30000);
        assert_eq!(s.outlier.min_samples, 100);
        assert_eq!(s.outlier.n_neighbors, 200);
        assert_eq!(s.reconnect.max_retries, 10);
        assert_eq!(s.reconnect.base_delay_s, 1.0);
        assert_eq!(s.reconnect.max_delay_s, 60.0);
        assert!((s.reference.lat_deg - 35.682677).abs() < 1e-9);
        assert!(s.database.is_none());
        assert!(s.slack.is_none());
    }
}
