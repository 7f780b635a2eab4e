//! Observation output records

use chrono::{DateTime, Utc};

use crate::physics::KNOTS_TO_MS;

/// How the weather values in an observation were obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObservationSource {
    /// Derived from a BDS-5,0 + BDS-6,0 register pair
    ModeSCalc,
    /// Direct MRAR readings (BDS-4,4)
    ModeSBds44,
    /// ACARS weather text received over VDL2
    Vdl2Acars,
}

impl ObservationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObservationSource::ModeSCalc => "mode_s_calc",
            ObservationSource::ModeSBds44 => "mode_s_bds44",
            ObservationSource::Vdl2Acars => "vdl2_acars",
        }
    }
}

impl std::fmt::Display for ObservationSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the altitude of an observation was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AltitudeSource {
    /// Directly from an ADS-B position message
    Adsb,
    /// Encoded in the ACARS weather text itself
    Acars,
    /// From an AVLC XID `ac_location` parameter
    Xid,
    /// Back-filled from a nearby position buffer entry
    Interpolated,
}

impl AltitudeSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            AltitudeSource::Adsb => "adsb",
            AltitudeSource::Acars => "acars",
            AltitudeSource::Xid => "xid",
            AltitudeSource::Interpolated => "interpolated",
        }
    }
}

impl std::fmt::Display for AltitudeSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Horizontal wind vector in SI units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindVector {
    /// Eastward component (m/s)
    pub east_ms: f64,
    /// Northward component (m/s)
    pub north_ms: f64,
    /// Compass bearing the wind blows from, clockwise from north
    pub direction_from_deg: f64,
    /// Magnitude (m/s)
    pub speed_ms: f64,
}

impl WindVector {
    /// Build from a meteorological (direction-from, speed) pair.
    /// A wind "from 270" blows eastward, hence the negated components.
    pub fn from_polar(direction_from_deg: f64, speed_ms: f64) -> Self {
        let rad = direction_from_deg.to_radians();
        Self {
            east_ms: -speed_ms * rad.sin(),
            north_ms: -speed_ms * rad.cos(),
            direction_from_deg,
            speed_ms,
        }
    }

    /// Same, from knots as reported in Comm-B and ACARS payloads.
    pub fn from_imperial(direction_from_deg: f64, speed_kt: f64) -> Self {
        Self::from_polar(direction_from_deg, speed_kt * KNOTS_TO_MS)
    }
}

/// A validated weather observation, immutable once emitted
#[derive(Debug, Clone)]
pub struct Observation {
    /// Receive time of the final fragment, not any time in the payload
    pub timestamp: DateTime<Utc>,
    pub source: ObservationSource,
    pub altitude_source: AltitudeSource,
    pub icao: Option<String>,
    pub callsign: Option<String>,
    pub altitude_m: f64,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Distance from the configured reference point, 0 if no position
    pub distance_km: f64,
    pub temperature_c: Option<f64>,
    pub wind: Option<WindVector>,
}

impl Observation {
    /// Storable observations carry an identity, at least one weather
    /// element, and a positive altitude.
    pub fn is_valid(&self) -> bool {
        let has_id = self.icao.as_deref().is_some_and(|s| !s.is_empty())
            || self.callsign.as_deref().is_some_and(|s| !s.is_empty());
        let has_weather = self.temperature_c.is_some() || self.wind.is_some();
        has_id && has_weather && self.altitude_m > 0.0
    }
}
