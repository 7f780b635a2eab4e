//! Flight physics: static air temperature and wind derivation
//!
//! Pure functions over SI units. Imperial inputs (ft, kt) are converted at
//! the boundary with the constants below.

use crate::types::WindVector;

pub const FEET_TO_METERS: f64 = 0.3048;
pub const KNOTS_TO_MS: f64 = 0.514444;

/// Heat capacity ratio of air
const GAMMA_AIR: f64 = 1.403;
/// Molar mass of dry air (kg/mol)
const MOLAR_MASS_AIR: f64 = 28.966e-3;
/// Universal gas constant (J/(mol K))
const GAS_CONSTANT: f64 = 8.314472;

const KELVIN_OFFSET: f64 = 273.15;

/// Static air temperature in Celsius from true airspeed (m/s) and Mach
/// number. The speed of sound v/M fixes the temperature through
/// a^2 = gamma R T / M_air. Returns None for non-positive Mach.
pub fn static_air_temperature(tas_ms: f64, mach: f64) -> Option<f64> {
    if mach <= 0.0 {
        return None;
    }
    let sound_speed = tas_ms / mach;
    let kelvin = sound_speed * sound_speed * MOLAR_MASS_AIR / (GAMMA_AIR * GAS_CONSTANT);
    Some(kelvin - KELVIN_OFFSET)
}

/// Magnetic declination in degrees, polynomial fit for the Japan region
/// (2020 epoch). Positive means magnetic north lies west of true north.
pub fn magnetic_declination(lat: f64, lon: f64) -> f64 {
    let dlat = lat - 37.0;
    let dlon = lon - 138.0;
    (8.0 + 15.822 / 60.0)
        + (18.462 / 60.0) * dlat
        - (7.726 / 60.0) * dlon
        + (0.007 / 60.0) * dlat * dlat
        + (0.007 / 60.0) * dlat * dlon
        - (0.655 / 60.0) * dlon * dlon
}

/// Wind vector from the ground velocity (true track, ground speed) and the
/// air velocity (magnetic heading, true airspeed). The heading is rotated
/// to true north by the local declination before the vectors are
/// subtracted. Speeds in m/s, angles in degrees.
pub fn derive_wind(
    track_deg: f64,
    groundspeed_ms: f64,
    heading_deg: f64,
    tas_ms: f64,
    lat: f64,
    lon: f64,
) -> WindVector {
    use std::f64::consts::{FRAC_PI_2, PI, TAU};

    let declination = magnetic_declination(lat, lon);

    let track_rad = track_deg.to_radians();
    let heading_rad = (heading_deg - declination).to_radians();

    let ground_east = groundspeed_ms * track_rad.sin();
    let ground_north = groundspeed_ms * track_rad.cos();
    let air_east = tas_ms * heading_rad.sin();
    let air_north = tas_ms * heading_rad.cos();

    let east_ms = ground_east - air_east;
    let north_ms = ground_north - air_north;

    let speed_ms = (east_ms * east_ms + north_ms * north_ms).sqrt();
    // Bearing the wind comes from: math angle to compass, plus half a turn
    let direction_from_deg = (FRAC_PI_2 - north_ms.atan2(east_ms) + PI)
        .rem_euclid(TAU)
        .to_degrees();

    WindVector {
        east_ms,
        north_ms,
        direction_from_deg,
        speed_ms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_air_temperature() {
        // Cruise: 480 kt TAS at Mach 0.82
        let tas_ms = 480.0 * KNOTS_TO_MS;
        let temp = static_air_temperature(tas_ms, 0.82).unwrap();
        assert!((temp - (-47.9714)).abs() < 0.01);
    }

    #[test]
    fn test_static_air_temperature_sea_level() {
        // Speed of sound at 15 C is about 340 m/s
        let temp = static_air_temperature(340.3, 1.0).unwrap();
        assert!((temp - 15.0).abs() < 1.0);
    }

    #[test]
    fn test_static_air_temperature_invalid_mach() {
        assert!(static_air_temperature(200.0, 0.0).is_none());
        assert!(static_air_temperature(200.0, -0.5).is_none());
    }

    #[test]
    fn test_magnetic_declination_tokyo() {
        let d = magnetic_declination(35.7, 139.8);
        assert!((d - 7.59646).abs() < 0.001);
    }

    #[test]
    fn test_magnetic_declination_reference_point() {
        // At the fit origin only the constant term remains
        let d = magnetic_declination(37.0, 138.0);
        assert!((d - (8.0 + 15.822 / 60.0)).abs() < 1e-9);
    }

    #[test]
    fn test_derive_wind() {
        // Track 90 at 500 kt ground, heading 88 at 480 kt air, near Tokyo
        let w = derive_wind(
            90.0,
            500.0 * KNOTS_TO_MS,
            88.0,
            480.0 * KNOTS_TO_MS,
            35.7,
            139.8,
        );
        assert!((w.east_ms - 13.7444).abs() < 0.001);
        assert!((w.north_ms - (-41.1657)).abs() < 0.001);
        assert!((w.direction_from_deg - 341.5369).abs() < 0.001);
        assert!((w.speed_ms - 43.3996).abs() < 0.001);
    }

    #[test]
    fn test_derive_wind_no_wind() {
        // Identical ground and air vectors leave no wind; use a heading
        // that cancels the declination so the vectors align exactly.
        let decl = magnetic_declination(35.7, 139.8);
        let w = derive_wind(90.0, 250.0, 90.0 + decl, 250.0, 35.7, 139.8);
        assert!(w.speed_ms < 1e-9);
    }
}
