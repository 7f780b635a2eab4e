//! Comm-B register decoding (BDS 4,4 / 5,0 / 6,0)
//!
//! DF 20/21 replies do not name the register they carry. Identification is
//! heuristic: every field's status bit must be consistent with its data
//! bits, and the decoded values must pass range gates. Candidates are tried
//! MRAR-first; the first register that passes wins.

use super::ModeSMessage;

/// 56-bit MB field of a 14-octet Comm-B frame, bits indexed from 1
struct Mb<'a>(&'a [u8]);

impl Mb<'_> {
    fn bit(&self, i: u32) -> u32 {
        let i = i - 1;
        ((self.0[4 + (i / 8) as usize] >> (7 - i % 8)) & 1) as u32
    }

    fn bits(&self, start: u32, len: u32) -> u32 {
        let mut v = 0;
        for i in start..start + len {
            v = (v << 1) | self.bit(i);
        }
        v
    }

    fn all_zero(&self) -> bool {
        self.0[4..11].iter().all(|b| *b == 0)
    }

    /// A field whose status bit is clear must have all data bits clear too
    fn wrong_status(&self, status: u32, first: u32, last: u32) -> bool {
        self.bit(status) == 0 && self.bits(first, last - first + 1) != 0
    }
}

/// Identify and decode the weather-relevant registers of a DF 20/21 frame.
/// A register whose required field is flagged absent yields None (data gap).
pub fn decode(msg: &[u8], icao: &str) -> Option<ModeSMessage> {
    let mb = Mb(msg);
    if mb.all_zero() {
        return None;
    }

    if is_bds44(&mb) {
        let (wind_speed_kt, wind_direction_deg) = wind_44(&mb)?;
        return Some(ModeSMessage::Bds44 {
            icao: icao.to_string(),
            temperature_c: temperature_44(&mb),
            wind_speed_kt,
            wind_direction_deg,
        });
    }

    if is_bds50(&mb) {
        return Some(ModeSMessage::Bds50 {
            icao: icao.to_string(),
            track_deg: track_50(&mb)?,
            groundspeed_kt: groundspeed_50(&mb)?,
            tas_kt: tas_50(&mb)?,
        });
    }

    if is_bds60(&mb) {
        return Some(ModeSMessage::Bds60 {
            icao: icao.to_string(),
            heading_deg: heading_60(&mb)?,
            ias_kt: ias_60(&mb)?,
            mach: mach_60(&mb)?,
        });
    }

    None
}

// --- BDS 4,4 (meteorological routine air report) ---

fn is_bds44(mb: &Mb) -> bool {
    for (status, first, last) in [(5, 6, 23), (35, 36, 46), (47, 48, 49), (50, 51, 56)] {
        if mb.wrong_status(status, first, last) {
            return false;
        }
    }
    // Figure of merit
    if mb.bits(1, 4) > 4 {
        return false;
    }
    if let Some((speed, _)) = wind_44(mb) {
        if speed > 250.0 {
            return false;
        }
    }
    temperature_44(mb) != 0.0
}

/// Wind speed (kt) and direction (degrees), gated by the wind status bit
fn wind_44(mb: &Mb) -> Option<(f64, f64)> {
    if mb.bit(5) == 0 {
        return None;
    }
    let speed = mb.bits(6, 9) as f64;
    let direction = mb.bits(15, 9) as f64 * 180.0 / 256.0;
    Some((speed, direction))
}

/// Static air temperature in Celsius, 0.25 degree resolution
fn temperature_44(mb: &Mb) -> f64 {
    let sign = mb.bit(24);
    let mut value = mb.bits(25, 10) as i32;
    if sign == 1 {
        value -= 1024;
    }
    value as f64 * 0.25
}

// --- BDS 5,0 (track and turn report) ---

fn is_bds50(mb: &Mb) -> bool {
    for (status, first, last) in [(1, 3, 11), (12, 14, 23), (24, 25, 34), (35, 37, 45), (46, 47, 56)]
    {
        if mb.wrong_status(status, first, last) {
            return false;
        }
    }
    if let Some(roll) = roll_50(mb) {
        if roll.abs() > 50.0 {
            return false;
        }
    }
    let gs = groundspeed_50(mb);
    if let Some(gs) = gs {
        if gs > 600.0 {
            return false;
        }
    }
    let tas = tas_50(mb);
    if let Some(tas) = tas {
        if tas > 500.0 {
            return false;
        }
    }
    if let (Some(gs), Some(tas)) = (gs, tas) {
        if (tas - gs).abs() > 200.0 {
            return false;
        }
    }
    true
}

fn roll_50(mb: &Mb) -> Option<f64> {
    if mb.bit(1) == 0 {
        return None;
    }
    let mut value = mb.bits(3, 9) as i32;
    if mb.bit(2) == 1 {
        value -= 512;
    }
    Some(value as f64 * 45.0 / 256.0)
}

/// True track angle in degrees clockwise from north
fn track_50(mb: &Mb) -> Option<f64> {
    if mb.bit(12) == 0 {
        return None;
    }
    let mut value = mb.bits(14, 10) as i32;
    if mb.bit(13) == 1 {
        value -= 1024;
    }
    let mut angle = value as f64 * 90.0 / 512.0;
    if angle < 0.0 {
        angle += 360.0;
    }
    Some(angle)
}

fn groundspeed_50(mb: &Mb) -> Option<f64> {
    if mb.bit(24) == 0 {
        return None;
    }
    Some(mb.bits(25, 10) as f64 * 2.0)
}

fn tas_50(mb: &Mb) -> Option<f64> {
    if mb.bit(46) == 0 {
        return None;
    }
    Some(mb.bits(47, 10) as f64 * 2.0)
}

// --- BDS 6,0 (heading and speed report) ---

fn is_bds60(mb: &Mb) -> bool {
    for (status, first, last) in [(1, 2, 12), (13, 14, 23), (24, 25, 34), (35, 36, 45), (46, 47, 56)]
    {
        if mb.wrong_status(status, first, last) {
            return false;
        }
    }
    if let Some(ias) = ias_60(mb) {
        if ias > 500.0 {
            return false;
        }
    }
    if let Some(mach) = mach_60(mb) {
        if mach > 1.0 {
            return false;
        }
    }
    for vr in [vertical_rate_baro_60(mb), vertical_rate_ins_60(mb)] {
        if let Some(vr) = vr {
            if vr.abs() > 6000.0 {
                return false;
            }
        }
    }
    true
}

/// Magnetic heading in degrees
fn heading_60(mb: &Mb) -> Option<f64> {
    if mb.bit(1) == 0 {
        return None;
    }
    let mut value = mb.bits(3, 10) as i32;
    if mb.bit(2) == 1 {
        value -= 1024;
    }
    Some(value as f64 * 90.0 / 512.0)
}

fn ias_60(mb: &Mb) -> Option<f64> {
    if mb.bit(13) == 0 {
        return None;
    }
    Some(mb.bits(14, 10) as f64)
}

fn mach_60(mb: &Mb) -> Option<f64> {
    if mb.bit(24) == 0 {
        return None;
    }
    Some(mb.bits(25, 10) as f64 * 2.048 / 512.0)
}

fn vertical_rate_baro_60(mb: &Mb) -> Option<f64> {
    if mb.bit(35) == 0 {
        return None;
    }
    let mut value = mb.bits(37, 9) as i32;
    if mb.bit(36) == 1 {
        value -= 512;
    }
    Some(value as f64 * 32.0)
}

fn vertical_rate_ins_60(mb: &Mb) -> Option<f64> {
    if mb.bit(46) == 0 {
        return None;
    }
    let mut value = mb.bits(48, 9) as i32;
    if mb.bit(47) == 1 {
        value -= 512;
    }
    Some(value as f64 * 32.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mb_of(hex_msg: &str) -> Vec<u8> {
        hex::decode(hex_msg).unwrap()
    }

    #[test]
    fn test_bds50_fields() {
        let msg = mb_of("A000139381951536E024D4CCF6B5");
        let mb = Mb(&msg);
        assert!(is_bds50(&mb));
        assert!(!is_bds44(&mb));
        assert!(!is_bds60(&mb));

        assert!((roll_50(&mb).unwrap() - 2.109375).abs() < 1e-9);
        assert!((track_50(&mb).unwrap() - 114.2578125).abs() < 1e-9);
        assert_eq!(groundspeed_50(&mb).unwrap(), 438.0);
        assert_eq!(tas_50(&mb).unwrap(), 424.0);
    }

    #[test]
    fn test_bds60_fields() {
        let msg = mb_of("A00004128F39F91A7E27C46ADC21");
        let mb = Mb(&msg);
        assert!(is_bds60(&mb));
        assert!(!is_bds44(&mb));
        assert!(!is_bds50(&mb));

        assert!((heading_60(&mb).unwrap() - 42.71484375).abs() < 1e-9);
        assert_eq!(ias_60(&mb).unwrap(), 252.0);
        assert!((mach_60(&mb).unwrap() - 0.42).abs() < 1e-9);
        assert_eq!(vertical_rate_baro_60(&mb).unwrap(), -1920.0);
        assert_eq!(vertical_rate_ins_60(&mb).unwrap(), -1920.0);
    }

    #[test]
    fn test_bds44_fields() {
        // Synthetic MRAR: wind 40 kt from 225, temperature -33.25 C
        let msg = mb_of("A000000018A281DEC00000000000");
        let mb = Mb(&msg);
        assert!(is_bds44(&mb));
        assert!(!is_bds50(&mb));
        assert!(!is_bds60(&mb));

        let (speed, direction) = wind_44(&mb).unwrap();
        assert_eq!(speed, 40.0);
        assert_eq!(direction, 225.0);
        assert!((temperature_44(&mb) - (-33.25)).abs() < 1e-9);
    }

    #[test]
    fn test_decode_routes_by_register() {
        let msg = mb_of("A000139381951536E024D4CCF6B5");
        match decode(&msg, "001393").unwrap() {
            ModeSMessage::Bds50 {
                icao,
                track_deg,
                groundspeed_kt,
                tas_kt,
            } => {
                assert_eq!(icao, "001393");
                assert!((track_deg - 114.2578125).abs() < 1e-9);
                assert_eq!(groundspeed_kt, 438.0);
                assert_eq!(tas_kt, 424.0);
            }
            other => panic!("unexpected message: {:?}", other),
        }

        let msg = mb_of("A00004128F39F91A7E27C46ADC21");
        assert!(matches!(
            decode(&msg, "000412"),
            Some(ModeSMessage::Bds60 { .. })
        ));

        let msg = mb_of("A000000018A281DEC00000000000");
        match decode(&msg, "86D1A5").unwrap() {
            ModeSMessage::Bds44 {
                temperature_c,
                wind_speed_kt,
                wind_direction_deg,
                ..
            } => {
                assert!((temperature_c - (-33.25)).abs() < 1e-9);
                assert_eq!(wind_speed_kt, 40.0);
                assert_eq!(wind_direction_deg, 225.0);
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_decode_rejects_empty_mb() {
        let msg = mb_of("A0000000000000000000000000F5");
        assert!(decode(&msg, "000000").is_none());
    }

    #[test]
    fn test_wrong_status_detection() {
        let msg = mb_of("A000139381951536E024D4CCF6B5");
        let mb = Mb(&msg);
        // Roll status is set with non-zero data, so not a wrong status
        assert!(!mb.wrong_status(1, 3, 11));
    }
}
