//! Mode-S frame decoding
//!
//! Input is the AVR text framing of a dump1090-style decoder: lines of the
//! form `*<hex>;` or `@<hex>;`. DF 17/18 extended squitters carry identity
//! and position; DF 20/21 Comm-B replies carry the weather registers.

pub mod adsb;
pub mod commb;

/// Decoded content of a single Mode-S frame
#[derive(Debug, Clone, PartialEq)]
pub enum ModeSMessage {
    /// Airborne position (DF 17/18, typecode 5-18 or 20-22)
    Position {
        icao: String,
        altitude_ft: f64,
        latitude: Option<f64>,
        longitude: Option<f64>,
    },
    /// Aircraft identification (DF 17/18, typecode 1-4)
    Callsign { icao: String, callsign: String },
    /// MRAR, direct meteorology (DF 20/21)
    Bds44 {
        icao: String,
        temperature_c: f64,
        wind_speed_kt: f64,
        wind_direction_deg: f64,
    },
    /// Track and turn report (DF 20/21)
    Bds50 {
        icao: String,
        track_deg: f64,
        groundspeed_kt: f64,
        tas_kt: f64,
    },
    /// Heading and speed report (DF 20/21)
    Bds60 {
        icao: String,
        heading_deg: f64,
        ias_kt: f64,
        mach: f64,
    },
}

impl ModeSMessage {
    pub fn icao(&self) -> &str {
        match self {
            ModeSMessage::Position { icao, .. }
            | ModeSMessage::Callsign { icao, .. }
            | ModeSMessage::Bds44 { icao, .. }
            | ModeSMessage::Bds50 { icao, .. }
            | ModeSMessage::Bds60 { icao, .. } => icao,
        }
    }
}

/// Strip AVR framing and return the raw frame bytes.
/// Payloads shorter than 22 nibbles carry nothing we consume.
pub fn parse_avr_line(line: &str) -> Option<Vec<u8>> {
    let line = line.trim();
    if line.len() < 2 {
        return None;
    }
    let body = match line.as_bytes()[0] {
        b'*' | b'@' => &line[1..],
        _ => return None,
    };
    let payload = body.strip_suffix(';')?;
    if payload.len() < 22 {
        return None;
    }
    hex::decode(payload).ok()
}

/// Decode a raw frame into a message, using the configured reference for
/// locally-referenced CPR position decoding. Returns None when the frame
/// carries nothing of interest or fails field validation.
pub fn decode(msg: &[u8], ref_lat: f64, ref_lon: f64) -> Option<ModeSMessage> {
    if msg.len() != 14 {
        return None;
    }

    let df = msg[0] >> 3;
    let icao = format!("{:02X}{:02X}{:02X}", msg[1], msg[2], msg[3]);

    match df {
        17 | 18 => {
            let tc = (msg[4] >> 3) & 0x1F;
            match tc {
                1..=4 => {
                    let callsign = adsb::decode_callsign(msg);
                    if callsign.is_empty() {
                        return None;
                    }
                    Some(ModeSMessage::Callsign { icao, callsign })
                }
                5..=18 | 20..=22 => {
                    // Altitude zero or non-Q-bit encodings are "no altitude"
                    let altitude_ft = adsb::decode_altitude_ft(msg)?;
                    let position = adsb::position_with_ref(msg, ref_lat, ref_lon);
                    Some(ModeSMessage::Position {
                        icao,
                        altitude_ft: altitude_ft as f64,
                        latitude: position.map(|p| p.0),
                        longitude: position.map(|p| p.1),
                    })
                }
                _ => None,
            }
        }
        20 | 21 => commb::decode(msg, &icao),
        _ => None,
    }
}
