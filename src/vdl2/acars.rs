//! ACARS weather text formats
//!
//! Airlines encode position reports with embedded weather in several
//! regional free-text formats. Parsers are tried in order, most specific
//! first; the first match wins. The formats are genuinely ambiguous, so
//! they stay separate rather than merged into one expression.

use regex::Regex;
use std::sync::OnceLock;

/// Weather fields extracted from one ACARS text block
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AcarsWeather {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude_ft: Option<f64>,
    pub temperature_c: Option<f64>,
    pub wind_direction_deg: Option<f64>,
    pub wind_speed_kt: Option<f64>,
}

impl AcarsWeather {
    pub fn has_weather(&self) -> bool {
        self.temperature_c.is_some()
            || (self.wind_direction_deg.is_some() && self.wind_speed_kt.is_some())
    }
}

/// Try every known format in order
pub fn parse_weather(text: &str) -> Option<AcarsWeather> {
    for parser in [parse_wn, parse_pntaf, parse_wx, parse_fl] {
        if let Some(weather) = parser(text) {
            return Some(weather);
        }
    }
    None
}

fn regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("static regex"))
}

/// WN position report:
/// `WN<lat5><E|W><lon5-6><time6>[P]<alt5><M|P|-><temp2><wdir3><wspd2-3>`
///
/// Examples:
///   WN35050E13655100384918002-24291044005200
///   WN35123E136555014610P24008M33260081027720
///   WN34514E13729000390739998-48258119 54770 (spaced wind speed)
fn parse_wn(text: &str) -> Option<AcarsWeather> {
    static CONTINUOUS: OnceLock<Regex> = OnceLock::new();
    static SPACED: OnceLock<Regex> = OnceLock::new();

    let line = text.split("\r\n").find(|l| l.contains("WN"))?;

    let continuous = regex(
        &CONTINUOUS,
        r"WN(\d{5})([EW])(\d{5,6})\d{6}P?(\d{5})([MP-])(\d{2})(\d{3})(\d{2,3})",
    );
    let spaced = regex(
        &SPACED,
        r"WN(\d{5})([EW])(\d{5,6})\d{6}P?(\d{5})([MP-])(\d{2})(\d{3})\s+(\d{2,3})",
    );

    let captures = continuous.captures(line).or_else(|| spaced.captures(line))?;

    let lat_raw = &captures[1];
    let latitude = parse_fixed_point(lat_raw, 2)?;

    let lon_raw = &captures[3];
    // Five digits encode degrees and minutes, six are plain decimal
    let mut longitude = if lon_raw.len() == 5 {
        lon_raw[..3].parse::<f64>().ok()? + lon_raw[3..].parse::<f64>().ok()? / 60.0
    } else {
        parse_fixed_point(lon_raw, 3)?
    };
    if &captures[2] == "W" {
        longitude = -longitude;
    }

    Some(AcarsWeather {
        latitude: Some(latitude),
        longitude: Some(longitude),
        altitude_ft: Some(captures[4].parse().ok()?),
        temperature_c: Some(parse_signed_temp(&captures[5], &captures[6])?),
        wind_direction_deg: Some(captures[7].parse().ok()?),
        wind_speed_kt: Some(captures[8].parse().ok()?),
    })
}

/// PNTAF position report:
/// `<N|S><lat5><E|W><lon6><time6><alt3><M|P|-><temp2><wdir3><wspd2-3>`
///
/// The three-digit field is a flight level only in the continuous variant,
/// and only when it falls in the plausible FL100-FL500 band.
fn parse_pntaf(text: &str) -> Option<AcarsWeather> {
    static SPACED: OnceLock<Regex> = OnceLock::new();
    static CONTINUOUS: OnceLock<Regex> = OnceLock::new();

    let spaced = regex(
        &SPACED,
        r"([NS])(\d{5})([EW])(\d{6})\d{6}(\d{3})([MP-])(\d{2})(\d{3})\s+(\d{2})",
    );
    let continuous = regex(
        &CONTINUOUS,
        r"([NS])(\d{5})([EW])(\d{6})\d{6}(\d{3})([MP])(\d{2})(\d{3})(\d{2,3})",
    );

    let (captures, is_continuous) = match spaced.captures(text) {
        Some(c) => (c, false),
        None => (continuous.captures(text)?, true),
    };

    let mut latitude = parse_fixed_point(&captures[2], 2)?;
    if &captures[1] == "S" {
        latitude = -latitude;
    }
    let mut longitude = parse_fixed_point(&captures[4], 3)?;
    if &captures[3] == "W" {
        longitude = -longitude;
    }

    let altitude_ft = if is_continuous {
        let fl: f64 = captures[5].parse().ok()?;
        (100.0..=500.0).contains(&fl).then_some(fl * 100.0)
    } else {
        None
    };

    Some(AcarsWeather {
        latitude: Some(latitude),
        longitude: Some(longitude),
        altitude_ft,
        temperature_c: Some(parse_signed_temp(&captures[6], &captures[7])?),
        wind_direction_deg: Some(captures[8].parse().ok()?),
        wind_speed_kt: Some(captures[9].parse().ok()?),
    })
}

/// WX report: `/WX ... <N|S><lat5><E|W><lon6> ... <M|P><temp2> ... CRS <alt5>`
///
/// Only altitude and temperature are taken. The wind block of this format
/// is ambiguous with a Mach group and is deliberately ignored.
fn parse_wx(text: &str) -> Option<AcarsWeather> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();

    if !text.contains("/WX") {
        return None;
    }

    let pattern = regex(
        &PATTERN,
        r"(?s)([NS])(\d{5})([EW])(\d{6}).*?([MP])(\d{2}).*?CRS\s+(\d{5})",
    );
    let captures = pattern.captures(text)?;

    let mut latitude = parse_fixed_point(&captures[2], 2)?;
    if &captures[1] == "S" {
        latitude = -latitude;
    }
    let mut longitude = parse_fixed_point(&captures[4], 3)?;
    if &captures[3] == "W" {
        longitude = -longitude;
    }

    Some(AcarsWeather {
        latitude: Some(latitude),
        longitude: Some(longitude),
        altitude_ft: Some(captures[7].parse().ok()?),
        temperature_c: Some(parse_signed_temp(&captures[5], &captures[6])?),
        wind_direction_deg: None,
        wind_speed_kt: None,
    })
}

/// Bare flight level, optionally followed by a temperature:
/// `FL350 M45` or `FL350/-45`
fn parse_fl(text: &str) -> Option<AcarsWeather> {
    static LEVEL: OnceLock<Regex> = OnceLock::new();
    static TEMP: OnceLock<Regex> = OnceLock::new();

    let level = regex(&LEVEL, r"FL(\d{3})");
    let captures = level.captures(text)?;
    let altitude_ft = captures[1].parse::<f64>().ok()? * 100.0;

    let temp = regex(&TEMP, r"FL\d{3}\s*[/\s]?\s*([MP-])(\d{2})");
    let temperature_c = temp
        .captures(text)
        .and_then(|c| parse_signed_temp(&c[1], &c[2]));

    Some(AcarsWeather {
        altitude_ft: Some(altitude_ft),
        temperature_c,
        ..AcarsWeather::default()
    })
}

/// `35123` with 2 integer digits becomes 35.123
fn parse_fixed_point(digits: &str, int_len: usize) -> Option<f64> {
    let int_part: f64 = digits[..int_len].parse().ok()?;
    let frac_part: f64 = digits[int_len..].parse().ok()?;
    Some(int_part + frac_part / 1000.0)
}

fn parse_signed_temp(sign: &str, value: &str) -> Option<f64> {
    let value: f64 = value.parse().ok()?;
    Some(match sign {
        "M" | "-" => -value,
        _ => value,
    })
}
