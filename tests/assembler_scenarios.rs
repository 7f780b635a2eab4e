//! End-to-end pipeline scenarios through the public API

use chrono::{DateTime, TimeZone, Utc};

use amdar_collector::assembler::{Assembler, Event};
use amdar_collector::config::Settings;
use amdar_collector::modes::ModeSMessage;
use amdar_collector::types::{AltitudeSource, ObservationSource};
use amdar_collector::vdl2::Vdl2Line;

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

fn mode_s(message: ModeSMessage, secs: i64) -> Event {
    Event::ModeS {
        message,
        received_at: at(secs),
    }
}

#[test]
fn derived_pair_produces_calculated_weather() {
    let mut assembler = Assembler::new(&Settings::default());

    assembler.process(mode_s(
        ModeSMessage::Position {
            icao: "84C27A".to_string(),
            altitude_ft: 35000.0,
            latitude: Some(35.7),
            longitude: Some(139.8),
        },
        0,
    ));
    assembler.process(mode_s(
        ModeSMessage::Callsign {
            icao: "84C27A".to_string(),
            callsign: "JAL123".to_string(),
        },
        1,
    ));
    assembler.process(mode_s(
        ModeSMessage::Bds50 {
            icao: "84C27A".to_string(),
            track_deg: 90.0,
            groundspeed_kt: 500.0,
            tas_kt: 480.0,
        },
        2,
    ));
    let obs = assembler
        .process(mode_s(
            ModeSMessage::Bds60 {
                icao: "84C27A".to_string(),
                heading_deg: 88.0,
                ias_kt: 250.0,
                mach: 0.82,
            },
            3,
        ))
        .expect("complete pair must emit");

    assert_eq!(obs.source, ObservationSource::ModeSCalc);
    assert_eq!(obs.altitude_source, AltitudeSource::Adsb);
    assert_eq!(obs.callsign.as_deref(), Some("JAL123"));
    assert!((obs.altitude_m - 10668.0).abs() < 0.01);
    assert!((obs.temperature_c.unwrap() - (-47.9714)).abs() < 0.01);

    let wind = obs.wind.expect("position present, wind derivable");
    assert!((wind.east_ms - 13.7444).abs() < 0.001);
    assert!((wind.north_ms - (-41.1657)).abs() < 0.001);
    assert!((wind.direction_from_deg - 341.5369).abs() < 0.001);
    assert!((wind.speed_ms - 43.3996).abs() < 0.001);
}

#[test]
fn acars_position_report_decodes_end_to_end() {
    let mut assembler = Assembler::new(&Settings::default());

    let line = r#"{"vdl2":{"avlc":{"src":{"addr":"84c27a"},"acars":{"flight":"JL123","reg":"JA824J","msg_text":"WN35123E136555014610P24008M33260081027720"}}}}"#;
    let parsed = Vdl2Line::parse(line).expect("valid dumpvdl2 json");
    let obs = assembler
        .process(Event::Vdl2Weather {
            icao: parsed.icao(),
            callsign: parsed.flight().map(str::to_string),
            weather: parsed.weather().expect("WN format"),
            received_at: at(0),
        })
        .expect("self-contained report must emit");

    assert_eq!(obs.source, ObservationSource::Vdl2Acars);
    assert_eq!(obs.altitude_source, AltitudeSource::Acars);
    assert_eq!(obs.icao.as_deref(), Some("84C27A"));
    assert_eq!(obs.callsign.as_deref(), Some("JL123"));
    assert!((obs.altitude_m - 7317.64).abs() < 0.01);
    assert_eq!(obs.temperature_c, Some(-33.0));
    let wind = obs.wind.unwrap();
    assert_eq!(wind.direction_from_deg, 260.0);
    assert!((wind.speed_ms - 81.0 * 0.514444).abs() < 1e-6);
    // A few hundred km out; the distance is recorded, never used to reject
    assert!(obs.distance_km > 100.0);
}

#[test]
fn acars_without_altitude_borrows_from_adsb() {
    let mut assembler = Assembler::new(&Settings::default());

    assembler.process(mode_s(
        ModeSMessage::Callsign {
            icao: "84C27A".to_string(),
            callsign: "JAL123".to_string(),
        },
        0,
    ));
    assembler.process(mode_s(
        ModeSMessage::Position {
            icao: "84C27A".to_string(),
            altitude_ft: 32808.4,
            latitude: Some(35.7),
            longitude: Some(139.8),
        },
        0,
    ));

    // Twenty seconds later a weather report names only the flight
    let obs = assembler
        .process(Event::Vdl2Weather {
            icao: None,
            callsign: Some("JAL123".to_string()),
            weather: amdar_collector::vdl2::acars::AcarsWeather {
                temperature_c: Some(-25.0),
                ..Default::default()
            },
            received_at: at(20),
        })
        .expect("backfilled altitude must emit");

    assert_eq!(obs.source, ObservationSource::Vdl2Acars);
    assert_eq!(obs.altitude_source, AltitudeSource::Interpolated);
    assert!((obs.altitude_m - 10000.0).abs() < 0.01);
    assert_eq!(obs.temperature_c, Some(-25.0));
}

#[test]
fn mrar_takes_priority_over_derived_pair() {
    let mut assembler = Assembler::new(&Settings::default());
    for event in [
        mode_s(
            ModeSMessage::Position {
                icao: "84C27A".to_string(),
                altitude_ft: 35000.0,
                latitude: Some(35.7),
                longitude: Some(139.8),
            },
            0,
        ),
        mode_s(
            ModeSMessage::Callsign {
                icao: "84C27A".to_string(),
                callsign: "JAL123".to_string(),
            },
            1,
        ),
        mode_s(
            ModeSMessage::Bds50 {
                icao: "84C27A".to_string(),
                track_deg: 90.0,
                groundspeed_kt: 500.0,
                tas_kt: 480.0,
            },
            2,
        ),
        mode_s(
            ModeSMessage::Bds60 {
                icao: "84C27A".to_string(),
                heading_deg: 88.0,
                ias_kt: 250.0,
                mach: 0.82,
            },
            3,
        ),
    ] {
        // The pair completes on the 6,0 and emits a calculated observation
        let _ = assembler.process(event);
    }

    // Refill the pair, then let MRAR arrive before the next 6,0
    assembler.process(mode_s(
        ModeSMessage::Bds50 {
            icao: "84C27A".to_string(),
            track_deg: 90.0,
            groundspeed_kt: 500.0,
            tas_kt: 480.0,
        },
        4,
    ));
    let obs = assembler
        .process(mode_s(
            ModeSMessage::Bds44 {
                icao: "84C27A".to_string(),
                temperature_c: -48.0,
                wind_speed_kt: 40.0,
                wind_direction_deg: 270.0,
            },
            5,
        ))
        .expect("MRAR completes immediately");
    assert_eq!(obs.source, ObservationSource::ModeSBds44);
    assert_eq!(obs.temperature_c, Some(-48.0));
}

#[test]
fn outlier_rejected_after_history_builds() {
    let mut assembler = Assembler::new(&Settings::default());
    assembler.seed_outlier((0..150).map(|i| {
        let alt = i as f64 * 80.0;
        (alt, 15.0 - 0.0065 * alt)
    }));

    let result = assembler.process(Event::Vdl2Weather {
        icao: Some("84C27A".to_string()),
        callsign: None,
        weather: amdar_collector::vdl2::acars::AcarsWeather {
            altitude_ft: Some(32808.4),
            temperature_c: Some(30.0),
            ..Default::default()
        },
        received_at: at(0),
    });
    assert!(result.is_none(), "+30 C at 10 km must be rejected");

    // A plausible temperature at the same altitude still passes
    let obs = assembler.process(Event::Vdl2Weather {
        icao: Some("84C27A".to_string()),
        callsign: None,
        weather: amdar_collector::vdl2::acars::AcarsWeather {
            altitude_ft: Some(32808.4),
            temperature_c: Some(-50.0),
            ..Default::default()
        },
        received_at: at(1),
    });
    assert!(obs.is_some());
}

#[test]
fn weatherless_text_never_emits() {
    let mut assembler = Assembler::new(&Settings::default());
    let parsed = Vdl2Line::parse(
        r#"{"vdl2":{"avlc":{"src":{"addr":"84c27a"},"acars":{"flight":"NH006","msg_text":"CLIMBING TO FL380"}}}}"#,
    )
    .unwrap();

    // FL-only content has an altitude but no weather element
    if let Some(weather) = parsed.weather() {
        let result = assembler.process(Event::Vdl2Weather {
            icao: parsed.icao(),
            callsign: parsed.flight().map(str::to_string),
            weather,
            received_at: at(0),
        });
        assert!(result.is_none());
    }
}
