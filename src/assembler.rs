//! Observation assembly
//!
//! The assembler owns all mutable pipeline state: the fragment store, the
//! position buffer and the outlier filter. Ingest tasks feed it decoded
//! events over a channel; it emits validated observations or nothing.

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::fragment::{
    Bds44Fragment, Bds50Fragment, Bds60Fragment, CompleteFragment, FragmentStore,
    PositionFragment,
};
use crate::geo;
use crate::modes::ModeSMessage;
use crate::outlier::OutlierFilter;
use crate::physics::{self, FEET_TO_METERS, KNOTS_TO_MS};
use crate::position::{PositionBuffer, PositionOrigin};
use crate::types::{AltitudeSource, Observation, ObservationSource, WindVector};
use crate::vdl2::{acars::AcarsWeather, XidLocation};

/// Temperatures below this are treated as decoder garbage
const MIN_PLAUSIBLE_TEMP_C: f64 = -100.0;

/// One decoded input, tagged with its receive time
#[derive(Debug, Clone)]
pub enum Event {
    ModeS {
        message: ModeSMessage,
        received_at: DateTime<Utc>,
    },
    Vdl2Weather {
        icao: Option<String>,
        callsign: Option<String>,
        weather: AcarsWeather,
        received_at: DateTime<Utc>,
    },
    Vdl2Xid {
        icao: String,
        location: XidLocation,
        received_at: DateTime<Utc>,
    },
}

pub struct Assembler {
    fragments: FragmentStore,
    positions: PositionBuffer,
    outlier: OutlierFilter,
    reference_lat: f64,
    reference_lon: f64,
}

impl Assembler {
    pub fn new(settings: &Settings) -> Self {
        Self {
            fragments: FragmentStore::new(settings.fragment_buf_size),
            positions: PositionBuffer::new(settings.window_seconds),
            outlier: OutlierFilter::new(&settings.outlier),
            reference_lat: settings.reference.lat_deg,
            reference_lon: settings.reference.lon_deg,
        }
    }

    /// Pre-load the outlier history, typically from recent stored rows.
    pub fn seed_outlier<I: IntoIterator<Item = (f64, f64)>>(&mut self, pairs: I) {
        self.outlier.seed(pairs);
    }

    /// Handle one event; most events return nothing.
    pub fn process(&mut self, event: Event) -> Option<Observation> {
        match event {
            Event::ModeS {
                message,
                received_at,
            } => self.process_mode_s(message, received_at),
            Event::Vdl2Weather {
                icao,
                callsign,
                weather,
                received_at,
            } => self.process_vdl2_weather(icao, callsign, weather, received_at),
            Event::Vdl2Xid {
                icao,
                location,
                received_at,
            } => {
                let now = epoch_seconds(received_at);
                self.positions.update_time(now);
                self.positions.add_position(
                    &icao,
                    None,
                    now,
                    location.altitude_ft * FEET_TO_METERS,
                    location.latitude,
                    location.longitude,
                    PositionOrigin::Xid,
                );
                None
            }
        }
    }

    /// Drain the event channel until it closes, forwarding observations.
    pub async fn run(
        mut self,
        mut events: mpsc::Receiver<Event>,
        observations: mpsc::Sender<Observation>,
    ) {
        while let Some(event) = events.recv().await {
            if let Some(obs) = self.process(event) {
                info!(
                    "observation: {} {} alt {:.0} m temp {:?} C wind {:?} m/s ({}/{})",
                    obs.icao.as_deref().unwrap_or("-"),
                    obs.callsign.as_deref().unwrap_or("-"),
                    obs.altitude_m,
                    obs.temperature_c,
                    obs.wind.map(|w| w.speed_ms),
                    obs.source,
                    obs.altitude_source,
                );
                if observations.send(obs).await.is_err() {
                    warn!("observation channel closed, stopping assembler");
                    return;
                }
            }
        }
        info!("event channel closed, assembler stopped");
    }

    fn process_mode_s(
        &mut self,
        message: ModeSMessage,
        received_at: DateTime<Utc>,
    ) -> Option<Observation> {
        let now = epoch_seconds(received_at);
        self.positions.update_time(now);
        let icao = message.icao().to_string();

        match message {
            ModeSMessage::Position {
                altitude_ft,
                latitude,
                longitude,
                ..
            } => {
                self.fragments.update_position(
                    &icao,
                    PositionFragment {
                        altitude_ft,
                        latitude,
                        longitude,
                    },
                );
                let callsign = self.fragments.callsign(&icao).map(str::to_string);
                self.positions.add_position(
                    &icao,
                    callsign.as_deref(),
                    now,
                    altitude_ft * FEET_TO_METERS,
                    latitude,
                    longitude,
                    PositionOrigin::Adsb,
                );
            }
            ModeSMessage::Callsign { callsign, .. } => {
                self.fragments.update_callsign(&icao, &callsign);
                // Re-feed the buffer so callsign lookups resolve before the
                // next position frame arrives
                if let Some(position) =
                    self.fragments.get(&icao).and_then(|slot| slot.position)
                {
                    self.positions.add_position(
                        &icao,
                        Some(&callsign),
                        now,
                        position.altitude_ft * FEET_TO_METERS,
                        position.latitude,
                        position.longitude,
                        PositionOrigin::Adsb,
                    );
                }
            }
            ModeSMessage::Bds44 {
                temperature_c,
                wind_speed_kt,
                wind_direction_deg,
                ..
            } => {
                self.fragments.update_bds44(
                    &icao,
                    Bds44Fragment {
                        temperature_c,
                        wind_speed_kt,
                        wind_direction_deg,
                    },
                );
            }
            ModeSMessage::Bds50 {
                track_deg,
                groundspeed_kt,
                tas_kt,
                ..
            } => {
                self.fragments.update_bds50(
                    &icao,
                    Bds50Fragment {
                        track_deg,
                        groundspeed_kt,
                        tas_kt,
                    },
                );
            }
            ModeSMessage::Bds60 {
                heading_deg,
                ias_kt,
                mach,
                ..
            } => {
                self.fragments.update_bds60(
                    &icao,
                    Bds60Fragment {
                        heading_deg,
                        ias_kt,
                        mach,
                    },
                );
            }
        }

        self.emit_mode_s(&icao, received_at)
    }

    fn emit_mode_s(&mut self, icao: &str, received_at: DateTime<Utc>) -> Option<Observation> {
        match self.fragments.take_complete(icao)? {
            CompleteFragment::Mrar {
                callsign,
                position,
                bds44,
            } => {
                // A tuple without a fix has no distance; drop it whole
                let (Some(latitude), Some(longitude)) = (position.latitude, position.longitude)
                else {
                    debug!("{}: MRAR tuple without lat/lon, dropped", icao);
                    return None;
                };
                if bds44.temperature_c < MIN_PLAUSIBLE_TEMP_C {
                    debug!("{}: implausible MRAR temperature, dropped", icao);
                    return None;
                }
                let wind =
                    WindVector::from_imperial(bds44.wind_direction_deg, bds44.wind_speed_kt);
                self.finish(
                    ObservationSource::ModeSBds44,
                    AltitudeSource::Adsb,
                    Some(icao.to_string()),
                    Some(callsign),
                    position.altitude_ft * FEET_TO_METERS,
                    Some(latitude),
                    Some(longitude),
                    Some(bds44.temperature_c),
                    Some(wind),
                    received_at,
                )
            }
            CompleteFragment::Derived {
                callsign,
                position,
                bds50,
                bds60,
            } => {
                let (Some(latitude), Some(longitude)) = (position.latitude, position.longitude)
                else {
                    debug!("{}: derived tuple without lat/lon, dropped", icao);
                    return None;
                };
                let tas_ms = bds50.tas_kt * KNOTS_TO_MS;
                let temperature = physics::static_air_temperature(tas_ms, bds60.mach)?;
                if temperature < MIN_PLAUSIBLE_TEMP_C {
                    debug!(
                        "{}: implausible derived temperature {:.0} C, dropped",
                        icao, temperature
                    );
                    return None;
                }
                let wind = physics::derive_wind(
                    bds50.track_deg,
                    bds50.groundspeed_kt * KNOTS_TO_MS,
                    bds60.heading_deg,
                    tas_ms,
                    latitude,
                    longitude,
                );
                self.finish(
                    ObservationSource::ModeSCalc,
                    AltitudeSource::Adsb,
                    Some(icao.to_string()),
                    Some(callsign),
                    position.altitude_ft * FEET_TO_METERS,
                    Some(latitude),
                    Some(longitude),
                    Some(temperature),
                    Some(wind),
                    received_at,
                )
            }
        }
    }

    fn process_vdl2_weather(
        &mut self,
        icao: Option<String>,
        callsign: Option<String>,
        weather: AcarsWeather,
        received_at: DateTime<Utc>,
    ) -> Option<Observation> {
        let now = epoch_seconds(received_at);
        self.positions.update_time(now);

        if !weather.has_weather() {
            return None;
        }
        if weather
            .temperature_c
            .is_some_and(|t| t < MIN_PLAUSIBLE_TEMP_C)
        {
            debug!("implausible ACARS temperature, dropped");
            return None;
        }

        // A zero or negative encoded altitude counts as missing
        let (altitude_m, altitude_source, latitude, longitude) =
            match weather.altitude_ft {
                Some(altitude_ft) if altitude_ft > 0.0 => (
                    altitude_ft * FEET_TO_METERS,
                    AltitudeSource::Acars,
                    weather.latitude,
                    weather.longitude,
                ),
                _ => {
                    // Back-fill the altitude from buffered position reports
                    let lookup = icao
                        .as_deref()
                        .and_then(|i| self.positions.lookup_by_time(i, now))
                        .or_else(|| {
                            callsign
                                .as_deref()
                                .and_then(|c| self.positions.lookup_by_time(c, now))
                        });
                    let Some(lookup) = lookup else {
                        debug!(
                            "no buffered position for {}/{}, weather dropped",
                            icao.as_deref().unwrap_or("-"),
                            callsign.as_deref().unwrap_or("-"),
                        );
                        return None;
                    };
                    (
                        lookup.altitude_m,
                        lookup.source,
                        weather.latitude.or(lookup.latitude),
                        weather.longitude.or(lookup.longitude),
                    )
                }
            };

        let wind = match (weather.wind_direction_deg, weather.wind_speed_kt) {
            (Some(direction), Some(speed)) => Some(WindVector::from_imperial(direction, speed)),
            _ => None,
        };

        self.finish(
            ObservationSource::Vdl2Acars,
            altitude_source,
            icao,
            callsign,
            altitude_m,
            latitude,
            longitude,
            weather.temperature_c,
            wind,
            received_at,
        )
    }

    /// Shared tail of every emission path: distance annotation, outlier
    /// check, validity check, then history update.
    #[allow(clippy::too_many_arguments)]
    fn finish(
        &mut self,
        source: ObservationSource,
        altitude_source: AltitudeSource,
        icao: Option<String>,
        callsign: Option<String>,
        altitude_m: f64,
        latitude: Option<f64>,
        longitude: Option<f64>,
        temperature_c: Option<f64>,
        wind: Option<WindVector>,
        received_at: DateTime<Utc>,
    ) -> Option<Observation> {
        // Distance is recorded, never filtered on; consumers select by it
        let distance_km = match (latitude, longitude) {
            (Some(lat), Some(lon)) => {
                geo::haversine_km(self.reference_lat, self.reference_lon, lat, lon)
            }
            _ => 0.0,
        };

        if let Some(temperature) = temperature_c {
            let label = callsign.as_deref().or(icao.as_deref()).unwrap_or("-");
            if self.outlier.is_outlier(altitude_m, temperature, label) {
                return None;
            }
        }

        let obs = Observation {
            timestamp: received_at,
            source,
            altitude_source,
            icao,
            callsign,
            altitude_m,
            latitude,
            longitude,
            distance_km,
            temperature_c,
            wind,
        };
        if !obs.is_valid() {
            return None;
        }

        if let Some(temperature) = obs.temperature_c {
            self.outlier.add_history(obs.altitude_m, temperature);
        }
        Some(obs)
    }
}

fn epoch_seconds(ts: DateTime<Utc>) -> f64 {
    ts.timestamp_millis() as f64 / 1000.0
}
