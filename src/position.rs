//! Time-indexed position buffer for VDL2 altitude backfill
//!
//! ADS-B and XID position reports are retained per aircraft for a rolling
//! window so that ACARS weather messages without an altitude can borrow one
//! from a nearby report.

use std::collections::{HashMap, VecDeque};

use crate::types::AltitudeSource;

/// Where a buffered position entry originated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionOrigin {
    Adsb,
    Xid,
}

#[derive(Debug, Clone, Copy)]
struct PositionEntry {
    timestamp: f64,
    altitude_m: f64,
    latitude: Option<f64>,
    longitude: Option<f64>,
    sequence: u64,
    origin: PositionOrigin,
}

/// Result of an altitude lookup
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AltitudeLookup {
    pub altitude_m: f64,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub source: AltitudeSource,
}

/// Per-aircraft position rings plus a persistent callsign map
pub struct PositionBuffer {
    entries: HashMap<String, VecDeque<PositionEntry>>,
    /// Callsign to ICAO, case-folded; never trimmed
    callsigns: HashMap<String, String>,
    window_seconds: f64,
    next_sequence: u64,
}

impl PositionBuffer {
    pub fn new(window_seconds: f64) -> Self {
        Self {
            entries: HashMap::new(),
            callsigns: HashMap::new(),
            window_seconds,
            next_sequence: 0,
        }
    }

    /// Advance the logical clock: drop entries older than twice the lookup
    /// window and forget aircraft whose rings empty.
    pub fn update_time(&mut self, now: f64) {
        let cutoff = now - 2.0 * self.window_seconds;
        self.entries.retain(|_, ring| {
            while ring.front().is_some_and(|e| e.timestamp < cutoff) {
                ring.pop_front();
            }
            !ring.is_empty()
        });
    }

    /// Append a position report. A non-empty callsign also refreshes the
    /// callsign map.
    #[allow(clippy::too_many_arguments)]
    pub fn add_position(
        &mut self,
        icao: &str,
        callsign: Option<&str>,
        timestamp: f64,
        altitude_m: f64,
        latitude: Option<f64>,
        longitude: Option<f64>,
        origin: PositionOrigin,
    ) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;

        self.entries
            .entry(icao.to_string())
            .or_default()
            .push_back(PositionEntry {
                timestamp,
                altitude_m,
                latitude,
                longitude,
                sequence,
                origin,
            });

        if let Some(callsign) = callsign {
            let key = callsign.trim().to_uppercase();
            if !key.is_empty() {
                self.callsigns.insert(key, icao.to_string());
            }
        }
    }

    /// Nearest-in-time entry within the window around `target`. The
    /// identifier is tried as an ICAO first, then as a callsign. Ties
    /// prefer the later entry. Within a second of the target the entry's
    /// own origin is reported; further away it counts as interpolated.
    pub fn lookup_by_time(&self, identifier: &str, target: f64) -> Option<AltitudeLookup> {
        let ring = self.resolve(identifier)?;

        let best = ring
            .iter()
            .filter(|e| (e.timestamp - target).abs() <= self.window_seconds)
            .min_by(|a, b| {
                let da = (a.timestamp - target).abs();
                let db = (b.timestamp - target).abs();
                da.total_cmp(&db)
                    .then(b.timestamp.total_cmp(&a.timestamp))
            })?;

        Some(Self::to_lookup(best, (best.timestamp - target).abs() < 1.0))
    }

    /// Same lookup keyed by sequence index, for replaying recorded streams
    /// that carry no usable wall clock.
    pub fn lookup_by_sequence(
        &self,
        identifier: &str,
        target: u64,
        max_distance: u64,
    ) -> Option<AltitudeLookup> {
        let ring = self.resolve(identifier)?;

        let best = ring
            .iter()
            .filter(|e| e.sequence.abs_diff(target) <= max_distance)
            .min_by(|a, b| {
                a.sequence
                    .abs_diff(target)
                    .cmp(&b.sequence.abs_diff(target))
                    .then(b.sequence.cmp(&a.sequence))
            })?;

        Some(Self::to_lookup(best, best.sequence.abs_diff(target) <= 1))
    }

    /// Number of aircraft with buffered positions
    pub fn aircraft_count(&self) -> usize {
        self.entries.len()
    }

    /// Total buffered entries across all aircraft
    pub fn entry_count(&self) -> usize {
        self.entries.values().map(|r| r.len()).sum()
    }

    pub fn callsign_count(&self) -> usize {
        self.callsigns.len()
    }

    fn resolve(&self, identifier: &str) -> Option<&VecDeque<PositionEntry>> {
        if let Some(ring) = self.entries.get(identifier) {
            return Some(ring);
        }
        let key = identifier.trim().to_uppercase();
        let icao = self.callsigns.get(&key)?;
        self.entries.get(icao)
    }

    fn to_lookup(entry: &PositionEntry, direct: bool) -> AltitudeLookup {
        let source = if direct {
            match entry.origin {
                PositionOrigin::Adsb => AltitudeSource::Adsb,
                PositionOrigin::Xid => AltitudeSource::Xid,
            }
        } else {
            AltitudeSource::Interpolated
        };
        AltitudeLookup {
            altitude_m: entry.altitude_m,
            latitude: entry.latitude,
            longitude: entry.longitude,
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add(buf: &mut PositionBuffer, icao: &str, t: f64, alt: f64) {
        buf.add_position(
            icao,
            None,
            t,
            alt,
            Some(35.0),
            Some(139.0),
            PositionOrigin::Adsb,
        );
    }

    #[test]
    fn test_lookup_within_window() {
        let mut buf = PositionBuffer::new(60.0);
        add(&mut buf, "84C27A", 0.0, 10000.0);

        let hit = buf.lookup_by_time("84C27A", 20.0).unwrap();
        assert_eq!(hit.altitude_m, 10000.0);
        assert_eq!(hit.source, AltitudeSource::Interpolated);

        // Exactly at the entry time the origin tag survives
        let hit = buf.lookup_by_time("84C27A", 0.5).unwrap();
        assert_eq!(hit.source, AltitudeSource::Adsb);
    }

    #[test]
    fn test_lookup_outside_window_fails() {
        let mut buf = PositionBuffer::new(60.0);
        add(&mut buf, "84C27A", 0.0, 10000.0);
        assert!(buf.lookup_by_time("84C27A", 61.0).is_none());
        assert!(buf.lookup_by_time("84C27A", -61.0).is_none());
        // Boundary is inclusive
        assert!(buf.lookup_by_time("84C27A", 60.0).is_some());
    }

    #[test]
    fn test_nearest_entry_wins() {
        let mut buf = PositionBuffer::new(60.0);
        add(&mut buf, "84C27A", 0.0, 10000.0);
        add(&mut buf, "84C27A", 30.0, 11000.0);

        let hit = buf.lookup_by_time("84C27A", 25.0).unwrap();
        assert_eq!(hit.altitude_m, 11000.0);
    }

    #[test]
    fn test_tie_break_prefers_later_entry() {
        let mut buf = PositionBuffer::new(60.0);
        add(&mut buf, "84C27A", 10.0, 10000.0);
        add(&mut buf, "84C27A", 30.0, 11000.0);

        // Equidistant from t=20
        let hit = buf.lookup_by_time("84C27A", 20.0).unwrap();
        assert_eq!(hit.altitude_m, 11000.0);
    }

    #[test]
    fn test_callsign_resolution() {
        let mut buf = PositionBuffer::new(60.0);
        buf.add_position(
            "84C27A",
            Some("JAL123"),
            0.0,
            10000.0,
            Some(35.0),
            Some(139.0),
            PositionOrigin::Adsb,
        );

        assert!(buf.lookup_by_time("JAL123", 10.0).is_some());
        assert!(buf.lookup_by_time("jal123 ", 10.0).is_some());
        assert!(buf.lookup_by_time("ANA456", 10.0).is_none());
    }

    #[test]
    fn test_update_time_eviction() {
        let mut buf = PositionBuffer::new(60.0);
        add(&mut buf, "84C27A", 0.0, 10000.0);
        add(&mut buf, "84C27A", 100.0, 11000.0);

        buf.update_time(130.0);
        assert_eq!(buf.entry_count(), 1);
        assert_eq!(buf.aircraft_count(), 1);

        buf.update_time(300.0);
        assert_eq!(buf.entry_count(), 0);
        assert_eq!(buf.aircraft_count(), 0);
        // Callsign map is persistent
        buf.add_position(
            "84C27A",
            Some("JAL123"),
            300.0,
            9000.0,
            None,
            None,
            PositionOrigin::Adsb,
        );
        buf.update_time(10000.0);
        assert_eq!(buf.callsign_count(), 1);
    }

    #[test]
    fn test_xid_origin_tag() {
        let mut buf = PositionBuffer::new(60.0);
        buf.add_position(
            "84C27A",
            None,
            0.0,
            9144.0,
            Some(35.0),
            Some(139.0),
            PositionOrigin::Xid,
        );

        let hit = buf.lookup_by_time("84C27A", 0.2).unwrap();
        assert_eq!(hit.source, AltitudeSource::Xid);

        let hit = buf.lookup_by_time("84C27A", 30.0).unwrap();
        assert_eq!(hit.source, AltitudeSource::Interpolated);
    }

    #[test]
    fn test_lookup_by_sequence() {
        let mut buf = PositionBuffer::new(60.0);
        add(&mut buf, "84C27A", 0.0, 10000.0); // seq 0
        add(&mut buf, "84C27A", 1.0, 11000.0); // seq 1
        add(&mut buf, "84C27A", 2.0, 12000.0); // seq 2

        let hit = buf.lookup_by_sequence("84C27A", 1, 10).unwrap();
        assert_eq!(hit.altitude_m, 11000.0);

        // Outside the allowed index distance
        assert!(buf.lookup_by_sequence("84C27A", 50, 10).is_none());

        // Tie between seq 0 and seq 2 prefers the later one
        let mut buf = PositionBuffer::new(60.0);
        add(&mut buf, "84C27A", 0.0, 10000.0); // seq 0
        add(&mut buf, "84C27A", 1.0, 11000.0); // seq 1
        add(&mut buf, "84C27A", 2.0, 12000.0); // seq 2
        let ring_target = 1;
        let hit = buf.lookup_by_sequence("84C27A", ring_target, 10).unwrap();
        assert_eq!(hit.altitude_m, 11000.0);
        // Remove the exact match and the equidistant neighbors tie
        let mut buf = PositionBuffer::new(60.0);
        add(&mut buf, "84C27A", 0.0, 10000.0); // seq 0
        buf.add_position("900001", None, 1.0, 5000.0, None, None, PositionOrigin::Adsb); // seq 1
        add(&mut buf, "84C27A", 2.0, 12000.0); // seq 2
        let hit = buf.lookup_by_sequence("84C27A", 1, 10).unwrap();
        assert_eq!(hit.altitude_m, 12000.0);
    }
}
