//! Per-aircraft fragment pairing
//!
//! Weather registers arrive spread over many Mode-S frames. Each aircraft
//! accumulates the most recent fragment of every kind until one of the two
//! emission routes is complete.

use std::collections::{HashMap, VecDeque};
use tracing::debug;

/// ADS-B position fragment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionFragment {
    pub altitude_ft: f64,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// BDS 5,0 fragment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bds50Fragment {
    pub track_deg: f64,
    pub groundspeed_kt: f64,
    pub tas_kt: f64,
}

/// BDS 6,0 fragment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bds60Fragment {
    pub heading_deg: f64,
    pub ias_kt: f64,
    pub mach: f64,
}

/// BDS 4,4 (MRAR) fragment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bds44Fragment {
    pub temperature_c: f64,
    pub wind_speed_kt: f64,
    pub wind_direction_deg: f64,
}

/// Fragment slots of a single aircraft
#[derive(Debug, Clone, Default)]
pub struct FragmentSlot {
    pub position: Option<PositionFragment>,
    pub callsign: Option<String>,
    pub bds50: Option<Bds50Fragment>,
    pub bds60: Option<Bds60Fragment>,
    pub bds44: Option<Bds44Fragment>,
}

/// A complete weather tuple ready for emission
#[derive(Debug, Clone, PartialEq)]
pub enum CompleteFragment {
    /// Position, callsign and MRAR are present
    Mrar {
        callsign: String,
        position: PositionFragment,
        bds44: Bds44Fragment,
    },
    /// Position, callsign and the 5,0 + 6,0 pair are present
    Derived {
        callsign: String,
        position: PositionFragment,
        bds50: Bds50Fragment,
        bds60: Bds60Fragment,
    },
}

/// Bounded ICAO to fragment-slot map with insertion-order eviction
pub struct FragmentStore {
    slots: HashMap<String, FragmentSlot>,
    order: VecDeque<String>,
    capacity: usize,
}

impl FragmentStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn get(&self, icao: &str) -> Option<&FragmentSlot> {
        self.slots.get(icao)
    }

    /// Current callsign for an aircraft, if one has been seen
    pub fn callsign(&self, icao: &str) -> Option<&str> {
        self.slots.get(icao).and_then(|s| s.callsign.as_deref())
    }

    pub fn update_position(&mut self, icao: &str, fragment: PositionFragment) {
        self.slot_mut(icao).position = Some(fragment);
    }

    pub fn update_callsign(&mut self, icao: &str, callsign: &str) {
        self.slot_mut(icao).callsign = Some(callsign.to_string());
    }

    pub fn update_bds50(&mut self, icao: &str, fragment: Bds50Fragment) {
        self.slot_mut(icao).bds50 = Some(fragment);
    }

    pub fn update_bds60(&mut self, icao: &str, fragment: Bds60Fragment) {
        self.slot_mut(icao).bds60 = Some(fragment);
    }

    pub fn update_bds44(&mut self, icao: &str, fragment: Bds44Fragment) {
        self.slot_mut(icao).bds44 = Some(fragment);
    }

    /// If one of the emission routes is complete, return the tuple and
    /// clear the consumed weather slots. Position and callsign persist
    /// because they change less frequently. MRAR wins when both routes are
    /// ready on the same cycle.
    pub fn take_complete(&mut self, icao: &str) -> Option<CompleteFragment> {
        let slot = self.slots.get_mut(icao)?;
        let position = slot.position?;
        let callsign = slot.callsign.clone()?;

        if let Some(bds44) = slot.bds44.take() {
            return Some(CompleteFragment::Mrar {
                callsign,
                position,
                bds44,
            });
        }

        if slot.bds50.is_some() && slot.bds60.is_some() {
            let bds50 = slot.bds50.take()?;
            let bds60 = slot.bds60.take()?;
            return Some(CompleteFragment::Derived {
                callsign,
                position,
                bds50,
                bds60,
            });
        }

        None
    }

    fn slot_mut(&mut self, icao: &str) -> &mut FragmentSlot {
        if !self.slots.contains_key(icao) {
            while self.slots.len() >= self.capacity {
                if let Some(oldest) = self.order.pop_front() {
                    self.slots.remove(&oldest);
                    debug!("evicted fragment slot for {}", oldest);
                } else {
                    break;
                }
            }
            self.slots.insert(icao.to_string(), FragmentSlot::default());
            self.order.push_back(icao.to_string());
        }
        self.slots.get_mut(icao).unwrap()
    }
}
