//! Sensor event classifier.
//!
//! Converts raw contact/optical readings into the debounced,
//! edge-triggered event vocabulary the state machines consume. The host
//! samples its hardware into a [`SensorSnapshot`] once per scheduler
//! tick and calls [`EventClassifier::poll`]; the returned events are
//! dispatched to the orchestrator like any other.
//!
//! Debouncing rules:
//! - bumper and top-bumper masks must be identical across an 8-sample
//!   window before a change is reported;
//! - the beacon detector and each track-wire coil use analog hysteresis
//!   (distinct on/off thresholds);
//! - tape and wall-tape readings are reported on edges.

use crate::core::event::{Event, EventKind};
use crate::core::mask::{PairMask, SensorMask};
use serde::{Deserialize, Serialize};

/// Samples a reading must stay identical before a change is believed.
pub const STABILITY_WINDOW: usize = 8;

/// Beacon analog level above which the beacon counts as found.
pub const BEACON_ON: u16 = 750;
/// Beacon analog level below which the beacon counts as lost.
pub const BEACON_OFF: u16 = 350;

/// Track-wire coil level above which that side counts as on the wire.
pub const TRACK_ON: u16 = 400;
/// Track-wire coil level below which that side counts as off the wire.
pub const TRACK_OFF: u16 = 300;

/// One tick's worth of raw sensor readings.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub struct SensorSnapshot {
    /// Directional tape sensors (active bits = on tape).
    pub tape: SensorMask,
    /// Directional bumpers (active bits = pressed).
    pub bumpers: SensorMask,
    /// Top bumper pair.
    pub top_bumpers: PairMask,
    /// Near-side wall tape sensor.
    pub wall_tape: bool,
    /// Far-side wall tape sensor.
    pub far_wall_tape: bool,
    /// Left track-wire coil, raw analog.
    pub track_left: u16,
    /// Right track-wire coil, raw analog.
    pub track_right: u16,
    /// Beacon detector, raw analog.
    pub beacon: u16,
}

/// Debouncing classifier over successive snapshots.
#[derive(Debug)]
pub struct EventClassifier {
    beacon_found: bool,
    track_found: bool,
    track_pair: PairMask,
    bumper_window: [SensorMask; STABILITY_WINDOW],
    bumper_index: usize,
    last_bumpers: SensorMask,
    top_window: [PairMask; STABILITY_WINDOW],
    top_index: usize,
    last_top: PairMask,
    last_tape: SensorMask,
    last_wall: bool,
    last_far_wall: bool,
}

impl Default for EventClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl EventClassifier {
    pub fn new() -> Self {
        Self {
            beacon_found: false,
            track_found: false,
            track_pair: PairMask::NONE,
            bumper_window: [SensorMask::NONE; STABILITY_WINDOW],
            bumper_index: 0,
            last_bumpers: SensorMask::NONE,
            top_window: [PairMask::NONE; STABILITY_WINDOW],
            top_index: 0,
            last_top: PairMask::NONE,
            last_tape: SensorMask::NONE,
            last_wall: false,
            last_far_wall: false,
        }
    }

    /// Classify one snapshot, returning the events (possibly none) it
    /// gives rise to.
    pub fn poll(&mut self, snap: &SensorSnapshot) -> Vec<Event> {
        let mut events = Vec::new();

        self.poll_beacon(snap, &mut events);
        self.poll_track_wire(snap, &mut events);
        self.poll_bumpers(snap, &mut events);
        self.poll_top_bumpers(snap, &mut events);
        self.poll_tape(snap, &mut events);
        self.poll_wall_tape(snap, &mut events);

        events
    }

    fn poll_beacon(&mut self, snap: &SensorSnapshot, events: &mut Vec<Event>) {
        if !self.beacon_found && snap.beacon > BEACON_ON {
            self.beacon_found = true;
            events.push(Event::signal(EventKind::BeaconFound));
        } else if self.beacon_found && snap.beacon < BEACON_OFF {
            self.beacon_found = false;
            events.push(Event::signal(EventKind::BeaconLost));
        }
    }

    fn poll_track_wire(&mut self, snap: &SensorSnapshot, events: &mut Vec<Event>) {
        let mut pair = self.track_pair;
        if snap.track_right > TRACK_ON {
            pair = pair | PairMask::RIGHT;
        } else if snap.track_right < TRACK_OFF {
            pair = pair.without(PairMask::RIGHT);
        }
        if snap.track_left > TRACK_ON {
            pair = pair | PairMask::LEFT;
        } else if snap.track_left < TRACK_OFF {
            pair = pair.without(PairMask::LEFT);
        }

        let found = if snap.track_right > TRACK_ON || snap.track_left > TRACK_ON {
            true
        } else if snap.track_right < TRACK_OFF && snap.track_left < TRACK_OFF {
            false
        } else {
            self.track_found
        };

        // A side change while still on the wire is re-posted so handlers
        // always see the current pair.
        if found != self.track_found || (found && pair != self.track_pair) {
            let kind = if found {
                EventKind::TrackWireFound
            } else {
                EventKind::TrackWireLost
            };
            events.push(Event::new(kind, pair.bits() as u16));
        }
        self.track_found = found;
        self.track_pair = pair;
    }

    fn poll_bumpers(&mut self, snap: &SensorSnapshot, events: &mut Vec<Event>) {
        self.bumper_window[self.bumper_index] = snap.bumpers;
        self.bumper_index = (self.bumper_index + 1) % STABILITY_WINDOW;
        let stable = self.bumper_window.iter().all(|&m| m == snap.bumpers);

        if snap.bumpers.is_empty() {
            // Releases are not events; they just rearm the change check.
            self.last_bumpers = SensorMask::NONE;
        } else if stable && snap.bumpers != self.last_bumpers {
            self.last_bumpers = snap.bumpers;
            events.push(Event::new(
                EventKind::BumperChanged,
                snap.bumpers.bits() as u16,
            ));
        }
    }

    fn poll_top_bumpers(&mut self, snap: &SensorSnapshot, events: &mut Vec<Event>) {
        self.top_window[self.top_index] = snap.top_bumpers;
        self.top_index = (self.top_index + 1) % STABILITY_WINDOW;
        let stable = self.top_window.iter().all(|&m| m == snap.top_bumpers);

        if snap.top_bumpers.is_empty() {
            self.last_top = PairMask::NONE;
        } else if stable && snap.top_bumpers != self.last_top {
            self.last_top = snap.top_bumpers;
            events.push(Event::new(
                EventKind::TopBumperChanged,
                snap.top_bumpers.bits() as u16,
            ));
        }
    }

    fn poll_tape(&mut self, snap: &SensorSnapshot, events: &mut Vec<Event>) {
        if snap.tape != self.last_tape {
            if snap.tape.is_empty() {
                events.push(Event::new(
                    EventKind::TapeCleared,
                    self.last_tape.bits() as u16,
                ));
            } else {
                events.push(Event::new(EventKind::TapeSensed, snap.tape.bits() as u16));
            }
            self.last_tape = snap.tape;
        }
    }

    fn poll_wall_tape(&mut self, snap: &SensorSnapshot, events: &mut Vec<Event>) {
        if snap.wall_tape != self.last_wall {
            self.last_wall = snap.wall_tape;
            events.push(Event::signal(if snap.wall_tape {
                EventKind::WallFound
            } else {
                EventKind::WallLost
            }));
        }
        if snap.far_wall_tape != self.last_far_wall {
            self.last_far_wall = snap.far_wall_tape;
            events.push(Event::signal(if snap.far_wall_tape {
                EventKind::FarWallFound
            } else {
                EventKind::FarWallLost
            }));
        }
    }
}
