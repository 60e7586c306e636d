//! Events dispatched through the state machines.
//!
//! An [`Event`] is an immutable value: a tagged kind plus one scalar
//! param. Events are both the dispatch input and the handler return
//! value, so a handler can rewrite one on the way back up: consume it
//! (rewrite to [`EventKind::NoEvent`]), promote it to a mission signal,
//! or leave it untouched for an enclosing machine to interpret.

use crate::core::mask::{PairMask, SensorMask};
use serde::{Deserialize, Serialize};

/// The closed event vocabulary shared by every machine in the system.
///
/// The param accompanying each kind is interpreted contextually:
/// a 4-bit directional [`SensorMask`] for tape and bumper kinds, a
/// 2-bit [`PairMask`] for track-wire and top-bumper kinds, the timer
/// identity for [`Timeout`](EventKind::Timeout), and unused (zero)
/// otherwise.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum EventKind {
    /// Dispatched once by `init()` to leave the pseudo-initial state.
    Init,
    /// Synthetic lifecycle event dispatched by the machine itself when a
    /// state is entered. Never consumed by handlers.
    Entry,
    /// Synthetic lifecycle event dispatched by the machine itself when a
    /// state is left. Never consumed by handlers.
    Exit,
    /// "Already handled, do not reprocess." The param is ignored.
    NoEvent,
    /// A named countdown timer expired; the param carries its identity.
    Timeout,

    /// Tape detected; param is the directional mask of sensors on tape.
    TapeSensed,
    /// Tape no longer detected; param is the mask that just cleared.
    TapeCleared,
    /// Debounced bumper mask changed; param is the new mask.
    BumperChanged,
    /// Debounced top-bumper pair changed; param is the new pair mask.
    TopBumperChanged,
    /// Beacon detector crossed its on threshold.
    BeaconFound,
    /// Beacon detector crossed its off threshold.
    BeaconLost,
    /// A track-wire coil crossed its on threshold; param is the pair.
    TrackWireFound,
    /// Both track-wire coils below their off thresholds.
    TrackWireLost,
    /// Near-side wall tape detected.
    WallFound,
    /// Near-side wall tape cleared.
    WallLost,
    /// Far-side wall tape detected.
    FarWallFound,
    /// Far-side wall tape cleared.
    FarWallLost,

    /// Mission signal: the beacon tower has been reached (or the search
    /// watchdog gave up). Promoted to the orchestrator.
    AtBeaconTower,
    /// Mission signal: ready to begin primary collection.
    ReadyToGo,
    /// Mission signal: positioned at the deposit wire.
    ReadyToDeposit,
    /// Mission signal: deposit complete, ready to sweep again.
    ReadyToSweep,
}

impl EventKind {
    /// True for the synthetic lifecycle markers the dispatch driver owns.
    pub fn is_lifecycle(self) -> bool {
        matches!(self, Self::Init | Self::Entry | Self::Exit | Self::NoEvent)
    }

    /// True for the phase-completion signals a child machine promotes
    /// past its own `run` so the orchestrator can observe them.
    pub fn is_mission_signal(self) -> bool {
        matches!(
            self,
            Self::AtBeaconTower | Self::ReadyToGo | Self::ReadyToDeposit | Self::ReadyToSweep
        )
    }
}

/// An immutable event value: kind plus one contextual scalar param.
///
/// # Example
///
/// ```rust
/// use reflex::core::event::{Event, EventKind};
/// use reflex::core::mask::SensorMask;
///
/// let hit = Event::new(EventKind::TapeSensed, SensorMask::FRONT_LEFT.bits() as u16);
/// assert_eq!(hit.kind(), EventKind::TapeSensed);
/// assert!(hit.mask().is_front_left());
/// assert!(Event::none().is_none());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct Event {
    kind: EventKind,
    param: u16,
}

impl Event {
    /// Build an event from a kind and a raw param.
    pub const fn new(kind: EventKind, param: u16) -> Self {
        Self { kind, param }
    }

    /// Build a param-less event (param zero).
    pub const fn signal(kind: EventKind) -> Self {
        Self::new(kind, 0)
    }

    /// The INIT lifecycle event.
    pub const fn init() -> Self {
        Self::signal(EventKind::Init)
    }

    /// The ENTRY lifecycle event.
    pub const fn entry() -> Self {
        Self::signal(EventKind::Entry)
    }

    /// The EXIT lifecycle event.
    pub const fn exit() -> Self {
        Self::signal(EventKind::Exit)
    }

    /// The "nothing left to do" event.
    pub const fn none() -> Self {
        Self::signal(EventKind::NoEvent)
    }

    pub const fn kind(self) -> EventKind {
        self.kind
    }

    pub const fn param(self) -> u16 {
        self.param
    }

    /// True if this event has been consumed.
    pub fn is_none(self) -> bool {
        self.kind == EventKind::NoEvent
    }

    /// Interpret the param as a 4-bit directional sensor mask.
    pub fn mask(self) -> SensorMask {
        SensorMask::from_bits(self.param as u8)
    }

    /// Interpret the param as a 2-bit left/right pair mask.
    pub fn pair(self) -> PairMask {
        PairMask::from_bits(self.param as u8)
    }
}
