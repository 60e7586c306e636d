//! Beacon search: sweep the arena in widening arcs until the beacon is
//! sighted, then drive to it.
//!
//! A machine-owned watchdog caps the whole search; when it expires the
//! machine reports `AtBeaconTower` anyway so the mission can move on.

use crate::core::event::{Event, EventKind};
use crate::core::machine::{Behavior, Context, Step};
use crate::core::state::State;
use crate::motion::{Motion, Turn, DRIVE_SPEED, SPIN_SPEED};
use crate::timers::TimerId;
use serde::Serialize;

use super::{front_origin, CollisionOrigin};

const SPIN_TICKS: u32 = 3_000;
const REVERSE_TICKS: u32 = 750;
const TURN_TICKS: u32 = 1_000;
const QUARTER_TURN_TICKS: u32 = 1_000;
const SHORT_DRIVE_TICKS: u32 = 1_000;
const SWEEP_TICKS: u32 = 4_500;
const PARK_TICKS: u32 = 4_000;
const WATCHDOG_TICKS: u32 = 30_000;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
pub enum BeaconSearchState {
    Boot,
    ScanInPlace,
    SweepRight,
    SweepLeft,
    DriveToBeacon,
    Park,
    Reverse,
    Turning,
    ShortDrive,
}

impl State for BeaconSearchState {
    fn name(&self) -> &'static str {
        match self {
            Self::Boot => "Boot",
            Self::ScanInPlace => "ScanInPlace",
            Self::SweepRight => "SweepRight",
            Self::SweepLeft => "SweepLeft",
            Self::DriveToBeacon => "DriveToBeacon",
            Self::Park => "Park",
            Self::Reverse => "Reverse",
            Self::Turning => "Turning",
            Self::ShortDrive => "ShortDrive",
        }
    }

    fn is_initial(&self) -> bool {
        matches!(self, Self::Boot)
    }
}

/// The beacon search substate machine.
#[derive(Debug)]
pub struct BeaconSearch {
    state: BeaconSearchState,
    origin: CollisionOrigin,
}

impl Default for BeaconSearch {
    fn default() -> Self {
        Self::new()
    }
}

impl BeaconSearch {
    pub fn new() -> Self {
        Self {
            state: BeaconSearchState::Boot,
            origin: CollisionOrigin::None,
        }
    }

    fn boot(&mut self, event: Event) -> Step<BeaconSearchState> {
        match event.kind() {
            EventKind::Init => {
                self.origin = CollisionOrigin::None;
                Step::to(BeaconSearchState::SweepRight)
            }
            _ => Step::pass(event),
        }
    }

    fn scan_in_place(&mut self, event: Event, ctx: &mut Context<'_>) -> Step<BeaconSearchState> {
        use BeaconSearchState::*;
        match event.kind() {
            EventKind::Entry => {
                ctx.motion.spin(Turn::Right, SPIN_SPEED);
                ctx.arm(TimerId::Spin, SPIN_TICKS);
                Step::pass(event)
            }
            EventKind::Timeout if TimerId::Spin.fired(event) => Step::to(SweepRight),
            EventKind::BeaconFound => Step::to(DriveToBeacon),
            EventKind::Exit => {
                ctx.disarm(TimerId::Spin);
                Step::pass(event)
            }
            _ => Step::pass(event),
        }
    }

    fn sweep_right(&mut self, event: Event, ctx: &mut Context<'_>) -> Step<BeaconSearchState> {
        use BeaconSearchState::*;
        match event.kind() {
            EventKind::Entry => {
                self.origin = CollisionOrigin::None;
                ctx.motion.pivot(Turn::Right, DRIVE_SPEED);
                ctx.arm(TimerId::Sweep, SWEEP_TICKS);
                ctx.arm_lasting(TimerId::Mission, WATCHDOG_TICKS);
                Step::pass(event)
            }
            EventKind::Timeout if TimerId::Sweep.fired(event) => Step::to(SweepLeft),
            EventKind::Timeout if TimerId::Mission.fired(event) => {
                ctx.disarm(TimerId::Sweep);
                Step::promote(EventKind::AtBeaconTower)
            }
            EventKind::TapeSensed | EventKind::BumperChanged => {
                if let Some(origin) = front_origin(event.mask()) {
                    self.origin = origin;
                }
                Step::to(Reverse)
            }
            EventKind::TopBumperChanged => {
                self.origin = CollisionOrigin::Overhang;
                Step::to(Reverse)
            }
            EventKind::BeaconFound => Step::to(DriveToBeacon),
            EventKind::Exit => {
                ctx.disarm(TimerId::Sweep);
                Step::pass(event)
            }
            _ => Step::pass(event),
        }
    }

    fn sweep_left(&mut self, event: Event, ctx: &mut Context<'_>) -> Step<BeaconSearchState> {
        use BeaconSearchState::*;
        match event.kind() {
            EventKind::Entry => {
                self.origin = CollisionOrigin::None;
                ctx.motion.pivot(Turn::Left, DRIVE_SPEED);
                ctx.arm(TimerId::Sweep, SWEEP_TICKS);
                Step::pass(event)
            }
            // Both sweep arcs exhausted: claim arrival and let the
            // mission move on.
            EventKind::Timeout if TimerId::Sweep.fired(event) => {
                Step::promote(EventKind::AtBeaconTower)
            }
            EventKind::Timeout if TimerId::Mission.fired(event) => {
                ctx.disarm(TimerId::Sweep);
                Step::promote(EventKind::AtBeaconTower)
            }
            EventKind::TapeSensed | EventKind::BumperChanged => {
                if let Some(origin) = front_origin(event.mask()) {
                    self.origin = origin;
                }
                Step::to(Reverse)
            }
            EventKind::TopBumperChanged => {
                self.origin = CollisionOrigin::Overhang;
                Step::to(Reverse)
            }
            EventKind::BeaconFound => Step::to(DriveToBeacon),
            EventKind::Exit => {
                ctx.disarm(TimerId::Sweep);
                Step::pass(event)
            }
            _ => Step::pass(event),
        }
    }

    fn drive_to_beacon(&mut self, event: Event, ctx: &mut Context<'_>) -> Step<BeaconSearchState> {
        use BeaconSearchState::*;
        match event.kind() {
            EventKind::Entry => {
                self.origin = CollisionOrigin::None;
                ctx.motion.drive(DRIVE_SPEED);
                Step::pass(event)
            }
            EventKind::BumperChanged => {
                if let Some(origin) = front_origin(event.mask()) {
                    self.origin = origin;
                }
                Step::to(Reverse)
            }
            EventKind::TapeSensed => Step::to(Park),
            EventKind::Exit => {
                ctx.motion.halt();
                Step::pass(event)
            }
            _ => Step::pass(event),
        }
    }

    fn park(&mut self, event: Event, ctx: &mut Context<'_>) -> Step<BeaconSearchState> {
        match event.kind() {
            EventKind::Entry => {
                ctx.motion.halt();
                ctx.arm(TimerId::Sweep, PARK_TICKS);
                Step::pass(event)
            }
            EventKind::Timeout if TimerId::Sweep.fired(event) => {
                Step::promote(EventKind::ReadyToDeposit)
            }
            EventKind::Exit => {
                ctx.disarm(TimerId::Sweep);
                ctx.motion.halt();
                Step::pass(event)
            }
            _ => Step::pass(event),
        }
    }

    fn reverse(&mut self, event: Event, ctx: &mut Context<'_>) -> Step<BeaconSearchState> {
        use BeaconSearchState::*;
        match event.kind() {
            EventKind::Entry => {
                ctx.motion.drive(-DRIVE_SPEED);
                ctx.arm(TimerId::Collision, REVERSE_TICKS);
                Step::pass(event)
            }
            EventKind::Timeout if TimerId::Mission.fired(event) => {
                ctx.disarm(TimerId::Collision);
                Step::promote(EventKind::AtBeaconTower)
            }
            EventKind::Timeout if TimerId::Collision.fired(event) => Step::to(Turning),
            EventKind::BumperChanged => Step::to(Turning),
            EventKind::TapeSensed if event.mask().is_rear_only() => Step::to(Turning),
            EventKind::Exit => {
                ctx.disarm(TimerId::Collision);
                Step::pass(event)
            }
            _ => Step::pass(event),
        }
    }

    fn turning(&mut self, event: Event, ctx: &mut Context<'_>) -> Step<BeaconSearchState> {
        use BeaconSearchState::*;
        match event.kind() {
            EventKind::Entry => {
                match self.origin {
                    CollisionOrigin::FrontRight => {
                        ctx.arm(TimerId::Collision, TURN_TICKS);
                        ctx.motion.pivot(Turn::Right, DRIVE_SPEED);
                    }
                    CollisionOrigin::FrontLeft => {
                        ctx.arm(TimerId::Collision, TURN_TICKS);
                        ctx.motion.pivot(Turn::Left, DRIVE_SPEED);
                    }
                    CollisionOrigin::FrontBoth | CollisionOrigin::Overhang => {
                        ctx.arm(TimerId::Collision, QUARTER_TURN_TICKS);
                        ctx.motion.pivot(Turn::Right, DRIVE_SPEED);
                    }
                    _ => {}
                }
                Step::pass(event)
            }
            EventKind::TapeSensed | EventKind::BumperChanged => {
                if let Some(origin) = front_origin(event.mask()) {
                    self.origin = origin;
                }
                Step::to(Reverse)
            }
            EventKind::TopBumperChanged => {
                self.origin = CollisionOrigin::Overhang;
                Step::to(Reverse)
            }
            EventKind::Timeout if TimerId::Mission.fired(event) => {
                ctx.disarm(TimerId::Collision);
                Step::promote(EventKind::AtBeaconTower)
            }
            EventKind::Timeout if TimerId::Collision.fired(event) => Step::to(ShortDrive),
            EventKind::Exit => {
                ctx.disarm(TimerId::Collision);
                Step::pass(event)
            }
            _ => Step::pass(event),
        }
    }

    fn short_drive(&mut self, event: Event, ctx: &mut Context<'_>) -> Step<BeaconSearchState> {
        use BeaconSearchState::*;
        match event.kind() {
            EventKind::Entry => {
                ctx.arm(TimerId::Collision, SHORT_DRIVE_TICKS);
                ctx.motion.drive(DRIVE_SPEED);
                Step::pass(event)
            }
            EventKind::TapeSensed | EventKind::BumperChanged => {
                if let Some(origin) = front_origin(event.mask()) {
                    self.origin = origin;
                }
                Step::to(Reverse)
            }
            EventKind::TopBumperChanged => {
                self.origin = CollisionOrigin::Overhang;
                Step::to(Reverse)
            }
            EventKind::Timeout if TimerId::Mission.fired(event) => {
                ctx.disarm(TimerId::Collision);
                Step::promote(EventKind::AtBeaconTower)
            }
            EventKind::Timeout if TimerId::Collision.fired(event) => Step::to(SweepLeft),
            EventKind::Exit => {
                ctx.disarm(TimerId::Collision);
                Step::pass(event)
            }
            _ => Step::pass(event),
        }
    }
}

impl Behavior for BeaconSearch {
    type State = BeaconSearchState;
    const NAME: &'static str = "beacon-search";

    fn state(&self) -> BeaconSearchState {
        self.state
    }

    fn set_state(&mut self, state: BeaconSearchState) {
        self.state = state;
    }

    fn reset(&mut self) {
        self.state = BeaconSearchState::Boot;
        self.origin = CollisionOrigin::None;
    }

    fn handle(
        &mut self,
        state: BeaconSearchState,
        event: Event,
        ctx: &mut Context<'_>,
    ) -> Step<BeaconSearchState> {
        match state {
            BeaconSearchState::Boot => self.boot(event),
            BeaconSearchState::ScanInPlace => self.scan_in_place(event, ctx),
            BeaconSearchState::SweepRight => self.sweep_right(event, ctx),
            BeaconSearchState::SweepLeft => self.sweep_left(event, ctx),
            BeaconSearchState::DriveToBeacon => self.drive_to_beacon(event, ctx),
            BeaconSearchState::Park => self.park(event, ctx),
            BeaconSearchState::Reverse => self.reverse(event, ctx),
            BeaconSearchState::Turning => self.turning(event, ctx),
            BeaconSearchState::ShortDrive => self.short_drive(event, ctx),
        }
    }
}
