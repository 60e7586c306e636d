//! Deposit: release the collected balls at the tower, then back away
//! and hand the mission back to collection.
//!
//! Entered with the robot stopped on the deposit wire and the gate
//! raised. The sequence is fixed-duration: settle, open the gate, shake
//! the paddle to clear stragglers, close the gate, back away. Rear
//! contact during the back-away ends it early; either way the machine
//! promotes `ReadyToSweep`.

use crate::core::event::{Event, EventKind};
use crate::core::machine::{Behavior, Context, Step};
use crate::core::state::State;
use crate::motion::{Auxiliary, Motion, DRIVE_SPEED};
use crate::timers::TimerId;
use serde::Serialize;

use super::CollisionOrigin;

const SETTLE_TICKS: u32 = 500;
const GATE_TICKS: u32 = 800;
const SHAKE_TICKS: u32 = 1_500;
const BACK_AWAY_TICKS: u32 = 600;
const GATE_SPEED: i16 = 700;
const PADDLE_SPEED: i16 = 600;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
pub enum DepositState {
    Boot,
    Settle,
    OpenGate,
    Shake,
    CloseGate,
    BackAway,
}

impl State for DepositState {
    fn name(&self) -> &'static str {
        match self {
            Self::Boot => "Boot",
            Self::Settle => "Settle",
            Self::OpenGate => "OpenGate",
            Self::Shake => "Shake",
            Self::CloseGate => "CloseGate",
            Self::BackAway => "BackAway",
        }
    }

    fn is_initial(&self) -> bool {
        matches!(self, Self::Boot)
    }
}

/// The deposit substate machine.
#[derive(Debug)]
pub struct Deposit {
    state: DepositState,
    origin: CollisionOrigin,
}

impl Default for Deposit {
    fn default() -> Self {
        Self::new()
    }
}

impl Deposit {
    pub fn new() -> Self {
        Self {
            state: DepositState::Boot,
            origin: CollisionOrigin::None,
        }
    }

    fn boot(&mut self, event: Event) -> Step<DepositState> {
        match event.kind() {
            EventKind::Init => {
                self.origin = CollisionOrigin::None;
                Step::to(DepositState::Settle)
            }
            _ => Step::pass(event),
        }
    }

    fn settle(&mut self, event: Event, ctx: &mut Context<'_>) -> Step<DepositState> {
        match event.kind() {
            EventKind::Entry => {
                ctx.motion.halt();
                ctx.arm(TimerId::Check, SETTLE_TICKS);
                Step::pass(event)
            }
            EventKind::Timeout if TimerId::Check.fired(event) => Step::to(DepositState::OpenGate),
            // Already committed: wire flicker while settling is noise.
            EventKind::TrackWireLost => Step::consume(),
            EventKind::Exit => {
                ctx.disarm(TimerId::Check);
                Step::pass(event)
            }
            _ => Step::pass(event),
        }
    }

    fn open_gate(&mut self, event: Event, ctx: &mut Context<'_>) -> Step<DepositState> {
        match event.kind() {
            EventKind::Entry => {
                ctx.motion.auxiliary(Auxiliary::Gate, GATE_SPEED);
                ctx.arm(TimerId::Follow, GATE_TICKS);
                Step::pass(event)
            }
            EventKind::Timeout if TimerId::Follow.fired(event) => Step::to(DepositState::Shake),
            EventKind::Exit => {
                ctx.disarm(TimerId::Follow);
                Step::pass(event)
            }
            _ => Step::pass(event),
        }
    }

    fn shake(&mut self, event: Event, ctx: &mut Context<'_>) -> Step<DepositState> {
        match event.kind() {
            EventKind::Entry => {
                ctx.motion.auxiliary(Auxiliary::Paddle, PADDLE_SPEED);
                ctx.arm(TimerId::Check, SHAKE_TICKS);
                Step::pass(event)
            }
            EventKind::Timeout if TimerId::Check.fired(event) => Step::to(DepositState::CloseGate),
            // Parked against the tower; contact there is expected.
            EventKind::TopBumperChanged => Step::consume(),
            EventKind::Exit => {
                ctx.motion.auxiliary(Auxiliary::Paddle, 0);
                ctx.disarm(TimerId::Check);
                Step::pass(event)
            }
            _ => Step::pass(event),
        }
    }

    fn close_gate(&mut self, event: Event, ctx: &mut Context<'_>) -> Step<DepositState> {
        match event.kind() {
            EventKind::Entry => {
                ctx.motion.auxiliary(Auxiliary::Gate, -GATE_SPEED);
                ctx.arm(TimerId::Follow, GATE_TICKS);
                Step::pass(event)
            }
            EventKind::Timeout if TimerId::Follow.fired(event) => Step::to(DepositState::BackAway),
            EventKind::Exit => {
                ctx.motion.auxiliary(Auxiliary::Gate, 0);
                ctx.disarm(TimerId::Follow);
                Step::pass(event)
            }
            _ => Step::pass(event),
        }
    }

    fn back_away(&mut self, event: Event, ctx: &mut Context<'_>) -> Step<DepositState> {
        match event.kind() {
            EventKind::Entry => {
                ctx.motion.drive(-DRIVE_SPEED);
                ctx.arm(TimerId::Reverse, BACK_AWAY_TICKS);
                Step::pass(event)
            }
            EventKind::Timeout if TimerId::Reverse.fired(event) => {
                ctx.motion.halt();
                Step::promote(EventKind::ReadyToSweep)
            }
            EventKind::TapeSensed if event.mask().is_rear_only() => {
                self.origin = CollisionOrigin::RearTape;
                ctx.motion.halt();
                ctx.disarm(TimerId::Reverse);
                Step::promote(EventKind::ReadyToSweep)
            }
            EventKind::BumperChanged if event.mask().is_rear_only() => {
                self.origin = CollisionOrigin::RearTape;
                ctx.motion.halt();
                ctx.disarm(TimerId::Reverse);
                Step::promote(EventKind::ReadyToSweep)
            }
            EventKind::Exit => {
                ctx.disarm(TimerId::Reverse);
                ctx.motion.halt();
                Step::pass(event)
            }
            _ => Step::pass(event),
        }
    }
}

impl Behavior for Deposit {
    type State = DepositState;
    const NAME: &'static str = "deposit";

    fn state(&self) -> DepositState {
        self.state
    }

    fn set_state(&mut self, state: DepositState) {
        self.state = state;
    }

    fn reset(&mut self) {
        self.state = DepositState::Boot;
        self.origin = CollisionOrigin::None;
    }

    fn handle(
        &mut self,
        state: DepositState,
        event: Event,
        ctx: &mut Context<'_>,
    ) -> Step<DepositState> {
        match state {
            DepositState::Boot => self.boot(event),
            DepositState::Settle => self.settle(event, ctx),
            DepositState::OpenGate => self.open_gate(event, ctx),
            DepositState::Shake => self.shake(event, ctx),
            DepositState::CloseGate => self.close_gate(event, ctx),
            DepositState::BackAway => self.back_away(event, ctx),
        }
    }
}
