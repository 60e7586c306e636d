//! Secondary collection: cross the arena, pick up the boundary tape and
//! follow it to the right until the deposit track wire is sensed.
//!
//! Promotes `ReadyToDeposit` the moment a track-wire coil fires,
//! raising the ball gate so the load is held for the deposit phase.

use crate::core::event::{Event, EventKind};
use crate::core::machine::{Behavior, Context, Step};
use crate::core::mask::SensorMask;
use crate::core::state::State;
use crate::motion::{Auxiliary, Motion, Turn, DRIVE_SPEED};
use crate::timers::TimerId;
use serde::Serialize;

use super::CollisionOrigin;

const REVERSE_TICKS: u32 = 600;
const FOLLOW_REVERSE_TICKS: u32 = 400;
const BACK_TICKS: u32 = 200;
const TURN_TICKS: u32 = 650;
const HALF_TURN_TICKS: u32 = 325;
const FULL_TURN_TICKS: u32 = 1_300;
const NUDGE_TICKS: u32 = 100;
const GATE_SPEED: i16 = 700;

/// Consecutive one-sided tape contacts tolerated before escalating.
const ALIGN_LIMIT: u8 = 2;
/// Consecutive alternating bumper contacts tolerated before escalating.
/// Higher than the tape limit: at a sharp angle the bumpers can trade
/// hits several times before the robot is actually square.
const BUMP_LIMIT: u8 = 3;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
pub enum CollectSecondaryState {
    Boot,
    DriveForward,
    TapeFollowRight,
    RightAlign,
    FollowReverse,
    Stop,
    AlignReverse,
    Reverse,
    Turn90Right,
    Turn90Left,
    Turn45Left,
    Turn180,
    AdjustingRight,
    AdjustingLeft,
}

impl State for CollectSecondaryState {
    fn name(&self) -> &'static str {
        match self {
            Self::Boot => "Boot",
            Self::DriveForward => "DriveForward",
            Self::TapeFollowRight => "TapeFollowRight",
            Self::RightAlign => "RightAlign",
            Self::FollowReverse => "FollowReverse",
            Self::Stop => "Stop",
            Self::AlignReverse => "AlignReverse",
            Self::Reverse => "Reverse",
            Self::Turn90Right => "Turn90Right",
            Self::Turn90Left => "Turn90Left",
            Self::Turn45Left => "Turn45Left",
            Self::Turn180 => "Turn180",
            Self::AdjustingRight => "AdjustingRight",
            Self::AdjustingLeft => "AdjustingLeft",
        }
    }

    fn is_initial(&self) -> bool {
        matches!(self, Self::Boot)
    }
}

/// The secondary collection substate machine.
#[derive(Debug)]
pub struct CollectSecondary {
    state: CollectSecondaryState,
    origin: CollisionOrigin,
    align_count: u8,
    bump_count: u8,
    left_bumped: bool,
    right_bumped: bool,
}

impl Default for CollectSecondary {
    fn default() -> Self {
        Self::new()
    }
}

impl CollectSecondary {
    pub fn new() -> Self {
        Self {
            state: CollectSecondaryState::Boot,
            origin: CollisionOrigin::None,
            align_count: 0,
            bump_count: 0,
            left_bumped: false,
            right_bumped: false,
        }
    }

    /// True for the tape patterns that mean the follow has run off the
    /// line to the left: both front sensors, front-left alone, or both
    /// front plus the rear-right trailing sensor.
    fn tape_ran_wide(mask: SensorMask) -> bool {
        mask.is_front_both()
            || mask.is_front_left()
            || mask == (SensorMask::FRONT_BOTH | SensorMask::REAR_RIGHT)
    }

    fn boot(&mut self, event: Event) -> Step<CollectSecondaryState> {
        match event.kind() {
            EventKind::Init => {
                self.origin = CollisionOrigin::None;
                self.align_count = 0;
                Step::to(CollectSecondaryState::DriveForward)
            }
            _ => Step::pass(event),
        }
    }

    fn drive_forward(&mut self, event: Event, ctx: &mut Context<'_>) -> Step<CollectSecondaryState> {
        use CollectSecondaryState::*;
        match event.kind() {
            EventKind::Entry => {
                ctx.motion.drive(DRIVE_SPEED);
                Step::pass(event)
            }
            EventKind::TapeSensed => {
                let mask = event.mask();
                if mask.is_front_both() || self.align_count > ALIGN_LIMIT {
                    self.align_count = 0;
                    self.origin = CollisionOrigin::Tape;
                    Step::to(Reverse)
                } else if mask.is_front_right() {
                    self.origin = CollisionOrigin::FrontRight;
                    Step::to(AlignReverse)
                } else if mask.is_front_left() {
                    self.origin = CollisionOrigin::FrontLeft;
                    Step::to(AlignReverse)
                } else if mask == SensorMask::REAR_LEFT || mask == SensorMask::REAR_RIGHT {
                    self.origin = CollisionOrigin::RearTape;
                    Step::to(AlignReverse)
                } else {
                    Step::pass(event)
                }
            }
            EventKind::BumperChanged => {
                let mask = event.mask();
                if mask.is_front_left() {
                    self.origin = CollisionOrigin::BumpFrontLeft;
                    Step::to(AlignReverse)
                } else if mask.is_front_right() {
                    self.origin = CollisionOrigin::BumpFrontRight;
                    Step::to(AlignReverse)
                } else if mask.is_front_both() {
                    self.origin = CollisionOrigin::Wall;
                    Step::to(Reverse)
                } else {
                    Step::pass(event)
                }
            }
            EventKind::TopBumperChanged => {
                self.origin = CollisionOrigin::OverhangCenter;
                Step::to(Reverse)
            }
            _ => Step::pass(event),
        }
    }

    fn tape_follow_right(
        &mut self,
        event: Event,
        ctx: &mut Context<'_>,
    ) -> Step<CollectSecondaryState> {
        use CollectSecondaryState::*;
        match event.kind() {
            EventKind::Entry => {
                ctx.motion.veer(Turn::Right, DRIVE_SPEED);
                Step::pass(event)
            }
            EventKind::TapeSensed => {
                let mask = event.mask();
                if mask.is_front_right() {
                    Step::to(RightAlign)
                } else if Self::tape_ran_wide(mask) {
                    self.origin = CollisionOrigin::Tape;
                    Step::to(FollowReverse)
                } else {
                    Step::pass(event)
                }
            }
            EventKind::TopBumperChanged => {
                self.origin = CollisionOrigin::Overhang;
                Step::to(Reverse)
            }
            EventKind::BumperChanged => {
                let mask = event.mask();
                if mask.is_front_left() {
                    self.origin = CollisionOrigin::BumpFrontLeft;
                    Step::to(AlignReverse)
                } else if mask.is_front_right() {
                    self.origin = CollisionOrigin::BumpFrontRight;
                    Step::to(AlignReverse)
                } else if mask.is_front_both() {
                    self.origin = CollisionOrigin::Wall;
                    Step::to(Reverse)
                } else {
                    Step::pass(event)
                }
            }
            EventKind::TrackWireFound => {
                ctx.motion.halt();
                ctx.motion.auxiliary(Auxiliary::Gate, GATE_SPEED);
                Step::promote(EventKind::ReadyToDeposit)
            }
            _ => Step::pass(event),
        }
    }

    fn right_align(&mut self, event: Event, ctx: &mut Context<'_>) -> Step<CollectSecondaryState> {
        use CollectSecondaryState::*;
        match event.kind() {
            EventKind::Entry => {
                ctx.motion.spin(Turn::Left, DRIVE_SPEED);
                if self.origin == CollisionOrigin::Overhang {
                    ctx.arm(TimerId::Spin, TURN_TICKS * 2);
                }
                Step::pass(event)
            }
            EventKind::TapeCleared => Step::to(TapeFollowRight),
            EventKind::TapeSensed => {
                let mask = event.mask();
                if Self::tape_ran_wide(mask) {
                    self.origin = CollisionOrigin::Tape;
                    Step::to(FollowReverse)
                } else if mask == SensorMask::REAR_RIGHT {
                    Step::to(TapeFollowRight)
                } else {
                    Step::pass(event)
                }
            }
            EventKind::TrackWireFound => {
                ctx.motion.halt();
                Step::promote(EventKind::ReadyToDeposit)
            }
            EventKind::TopBumperChanged => {
                self.origin = CollisionOrigin::Overhang;
                Step::to(Reverse)
            }
            EventKind::Timeout if TimerId::Spin.fired(event) => Step::to(DriveForward),
            EventKind::Exit => {
                ctx.disarm(TimerId::Spin);
                Step::pass(event)
            }
            _ => Step::pass(event),
        }
    }

    fn follow_reverse(&mut self, event: Event, ctx: &mut Context<'_>) -> Step<CollectSecondaryState> {
        use CollectSecondaryState::*;
        match event.kind() {
            EventKind::Entry => {
                ctx.motion.drive(-DRIVE_SPEED);
                ctx.arm(TimerId::Follow, FOLLOW_REVERSE_TICKS);
                Step::pass(event)
            }
            EventKind::Timeout if TimerId::Follow.fired(event) => Step::to(Turn90Left),
            EventKind::TapeSensed if event.mask().is_rear_only() => Step::to(Turn90Left),
            EventKind::Exit => {
                ctx.disarm(TimerId::Follow);
                Step::pass(event)
            }
            _ => Step::pass(event),
        }
    }

    fn stop(&mut self, event: Event, ctx: &mut Context<'_>) -> Step<CollectSecondaryState> {
        match event.kind() {
            EventKind::Entry => {
                ctx.motion.halt();
                Step::pass(event)
            }
            _ => Step::pass(event),
        }
    }

    fn align_reverse(&mut self, event: Event, ctx: &mut Context<'_>) -> Step<CollectSecondaryState> {
        use CollectSecondaryState::*;
        match event.kind() {
            EventKind::Entry => {
                ctx.motion.drive(-DRIVE_SPEED);
                self.align_count += 1;
                if self.left_bumped && self.right_bumped {
                    self.bump_count += 1;
                }
                if matches!(
                    self.origin,
                    CollisionOrigin::BumpFrontRight | CollisionOrigin::BumpFrontLeft
                ) {
                    ctx.arm(TimerId::Reverse, NUDGE_TICKS);
                }
                Step::pass(event)
            }
            EventKind::TapeCleared => match self.origin {
                CollisionOrigin::FrontRight => Step::to(AdjustingRight),
                CollisionOrigin::FrontLeft => Step::to(AdjustingLeft),
                _ => Step::pass(event),
            },
            EventKind::TapeSensed if event.mask().is_rear_only() => {
                self.origin = CollisionOrigin::RearTape;
                Step::to(Reverse)
            }
            EventKind::Timeout if TimerId::Reverse.fired(event) => match self.origin {
                CollisionOrigin::BumpFrontLeft => Step::to(AdjustingLeft),
                CollisionOrigin::BumpFrontRight => Step::to(AdjustingRight),
                _ => Step::pass(event),
            },
            EventKind::Exit => {
                ctx.disarm(TimerId::Reverse);
                Step::pass(event)
            }
            _ => Step::pass(event),
        }
    }

    fn reverse(&mut self, event: Event, ctx: &mut Context<'_>) -> Step<CollectSecondaryState> {
        use CollectSecondaryState::*;
        match event.kind() {
            EventKind::Entry => {
                ctx.motion.drive(-DRIVE_SPEED);
                let ticks = if matches!(
                    self.origin,
                    CollisionOrigin::Overhang | CollisionOrigin::OverhangCenter
                ) {
                    REVERSE_TICKS
                } else {
                    BACK_TICKS
                };
                ctx.arm(TimerId::Reverse, ticks);
                Step::pass(event)
            }
            EventKind::Timeout if TimerId::Reverse.fired(event) => match self.origin {
                CollisionOrigin::Wall | CollisionOrigin::Tape | CollisionOrigin::FrontRight => {
                    Step::to(Turn90Left)
                }
                CollisionOrigin::FrontLeft => Step::to(Turn90Right),
                CollisionOrigin::RearTape => Step::to(DriveForward),
                CollisionOrigin::Overhang => Step::to(Turn45Left),
                CollisionOrigin::OverhangCenter => Step::to(Turn180),
                _ => Step::consume(),
            },
            EventKind::TapeSensed if event.mask().is_rear_only() => {
                self.origin = CollisionOrigin::RearTape;
                Step::to(Turn90Left)
            }
            EventKind::Exit => {
                ctx.disarm(TimerId::Reverse);
                Step::pass(event)
            }
            _ => Step::pass(event),
        }
    }

    fn turn_90_right(&mut self, event: Event, ctx: &mut Context<'_>) -> Step<CollectSecondaryState> {
        match event.kind() {
            EventKind::Entry => {
                ctx.motion.spin(Turn::Right, DRIVE_SPEED);
                ctx.arm(TimerId::Collision, TURN_TICKS);
                Step::pass(event)
            }
            EventKind::Timeout if TimerId::Collision.fired(event) => {
                Step::to(CollectSecondaryState::DriveForward)
            }
            EventKind::Exit => {
                ctx.disarm(TimerId::Collision);
                Step::pass(event)
            }
            _ => Step::pass(event),
        }
    }

    fn turn_90_left(&mut self, event: Event, ctx: &mut Context<'_>) -> Step<CollectSecondaryState> {
        use CollectSecondaryState::*;
        match event.kind() {
            EventKind::Entry => {
                ctx.motion.spin(Turn::Left, DRIVE_SPEED);
                ctx.arm(TimerId::Collision, TURN_TICKS);
                Step::pass(event)
            }
            EventKind::Timeout if TimerId::Collision.fired(event) => {
                // Wall recoveries go back to crossing; everything else
                // resumes the tape follow.
                if matches!(
                    self.origin,
                    CollisionOrigin::BumpFrontRight
                        | CollisionOrigin::BumpFrontLeft
                        | CollisionOrigin::Wall
                ) {
                    Step::to(DriveForward)
                } else {
                    Step::to(TapeFollowRight)
                }
            }
            EventKind::Exit => {
                ctx.disarm(TimerId::Collision);
                Step::pass(event)
            }
            _ => Step::pass(event),
        }
    }

    fn turn_45_left(&mut self, event: Event, ctx: &mut Context<'_>) -> Step<CollectSecondaryState> {
        match event.kind() {
            EventKind::Entry => {
                ctx.motion.spin(Turn::Left, DRIVE_SPEED);
                ctx.arm(TimerId::Collision, HALF_TURN_TICKS);
                Step::pass(event)
            }
            EventKind::Timeout if TimerId::Collision.fired(event) => {
                Step::to(CollectSecondaryState::TapeFollowRight)
            }
            EventKind::Exit => {
                ctx.disarm(TimerId::Collision);
                Step::pass(event)
            }
            _ => Step::pass(event),
        }
    }

    fn turn_180(&mut self, event: Event, ctx: &mut Context<'_>) -> Step<CollectSecondaryState> {
        match event.kind() {
            EventKind::Entry => {
                ctx.motion.spin(Turn::Right, DRIVE_SPEED);
                ctx.arm(TimerId::Collision, FULL_TURN_TICKS);
                Step::pass(event)
            }
            EventKind::Timeout if TimerId::Collision.fired(event) => {
                Step::to(CollectSecondaryState::DriveForward)
            }
            EventKind::Exit => {
                ctx.disarm(TimerId::Collision);
                Step::pass(event)
            }
            _ => Step::pass(event),
        }
    }

    fn adjusting(
        &mut self,
        side: Turn,
        event: Event,
        ctx: &mut Context<'_>,
    ) -> Step<CollectSecondaryState> {
        use CollectSecondaryState::*;
        match event.kind() {
            EventKind::Entry => {
                ctx.motion.pivot(side, DRIVE_SPEED - 75);
                Step::pass(event)
            }
            EventKind::BumperChanged => {
                let mask = event.mask();
                if mask.is_front_both() || self.bump_count > BUMP_LIMIT {
                    self.bump_count = 0;
                    self.left_bumped = false;
                    self.right_bumped = false;
                    self.origin = CollisionOrigin::Wall;
                    Step::to(Reverse)
                } else if mask.is_front_left() {
                    self.origin = CollisionOrigin::BumpFrontLeft;
                    self.left_bumped = true;
                    Step::to(AlignReverse)
                } else if mask.is_front_right() {
                    self.origin = CollisionOrigin::BumpFrontRight;
                    self.right_bumped = true;
                    Step::to(AlignReverse)
                } else {
                    Step::pass(event)
                }
            }
            EventKind::TapeSensed => {
                let mask = event.mask();
                if mask.is_front_both() || self.align_count > ALIGN_LIMIT {
                    self.align_count = 0;
                    self.origin = CollisionOrigin::Tape;
                    Step::to(Reverse)
                } else if side == Turn::Right && mask.is_front_left() {
                    self.origin = CollisionOrigin::FrontLeft;
                    Step::to(AlignReverse)
                } else if side == Turn::Left && mask.is_front_right() {
                    self.origin = CollisionOrigin::FrontRight;
                    Step::to(AlignReverse)
                } else {
                    Step::pass(event)
                }
            }
            _ => Step::pass(event),
        }
    }
}

impl Behavior for CollectSecondary {
    type State = CollectSecondaryState;
    const NAME: &'static str = "collect-secondary";

    fn state(&self) -> CollectSecondaryState {
        self.state
    }

    fn set_state(&mut self, state: CollectSecondaryState) {
        self.state = state;
    }

    fn reset(&mut self) {
        *self = Self::new();
    }

    fn handle(
        &mut self,
        state: CollectSecondaryState,
        event: Event,
        ctx: &mut Context<'_>,
    ) -> Step<CollectSecondaryState> {
        use CollectSecondaryState::*;
        match state {
            Boot => self.boot(event),
            DriveForward => self.drive_forward(event, ctx),
            TapeFollowRight => self.tape_follow_right(event, ctx),
            RightAlign => self.right_align(event, ctx),
            FollowReverse => self.follow_reverse(event, ctx),
            Stop => self.stop(event, ctx),
            AlignReverse => self.align_reverse(event, ctx),
            Reverse => self.reverse(event, ctx),
            Turn90Right => self.turn_90_right(event, ctx),
            Turn90Left => self.turn_90_left(event, ctx),
            Turn45Left => self.turn_45_left(event, ctx),
            Turn180 => self.turn_180(event, ctx),
            AdjustingRight => self.adjusting(Turn::Right, event, ctx),
            AdjustingLeft => self.adjusting(Turn::Left, event, ctx),
        }
    }
}
