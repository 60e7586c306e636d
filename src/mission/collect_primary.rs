//! Primary collection: hug the arena walls and sweep balls into the
//! intake, recovering from tape, wall, and overhang contacts.
//!
//! One reversal family serves every collision cause via the recorded
//! origin, and the persisted spin bias makes each reversal arc back
//! toward the side the robot came from. Repeated one-sided contacts
//! escalate to a full reversal instead of micro-adjusting forever.

use crate::core::event::{Event, EventKind};
use crate::core::machine::{Behavior, Context, Step};
use crate::core::state::State;
use crate::motion::{Motion, Turn, DRIVE_SPEED, SPIN_SPEED};
use crate::timers::TimerId;
use serde::Serialize;

use super::{CollisionOrigin, SpinSide};

const REVERSE_TICKS: u32 = 400;
const SHORT_REVERSE_TICKS: u32 = 200;
const TURN_TICKS: u32 = 1_000;
const HALF_TURN_TICKS: u32 = 500;
const FORWARD_TICKS: u32 = 1_000;
const FOLLOW_WATCHDOG_TICKS: u32 = 5_000;
const NUDGE_TICKS: u32 = 100;

/// Consecutive one-sided tape contacts tolerated before escalating.
const ALIGN_LIMIT: u8 = 2;
/// Consecutive alternating bumper contacts tolerated before escalating.
const BUMP_LIMIT: u8 = 2;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
pub enum CollectPrimaryState {
    Boot,
    Reverse,
    CollisionReverse,
    StuckReverse,
    Turn90Left,
    Turn90Right,
    Turn45Left,
    Turn45Right,
    Adjust90Left,
    WallFollow,
    WallAdjust,
    FarWallFollow,
    FarWallAdjust,
    DriveForward,
    AdjustingLeft,
    AdjustingRight,
    AlignReverse,
}

impl State for CollectPrimaryState {
    fn name(&self) -> &'static str {
        match self {
            Self::Boot => "Boot",
            Self::Reverse => "Reverse",
            Self::CollisionReverse => "CollisionReverse",
            Self::StuckReverse => "StuckReverse",
            Self::Turn90Left => "Turn90Left",
            Self::Turn90Right => "Turn90Right",
            Self::Turn45Left => "Turn45Left",
            Self::Turn45Right => "Turn45Right",
            Self::Adjust90Left => "Adjust90Left",
            Self::WallFollow => "WallFollow",
            Self::WallAdjust => "WallAdjust",
            Self::FarWallFollow => "FarWallFollow",
            Self::FarWallAdjust => "FarWallAdjust",
            Self::DriveForward => "DriveForward",
            Self::AdjustingLeft => "AdjustingLeft",
            Self::AdjustingRight => "AdjustingRight",
            Self::AlignReverse => "AlignReverse",
        }
    }

    fn is_initial(&self) -> bool {
        matches!(self, Self::Boot)
    }
}

/// The primary collection substate machine.
#[derive(Debug)]
pub struct CollectPrimary {
    state: CollectPrimaryState,
    origin: CollisionOrigin,
    spin: SpinSide,
    align_count: u8,
    bump_count: u8,
    left_bumped: bool,
    right_bumped: bool,
    from_wall: bool,
}

impl Default for CollectPrimary {
    fn default() -> Self {
        Self::new()
    }
}

impl CollectPrimary {
    pub fn new() -> Self {
        Self {
            state: CollectPrimaryState::Boot,
            origin: CollisionOrigin::None,
            spin: SpinSide::None,
            align_count: 0,
            bump_count: 0,
            left_bumped: false,
            right_bumped: false,
            from_wall: false,
        }
    }

    /// Tape handling shared by the follow/adjust states: single-side
    /// front contacts go to align-reverse; both-sides (or an escalated
    /// count) forces a full reversal.
    fn follow_tape(&mut self, event: Event) -> Option<Step<CollectPrimaryState>> {
        use CollectPrimaryState::*;
        let mask = event.mask();
        if mask.is_front_both() || self.align_count > ALIGN_LIMIT {
            self.align_count = 0;
            self.origin = CollisionOrigin::Tape;
            return Some(Step::to(Reverse));
        }
        if mask.is_front_left() {
            self.origin = CollisionOrigin::FrontLeft;
            return Some(Step::to(AlignReverse));
        }
        if mask.is_front_right() {
            self.origin = CollisionOrigin::FrontRight;
            return Some(Step::to(AlignReverse));
        }
        None
    }

    /// Bumper handling shared by drive-forward and the adjusting
    /// states: both-front (or an escalated count) means a wall head-on.
    fn forward_bump(&mut self, event: Event) -> Option<Step<CollectPrimaryState>> {
        use CollectPrimaryState::*;
        let mask = event.mask();
        if mask.is_front_both() || self.bump_count > BUMP_LIMIT {
            self.bump_count = 0;
            self.left_bumped = false;
            self.right_bumped = false;
            self.from_wall = true;
            self.origin = CollisionOrigin::Wall;
            return Some(Step::to(Reverse));
        }
        if mask.is_front_left() {
            self.origin = CollisionOrigin::BumpFrontLeft;
            self.left_bumped = true;
            return Some(Step::to(AlignReverse));
        }
        if mask.is_front_right() {
            self.origin = CollisionOrigin::BumpFrontRight;
            self.right_bumped = true;
            return Some(Step::to(AlignReverse));
        }
        None
    }

    fn boot(&mut self, event: Event) -> Step<CollectPrimaryState> {
        match event.kind() {
            EventKind::Init => {
                self.origin = CollisionOrigin::None;
                self.spin = SpinSide::None;
                Step::to(CollectPrimaryState::Reverse)
            }
            _ => Step::pass(event),
        }
    }

    fn reverse(&mut self, event: Event, ctx: &mut Context<'_>) -> Step<CollectPrimaryState> {
        use CollectPrimaryState::*;
        match event.kind() {
            EventKind::Entry => {
                // Arc back toward the side the last follow came from.
                match self.spin {
                    SpinSide::None | SpinSide::Right => ctx.motion.veer(Turn::Left, -DRIVE_SPEED),
                    SpinSide::Left => ctx.motion.veer(Turn::Right, -DRIVE_SPEED),
                }
                let ticks = if self.origin == CollisionOrigin::Tape {
                    REVERSE_TICKS
                } else {
                    SHORT_REVERSE_TICKS
                };
                ctx.arm(TimerId::Check, ticks);
                Step::pass(event)
            }
            EventKind::Timeout if TimerId::Check.fired(event) => match self.spin {
                SpinSide::None => Step::to(Turn90Left),
                SpinSide::Left => Step::to(Adjust90Left),
                SpinSide::Right => Step::to(Turn90Right),
            },
            EventKind::TapeSensed => Step::consume(),
            EventKind::Exit => {
                ctx.disarm(TimerId::Check);
                Step::pass(event)
            }
            _ => Step::pass(event),
        }
    }

    fn collision_reverse(&mut self, event: Event, ctx: &mut Context<'_>) -> Step<CollectPrimaryState> {
        use CollectPrimaryState::*;
        match event.kind() {
            EventKind::Entry => {
                ctx.motion.drive(-DRIVE_SPEED);
                ctx.arm(TimerId::Reverse, SHORT_REVERSE_TICKS);
                Step::pass(event)
            }
            EventKind::Timeout if TimerId::Reverse.fired(event) => match self.spin {
                SpinSide::Left => Step::to(Turn45Right),
                SpinSide::Right => Step::to(Turn45Left),
                SpinSide::None => Step::consume(),
            },
            EventKind::TapeSensed => Step::consume(),
            EventKind::Exit => {
                ctx.disarm(TimerId::Reverse);
                Step::pass(event)
            }
            _ => Step::pass(event),
        }
    }

    fn stuck_reverse(&mut self, event: Event, ctx: &mut Context<'_>) -> Step<CollectPrimaryState> {
        use CollectPrimaryState::*;
        match event.kind() {
            EventKind::Entry => {
                ctx.motion.drive(-DRIVE_SPEED);
                ctx.arm(TimerId::Check, SHORT_REVERSE_TICKS);
                Step::pass(event)
            }
            EventKind::Timeout if TimerId::Check.fired(event) => match self.spin {
                SpinSide::Left => {
                    self.from_wall = true;
                    Step::to(Turn90Right)
                }
                SpinSide::Right => Step::to(Turn90Left),
                SpinSide::None => Step::consume(),
            },
            EventKind::TapeSensed => Step::consume(),
            EventKind::Exit => {
                ctx.disarm(TimerId::Check);
                Step::pass(event)
            }
            _ => Step::pass(event),
        }
    }

    fn turn_90_left(&mut self, event: Event, ctx: &mut Context<'_>) -> Step<CollectPrimaryState> {
        match event.kind() {
            EventKind::Entry => {
                ctx.arm(TimerId::Follow, TURN_TICKS);
                ctx.motion.spin(Turn::Left, SPIN_SPEED);
                Step::pass(event)
            }
            EventKind::Timeout if TimerId::Follow.fired(event) => {
                Step::to(CollectPrimaryState::WallFollow)
            }
            EventKind::Exit => {
                ctx.disarm(TimerId::Follow);
                Step::pass(event)
            }
            _ => Step::pass(event),
        }
    }

    fn adjust_90_left(&mut self, event: Event, ctx: &mut Context<'_>) -> Step<CollectPrimaryState> {
        use CollectPrimaryState::*;
        match event.kind() {
            EventKind::Entry => {
                ctx.arm(TimerId::Follow, TURN_TICKS);
                ctx.motion.spin(Turn::Left, SPIN_SPEED);
                Step::pass(event)
            }
            EventKind::Timeout if TimerId::Follow.fired(event) => {
                if self.from_wall {
                    Step::to(WallFollow)
                } else {
                    Step::to(DriveForward)
                }
            }
            EventKind::Exit => {
                ctx.disarm(TimerId::Follow);
                Step::pass(event)
            }
            _ => Step::pass(event),
        }
    }

    fn turn_45_left(&mut self, event: Event, ctx: &mut Context<'_>) -> Step<CollectPrimaryState> {
        match event.kind() {
            EventKind::Entry => {
                ctx.arm(TimerId::Follow, HALF_TURN_TICKS);
                ctx.motion.spin(Turn::Left, SPIN_SPEED);
                Step::pass(event)
            }
            EventKind::Timeout if TimerId::Follow.fired(event) => {
                Step::to(CollectPrimaryState::WallFollow)
            }
            EventKind::Exit => {
                ctx.disarm(TimerId::Follow);
                Step::pass(event)
            }
            _ => Step::pass(event),
        }
    }

    fn turn_45_right(&mut self, event: Event, ctx: &mut Context<'_>) -> Step<CollectPrimaryState> {
        match event.kind() {
            EventKind::Entry => {
                ctx.arm(TimerId::Follow, HALF_TURN_TICKS);
                ctx.motion.spin(Turn::Right, SPIN_SPEED);
                Step::pass(event)
            }
            EventKind::Timeout if TimerId::Follow.fired(event) => {
                Step::to(CollectPrimaryState::FarWallFollow)
            }
            EventKind::Exit => {
                ctx.disarm(TimerId::Follow);
                Step::pass(event)
            }
            _ => Step::pass(event),
        }
    }

    fn turn_90_right(&mut self, event: Event, ctx: &mut Context<'_>) -> Step<CollectPrimaryState> {
        use CollectPrimaryState::*;
        match event.kind() {
            EventKind::Entry => {
                ctx.arm(TimerId::Follow, TURN_TICKS);
                ctx.motion.spin(Turn::Right, SPIN_SPEED);
                Step::pass(event)
            }
            EventKind::Timeout if TimerId::Follow.fired(event) => {
                if self.from_wall {
                    Step::to(FarWallFollow)
                } else {
                    Step::to(DriveForward)
                }
            }
            EventKind::Exit => {
                ctx.disarm(TimerId::Follow);
                Step::pass(event)
            }
            _ => Step::pass(event),
        }
    }

    fn wall_follow(&mut self, event: Event, ctx: &mut Context<'_>) -> Step<CollectPrimaryState> {
        use CollectPrimaryState::*;
        match event.kind() {
            EventKind::Entry => {
                self.spin = SpinSide::Right;
                self.from_wall = false;
                ctx.motion.drag(DRIVE_SPEED, DRIVE_SPEED - 200);
                ctx.arm(TimerId::Collision, FOLLOW_WATCHDOG_TICKS);
                Step::pass(event)
            }
            EventKind::WallFound | EventKind::BumperChanged => Step::to(WallAdjust),
            EventKind::TopBumperChanged => Step::to(CollisionReverse),
            EventKind::TapeSensed => self.follow_tape(event).unwrap_or(Step::pass(event)),
            EventKind::Timeout if TimerId::Collision.fired(event) => Step::to(Reverse),
            EventKind::Exit => {
                ctx.disarm(TimerId::Collision);
                Step::pass(event)
            }
            _ => Step::pass(event),
        }
    }

    fn wall_adjust(&mut self, event: Event, ctx: &mut Context<'_>) -> Step<CollectPrimaryState> {
        use CollectPrimaryState::*;
        match event.kind() {
            EventKind::Entry => {
                ctx.motion.spin(Turn::Left, DRIVE_SPEED - 100);
                Step::pass(event)
            }
            EventKind::WallLost => Step::to(WallFollow),
            EventKind::TopBumperChanged => Step::to(CollisionReverse),
            EventKind::TapeSensed => self.follow_tape(event).unwrap_or(Step::pass(event)),
            _ => Step::pass(event),
        }
    }

    fn far_wall_follow(&mut self, event: Event, ctx: &mut Context<'_>) -> Step<CollectPrimaryState> {
        use CollectPrimaryState::*;
        match event.kind() {
            EventKind::Entry => {
                self.spin = SpinSide::Left;
                self.from_wall = false;
                ctx.motion.drag(DRIVE_SPEED - 400, DRIVE_SPEED);
                ctx.arm(TimerId::Collision, FOLLOW_WATCHDOG_TICKS);
                Step::pass(event)
            }
            EventKind::FarWallFound | EventKind::BumperChanged => Step::to(FarWallAdjust),
            EventKind::TopBumperChanged => Step::to(CollisionReverse),
            EventKind::TapeSensed => self.follow_tape(event).unwrap_or(Step::pass(event)),
            EventKind::Timeout if TimerId::Collision.fired(event) => Step::to(Reverse),
            EventKind::Exit => {
                ctx.disarm(TimerId::Collision);
                Step::pass(event)
            }
            _ => Step::pass(event),
        }
    }

    fn far_wall_adjust(&mut self, event: Event, ctx: &mut Context<'_>) -> Step<CollectPrimaryState> {
        use CollectPrimaryState::*;
        match event.kind() {
            EventKind::Entry => {
                ctx.motion.spin(Turn::Right, DRIVE_SPEED - 300);
                Step::pass(event)
            }
            EventKind::FarWallLost => Step::to(FarWallFollow),
            EventKind::TopBumperChanged => Step::to(CollisionReverse),
            EventKind::TapeSensed => self.follow_tape(event).unwrap_or(Step::pass(event)),
            _ => Step::pass(event),
        }
    }

    fn drive_forward(&mut self, event: Event, ctx: &mut Context<'_>) -> Step<CollectPrimaryState> {
        use CollectPrimaryState::*;
        match event.kind() {
            EventKind::Entry => {
                ctx.motion.drive(DRIVE_SPEED);
                ctx.arm(TimerId::Follow, FORWARD_TICKS);
                Step::pass(event)
            }
            EventKind::BumperChanged => self.forward_bump(event).unwrap_or(Step::pass(event)),
            EventKind::Timeout if TimerId::Follow.fired(event) => {
                self.bump_count = 0;
                self.left_bumped = false;
                self.right_bumped = false;
                self.from_wall = true;
                Step::to(Reverse)
            }
            EventKind::Exit => {
                ctx.disarm(TimerId::Follow);
                Step::pass(event)
            }
            _ => Step::pass(event),
        }
    }

    fn adjusting_right(&mut self, event: Event, ctx: &mut Context<'_>) -> Step<CollectPrimaryState> {
        use CollectPrimaryState::*;
        match event.kind() {
            EventKind::Entry => {
                ctx.motion.pivot(Turn::Right, DRIVE_SPEED - 75);
                Step::pass(event)
            }
            EventKind::TapeSensed => {
                let mask = event.mask();
                if mask.is_front_both() || self.align_count > ALIGN_LIMIT {
                    self.align_count = 0;
                    self.origin = CollisionOrigin::Tape;
                    Step::to(Reverse)
                } else if mask.is_front_left() {
                    self.origin = CollisionOrigin::FrontLeft;
                    Step::to(AlignReverse)
                } else {
                    Step::pass(event)
                }
            }
            EventKind::BumperChanged => self.forward_bump(event).unwrap_or(Step::pass(event)),
            _ => Step::pass(event),
        }
    }

    fn adjusting_left(&mut self, event: Event, ctx: &mut Context<'_>) -> Step<CollectPrimaryState> {
        use CollectPrimaryState::*;
        match event.kind() {
            EventKind::Entry => {
                ctx.motion.pivot(Turn::Left, DRIVE_SPEED - 75);
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
                } else {
                    Step::pass(event)
                }
            }
            EventKind::BumperChanged => self.forward_bump(event).unwrap_or(Step::pass(event)),
            _ => Step::pass(event),
        }
    }

    fn align_reverse(&mut self, event: Event, ctx: &mut Context<'_>) -> Step<CollectPrimaryState> {
        use CollectPrimaryState::*;
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
}

impl Behavior for CollectPrimary {
    type State = CollectPrimaryState;
    const NAME: &'static str = "collect-primary";

    fn state(&self) -> CollectPrimaryState {
        self.state
    }

    fn set_state(&mut self, state: CollectPrimaryState) {
        self.state = state;
    }

    fn reset(&mut self) {
        *self = Self::new();
    }

    fn handle(
        &mut self,
        state: CollectPrimaryState,
        event: Event,
        ctx: &mut Context<'_>,
    ) -> Step<CollectPrimaryState> {
        use CollectPrimaryState::*;
        match state {
            Boot => self.boot(event),
            Reverse => self.reverse(event, ctx),
            CollisionReverse => self.collision_reverse(event, ctx),
            StuckReverse => self.stuck_reverse(event, ctx),
            Turn90Left => self.turn_90_left(event, ctx),
            Turn90Right => self.turn_90_right(event, ctx),
            Turn45Left => self.turn_45_left(event, ctx),
            Turn45Right => self.turn_45_right(event, ctx),
            Adjust90Left => self.adjust_90_left(event, ctx),
            WallFollow => self.wall_follow(event, ctx),
            WallAdjust => self.wall_adjust(event, ctx),
            FarWallFollow => self.far_wall_follow(event, ctx),
            FarWallAdjust => self.far_wall_adjust(event, ctx),
            DriveForward => self.drive_forward(event, ctx),
            AdjustingLeft => self.adjusting_left(event, ctx),
            AdjustingRight => self.adjusting_right(event, ctx),
            AlignReverse => self.align_reverse(event, ctx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::machine::Machine;
    use crate::core::mask::SensorMask;
    use crate::motion::MotionCommand;
    use crate::testkit::Rig;

    fn tape(mask: SensorMask) -> Event {
        Event::new(EventKind::TapeSensed, mask.bits() as u16)
    }

    fn bump(mask: SensorMask) -> Event {
        Event::new(EventKind::BumperChanged, mask.bits() as u16)
    }

    #[test]
    fn init_backs_out_before_the_first_turn() {
        let mut rig = Rig::new();
        let mut collect = CollectPrimary::new();
        collect.init(&mut rig.ctx()).unwrap();

        assert_eq!(collect.state, CollectPrimaryState::Reverse);
        // No bias yet: the reverse arcs left.
        assert_eq!(
            rig.motion.last(),
            Some(MotionCommand::Veer(Turn::Left, -DRIVE_SPEED))
        );
        assert!(rig.timers.is_active(TimerId::Check));
    }

    #[test]
    fn first_reverse_leads_to_the_near_wall() {
        let mut rig = Rig::new();
        let mut collect = CollectPrimary::new();
        collect.init(&mut rig.ctx()).unwrap();

        collect.run(TimerId::Check.timeout(), &mut rig.ctx());
        assert_eq!(collect.state, CollectPrimaryState::Turn90Left);

        collect.run(TimerId::Follow.timeout(), &mut rig.ctx());
        assert_eq!(collect.state, CollectPrimaryState::WallFollow);
        assert_eq!(
            rig.motion.last(),
            Some(MotionCommand::Drag(DRIVE_SPEED, DRIVE_SPEED - 200))
        );
        assert_eq!(collect.spin, SpinSide::Right);
    }

    fn follow(rig: &mut Rig, collect: &mut CollectPrimary) {
        collect.init(&mut rig.ctx()).unwrap();
        collect.run(TimerId::Check.timeout(), &mut rig.ctx());
        collect.run(TimerId::Follow.timeout(), &mut rig.ctx());
        assert_eq!(collect.state, CollectPrimaryState::WallFollow);
    }

    #[test]
    fn wall_contact_alternates_follow_and_adjust() {
        let mut rig = Rig::new();
        let mut collect = CollectPrimary::new();
        follow(&mut rig, &mut collect);

        collect.run(Event::signal(EventKind::WallFound), &mut rig.ctx());
        assert_eq!(collect.state, CollectPrimaryState::WallAdjust);
        assert_eq!(
            rig.motion.last(),
            Some(MotionCommand::Spin(Turn::Left, DRIVE_SPEED - 100))
        );

        collect.run(Event::signal(EventKind::WallLost), &mut rig.ctx());
        assert_eq!(collect.state, CollectPrimaryState::WallFollow);
    }

    #[test]
    fn one_sided_tape_goes_to_align_reverse() {
        let mut rig = Rig::new();
        let mut collect = CollectPrimary::new();
        follow(&mut rig, &mut collect);

        collect.run(tape(SensorMask::FRONT_LEFT), &mut rig.ctx());
        assert_eq!(collect.state, CollectPrimaryState::AlignReverse);
        assert_eq!(collect.origin, CollisionOrigin::FrontLeft);
        assert_eq!(collect.align_count, 1);
    }

    #[test]
    fn repeated_partial_tape_escalates_to_full_reversal() {
        let mut rig = Rig::new();
        let mut collect = CollectPrimary::new();
        follow(&mut rig, &mut collect);

        // Three partial hits (alternating sides, as happens against a
        // boundary at a shallow angle) stay below the threshold.
        let sides = [
            (SensorMask::FRONT_LEFT, CollectPrimaryState::AdjustingLeft),
            (SensorMask::FRONT_RIGHT, CollectPrimaryState::AdjustingRight),
            (SensorMask::FRONT_LEFT, CollectPrimaryState::AdjustingLeft),
        ];
        for (mask, adjust) in sides {
            collect.run(tape(mask), &mut rig.ctx());
            assert_eq!(collect.state, CollectPrimaryState::AlignReverse);
            collect.run(
                Event::new(EventKind::TapeCleared, mask.bits() as u16),
                &mut rig.ctx(),
            );
            assert_eq!(collect.state, adjust);
        }
        assert_eq!(collect.align_count, 3);

        // The next partial hit counts as a head-on.
        collect.run(tape(SensorMask::FRONT_RIGHT), &mut rig.ctx());
        assert_eq!(collect.state, CollectPrimaryState::Reverse);
        assert_eq!(collect.origin, CollisionOrigin::Tape);
        assert_eq!(collect.align_count, 0);
    }

    #[test]
    fn bump_nudge_timer_picks_the_matching_adjust() {
        let mut rig = Rig::new();
        let mut collect = CollectPrimary::new();
        collect.init(&mut rig.ctx()).unwrap();
        collect.set_state(CollectPrimaryState::DriveForward);

        collect.run(bump(SensorMask::FRONT_LEFT), &mut rig.ctx());
        assert_eq!(collect.state, CollectPrimaryState::AlignReverse);
        assert_eq!(collect.origin, CollisionOrigin::BumpFrontLeft);
        assert!(rig.timers.is_active(TimerId::Reverse));
        assert_eq!(rig.timers.remaining(TimerId::Reverse), Some(NUDGE_TICKS));

        collect.run(TimerId::Reverse.timeout(), &mut rig.ctx());
        assert_eq!(collect.state, CollectPrimaryState::AdjustingLeft);
        assert_eq!(
            rig.motion.last(),
            Some(MotionCommand::Pivot(Turn::Left, DRIVE_SPEED - 75))
        );
    }

    #[test]
    fn head_on_bump_records_the_wall_and_reverses() {
        let mut rig = Rig::new();
        let mut collect = CollectPrimary::new();
        collect.init(&mut rig.ctx()).unwrap();
        collect.set_state(CollectPrimaryState::DriveForward);

        collect.run(bump(SensorMask::FRONT_BOTH), &mut rig.ctx());
        assert_eq!(collect.state, CollectPrimaryState::Reverse);
        assert_eq!(collect.origin, CollisionOrigin::Wall);
        assert!(collect.from_wall);
    }

    #[test]
    fn spin_bias_steers_the_reversal() {
        let mut rig = Rig::new();
        let mut collect = CollectPrimary::new();
        follow(&mut rig, &mut collect);
        assert_eq!(collect.spin, SpinSide::Right);

        // Follow watchdog: back out of the corner.
        collect.run(TimerId::Collision.timeout(), &mut rig.ctx());
        assert_eq!(collect.state, CollectPrimaryState::Reverse);
        assert_eq!(
            rig.motion.last(),
            Some(MotionCommand::Veer(Turn::Left, -DRIVE_SPEED))
        );

        collect.run(TimerId::Check.timeout(), &mut rig.ctx());
        assert_eq!(collect.state, CollectPrimaryState::Turn90Right);
    }

    #[test]
    fn far_wall_cycle_biases_left() {
        let mut rig = Rig::new();
        let mut collect = CollectPrimary::new();
        collect.init(&mut rig.ctx()).unwrap();
        collect.set_state(CollectPrimaryState::FarWallFollow);
        collect.run(Event::entry(), &mut rig.ctx());
        assert_eq!(collect.spin, SpinSide::Left);
        assert_eq!(
            rig.motion.last(),
            Some(MotionCommand::Drag(DRIVE_SPEED - 400, DRIVE_SPEED))
        );

        collect.run(Event::signal(EventKind::FarWallFound), &mut rig.ctx());
        assert_eq!(collect.state, CollectPrimaryState::FarWallAdjust);
        collect.run(Event::signal(EventKind::FarWallLost), &mut rig.ctx());
        assert_eq!(collect.state, CollectPrimaryState::FarWallFollow);
    }

    #[test]
    fn overhang_contact_backs_straight_out() {
        let mut rig = Rig::new();
        let mut collect = CollectPrimary::new();
        follow(&mut rig, &mut collect);

        collect.run(Event::new(EventKind::TopBumperChanged, 0b11), &mut rig.ctx());
        assert_eq!(collect.state, CollectPrimaryState::CollisionReverse);
        assert_eq!(rig.motion.last(), Some(MotionCommand::Drive(-DRIVE_SPEED)));

        // Right bias (set by wall follow): recover with a left 45.
        collect.run(TimerId::Reverse.timeout(), &mut rig.ctx());
        assert_eq!(collect.state, CollectPrimaryState::Turn45Left);
    }

    #[test]
    fn rear_tape_while_reversing_is_consumed() {
        let mut rig = Rig::new();
        let mut collect = CollectPrimary::new();
        collect.init(&mut rig.ctx()).unwrap();

        let out = collect.run(tape(SensorMask::REAR_BOTH), &mut rig.ctx());
        assert!(out.is_none());
        assert_eq!(collect.state, CollectPrimaryState::Reverse);
    }
}
