//! Motion primitives.
//!
//! All motion is open-loop: named maneuvers expressed as two independent
//! signed wheel speeds, issued afresh from state ENTRY handlers. The
//! exact speed deltas encode the emergent turning behavior, so they live
//! here as named constants rather than in the transition tables.
//!
//! [`MotorOutputs`] is the hardware seam; [`DifferentialMotion`] does the
//! wheel math on top of it. [`RecordedMotion`] captures issued commands
//! for exercising the state machines without hardware.

use serde::{Deserialize, Serialize};

/// Platform maximum wheel speed; commands are clamped to ±this.
pub const MAX_SPEED: i16 = 1000;
/// Normal travel speed.
pub const DRIVE_SPEED: i16 = 900;
/// In-place rotation speed.
pub const SPIN_SPEED: i16 = 600;
/// Continuous duty speed for the intake roller.
pub const ROLLER_SPEED: i16 = 400;
pub const NO_SPEED: i16 = 0;

/// Speed decrement applied to the inner wheel during a gentle turn.
/// A sharp turn stops the inner wheel entirely.
pub const VEER_DROP: i16 = 300;

/// Turn direction, from the robot's point of view.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum Turn {
    Left,
    Right,
}

impl Turn {
    pub fn opposite(self) -> Self {
        match self {
            Turn::Left => Turn::Right,
            Turn::Right => Turn::Left,
        }
    }
}

/// Non-wheel actuators: the intake roller, the ball gate, and the
/// dispensing paddle.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum Auxiliary {
    Roller,
    Gate,
    Paddle,
}

/// The raw motor interface provided by the platform.
///
/// Speeds are signed; magnitude is bounded by [`MAX_SPEED`]. Callers of
/// this trait (the [`DifferentialMotion`] adapter) clamp before writing.
pub trait MotorOutputs {
    fn set_wheels(&mut self, left: i16, right: i16);
    fn set_auxiliary(&mut self, target: Auxiliary, speed: i16);
}

/// Named drive maneuvers. Stateless: each call fully determines the
/// wheel commands.
pub trait Motion {
    /// Symmetric drive; negative speed reverses.
    fn drive(&mut self, speed: i16);

    /// In-place rotation: opposite signs, equal magnitude.
    fn spin(&mut self, dir: Turn, speed: i16);

    /// Gentle turn: inner wheel runs [`VEER_DROP`] below the commanded
    /// speed.
    fn veer(&mut self, dir: Turn, speed: i16);

    /// Sharp turn: inner wheel stopped.
    fn pivot(&mut self, dir: Turn, speed: i16);

    /// Asymmetric drag with two independent speeds; the offset itself is
    /// the control signal during wall following.
    fn drag(&mut self, left: i16, right: i16);

    /// Stop both wheels.
    fn halt(&mut self) {
        self.drive(NO_SPEED);
    }

    /// Command an auxiliary actuator.
    fn auxiliary(&mut self, target: Auxiliary, speed: i16);
}

fn clamp(speed: i16) -> i16 {
    speed.clamp(-MAX_SPEED, MAX_SPEED)
}

/// Differential-drive adapter translating named maneuvers into wheel
/// speed pairs.
///
/// # Example
///
/// ```rust
/// use reflex::motion::{DifferentialMotion, Motion, MotorOutputs, Auxiliary, Turn};
///
/// #[derive(Default)]
/// struct Wheels {
///     last: (i16, i16),
/// }
///
/// impl MotorOutputs for Wheels {
///     fn set_wheels(&mut self, left: i16, right: i16) {
///         self.last = (left, right);
///     }
///     fn set_auxiliary(&mut self, _target: Auxiliary, _speed: i16) {}
/// }
///
/// let mut motion = DifferentialMotion::new(Wheels::default());
/// motion.pivot(Turn::Right, 900);
/// assert_eq!(motion.outputs().last, (900, 0));
/// ```
#[derive(Debug, Default)]
pub struct DifferentialMotion<M> {
    outputs: M,
}

impl<M> DifferentialMotion<M> {
    pub fn new(outputs: M) -> Self {
        Self { outputs }
    }

    pub fn outputs(&self) -> &M {
        &self.outputs
    }

    pub fn outputs_mut(&mut self) -> &mut M {
        &mut self.outputs
    }

    pub fn into_inner(self) -> M {
        self.outputs
    }
}

impl<M: MotorOutputs> Motion for DifferentialMotion<M> {
    fn drive(&mut self, speed: i16) {
        let speed = clamp(speed);
        self.outputs.set_wheels(speed, speed);
    }

    fn spin(&mut self, dir: Turn, speed: i16) {
        let speed = clamp(speed);
        match dir {
            Turn::Right => self.outputs.set_wheels(speed, -speed),
            Turn::Left => self.outputs.set_wheels(-speed, speed),
        }
    }

    fn veer(&mut self, dir: Turn, speed: i16) {
        let inner = clamp(speed - VEER_DROP);
        let outer = clamp(speed);
        match dir {
            Turn::Right => self.outputs.set_wheels(outer, inner),
            Turn::Left => self.outputs.set_wheels(inner, outer),
        }
    }

    fn pivot(&mut self, dir: Turn, speed: i16) {
        let speed = clamp(speed);
        match dir {
            Turn::Right => self.outputs.set_wheels(speed, NO_SPEED),
            Turn::Left => self.outputs.set_wheels(NO_SPEED, speed),
        }
    }

    fn drag(&mut self, left: i16, right: i16) {
        self.outputs.set_wheels(clamp(left), clamp(right));
    }

    fn auxiliary(&mut self, target: Auxiliary, speed: i16) {
        self.outputs.set_auxiliary(target, clamp(speed));
    }
}

/// One issued motion command, as recorded by [`RecordedMotion`].
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
pub enum MotionCommand {
    Drive(i16),
    Spin(Turn, i16),
    Veer(Turn, i16),
    Pivot(Turn, i16),
    Drag(i16, i16),
    Halt,
    Auxiliary(Auxiliary, i16),
}

/// Test double recording every maneuver in order.
#[derive(Debug, Default)]
pub struct RecordedMotion {
    commands: Vec<MotionCommand>,
}

impl RecordedMotion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[MotionCommand] {
        &self.commands
    }

    pub fn last(&self) -> Option<MotionCommand> {
        self.commands.last().copied()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }
}

impl Motion for RecordedMotion {
    fn drive(&mut self, speed: i16) {
        self.commands.push(MotionCommand::Drive(speed));
    }

    fn spin(&mut self, dir: Turn, speed: i16) {
        self.commands.push(MotionCommand::Spin(dir, speed));
    }

    fn veer(&mut self, dir: Turn, speed: i16) {
        self.commands.push(MotionCommand::Veer(dir, speed));
    }

    fn pivot(&mut self, dir: Turn, speed: i16) {
        self.commands.push(MotionCommand::Pivot(dir, speed));
    }

    fn drag(&mut self, left: i16, right: i16) {
        self.commands.push(MotionCommand::Drag(left, right));
    }

    fn halt(&mut self) {
        self.commands.push(MotionCommand::Halt);
    }

    fn auxiliary(&mut self, target: Auxiliary, speed: i16) {
        self.commands.push(MotionCommand::Auxiliary(target, speed));
    }
}
