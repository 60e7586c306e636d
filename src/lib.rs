//! Reflex: hierarchical state machine behavior core for an autonomous
//! collection robot.
//!
//! The crate arbitrates debounced sensor events (bumper contacts, tape
//! crossings, track-wire and beacon detections) into timed open-loop
//! motor actions across a sequence of mission phases. A top-level
//! [`Mission`](mission::Mission) orchestrator delegates every event to
//! the active phase's substate machine; the child either consumes the
//! event or promotes a mission signal back up, which is the only channel
//! it has to report phase completion.
//!
//! # Core Concepts
//!
//! - **Event**: an immutable kind + param value, rewritten (never
//!   mutated in place) as it climbs back out of nested dispatch
//! - **Behavior**: one machine's transition table plus its private
//!   scalars; the [`Machine`](crate::core::machine::Machine) driver
//!   wraps it in the EXIT-then-ENTRY transition protocol
//! - **Timer ownership**: a state that arms a timer must disarm it on
//!   exit; the driver reclaims and reports leaks, and the one deliberate
//!   cross-state timer (the mission watchdog) is declared machine-owned
//!
//! # Example
//!
//! ```rust
//! use reflex::core::history::TransitionLog;
//! use reflex::core::machine::{Context, Machine};
//! use reflex::mission::{Mission, Phase};
//! use reflex::motion::RecordedMotion;
//! use reflex::timers::TimerRegistry;
//!
//! let mut timers = TimerRegistry::new();
//! let mut motion = RecordedMotion::new();
//! let mut trace = TransitionLog::new();
//! let mut mission = Mission::new();
//!
//! let mut ctx = Context::new(&mut timers, &mut motion, &mut trace);
//! mission.init(&mut ctx).expect("clean init");
//! assert_eq!(mission.phase(), Phase::BeaconSearch);
//!
//! // The host loop: tick timers, dispatch whatever fired.
//! let fired = timers.tick();
//! for event in fired {
//!     let mut ctx = Context::new(&mut timers, &mut motion, &mut trace);
//!     mission.run(event, &mut ctx);
//! }
//! ```

pub mod classifier;
pub mod core;
pub mod mission;
pub mod motion;
pub mod timers;

pub use self::core::event::{Event, EventKind};
pub use self::core::history::{TransitionLog, TransitionRecord};
pub use self::core::machine::{Behavior, Context, InitError, Machine, Step};
pub use self::core::mask::{PairMask, SensorMask};
pub use self::core::state::State;
pub use self::mission::{Mission, Phase};
pub use self::timers::{TimerId, TimerOwner, TimerRegistry};

#[cfg(test)]
pub(crate) mod testkit {
    //! Shared rig for unit tests: a timer registry, a command-recording
    //! motion double, and a transition log.

    use crate::core::history::TransitionLog;
    use crate::core::machine::Context;
    use crate::motion::RecordedMotion;
    use crate::timers::TimerRegistry;

    pub(crate) struct Rig {
        pub timers: TimerRegistry,
        pub motion: RecordedMotion,
        pub trace: TransitionLog,
    }

    impl Rig {
        pub fn new() -> Self {
            Self {
                timers: TimerRegistry::new(),
                motion: RecordedMotion::new(),
                trace: TransitionLog::new(),
            }
        }

        pub fn ctx(&mut self) -> Context<'_> {
            Context::new(&mut self.timers, &mut self.motion, &mut self.trace)
        }
    }
}
