//! Core dispatch protocol shared by every state machine in the crate.
//!
//! This module contains the pieces that know nothing about the robot
//! mission itself:
//! - `Event` values and the closed event vocabulary
//! - typed sensor bit masks replacing raw numeric params
//! - the `State` trait for named state identifiers
//! - the `Behavior` table trait and the `Machine` dispatch driver
//! - the tick-stamped transition log

pub mod event;
pub mod history;
pub mod machine;
pub mod mask;
pub mod state;

pub use event::{Event, EventKind};
pub use history::{TransitionLog, TransitionRecord};
pub use machine::{Behavior, Context, InitError, Machine, Step};
pub use mask::{PairMask, SensorMask};
pub use state::State;
