//! Mission-phase state machines and the top-level orchestrator.
//!
//! Four self-contained substate machines — beacon search, two collection
//! behaviors, deposit — composed by [`Mission`], whose own states are
//! the mission phases. Each machine keeps a handful of private scalars
//! (collision origin, spin bias, escalation counters) that survive
//! across dispatches and are cleared only by a full mission restart.

mod beacon_search;
mod collect_primary;
mod collect_secondary;
mod deposit;
mod orchestrator;

pub use beacon_search::{BeaconSearch, BeaconSearchState};
pub use collect_primary::{CollectPrimary, CollectPrimaryState};
pub use collect_secondary::{CollectSecondary, CollectSecondaryState};
pub use deposit::{Deposit, DepositState};
pub use orchestrator::{Mission, Phase};

use crate::core::mask::SensorMask;
use serde::{Deserialize, Serialize};

/// Which sensor condition caused the last reversal. Recorded before
/// entering a generic reverse state so that one reversal state can pick
/// the follow-up maneuver for many collision causes.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub enum CollisionOrigin {
    #[default]
    None,
    /// Front-right tape contact.
    FrontRight,
    /// Front-left tape contact.
    FrontLeft,
    /// Both front tape sensors at once.
    FrontBoth,
    /// Front-right bumper contact.
    BumpFrontRight,
    /// Front-left bumper contact.
    BumpFrontLeft,
    /// Both front bumpers: a wall head-on.
    Wall,
    /// Escalated or both-sides tape: a boundary head-on.
    Tape,
    /// Rear tape contact while reversing.
    RearTape,
    /// Top bumper: wedged under an overhang.
    Overhang,
    /// Top bumper dead-center.
    OverhangCenter,
}

/// Persisted spin bias: which way the last follow/adjust cycle was
/// turning, so a later reversal spins back toward the side it came from.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub enum SpinSide {
    #[default]
    None,
    Left,
    Right,
}

/// Map a front tape contact to its origin tag.
fn front_origin(mask: SensorMask) -> Option<CollisionOrigin> {
    if mask.is_front_right() {
        Some(CollisionOrigin::FrontRight)
    } else if mask.is_front_left() {
        Some(CollisionOrigin::FrontLeft)
    } else if mask.is_front_both() {
        Some(CollisionOrigin::FrontBoth)
    } else {
        None
    }
}
