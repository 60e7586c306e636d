//! Named countdown timers.
//!
//! States arm timers on ENTRY and disarm them on EXIT; expiry is
//! delivered back through the ordinary event stream as a
//! [`EventKind::Timeout`] carrying the timer's identity in the param.
//!
//! Ownership is explicit. A timer armed through
//! [`Context::arm`](crate::core::machine::Context::arm) belongs to the
//! state that armed it and is reclaimed (disarmed, with a warning from
//! the dispatch driver) if that state exits while it is still running.
//! A timer armed through
//! [`Context::arm_lasting`](crate::core::machine::Context::arm_lasting)
//! belongs to the whole machine and deliberately survives state exits —
//! the mission watchdog is the one such timer in this system.

use crate::core::event::{Event, EventKind};
use serde::{Deserialize, Serialize};

/// Identity of one named timer.
///
/// Several timers may run concurrently; each expiry names its timer so
/// handlers can check which one fired. Every timeout handler in this
/// crate checks the identity — acting on an unexpected timer's expiry is
/// how stale timeouts corrupt a state's logic.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[repr(u16)]
pub enum TimerId {
    Spin,
    Collision,
    Reverse,
    Follow,
    Check,
    Sweep,
    Mission,
}

impl TimerId {
    pub const ALL: [TimerId; 7] = [
        TimerId::Spin,
        TimerId::Collision,
        TimerId::Reverse,
        TimerId::Follow,
        TimerId::Check,
        TimerId::Sweep,
        TimerId::Mission,
    ];

    /// The identity as carried in a timeout event's param.
    pub const fn param(self) -> u16 {
        self as u16
    }

    /// Recover an identity from an event param.
    pub fn from_param(param: u16) -> Option<Self> {
        Self::ALL.get(param as usize).copied()
    }

    /// The timeout event this timer emits on expiry.
    pub fn timeout(self) -> Event {
        Event::new(EventKind::Timeout, self.param())
    }

    /// True if `event` is this timer's expiry.
    ///
    /// # Example
    ///
    /// ```rust
    /// use reflex::timers::TimerId;
    ///
    /// let ev = TimerId::Sweep.timeout();
    /// assert!(TimerId::Sweep.fired(ev));
    /// assert!(!TimerId::Mission.fired(ev));
    /// ```
    pub fn fired(self, event: Event) -> bool {
        event.kind() == EventKind::Timeout && event.param() == self.param()
    }

    pub fn name(self) -> &'static str {
        match self {
            TimerId::Spin => "spin",
            TimerId::Collision => "collision",
            TimerId::Reverse => "reverse",
            TimerId::Follow => "follow",
            TimerId::Check => "check",
            TimerId::Sweep => "sweep",
            TimerId::Mission => "mission",
        }
    }
}

/// Who is responsible for disarming a timer.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TimerOwner {
    /// Owned by one state; must be gone by the time that state exits.
    State {
        machine: &'static str,
        state: &'static str,
    },
    /// Owned by a whole machine; survives state exits.
    Machine(&'static str),
}

#[derive(Clone, Copy, Debug)]
struct Slot {
    remaining: u32,
    owner: TimerOwner,
}

/// The registry of named countdown timers.
///
/// The host decrements every active timer once per scheduler tick via
/// [`tick`](TimerRegistry::tick); a timer reaching zero deactivates and
/// yields its timeout event exactly once. Re-arming overwrites any
/// previous arming; disarming is silent (no event on cancel).
#[derive(Debug, Default)]
pub struct TimerRegistry {
    slots: [Option<Slot>; TimerId::ALL.len()],
    now: u64,
}

impl TimerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ticks elapsed since the registry was created.
    pub fn now(&self) -> u64 {
        self.now
    }

    /// Start (or restart) a countdown. A timer armed with `ticks` fires
    /// after `ticks` calls to [`tick`](TimerRegistry::tick) (after one
    /// call if `ticks` is zero).
    pub fn arm(&mut self, id: TimerId, ticks: u32, owner: TimerOwner) {
        self.slots[id.param() as usize] = Some(Slot {
            remaining: ticks,
            owner,
        });
    }

    /// Stop a countdown without emitting anything.
    pub fn disarm(&mut self, id: TimerId) {
        self.slots[id.param() as usize] = None;
    }

    pub fn is_active(&self, id: TimerId) -> bool {
        self.slots[id.param() as usize].is_some()
    }

    pub fn remaining(&self, id: TimerId) -> Option<u32> {
        self.slots[id.param() as usize].map(|slot| slot.remaining)
    }

    pub fn owner(&self, id: TimerId) -> Option<TimerOwner> {
        self.slots[id.param() as usize].map(|slot| slot.owner)
    }

    /// All currently armed timers with their owners.
    pub fn active(&self) -> impl Iterator<Item = (TimerId, TimerOwner)> + '_ {
        TimerId::ALL
            .iter()
            .filter_map(|&id| self.slots[id.param() as usize].map(|slot| (id, slot.owner)))
    }

    /// Advance one scheduler tick. Every active timer decrements; each
    /// timer reaching zero deactivates and its timeout event is
    /// returned, in `TimerId` order.
    pub fn tick(&mut self) -> Vec<Event> {
        self.now += 1;
        let mut fired = Vec::new();
        for id in TimerId::ALL {
            let slot = &mut self.slots[id.param() as usize];
            if let Some(inner) = slot {
                inner.remaining = inner.remaining.saturating_sub(1);
                if inner.remaining == 0 {
                    *slot = None;
                    fired.push(id.timeout());
                }
            }
        }
        fired
    }

    /// Disarm every timer still owned by the given state, returning the
    /// identities reclaimed. Called by the dispatch driver after a
    /// state's EXIT; a non-empty result means the state leaked a timer.
    pub fn reclaim(&mut self, machine: &'static str, state: &'static str) -> Vec<TimerId> {
        let mut reclaimed = Vec::new();
        for id in TimerId::ALL {
            let slot = &mut self.slots[id.param() as usize];
            if let Some(inner) = slot {
                if inner.owner == (TimerOwner::State { machine, state }) {
                    *slot = None;
                    reclaimed.push(id);
                }
            }
        }
        reclaimed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OWNER: TimerOwner = TimerOwner::State {
        machine: "m",
        state: "s",
    };

    #[test]
    fn timeout_fires_exactly_once() {
        let mut timers = TimerRegistry::new();
        timers.arm(TimerId::Check, 2, OWNER);

        assert!(timers.tick().is_empty());
        let fired = timers.tick();
        assert_eq!(fired, vec![TimerId::Check.timeout()]);
        assert!(!timers.is_active(TimerId::Check));
        assert!(timers.tick().is_empty());
    }

    #[test]
    fn rearm_overwrites_previous_countdown() {
        let mut timers = TimerRegistry::new();
        timers.arm(TimerId::Spin, 1, OWNER);
        timers.arm(TimerId::Spin, 3, OWNER);

        assert!(timers.tick().is_empty());
        assert!(timers.tick().is_empty());
        assert_eq!(timers.tick(), vec![TimerId::Spin.timeout()]);
    }

    #[test]
    fn disarm_is_silent() {
        let mut timers = TimerRegistry::new();
        timers.arm(TimerId::Follow, 1, OWNER);
        timers.disarm(TimerId::Follow);
        assert!(timers.tick().is_empty());
    }

    #[test]
    fn independent_timers_run_concurrently() {
        let mut timers = TimerRegistry::new();
        timers.arm(TimerId::Spin, 1, OWNER);
        timers.arm(TimerId::Mission, 3, TimerOwner::Machine("m"));

        assert_eq!(timers.tick(), vec![TimerId::Spin.timeout()]);
        assert!(timers.is_active(TimerId::Mission));
        assert!(timers.tick().is_empty());
        assert_eq!(timers.tick(), vec![TimerId::Mission.timeout()]);
    }

    #[test]
    fn reclaim_takes_only_the_named_states_timers() {
        let mut timers = TimerRegistry::new();
        timers.arm(TimerId::Spin, 10, OWNER);
        timers.arm(
            TimerId::Follow,
            10,
            TimerOwner::State {
                machine: "m",
                state: "other",
            },
        );
        timers.arm(TimerId::Mission, 10, TimerOwner::Machine("m"));

        let reclaimed = timers.reclaim("m", "s");
        assert_eq!(reclaimed, vec![TimerId::Spin]);
        assert!(timers.is_active(TimerId::Follow));
        assert!(timers.is_active(TimerId::Mission));
    }

    #[test]
    fn param_round_trips_identity() {
        for id in TimerId::ALL {
            assert_eq!(TimerId::from_param(id.param()), Some(id));
        }
        assert_eq!(TimerId::from_param(999), None);
    }

    #[test]
    fn fired_checks_kind_and_identity() {
        let ev = TimerId::Reverse.timeout();
        assert!(TimerId::Reverse.fired(ev));
        assert!(!TimerId::Check.fired(ev));
        assert!(!TimerId::Reverse.fired(Event::none()));
    }
}
