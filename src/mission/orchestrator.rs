//! The top-level orchestrator.
//!
//! Its states are the mission phases. Every incoming event — lifecycle
//! markers included — is delegated to the active phase's child machine
//! first; the orchestrator then pattern-matches the returned event
//! against the phase-completion signals. Forwarding ENTRY and EXIT is
//! what freezes a child on phase exit and resumes it, in its frozen
//! state, when the phase is revisited.

use crate::core::event::{Event, EventKind};
use crate::core::machine::{Behavior, Context, Machine, Step};
use crate::core::state::State;
use crate::motion::{Auxiliary, Motion, ROLLER_SPEED};
use serde::Serialize;
use tracing::error;

use super::{BeaconSearch, CollectPrimary, CollectSecondary, Deposit};

/// The mission phases.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize)]
pub enum Phase {
    #[default]
    Boot,
    BeaconSearch,
    CollectPrimary,
    CollectSecondary,
    Deposit,
}

impl State for Phase {
    fn name(&self) -> &'static str {
        match self {
            Self::Boot => "Boot",
            Self::BeaconSearch => "BeaconSearch",
            Self::CollectPrimary => "CollectPrimary",
            Self::CollectSecondary => "CollectSecondary",
            Self::Deposit => "Deposit",
        }
    }

    fn is_initial(&self) -> bool {
        matches!(self, Self::Boot)
    }
}

/// The mission orchestrator, owning the four phase machines.
///
/// Children are initialized exactly once, during the startup sequence.
/// Leaving a phase freezes its machine mid-state; re-entering the phase
/// resumes it there rather than re-initializing.
#[derive(Debug, Default)]
pub struct Mission {
    phase: Phase,
    beacon_search: BeaconSearch,
    collect_primary: CollectPrimary,
    collect_secondary: CollectSecondary,
    deposit: Deposit,
}

impl Mission {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn beacon_search(&self) -> &BeaconSearch {
        &self.beacon_search
    }

    pub fn collect_primary(&self) -> &CollectPrimary {
        &self.collect_primary
    }

    pub fn collect_secondary(&self) -> &CollectSecondary {
        &self.collect_secondary
    }

    pub fn deposit(&self) -> &Deposit {
        &self.deposit
    }

    /// One-time startup: start the intake roller, bring every child to
    /// its initial state, and enter the first phase.
    fn startup(&mut self, ctx: &mut Context<'_>) -> Step<Phase> {
        ctx.motion.auxiliary(Auxiliary::Roller, ROLLER_SPEED);

        if let Err(err) = self.beacon_search.init(ctx) {
            error!(%err, "beacon search initialized dirty");
        }
        if let Err(err) = self.collect_primary.init(ctx) {
            error!(%err, "primary collection initialized dirty");
        }
        if let Err(err) = self.collect_secondary.init(ctx) {
            error!(%err, "secondary collection initialized dirty");
        }
        if let Err(err) = self.deposit.init(ctx) {
            error!(%err, "deposit initialized dirty");
        }

        Step::to(Phase::BeaconSearch)
    }
}

impl Behavior for Mission {
    type State = Phase;
    const NAME: &'static str = "mission";

    fn state(&self) -> Phase {
        self.phase
    }

    fn set_state(&mut self, phase: Phase) {
        self.phase = phase;
    }

    fn reset(&mut self) {
        // Children are re-initialized by the startup sequence.
        self.phase = Phase::Boot;
    }

    fn handle(&mut self, phase: Phase, event: Event, ctx: &mut Context<'_>) -> Step<Phase> {
        match phase {
            Phase::Boot => match event.kind() {
                EventKind::Init => self.startup(ctx),
                _ => Step::pass(event),
            },
            Phase::BeaconSearch => {
                let returned = self.beacon_search.run(event, ctx);
                match returned.kind() {
                    EventKind::AtBeaconTower => Step::to(Phase::CollectSecondary),
                    EventKind::ReadyToGo => Step::to(Phase::CollectPrimary),
                    _ => Step::pass(returned),
                }
            }
            Phase::CollectPrimary => {
                let returned = self.collect_primary.run(event, ctx);
                match returned.kind() {
                    EventKind::AtBeaconTower => Step::to(Phase::BeaconSearch),
                    _ => Step::pass(returned),
                }
            }
            Phase::CollectSecondary => {
                let returned = self.collect_secondary.run(event, ctx);
                match returned.kind() {
                    EventKind::ReadyToDeposit => Step::to(Phase::Deposit),
                    _ => Step::pass(returned),
                }
            }
            Phase::Deposit => {
                let returned = self.deposit.run(event, ctx);
                match returned.kind() {
                    EventKind::ReadyToSweep => Step::to(Phase::CollectPrimary),
                    _ => Step::pass(returned),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::mask::SensorMask;
    use crate::mission::{BeaconSearchState, CollectSecondaryState, DepositState};
    use crate::motion::MotionCommand;
    use crate::testkit::Rig;
    use crate::timers::TimerId;

    #[test]
    fn startup_runs_the_roller_and_enters_beacon_search() {
        let mut rig = Rig::new();
        let mut mission = Mission::new();
        mission.init(&mut rig.ctx()).unwrap();

        assert_eq!(mission.phase(), Phase::BeaconSearch);
        assert!(rig
            .motion
            .commands()
            .contains(&MotionCommand::Auxiliary(Auxiliary::Roller, ROLLER_SPEED)));
        // The forwarded phase ENTRY re-activated the child's state.
        assert_eq!(
            mission.beacon_search().state(),
            BeaconSearchState::SweepRight
        );
        assert_eq!(
            rig.motion.last(),
            Some(MotionCommand::Pivot(crate::motion::Turn::Right, 900))
        );
    }

    #[test]
    fn promoted_arrival_switches_to_secondary_collection() {
        let mut rig = Rig::new();
        let mut mission = Mission::new();
        mission.init(&mut rig.ctx()).unwrap();

        let out = mission.run(TimerId::Mission.timeout(), &mut rig.ctx());
        assert!(out.is_none());
        assert_eq!(mission.phase(), Phase::CollectSecondary);
        // The new phase's child saw ENTRY and issued its drive command.
        assert_eq!(rig.motion.last(), Some(MotionCommand::Drive(900)));
    }

    #[test]
    fn deposit_phase_round_trip() {
        let mut rig = Rig::new();
        let mut mission = Mission::new();
        mission.init(&mut rig.ctx()).unwrap();
        mission.run(TimerId::Mission.timeout(), &mut rig.ctx());
        assert_eq!(mission.phase(), Phase::CollectSecondary);

        // Walk the secondary collector onto the wire.
        mission.run(
            Event::new(EventKind::TapeSensed, SensorMask::FRONT_BOTH.bits() as u16),
            &mut rig.ctx(),
        );
        mission.run(TimerId::Reverse.timeout(), &mut rig.ctx());
        mission.run(TimerId::Collision.timeout(), &mut rig.ctx());
        assert_eq!(
            mission.collect_secondary().state(),
            CollectSecondaryState::TapeFollowRight
        );

        let out = mission.run(Event::new(EventKind::TrackWireFound, 0b01), &mut rig.ctx());
        assert!(out.is_none());
        assert_eq!(mission.phase(), Phase::Deposit);
        assert_eq!(mission.deposit().state(), DepositState::Settle);
    }

    #[test]
    fn unmatched_events_pass_through_the_top_level() {
        let mut rig = Rig::new();
        let mut mission = Mission::new();
        mission.init(&mut rig.ctx()).unwrap();

        let ev = Event::signal(EventKind::BeaconLost);
        assert_eq!(mission.run(ev, &mut rig.ctx()), ev);
        assert_eq!(mission.phase(), Phase::BeaconSearch);
    }
}
