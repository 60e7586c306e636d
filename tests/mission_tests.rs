//! End-to-end mission scenarios: the orchestrator, its four phase
//! machines, the timer registry, and the motion contract wired together
//! the way the host scheduler drives them.

use reflex::core::history::TransitionLog;
use reflex::core::machine::{Behavior, Context, Machine};
use reflex::mission::{
    BeaconSearchState, CollectPrimaryState, CollectSecondaryState, DepositState, Mission, Phase,
};
use reflex::motion::{Auxiliary, MotionCommand, RecordedMotion, Turn, DRIVE_SPEED};
use reflex::timers::{TimerId, TimerRegistry};
use reflex::{Event, EventKind, SensorMask};

struct Rig {
    timers: TimerRegistry,
    motion: RecordedMotion,
    trace: TransitionLog,
    mission: Mission,
}

impl Rig {
    fn new() -> Self {
        let mut rig = Self {
            timers: TimerRegistry::new(),
            motion: RecordedMotion::new(),
            trace: TransitionLog::new(),
            mission: Mission::new(),
        };
        let mut ctx = Context::new(&mut rig.timers, &mut rig.motion, &mut rig.trace);
        rig.mission.init(&mut ctx).expect("clean mission init");
        rig
    }

    fn dispatch(&mut self, event: Event) -> Event {
        let mut ctx = Context::new(&mut self.timers, &mut self.motion, &mut self.trace);
        self.mission.run(event, &mut ctx)
    }

    /// Advance the scheduler, feeding every expiry back into the
    /// mission, until `ticks` have elapsed.
    fn advance(&mut self, ticks: u32) {
        for _ in 0..ticks {
            let fired = self.timers.tick();
            for event in fired {
                self.dispatch(event);
            }
        }
    }

    fn tape(mask: SensorMask) -> Event {
        Event::new(EventKind::TapeSensed, mask.bits() as u16)
    }
}

#[test]
fn startup_sequence_enters_beacon_search_once() {
    let rig = Rig::new();

    assert_eq!(rig.mission.phase(), Phase::BeaconSearch);
    assert_eq!(
        rig.mission.beacon_search().state(),
        BeaconSearchState::SweepRight
    );
    // Roller started once during the boot phase.
    let rollers = rig
        .motion
        .commands()
        .iter()
        .filter(|&&c| c == MotionCommand::Auxiliary(Auxiliary::Roller, 400))
        .count();
    assert_eq!(rollers, 1);
    // One boot transition for the mission itself.
    assert_eq!(rig.trace.path_of("mission"), vec!["Boot", "BeaconSearch"]);
}

#[test]
fn beacon_arrival_switches_phase_and_enters_the_child_once() {
    let mut rig = Rig::new();

    rig.motion.clear();
    let before = rig.trace.len();
    let out = rig.dispatch(TimerId::Mission.timeout());
    assert!(out.is_none());
    assert_eq!(rig.mission.phase(), Phase::CollectSecondary);

    // The new child machine received ENTRY exactly once: one drive
    // command, one phase transition, no child transition.
    let drives = rig
        .motion
        .commands()
        .iter()
        .filter(|&&c| c == MotionCommand::Drive(DRIVE_SPEED))
        .count();
    assert_eq!(drives, 1);
    assert_eq!(rig.trace.len(), before + 1);
    assert_eq!(
        rig.mission.collect_secondary().state(),
        CollectSecondaryState::DriveForward
    );
}

#[test]
fn search_watchdog_expires_into_collection() {
    let mut rig = Rig::new();

    // No sensor input at all: sweeps alternate until the 30s watchdog
    // (or the sweep give-up path) promotes arrival.
    rig.advance(30_000);
    assert_eq!(rig.mission.phase(), Phase::CollectSecondary);
}

#[test]
fn full_deposit_cycle_returns_to_collection() {
    let mut rig = Rig::new();
    rig.dispatch(TimerId::Mission.timeout());
    assert_eq!(rig.mission.phase(), Phase::CollectSecondary);

    // Cross the arena, hit the boundary head-on, recover into the tape
    // follow, then find the wire.
    rig.dispatch(Rig::tape(SensorMask::FRONT_BOTH));
    rig.advance(200); // reverse
    rig.advance(650); // quarter turn left
    assert_eq!(
        rig.mission.collect_secondary().state(),
        CollectSecondaryState::TapeFollowRight
    );

    let out = rig.dispatch(Event::new(EventKind::TrackWireFound, 0b01));
    assert!(out.is_none());
    assert_eq!(rig.mission.phase(), Phase::Deposit);
    assert_eq!(rig.mission.deposit().state(), DepositState::Settle);

    // Gate raised while leaving the collection phase.
    assert!(rig
        .motion
        .commands()
        .contains(&MotionCommand::Auxiliary(Auxiliary::Gate, 700)));

    // The fixed-duration deposit sequence runs off timers alone.
    rig.advance(500); // settle
    assert_eq!(rig.mission.deposit().state(), DepositState::OpenGate);
    rig.advance(800);
    assert_eq!(rig.mission.deposit().state(), DepositState::Shake);
    rig.advance(1_500);
    assert_eq!(rig.mission.deposit().state(), DepositState::CloseGate);
    rig.advance(800);
    assert_eq!(rig.mission.deposit().state(), DepositState::BackAway);
    rig.advance(600);

    assert_eq!(rig.mission.phase(), Phase::CollectPrimary);
    assert_eq!(
        rig.mission.collect_primary().state(),
        CollectPrimaryState::Reverse
    );
}

#[test]
fn frozen_child_resumes_where_it_left_off() {
    let mut rig = Rig::new();

    // Freeze the search mid-approach.
    rig.dispatch(Event::signal(EventKind::BeaconFound));
    assert_eq!(
        rig.mission.beacon_search().state(),
        BeaconSearchState::DriveToBeacon
    );

    // An arrival signal from outside the child passes through its table
    // untouched and is interpreted at the top level.
    rig.dispatch(Event::signal(EventKind::AtBeaconTower));
    assert_eq!(rig.mission.phase(), Phase::CollectSecondary);

    // Come back to the search phase the same way.
    rig.motion.clear();
    rig.dispatch(Event::signal(EventKind::ReadyToGo));
    assert_eq!(rig.mission.phase(), Phase::CollectSecondary);

    // ReadyToGo only matters in the search phase; force the round trip
    // through deposit instead. The wire only counts once the collector
    // is following tape.
    rig.dispatch(Rig::tape(SensorMask::FRONT_BOTH));
    rig.advance(200);
    rig.advance(650);
    assert_eq!(
        rig.mission.collect_secondary().state(),
        CollectSecondaryState::TapeFollowRight
    );
    rig.dispatch(Event::new(EventKind::TrackWireFound, 0b10));
    assert_eq!(rig.mission.phase(), Phase::Deposit);
    rig.advance(500 + 800 + 1_500 + 800 + 600);
    assert_eq!(rig.mission.phase(), Phase::CollectPrimary);

    rig.motion.clear();
    rig.dispatch(Event::signal(EventKind::AtBeaconTower));
    assert_eq!(rig.mission.phase(), Phase::BeaconSearch);

    // Resumed, not re-initialized: still mid-approach, and the ENTRY
    // re-issued the approach drive.
    assert_eq!(
        rig.mission.beacon_search().state(),
        BeaconSearchState::DriveToBeacon
    );
    assert_eq!(rig.motion.last(), Some(MotionCommand::Drive(DRIVE_SPEED)));
}

#[test]
fn stale_watchdog_expiry_cannot_corrupt_another_phase() {
    let mut rig = Rig::new();

    // Leave beacon search quickly; its machine-owned watchdog keeps
    // counting.
    rig.dispatch(Event::signal(EventKind::AtBeaconTower));
    assert_eq!(rig.mission.phase(), Phase::CollectSecondary);
    assert!(rig.timers.is_active(TimerId::Mission));

    // Put the collector into a reversal with its own timer pending.
    rig.dispatch(Rig::tape(SensorMask::FRONT_BOTH));
    assert_eq!(
        rig.mission.collect_secondary().state(),
        CollectSecondaryState::Reverse
    );

    // The stale watchdog fires mid-reversal: it must pass through
    // untouched rather than drive this machine's timeout logic.
    let before = rig.mission.collect_secondary().state();
    let out = rig.dispatch(TimerId::Mission.timeout());
    assert_eq!(out, TimerId::Mission.timeout());
    assert_eq!(rig.mission.collect_secondary().state(), before);
    assert_eq!(rig.mission.phase(), Phase::CollectSecondary);
}

#[test]
fn mission_restart_reinitializes_every_child() {
    let mut rig = Rig::new();

    // Advance the mission well past its initial configuration.
    rig.dispatch(Event::signal(EventKind::AtBeaconTower));
    rig.dispatch(Rig::tape(SensorMask::FRONT_BOTH));
    assert_eq!(rig.mission.phase(), Phase::CollectSecondary);

    // A full restart is the only thing that resets children.
    let mut ctx = Context::new(&mut rig.timers, &mut rig.motion, &mut rig.trace);
    rig.mission.init(&mut ctx).expect("clean re-init");

    assert_eq!(rig.mission.phase(), Phase::BeaconSearch);
    assert_eq!(
        rig.mission.beacon_search().state(),
        BeaconSearchState::SweepRight
    );
    assert_eq!(
        rig.mission.collect_secondary().state(),
        CollectSecondaryState::DriveForward
    );
    assert_eq!(
        rig.mission.collect_primary().state(),
        CollectPrimaryState::Reverse
    );
    assert_eq!(rig.mission.deposit().state(), DepositState::Settle);
}

#[test]
fn promoted_events_are_consumed_at_the_top() {
    let mut rig = Rig::new();

    // The phase-completion signal is acted on and consumed; the host
    // scheduler sees NoEvent.
    let out = rig.dispatch(Event::signal(EventKind::AtBeaconTower));
    assert!(out.is_none());

    // Unrecognized events come back out unchanged for the host.
    let ev = Event::new(EventKind::TrackWireLost, 0);
    assert_eq!(rig.dispatch(ev), ev);
}

#[test]
fn sweeps_alternate_pivot_direction() {
    let mut rig = Rig::new();

    // The search's first sweep pivots right; after its span, left.
    assert_eq!(
        rig.motion.last(),
        Some(MotionCommand::Pivot(Turn::Right, DRIVE_SPEED))
    );
    rig.advance(4_500);
    assert_eq!(
        rig.mission.beacon_search().state(),
        BeaconSearchState::SweepLeft
    );
    assert_eq!(
        rig.motion.last(),
        Some(MotionCommand::Pivot(Turn::Left, DRIVE_SPEED))
    );
}
