//! The dispatch protocol.
//!
//! Every machine in the crate — the four mission substate machines and
//! the orchestrator — is a [`Behavior`]: a current state plus a pure-ish
//! transition table. The blanket [`Machine`] impl supplies the protocol
//! around that table:
//!
//! 1. Dispatch the event to the current state's handler.
//! 2. If the handler requested a transition, dispatch EXIT to the old
//!    state (its result is discarded; EXIT must not itself transition),
//!    reclaim any timers the old state left armed, mutate the current
//!    state, then dispatch ENTRY to the new state.
//! 3. Return the (possibly rewritten) event from step 1 to the caller,
//!    never the ENTRY/EXIT results, so an enclosing machine can see
//!    whether the input was consumed or promoted.
//!
//! An ENTRY handler that itself requests a transition repeats step 2; no
//! handler in this system does, but the protocol allows it.

use crate::core::event::{Event, EventKind};
use crate::core::history::{TransitionLog, TransitionRecord};
use crate::core::state::State;
use crate::motion::Motion;
use crate::timers::{TimerId, TimerOwner, TimerRegistry};
use thiserror::Error;
use tracing::{debug, error, warn};

#[derive(Clone, Copy)]
struct Scope {
    machine: &'static str,
    state: &'static str,
}

/// Collaborator handles passed into every dispatch.
///
/// The dispatch driver keeps the scope field pointed at the machine and
/// state currently handling an event, so handlers arm timers without
/// naming themselves.
pub struct Context<'a> {
    pub timers: &'a mut TimerRegistry,
    pub motion: &'a mut dyn Motion,
    pub trace: &'a mut TransitionLog,
    scope: Scope,
}

impl<'a> Context<'a> {
    pub fn new(
        timers: &'a mut TimerRegistry,
        motion: &'a mut dyn Motion,
        trace: &'a mut TransitionLog,
    ) -> Self {
        Self {
            timers,
            motion,
            trace,
            scope: Scope {
                machine: "",
                state: "",
            },
        }
    }

    /// Arm a timer owned by the state currently handling the event. It
    /// must be disarmed by that state's EXIT; the driver reclaims (and
    /// warns about) leftovers.
    pub fn arm(&mut self, id: TimerId, ticks: u32) {
        self.timers.arm(
            id,
            ticks,
            TimerOwner::State {
                machine: self.scope.machine,
                state: self.scope.state,
            },
        );
    }

    /// Arm a timer owned by the whole machine. It survives state exits
    /// and keeps counting until it fires, is re-armed, or is disarmed.
    pub fn arm_lasting(&mut self, id: TimerId, ticks: u32) {
        self.timers
            .arm(id, ticks, TimerOwner::Machine(self.scope.machine));
    }

    pub fn disarm(&mut self, id: TimerId) {
        self.timers.disarm(id);
    }
}

/// A handler's verdict on one event: the rewritten event handed back to
/// the caller, plus an optional requested transition.
pub struct Step<S> {
    pub event: Event,
    pub next: Option<S>,
}

impl<S> Step<S> {
    /// Leave the event as-is (or substitute another) and stay put.
    pub fn pass(event: Event) -> Self {
        Step { event, next: None }
    }

    /// The event has been acted on; nothing further should see it.
    pub fn consume() -> Self {
        Self::pass(Event::none())
    }

    /// Consume the event and request a transition.
    pub fn to(next: S) -> Self {
        Step {
            event: Event::none(),
            next: Some(next),
        }
    }

    /// Replace the event with a param-less signal for the enclosing
    /// machine, staying put. This is the only channel a child machine
    /// has to report phase completion upward.
    pub fn promote(kind: EventKind) -> Self {
        Self::pass(Event::signal(kind))
    }
}

/// A machine's transition table and private scalars.
///
/// Implementations hold the current state plus whatever per-machine
/// scalars survive across dispatches (collision origin, spin bias,
/// retry counters). `handle` is called by the driver only; everything
/// else is bookkeeping the driver needs.
pub trait Behavior {
    type State: State;

    /// Stable machine tag used in traces and timer ownership.
    const NAME: &'static str;

    fn state(&self) -> Self::State;

    fn set_state(&mut self, state: Self::State);

    /// Return to the pseudo-initial state and clear private scalars.
    /// Called by `init()` only; a machine is otherwise never reset, just
    /// frozen and resumed by its parent.
    fn reset(&mut self);

    /// The transition table: pure function of (state, event, scalars)
    /// to a [`Step`], with side effects limited to timer arming and
    /// motion commands on the context.
    fn handle(&mut self, state: Self::State, event: Event, ctx: &mut Context<'_>)
        -> Step<Self::State>;
}

/// Failure reported by [`Machine::init`]: the INIT event fell out of the
/// transition table instead of being consumed by the pseudo-initial
/// state, which indicates a table bug.
#[derive(Debug, Error)]
pub enum InitError {
    #[error("{machine}: init left residual event {kind:?} (param {param:#06b})")]
    Residual {
        machine: &'static str,
        kind: EventKind,
        param: u16,
    },
}

/// The public dispatch surface, implemented for every [`Behavior`].
pub trait Machine: Behavior {
    /// Reset to the pseudo-initial state and synchronously dispatch
    /// INIT. A residual event is a transition-table bug and is both
    /// logged and returned as an error.
    fn init(&mut self, ctx: &mut Context<'_>) -> Result<(), InitError>;

    /// The sole dispatch entry point.
    fn run(&mut self, event: Event, ctx: &mut Context<'_>) -> Event;
}

impl<B: Behavior> Machine for B {
    fn init(&mut self, ctx: &mut Context<'_>) -> Result<(), InitError> {
        self.reset();
        let residual = self.run(Event::init(), ctx);
        if residual.is_none() {
            Ok(())
        } else {
            error!(
                machine = Self::NAME,
                kind = ?residual.kind(),
                "INIT fell out of the transition table"
            );
            Err(InitError::Residual {
                machine: Self::NAME,
                kind: residual.kind(),
                param: residual.param(),
            })
        }
    }

    fn run(&mut self, event: Event, ctx: &mut Context<'_>) -> Event {
        let saved = ctx.scope;
        ctx.scope = Scope {
            machine: Self::NAME,
            state: self.state().name(),
        };
        let Step { event: result, next } = self.handle(self.state(), event, ctx);

        let mut requested = next;
        let mut trigger = event.kind();
        while let Some(target) = requested {
            let from = self.state();
            let exit = self.handle(from, Event::exit(), ctx);
            if exit.next.is_some() {
                // EXIT handlers are terminal for their dispatch.
                error!(
                    machine = Self::NAME,
                    state = from.name(),
                    "EXIT handler requested a transition; ignored"
                );
            }
            for id in ctx.timers.reclaim(Self::NAME, from.name()) {
                warn!(
                    machine = Self::NAME,
                    state = from.name(),
                    timer = id.name(),
                    "timer still armed at exit; reclaimed"
                );
            }
            ctx.trace.record(TransitionRecord {
                machine: Self::NAME,
                from: from.name(),
                to: target.name(),
                trigger,
                tick: ctx.timers.now(),
            });
            debug!(
                machine = Self::NAME,
                from = from.name(),
                to = target.name(),
                trigger = ?trigger,
                "transition"
            );
            self.set_state(target);
            ctx.scope = Scope {
                machine: Self::NAME,
                state: target.name(),
            };
            let entry = self.handle(target, Event::entry(), ctx);
            requested = entry.next;
            trigger = EventKind::Entry;
        }

        ctx.scope = saved;
        result
    }
}
