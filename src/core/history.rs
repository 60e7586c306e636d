//! Tick-stamped transition log.
//!
//! Every transition made by any machine is appended here by the dispatch
//! driver. The log exists for tracing and for test assertions; nothing
//! in the dispatch path reads it back.

use crate::core::event::EventKind;
use serde::Serialize;

/// Record of a single state transition.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
pub struct TransitionRecord {
    /// The machine that transitioned.
    pub machine: &'static str,
    /// The state being left.
    pub from: &'static str,
    /// The state being entered.
    pub to: &'static str,
    /// The kind of the event that caused the transition.
    pub trigger: EventKind,
    /// The scheduler tick at which the transition happened.
    pub tick: u64,
}

/// Ordered log of transitions across all machines.
///
/// # Example
///
/// ```rust
/// use reflex::core::event::EventKind;
/// use reflex::core::history::{TransitionLog, TransitionRecord};
///
/// let mut log = TransitionLog::new();
/// log.record(TransitionRecord {
///     machine: "dock",
///     from: "Boot",
///     to: "Approach",
///     trigger: EventKind::Init,
///     tick: 0,
/// });
/// assert_eq!(log.path_of("dock"), vec!["Boot", "Approach"]);
/// ```
#[derive(Clone, Debug, Default, Serialize)]
pub struct TransitionLog {
    records: Vec<TransitionRecord>,
}

impl TransitionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a transition.
    pub fn record(&mut self, record: TransitionRecord) {
        self.records.push(record);
    }

    /// All recorded transitions in order.
    pub fn records(&self) -> &[TransitionRecord] {
        &self.records
    }

    /// The most recent transition, if any.
    pub fn last(&self) -> Option<&TransitionRecord> {
        self.records.last()
    }

    /// The sequence of states one machine traversed: its first `from`,
    /// then every `to`. Empty if the machine never transitioned.
    pub fn path_of(&self, machine: &str) -> Vec<&'static str> {
        let mut path = Vec::new();
        for record in self.records.iter().filter(|r| r.machine == machine) {
            if path.is_empty() {
                path.push(record.from);
            }
            path.push(record.to);
        }
        path
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(machine: &'static str, from: &'static str, to: &'static str) -> TransitionRecord {
        TransitionRecord {
            machine,
            from,
            to,
            trigger: EventKind::Timeout,
            tick: 0,
        }
    }

    #[test]
    fn new_log_is_empty() {
        let log = TransitionLog::new();
        assert!(log.is_empty());
        assert!(log.last().is_none());
        assert!(log.path_of("any").is_empty());
    }

    #[test]
    fn path_interleaves_machines_independently() {
        let mut log = TransitionLog::new();
        log.record(record("a", "One", "Two"));
        log.record(record("b", "Idle", "Busy"));
        log.record(record("a", "Two", "Three"));

        assert_eq!(log.path_of("a"), vec!["One", "Two", "Three"]);
        assert_eq!(log.path_of("b"), vec!["Idle", "Busy"]);
    }

    #[test]
    fn last_returns_most_recent() {
        let mut log = TransitionLog::new();
        log.record(record("a", "One", "Two"));
        log.record(record("a", "Two", "Three"));
        assert_eq!(log.last().unwrap().to, "Three");
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn log_serializes_for_diagnostics() {
        let mut log = TransitionLog::new();
        log.record(record("a", "One", "Two"));
        let json = serde_json::to_string(&log).unwrap();
        assert!(json.contains("\"from\":\"One\""));
    }
}
