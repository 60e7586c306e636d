//! The State trait for named state identifiers.
//!
//! Each machine declares its own state enum; a state identifier belongs
//! to exactly one machine. The orchestrator's states reference (never
//! extend) the substate machines' state sets.

use serde::Serialize;
use std::fmt::Debug;

/// A state identifier within one machine.
///
/// # Required Traits
///
/// - `Copy` + `PartialEq` + `Eq`: identifiers are small comparable values
/// - `Debug` + `Serialize`: identifiers appear in traces and log dumps
///
/// # Example
///
/// ```rust
/// use reflex::core::state::State;
/// use serde::Serialize;
///
/// #[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
/// enum DockState {
///     Boot,
///     Approach,
///     Latched,
/// }
///
/// impl State for DockState {
///     fn name(&self) -> &'static str {
///         match self {
///             Self::Boot => "Boot",
///             Self::Approach => "Approach",
///             Self::Latched => "Latched",
///         }
///     }
///
///     fn is_initial(&self) -> bool {
///         matches!(self, Self::Boot)
///     }
/// }
///
/// assert_eq!(DockState::Approach.name(), "Approach");
/// assert!(DockState::Boot.is_initial());
/// ```
pub trait State: Copy + PartialEq + Eq + Debug + Serialize {
    /// The state's name, used for tracing and timer ownership tags.
    fn name(&self) -> &'static str;

    /// True for the pseudo-initial state, entered only through a reset
    /// and left again on the first INIT dispatch.
    ///
    /// Default implementation returns `false`.
    fn is_initial(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize)]
    enum TestState {
        Boot,
        Running,
    }

    impl State for TestState {
        fn name(&self) -> &'static str {
            match self {
                Self::Boot => "Boot",
                Self::Running => "Running",
            }
        }

        fn is_initial(&self) -> bool {
            matches!(self, Self::Boot)
        }
    }

    #[test]
    fn names_are_stable() {
        assert_eq!(TestState::Boot.name(), "Boot");
        assert_eq!(TestState::Running.name(), "Running");
    }

    #[test]
    fn only_the_pseudo_initial_state_is_initial() {
        assert!(TestState::Boot.is_initial());
        assert!(!TestState::Running.is_initial());
    }
}
