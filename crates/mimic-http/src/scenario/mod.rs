//! Scenario state machine.
//!
//! A scenario is a named, server-wide state value. Mappings gate on it
//! (`whenStateIs`) and move it forward (`setStateTo`) once their response has
//! been produced. Scenarios are created lazily the first time anything
//! refers to them.

use serde::Serialize;
use std::fmt;

/// Snapshot of one scenario.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioState {
    pub name: String,
    /// `None` until the first transition.
    pub state: Option<String>,
    /// Commits seen in the current state.
    pub counter: u32,
    pub started: bool,
    pub finished: bool,
}

impl ScenarioState {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// A requested scenario transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionRequest<'a> {
    pub scenario: &'a str,
    /// State the mapping was matched in.
    pub expected: Option<&'a str>,
    /// State to move to; `None` marks the scenario finished.
    pub next: Option<&'a str>,
    /// Commits required before moving (at least 1).
    pub times: u32,
}

/// Outcome of [`ScenarioStore::commit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// The counter reached its threshold and the state moved.
    Advanced {
        from: Option<String>,
        to: String,
    },
    /// The commit was counted but the threshold is not reached yet.
    Counted { counter: u32, times: u32 },
    /// The mapping has no next state; the scenario is marked finished.
    Finished,
    /// Another commit moved the scenario since the mapping was matched.
    Stale { current: Option<String> },
}

impl Transition {
    pub fn label(&self) -> &'static str {
        match self {
            Transition::Advanced { .. } => "advanced",
            Transition::Counted { .. } => "counted",
            Transition::Finished => "finished",
            Transition::Stale { .. } => "stale",
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transition::Advanced { from, to } => {
                write!(f, "{} -> {to}", from.as_deref().unwrap_or("<initial>"))
            }
            Transition::Counted { counter, times } => write!(f, "counted {counter}/{times}"),
            Transition::Finished => f.write_str("finished"),
            Transition::Stale { current } => {
                write!(f, "stale (now {})", current.as_deref().unwrap_or("<initial>"))
            }
        }
    }
}

/// Apply one commit to a scenario.
///
/// The commit only counts while the scenario is still in the state the
/// mapping was matched in.
pub fn apply_transition(state: &mut ScenarioState, request: &TransitionRequest<'_>) -> Transition {
    if state.state.as_deref() != request.expected {
        return Transition::Stale {
            current: state.state.clone(),
        };
    }

    state.started = true;
    state.counter = state.counter.saturating_add(1);

    let Some(next) = request.next else {
        state.finished = true;
        return Transition::Finished;
    };

    let times = request.times.max(1);
    if state.counter < times {
        return Transition::Counted {
            counter: state.counter,
            times,
        };
    }

    let from = state.state.replace(next.to_string());
    state.counter = 0;
    state.finished = false;
    Transition::Advanced {
        from,
        to: next.to_string(),
    }
}

/// Storage for scenario state.
///
/// Synchronous: commits happen on the request path after the response is
/// built, and every operation is a short critical section.
pub trait ScenarioStore: Send + Sync + fmt::Debug {
    /// Current state of a scenario; `None` for unknown or never-transitioned scenarios.
    fn current_state(&self, name: &str) -> Option<String>;

    /// Register a scenario if it does not exist yet.
    fn ensure(&self, name: &str);

    fn get(&self, name: &str) -> Option<ScenarioState>;

    /// All scenarios, ordered by name.
    fn list(&self) -> Vec<ScenarioState>;

    /// Atomically apply a transition to one scenario, creating it if needed.
    fn commit(&self, request: &TransitionRequest<'_>) -> Transition;

    /// Force a scenario into a state, resetting its counter.
    fn set_state(&self, name: &str, state: Option<String>);

    /// Forget every scenario.
    fn reset_all(&self);
}
