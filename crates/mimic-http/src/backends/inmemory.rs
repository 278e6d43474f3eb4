use crate::scenario::{apply_transition, ScenarioState, ScenarioStore, Transition, TransitionRequest};
use parking_lot::{Mutex, RwLock, RwLockWriteGuard};
use std::collections::BTreeMap;

/// In-memory implementation of ScenarioStore
///
/// Scenarios live in a read-mostly table; each one has its own mutex so
/// commits to different scenarios never contend.
#[derive(Debug, Default)]
pub struct InMemoryScenarioStore {
    scenarios: RwLock<BTreeMap<String, Mutex<ScenarioState>>>,
}

impl InMemoryScenarioStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` on the named scenario, creating it first if needed.
    fn with_scenario<R>(&self, name: &str, f: impl FnOnce(&mut ScenarioState) -> R) -> R {
        let mut table = self.scenarios.read();
        // Opportunistically use just a read lock. If the scenario doesn't exist
        // yet, lock for writing, insert, then downgrade
        if !table.contains_key(name) {
            drop(table);
            let mut write = self.scenarios.write();
            write
                .entry(name.to_string())
                .or_insert_with(|| Mutex::new(ScenarioState::new(name)));
            table = RwLockWriteGuard::downgrade(write);
        }
        let scenario = table
            .get(name)
            .expect("We atomically downgraded the lock, the scenario we just inserted must exist");
        let mut state = scenario.lock();
        f(&mut state)
    }
}

impl ScenarioStore for InMemoryScenarioStore {
    fn current_state(&self, name: &str) -> Option<String> {
        self.scenarios
            .read()
            .get(name)
            .and_then(|s| s.lock().state.clone())
    }

    fn ensure(&self, name: &str) {
        self.with_scenario(name, |_| ());
    }

    fn get(&self, name: &str) -> Option<ScenarioState> {
        self.scenarios.read().get(name).map(|s| s.lock().clone())
    }

    fn list(&self) -> Vec<ScenarioState> {
        self.scenarios
            .read()
            .values()
            .map(|s| s.lock().clone())
            .collect()
    }

    fn commit(&self, request: &TransitionRequest<'_>) -> Transition {
        self.with_scenario(request.scenario, |state| apply_transition(state, request))
    }

    fn set_state(&self, name: &str, state: Option<String>) {
        self.with_scenario(name, |scenario| {
            scenario.started = state.is_some();
            scenario.finished = false;
            scenario.counter = 0;
            scenario.state = state;
        });
    }

    fn reset_all(&self) {
        self.scenarios.write().clear();
    }
}
