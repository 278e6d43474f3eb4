use super::Mapping;
use crate::scenario::ScenarioStore;
use chrono::{DateTime, Duration, Utc};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Live set of mappings, keyed by guid.
///
/// Readers take a snapshot of `Arc<Mapping>` handles under a short read
/// lock; writers replace whole entries.
#[derive(Debug)]
pub struct MappingStore {
    mappings: RwLock<HashMap<Uuid, Arc<Mapping>>>,
    last_stamp: Mutex<DateTime<Utc>>,
    scenarios: Arc<dyn ScenarioStore>,
}

impl MappingStore {
    pub fn new(scenarios: Arc<dyn ScenarioStore>) -> Self {
        Self {
            mappings: RwLock::new(HashMap::new()),
            last_stamp: Mutex::new(DateTime::<Utc>::MIN_UTC),
            scenarios,
        }
    }

    pub fn scenarios(&self) -> &Arc<dyn ScenarioStore> {
        &self.scenarios
    }

    /// Strictly increasing update stamp, so no two mappings tie on `updated_at`.
    fn next_stamp(&self) -> DateTime<Utc> {
        let now = Utc::now();
        let mut last = self.last_stamp.lock();
        let stamp = if now > *last {
            now
        } else {
            *last + Duration::microseconds(1)
        };
        *last = stamp;
        stamp
    }

    /// Insert or replace a mapping by guid, refreshing its `updated_at`.
    pub fn upsert(&self, mut mapping: Mapping) -> Arc<Mapping> {
        mapping.updated_at = self.next_stamp();
        if let Some(scenario) = &mapping.scenario {
            self.scenarios.ensure(scenario);
        }

        let mapping = Arc::new(mapping);
        let previous = self
            .mappings
            .write()
            .insert(mapping.guid, Arc::clone(&mapping));
        tracing::debug!(
            mapping = %mapping.guid,
            replaced = previous.is_some(),
            "Mapping registered"
        );
        mapping
    }

    pub fn get(&self, guid: &Uuid) -> Option<Arc<Mapping>> {
        self.mappings.read().get(guid).cloned()
    }

    pub fn remove(&self, guid: &Uuid) -> Option<Arc<Mapping>> {
        let removed = self.mappings.write().remove(guid);
        if removed.is_some() {
            tracing::debug!(mapping = %guid, "Mapping removed");
        }
        removed
    }

    /// Current mappings in no particular order.
    pub fn snapshot(&self) -> Vec<Arc<Mapping>> {
        self.mappings.read().values().cloned().collect()
    }

    /// Current mappings by priority, newest first within a priority.
    pub fn list(&self) -> Vec<Arc<Mapping>> {
        let mut mappings = self.snapshot();
        mappings.sort_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then_with(|| b.updated_at.cmp(&a.updated_at))
        });
        mappings
    }

    pub fn len(&self) -> usize {
        self.mappings.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.read().is_empty()
    }

    /// Remove every mapping except admin-interface ones.
    pub fn reset(&self) {
        let mut mappings = self.mappings.write();
        let before = mappings.len();
        mappings.retain(|_, m| m.is_admin_interface);
        tracing::info!(removed = before - mappings.len(), "Mappings reset");
    }
}
