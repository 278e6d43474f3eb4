//! Scenario store backends.

mod inmemory;

pub use inmemory::InMemoryScenarioStore;
