//! Scenario record storage.
//!
//! [`ScenarioStore`] is the contract the lifecycle manager persists through;
//! [`InMemoryScenarioStore`] is the embedded reference backend.

mod memory;
mod traits;

pub use memory::InMemoryScenarioStore;
pub use traits::{ScenarioStore, StorageError};
