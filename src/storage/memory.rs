//! In-memory storage backend.
//!
//! Thread-safe in-memory implementation of [`ScenarioStore`]. It is intended
//! for embedded usage, tests, and as a reference implementation.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::scenario::{Scenario, ScenarioId, ScenarioStatus};
use crate::storage::traits::{ScenarioStore, StorageError};

fn lock_err(context: &'static str) -> StorageError {
    StorageError::BackendError(format!("poisoned lock: {context}"))
}

/// Thread-safe in-memory scenario store.
#[derive(Debug, Default)]
pub struct InMemoryScenarioStore {
    by_id: RwLock<HashMap<ScenarioId, Scenario>>,
}

impl InMemoryScenarioStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records, soft-deleted ones included.
    ///
    /// # Errors
    /// `BackendError` on a poisoned lock.
    pub fn total_records(&self) -> Result<usize, StorageError> {
        Ok(self.by_id.read().map_err(|_| lock_err("scenario.total_records"))?.len())
    }
}

#[async_trait]
impl ScenarioStore for InMemoryScenarioStore {
    async fn insert(&self, scenario: Scenario) -> Result<ScenarioId, StorageError> {
        let mut by_id = self.by_id.write().map_err(|_| lock_err("scenario.insert"))?;
        if by_id.contains_key(&scenario.id) {
            return Err(StorageError::DuplicateKey(scenario.id.to_string()));
        }
        let id = scenario.id;
        by_id.insert(id, scenario);
        Ok(id)
    }

    async fn get(&self, id: ScenarioId) -> Result<Option<Scenario>, StorageError> {
        let by_id = self.by_id.read().map_err(|_| lock_err("scenario.get"))?;
        Ok(by_id.get(&id).filter(|s| !s.is_deleted()).cloned())
    }

    async fn update(&self, mut scenario: Scenario, expected_version: u64) -> Result<Scenario, StorageError> {
        let mut by_id = self.by_id.write().map_err(|_| lock_err("scenario.update"))?;
        let id = scenario.id;
        let stored = by_id
            .get_mut(&id)
            .filter(|s| !s.is_deleted())
            .ok_or(StorageError::NotFound(id))?;

        if stored.version != expected_version {
            return Err(StorageError::VersionConflict {
                id,
                expected: expected_version,
                actual: stored.version,
            });
        }

        // Identity and creation metadata are owned by the store once inserted.
        scenario.created_at = stored.created_at;
        scenario.deleted_at = None;
        scenario.version = expected_version + 1;
        *stored = scenario.clone();
        Ok(scenario)
    }

    async fn soft_delete(&self, id: ScenarioId, at: DateTime<Utc>) -> Result<bool, StorageError> {
        let mut by_id = self.by_id.write().map_err(|_| lock_err("scenario.soft_delete"))?;
        let stored = by_id.get_mut(&id).ok_or(StorageError::NotFound(id))?;
        if stored.is_deleted() {
            return Ok(false);
        }
        stored.deleted_at = Some(at);
        stored.updated_at = at;
        stored.version += 1;
        Ok(true)
    }

    async fn list_by_status(&self, status: Option<ScenarioStatus>) -> Result<Vec<Scenario>, StorageError> {
        let by_id = self.by_id.read().map_err(|_| lock_err("scenario.list_by_status"))?;
        let mut out: Vec<Scenario> = by_id
            .values()
            .filter(|s| !s.is_deleted())
            .filter(|s| status.map_or(true, |wanted| s.status == wanted))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(out)
    }
}
