//! Abstract storage contract for scenario records.
//!
//! The lifecycle manager only depends on this trait. Every method is async:
//! backends are free to suspend on network or disk I/O.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::scenario::{Scenario, ScenarioId, ScenarioStatus};

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Scenario not found (or soft-deleted, for reads and updates).
    #[error("Scenario not found: {0}")]
    NotFound(ScenarioId),

    /// Key already exists.
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// Compare-and-swap on the record version failed.
    #[error("Version conflict on {id}: expected {expected}, found {actual}")]
    VersionConflict {
        /// Scenario being updated.
        id: ScenarioId,
        /// Version the caller read.
        expected: u64,
        /// Version currently stored.
        actual: u64,
    },

    /// Backend cannot be reached.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// Backend error.
    #[error("Storage backend error: {0}")]
    BackendError(String),
}

/// Record store for scenarios.
///
/// # Contract
/// - `insert` stores the record as given; the caller sets `version = 1`
/// - `get` and `list_by_status` never return soft-deleted records
/// - `update` is a compare-and-swap on `version` and stores `version + 1`
/// - `soft_delete` tombstones the record instead of removing it
#[async_trait]
pub trait ScenarioStore: Send + Sync {
    /// Insert a new scenario. Returns error if the ID already exists.
    async fn insert(&self, scenario: Scenario) -> Result<ScenarioId, StorageError>;

    /// Get a live scenario by ID.
    async fn get(&self, id: ScenarioId) -> Result<Option<Scenario>, StorageError>;

    /// Replace a live scenario if its stored version is `expected_version`.
    ///
    /// Returns the stored record, carrying the bumped version.
    ///
    /// # Errors
    /// - `NotFound`: unknown or soft-deleted ID
    /// - `VersionConflict`: the stored version moved on
    async fn update(&self, scenario: Scenario, expected_version: u64) -> Result<Scenario, StorageError>;

    /// Soft-delete a scenario.
    ///
    /// Returns `true` if the record was live, `false` if it was already deleted.
    ///
    /// # Errors
    /// - `NotFound`: the ID was never stored
    async fn soft_delete(&self, id: ScenarioId, at: DateTime<Utc>) -> Result<bool, StorageError>;

    /// List live scenarios, most recently created first.
    async fn list_by_status(&self, status: Option<ScenarioStatus>) -> Result<Vec<Scenario>, StorageError>;

    /// Check that the backend is reachable.
    async fn health_check(&self) -> Result<(), StorageError> {
        Ok(())
    }
}
