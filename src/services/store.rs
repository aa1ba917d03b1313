//! Task store access
//!
//! The scheduler only ever reads tasks. Postgres in production, an in-memory
//! map for tests.

use std::collections::HashMap;

use async_trait::async_trait;
#[cfg(test)]
use parking_lot::RwLock;
use sqlx::PgPool;

use crate::db::queries;
use crate::error::StorageError;
use crate::types::TaskRecord;

/// Read-only task store
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Look up one task
    async fn get_task(&self, task_id: &str) -> Result<Option<TaskRecord>, StorageError>;

    /// Resolve every id, preserving the order of `task_ids`.
    /// Fails with `NotFound` for the first id that does not resolve.
    async fn get_tasks(&self, task_ids: &[String]) -> Result<Vec<TaskRecord>, StorageError> {
        let mut records = Vec::with_capacity(task_ids.len());
        for id in task_ids {
            match self.get_task(id).await? {
                Some(record) => records.push(record),
                None => return Err(StorageError::NotFound(id.clone())),
            }
        }
        Ok(records)
    }

    /// Store name for logging
    fn name(&self) -> &str;
}

/// Postgres-backed store over the `tasks` table
pub struct PgTaskStore {
    pool: PgPool,
}

impl PgTaskStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaskStore for PgTaskStore {
    async fn get_task(&self, task_id: &str) -> Result<Option<TaskRecord>, StorageError> {
        Ok(queries::task::get_task(&self.pool, task_id).await?)
    }

    /// One round trip, then reorder to match the request
    async fn get_tasks(&self, task_ids: &[String]) -> Result<Vec<TaskRecord>, StorageError> {
        let rows = queries::task::get_tasks_by_ids(&self.pool, task_ids).await?;
        order_by_ids(rows, task_ids)
    }

    fn name(&self) -> &str {
        "Postgres"
    }
}

/// Arrange `rows` in the order of `task_ids`; a missing id is `NotFound`
fn order_by_ids(rows: Vec<TaskRecord>, task_ids: &[String]) -> Result<Vec<TaskRecord>, StorageError> {
    let by_id: HashMap<String, TaskRecord> = rows.into_iter().map(|r| (r.id.clone(), r)).collect();
    task_ids
        .iter()
        .map(|id| {
            by_id
                .get(id)
                .cloned()
                .ok_or_else(|| StorageError::NotFound(id.clone()))
        })
        .collect()
}

/// In-memory store for handler and store tests
#[cfg(test)]
#[derive(Default)]
pub struct InMemoryTaskStore {
    tasks: RwLock<HashMap<String, TaskRecord>>,
}

#[cfg(test)]
impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tasks(records: impl IntoIterator<Item = TaskRecord>) -> Self {
        let store = Self::new();
        for record in records {
            store.insert(record);
        }
        store
    }

    pub fn insert(&self, record: TaskRecord) {
        self.tasks.write().insert(record.id.clone(), record);
    }
}

#[cfg(test)]
#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn get_task(&self, task_id: &str) -> Result<Option<TaskRecord>, StorageError> {
        Ok(self.tasks.read().get(task_id).cloned())
    }

    fn name(&self) -> &str {
        "InMemory"
    }
}
