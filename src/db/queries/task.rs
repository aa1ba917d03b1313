//! Task database queries (read-only)

use sqlx::PgPool;

use crate::types::TaskRecord;

/// Get a single task by id
pub async fn get_task(pool: &PgPool, task_id: &str) -> Result<Option<TaskRecord>, sqlx::Error> {
    sqlx::query_as::<_, TaskRecord>(
        r#"
        SELECT
            id, name, start_time, end_time, duration_minutes,
            latitude, longitude, priority, description
        FROM tasks
        WHERE id = $1
        "#
    )
    .bind(task_id)
    .fetch_optional(pool)
    .await
}

/// Get all tasks whose id is in `task_ids`, in no particular order
pub async fn get_tasks_by_ids(pool: &PgPool, task_ids: &[String]) -> Result<Vec<TaskRecord>, sqlx::Error> {
    sqlx::query_as::<_, TaskRecord>(
        r#"
        SELECT
            id, name, start_time, end_time, duration_minutes,
            latitude, longitude, priority, description
        FROM tasks
        WHERE id = ANY($1)
        "#
    )
    .bind(task_ids)
    .fetch_all(pool)
    .await
}
