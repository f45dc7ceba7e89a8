use chrono::Utc;
use sea_orm::{ActiveModelTrait, ConnectionTrait, DbErr, EntityTrait, Set};
use shared::{validate_title, CreateTaskRequest, Task, TitleError, UpdateTaskRequest};
use thiserror::Error;

use crate::entities::task;

#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Task not found")]
    NotFound,
    #[error("{0}")]
    Validation(String),
}

impl From<TitleError> for TaskError {
    fn from(err: TitleError) -> Self {
        TaskError::Validation(err.to_string())
    }
}

/// Case folding used for the search columns and for search needles. SQL
/// `LOWER()` only folds ASCII on SQLite, so both sides are folded here.
pub fn fold_case(text: &str) -> String {
    text.to_lowercase()
}

fn update_error(err: DbErr) -> TaskError {
    match err {
        // the row vanished between the read and the write
        DbErr::RecordNotUpdated => TaskError::NotFound,
        other => TaskError::Database(other),
    }
}

pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: i64) -> Result<Option<Task>, DbErr> {
    Ok(task::Entity::find_by_id(id).one(db).await?.map(Task::from))
}

pub async fn create<C: ConnectionTrait>(
    db: &C,
    payload: &CreateTaskRequest,
) -> Result<Task, TaskError> {
    let title = payload
        .title
        .as_deref()
        .ok_or_else(|| TaskError::Validation("Title is required".to_string()))?;
    validate_title(title)?;

    let description = payload.description.clone().unwrap_or_default();
    let now = Utc::now();
    let active = task::ActiveModel {
        title: Set(title.to_string()),
        title_search: Set(fold_case(title)),
        description_search: Set(fold_case(&description)),
        description: Set(description),
        completed: Set(false),
        priority: Set(payload.priority.unwrap_or_default()),
        due_date: Set(payload.due_date),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };

    let model = active.insert(db).await?;
    tracing::debug!(task_id = model.id, "Created task");
    Ok(model.into())
}

/// Applies the fields present in `payload` and bumps `updated_at`, even when
/// nothing else changed.
pub async fn update<C: ConnectionTrait>(
    db: &C,
    id: i64,
    payload: &UpdateTaskRequest,
) -> Result<Task, TaskError> {
    let existing = task::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or(TaskError::NotFound)?;
    apply_update(db, existing, payload).await
}

async fn apply_update<C: ConnectionTrait>(
    db: &C,
    existing: task::Model,
    payload: &UpdateTaskRequest,
) -> Result<Task, TaskError> {
    if let Some(title) = &payload.title {
        validate_title(title)?;
    }

    let mut active: task::ActiveModel = existing.into();
    if let Some(title) = &payload.title {
        active.title = Set(title.clone());
        active.title_search = Set(fold_case(title));
    }
    if let Some(description) = &payload.description {
        active.description = Set(description.clone());
        active.description_search = Set(fold_case(description));
    }
    if let Some(completed) = payload.completed {
        active.completed = Set(completed);
    }
    if let Some(priority) = payload.priority {
        active.priority = Set(priority);
    }
    if let Some(due_date) = payload.due_date {
        active.due_date = Set(due_date);
    }
    active.updated_at = Set(Utc::now());

    let model = active.update(db).await.map_err(update_error)?;
    tracing::debug!(task_id = model.id, "Updated task");
    Ok(model.into())
}

pub async fn delete<C: ConnectionTrait>(db: &C, id: i64) -> Result<(), TaskError> {
    let result = task::Entity::delete_by_id(id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(TaskError::NotFound);
    }
    tracing::debug!(task_id = id, "Deleted task");
    Ok(())
}
