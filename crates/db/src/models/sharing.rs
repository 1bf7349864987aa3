//! Share-copies and completion sync across a share family.
//!
//! A family is one original plus every copy whose `original_todo_id` points at it. Copies of
//! copies are flattened onto the root when they are made, so a family is always one level deep.

use sea_orm::{ConnectionTrait, DbErr};
use thiserror::Error;

use super::{
    ordering,
    todo::{NewTodo, SHARED_CATEGORY, Todo},
    user::User,
};

#[derive(Debug, Error)]
pub enum ShareError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Todo not found: {0}")]
    TodoNotFound(i64),
    #[error("User not found: {0}")]
    UserNotFound(i64),
}

/// Gives `target_user_id` a copy of `todo_id` at the end of their list.
pub async fn share_todo<C: ConnectionTrait>(
    db: &C,
    todo_id: i64,
    target_user_id: i64,
) -> Result<Todo, ShareError> {
    let source = Todo::find_by_id(db, todo_id)
        .await?
        .ok_or(ShareError::TodoNotFound(todo_id))?;
    if !User::exists(db, target_user_id).await? {
        return Err(ShareError::UserNotFound(target_user_id));
    }

    let order = ordering::assign_on_create(db, target_user_id).await?;
    let copy = Todo::insert(
        db,
        NewTodo {
            user_id: target_user_id,
            title: source.title.clone(),
            description: source.description.clone(),
            category: SHARED_CATEGORY.to_string(),
            order,
            completed: source.completed,
            original_todo_id: Some(source.root_id()),
        },
    )
    .await?;
    tracing::debug!(
        todo_id,
        copy_id = copy.id,
        target_user_id,
        original_todo_id = source.root_id(),
        "Shared todo"
    );

    Ok(copy)
}

/// Sets `completed` on `todo_id` and on every other member of its family.
pub async fn set_completed<C: ConnectionTrait>(
    db: &C,
    todo_id: i64,
    completed: bool,
) -> Result<Todo, ShareError> {
    let todo = Todo::find_by_id(db, todo_id)
        .await?
        .ok_or(ShareError::TodoNotFound(todo_id))?;

    // The root may be gone; its copies still match on original_todo_id.
    let affected = Todo::set_family_completed(db, todo.root_id(), completed).await?;
    tracing::debug!(todo_id, root_id = todo.root_id(), completed, affected, "Set completion");

    Todo::find_by_id(db, todo_id)
        .await?
        .ok_or(ShareError::TodoNotFound(todo_id))
}
