use db::{
    DBService, DatabaseTransaction,
    models::{
        ordering, sharing,
        todo::{CreateTodo, NewTodo, Todo, UpdateTodo, normalize_category},
        user::User,
    },
};
use sea_orm::{ConnectionTrait, TransactionTrait};

use crate::error::TodoError;

/// Todo operations for authenticated callers. Each call is one transaction.
#[derive(Clone)]
pub struct TodoService {
    db: DBService,
}

impl TodoService {
    pub fn new(db: DBService) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &DBService {
        &self.db
    }

    pub async fn authenticate(
        &self,
        user_id: i64,
        secret: &str,
    ) -> Result<Option<User>, TodoError> {
        Ok(User::authenticate(&self.db.pool, user_id, secret).await?)
    }

    /// Creates `user_id` or rotates its secret.
    pub async fn ensure_user(&self, user_id: i64, secret: &str) -> Result<User, TodoError> {
        let tx = self.db.begin_write().await?;
        let result = User::ensure(&tx, user_id, secret).await.map_err(TodoError::from);
        finish(tx, result).await
    }

    pub async fn create(&self, payload: CreateTodo) -> Result<Todo, TodoError> {
        tracing::debug!(user_id = payload.user_id, "Creating todo");
        validate_create(&payload)?;

        let tx = self.db.begin_write().await?;
        let result = create_in(&tx, payload).await;
        finish(tx, result).await
    }

    pub async fn get(&self, todo_id: i64) -> Result<Todo, TodoError> {
        let tx = self.db.pool.begin().await?;
        let result = Todo::find_by_id(&tx, todo_id)
            .await
            .map_err(TodoError::from)
            .and_then(|todo| todo.ok_or(TodoError::TodoNotFound(todo_id)));
        finish(tx, result).await
    }

    pub async fn list_by_user(&self, user_id: i64) -> Result<Vec<Todo>, TodoError> {
        let tx = self.db.pool.begin().await?;
        let result = list_in(&tx, user_id, false).await;
        finish(tx, result).await
    }

    /// Share-copies owned by `user_id`.
    pub async fn list_shared_by_user(&self, user_id: i64) -> Result<Vec<Todo>, TodoError> {
        let tx = self.db.pool.begin().await?;
        let result = list_in(&tx, user_id, true).await;
        finish(tx, result).await
    }

    pub async fn update(&self, todo_id: i64, patch: UpdateTodo) -> Result<Todo, TodoError> {
        tracing::debug!(todo_id, "Updating todo");
        validate_update(&patch)?;

        let tx = self.db.begin_write().await?;
        let result = update_in(&tx, todo_id, &patch).await;
        finish(tx, result).await
    }

    /// Deletes `todo_id` and closes the gap in its owner's order. Returns the removed todo.
    pub async fn delete(&self, todo_id: i64) -> Result<Todo, TodoError> {
        tracing::debug!(todo_id, "Deleting todo");
        let tx = self.db.begin_write().await?;
        let result = ordering::compact_and_delete(&tx, todo_id)
            .await
            .map_err(TodoError::from);
        finish(tx, result).await
    }

    pub async fn share(&self, todo_id: i64, target_user_id: i64) -> Result<Todo, TodoError> {
        tracing::debug!(todo_id, target_user_id, "Sharing todo");
        let tx = self.db.begin_write().await?;
        let result = sharing::share_todo(&tx, todo_id, target_user_id)
            .await
            .map_err(TodoError::from);
        finish(tx, result).await
    }

    pub async fn set_completed(&self, todo_id: i64, completed: bool) -> Result<Todo, TodoError> {
        tracing::debug!(todo_id, completed, "Setting todo completion");
        let tx = self.db.begin_write().await?;
        let result = sharing::set_completed(&tx, todo_id, completed)
            .await
            .map_err(TodoError::from);
        finish(tx, result).await
    }
}

/// Commits on success; rolls back and hands the error through otherwise.
async fn finish<T>(
    tx: DatabaseTransaction,
    result: Result<T, TodoError>,
) -> Result<T, TodoError> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::error!(error = %rollback_err, "Failed to roll back transaction");
            }
            Err(err)
        }
    }
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn validate_create(payload: &CreateTodo) -> Result<(), TodoError> {
    let mut missing = Vec::new();
    if payload.user_id <= 0 {
        missing.push("user_id");
    }
    if is_blank(&payload.title) {
        missing.push("title");
    }
    if is_blank(&payload.description) {
        missing.push("description");
    }
    if missing.is_empty() {
        return Ok(());
    }
    Err(TodoError::Validation(format!(
        "Missing required fields: {}",
        missing.join(", ")
    )))
}

fn validate_update(patch: &UpdateTodo) -> Result<(), TodoError> {
    if patch.is_empty() {
        return Err(TodoError::Validation("No fields to update".to_string()));
    }
    let mut blank = Vec::new();
    if patch.title.as_deref().is_some_and(is_blank) {
        blank.push("title");
    }
    if patch.description.as_deref().is_some_and(is_blank) {
        blank.push("description");
    }
    if blank.is_empty() {
        return Ok(());
    }
    Err(TodoError::Validation(format!(
        "Fields cannot be empty: {}",
        blank.join(", ")
    )))
}

async fn require_user<C: ConnectionTrait>(db: &C, user_id: i64) -> Result<(), TodoError> {
    if User::exists(db, user_id).await? {
        Ok(())
    } else {
        Err(TodoError::UserNotFound(user_id))
    }
}

async fn list_in<C: ConnectionTrait>(
    db: &C,
    user_id: i64,
    shared_only: bool,
) -> Result<Vec<Todo>, TodoError> {
    require_user(db, user_id).await?;
    let todos = if shared_only {
        Todo::find_shared_by_user_id(db, user_id).await?
    } else {
        Todo::find_by_user_id(db, user_id).await?
    };
    Ok(todos)
}

async fn create_in<C: ConnectionTrait>(db: &C, payload: CreateTodo) -> Result<Todo, TodoError> {
    require_user(db, payload.user_id).await?;
    let order = ordering::assign_on_create(db, payload.user_id).await?;
    let todo = Todo::insert(
        db,
        NewTodo {
            user_id: payload.user_id,
            title: payload.title,
            description: payload.description,
            category: normalize_category(payload.category.as_deref()),
            order,
            completed: false,
            original_todo_id: None,
        },
    )
    .await?;
    Ok(todo)
}

async fn update_in<C: ConnectionTrait>(
    db: &C,
    todo_id: i64,
    patch: &UpdateTodo,
) -> Result<Todo, TodoError> {
    let todo = Todo::find_by_id(db, todo_id)
        .await?
        .ok_or(TodoError::TodoNotFound(todo_id))?;

    if todo.is_copy() {
        let fields = patch.content_fields();
        if !fields.is_empty() {
            return Err(TodoError::Forbidden(format!(
                "Todo {todo_id} is a shared copy; cannot change {}",
                fields.join(", ")
            )));
        }
    }

    if patch.title.is_some() || patch.description.is_some() || patch.category.is_some() {
        Todo::update_content(db, todo_id, patch).await?;
    }
    if let Some(order) = patch.order {
        ordering::move_todo(db, todo_id, order).await?;
    }
    if let Some(completed) = patch.completed {
        sharing::set_completed(db, todo_id, completed).await?;
    }

    Todo::find_by_id(db, todo_id)
        .await?
        .ok_or(TodoError::TodoNotFound(todo_id))
}
