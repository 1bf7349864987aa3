use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, ExprTrait};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DbErr, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use serde::{Deserialize, Serialize};

use crate::entities::todo;

pub const DEFAULT_CATEGORY: &str = "no category";
pub const SHARED_CATEGORY: &str = "shared";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub description: String,
    pub category: String,
    pub order: i32,
    pub completed: bool,
    pub original_todo_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<todo::Model> for Todo {
    fn from(model: todo::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            title: model.title,
            description: model.description,
            category: model.category,
            order: model.order,
            completed: model.completed,
            original_todo_id: model.original_todo_id,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Request body for creating a todo. Missing fields deserialize to their empty
/// value so validation can report every one of them at once.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateTodo {
    pub user_id: i64,
    pub title: String,
    pub description: String,
    pub category: Option<String>,
}

impl CreateTodo {
    pub fn new(user_id: i64, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            user_id,
            title: title.into(),
            description: description.into(),
            category: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

/// Field patch for a todo. `None` leaves a field untouched; `Some` writes it,
/// including `Some(false)` for `completed`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTodo {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub order: Option<i32>,
    pub completed: Option<bool>,
}

impl UpdateTodo {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.order.is_none()
            && self.completed.is_none()
    }

    /// Present fields that a share-copy is not allowed to change.
    pub fn content_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.title.is_some() {
            fields.push("title");
        }
        if self.description.is_some() {
            fields.push("description");
        }
        if self.category.is_some() {
            fields.push("category");
        }
        if self.completed.is_some() {
            fields.push("completed");
        }
        fields
    }
}

/// Row values for an insert; `order` must already be assigned.
#[derive(Debug, Clone)]
pub struct NewTodo {
    pub user_id: i64,
    pub title: String,
    pub description: String,
    pub category: String,
    pub order: i32,
    pub completed: bool,
    pub original_todo_id: Option<i64>,
}

pub fn normalize_category(category: Option<&str>) -> String {
    match category.map(str::trim) {
        Some(category) if !category.is_empty() => category.to_string(),
        _ => DEFAULT_CATEGORY.to_string(),
    }
}

impl Todo {
    pub fn is_copy(&self) -> bool {
        self.original_todo_id.is_some()
    }

    /// Id of the original this todo belongs to (itself for an original).
    pub fn root_id(&self) -> i64 {
        self.original_todo_id.unwrap_or(self.id)
    }

    pub async fn find_by_id<C: ConnectionTrait>(db: &C, id: i64) -> Result<Option<Self>, DbErr> {
        let record = todo::Entity::find_by_id(id).one(db).await?;
        Ok(record.map(Self::from))
    }

    pub async fn find_by_user_id<C: ConnectionTrait>(
        db: &C,
        user_id: i64,
    ) -> Result<Vec<Self>, DbErr> {
        let models = todo::Entity::find()
            .filter(todo::Column::UserId.eq(user_id))
            .order_by_asc(todo::Column::Order)
            .order_by_asc(todo::Column::Id)
            .all(db)
            .await?;
        Ok(models.into_iter().map(Self::from).collect())
    }

    /// Share-copies owned by `user_id`, in the user's order.
    pub async fn find_shared_by_user_id<C: ConnectionTrait>(
        db: &C,
        user_id: i64,
    ) -> Result<Vec<Self>, DbErr> {
        let models = todo::Entity::find()
            .filter(todo::Column::UserId.eq(user_id))
            .filter(todo::Column::OriginalTodoId.is_not_null())
            .order_by_asc(todo::Column::Order)
            .all(db)
            .await?;
        Ok(models.into_iter().map(Self::from).collect())
    }

    pub async fn max_order<C: ConnectionTrait>(db: &C, user_id: i64) -> Result<Option<i32>, DbErr> {
        let max = todo::Entity::find()
            .select_only()
            .column_as(todo::Column::Order.max(), "max_order")
            .filter(todo::Column::UserId.eq(user_id))
            .into_tuple::<Option<i32>>()
            .one(db)
            .await?;
        Ok(max.flatten())
    }

    pub async fn insert<C: ConnectionTrait>(db: &C, data: NewTodo) -> Result<Self, DbErr> {
        let now = Utc::now();
        let active = todo::ActiveModel {
            user_id: Set(data.user_id),
            title: Set(data.title),
            description: Set(data.description),
            category: Set(data.category),
            order: Set(data.order),
            completed: Set(data.completed),
            original_todo_id: Set(data.original_todo_id),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        let model = active.insert(db).await?;
        Ok(Self::from(model))
    }

    /// Writes the present `title`/`description`/`category` fields of `patch`.
    pub async fn update_content<C: ConnectionTrait>(
        db: &C,
        id: i64,
        patch: &UpdateTodo,
    ) -> Result<Self, DbErr> {
        let record = todo::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or(DbErr::RecordNotFound("Todo not found".to_string()))?;

        let mut active: todo::ActiveModel = record.into();
        if let Some(title) = &patch.title {
            active.title = Set(title.clone());
        }
        if let Some(description) = &patch.description {
            active.description = Set(description.clone());
        }
        if let Some(category) = &patch.category {
            active.category = Set(normalize_category(Some(category.as_str())));
        }
        active.updated_at = Set(Utc::now());
        let updated = active.update(db).await?;
        Ok(Self::from(updated))
    }

    pub async fn set_order<C: ConnectionTrait>(
        db: &C,
        id: i64,
        order: i32,
    ) -> Result<Self, DbErr> {
        let record = todo::Entity::find_by_id(id)
            .one(db)
            .await?
            .ok_or(DbErr::RecordNotFound("Todo not found".to_string()))?;

        let mut active: todo::ActiveModel = record.into();
        active.order = Set(order);
        active.updated_at = Set(Utc::now());
        let updated = active.update(db).await?;
        Ok(Self::from(updated))
    }

    /// Adds `delta` to the order of every todo of `user_id` whose order lies in
    /// `from..=to` (`to = None` means unbounded), skipping `except_id`.
    pub async fn shift_orders<C: ConnectionTrait>(
        db: &C,
        user_id: i64,
        from: i32,
        to: Option<i32>,
        delta: i32,
        except_id: i64,
    ) -> Result<u64, DbErr> {
        let mut condition = Condition::all()
            .add(todo::Column::UserId.eq(user_id))
            .add(todo::Column::Id.ne(except_id))
            .add(todo::Column::Order.gte(from));
        if let Some(to) = to {
            condition = condition.add(todo::Column::Order.lte(to));
        }

        let result = todo::Entity::update_many()
            .col_expr(todo::Column::Order, Expr::col(todo::Column::Order).add(delta))
            .col_expr(todo::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(condition)
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }

    /// Sets `completed` on the original `root_id` and every copy pointing at it.
    pub async fn set_family_completed<C: ConnectionTrait>(
        db: &C,
        root_id: i64,
        completed: bool,
    ) -> Result<u64, DbErr> {
        let result = todo::Entity::update_many()
            .col_expr(todo::Column::Completed, Expr::value(completed))
            .col_expr(todo::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(
                Condition::any()
                    .add(todo::Column::Id.eq(root_id))
                    .add(todo::Column::OriginalTodoId.eq(root_id)),
            )
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }

    pub async fn delete<C: ConnectionTrait>(db: &C, id: i64) -> Result<u64, DbErr> {
        let result = todo::Entity::delete_many()
            .filter(todo::Column::Id.eq(id))
            .exec(db)
            .await?;
        Ok(result.rows_affected)
    }
}
