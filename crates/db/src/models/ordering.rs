//! Keeps each user's `order` values dense (`1..=N`) across create, move and delete.
//!
//! Every function here expects to run on the caller's transaction; a shift and the
//! write that follows it must commit together.

use sea_orm::{ConnectionTrait, DbErr};
use thiserror::Error;

use super::todo::Todo;

#[derive(Debug, Error)]
pub enum OrderError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("Todo not found: {0}")]
    TodoNotFound(i64),
    #[error("Order {requested} is outside the valid range 1..={max}")]
    OutOfRange { requested: i32, max: i32 },
    #[error("Todo is already at position {0}")]
    Unchanged(i32),
}

/// Moving one todo from `from` to `to` within a dense list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MovePlan {
    pub from: i32,
    pub to: i32,
}

impl MovePlan {
    pub fn new(current: i32, requested: i32, max: i32) -> Result<Self, OrderError> {
        if requested < 1 || requested > max {
            return Err(OrderError::OutOfRange { requested, max });
        }
        if requested == current {
            return Err(OrderError::Unchanged(current));
        }
        Ok(Self {
            from: current,
            to: requested,
        })
    }

    /// Inclusive range of neighbours that shift and the delta applied to them.
    pub fn shifted_range(&self) -> (i32, i32, i32) {
        if self.to > self.from {
            (self.from + 1, self.to, -1)
        } else {
            (self.to, self.from - 1, 1)
        }
    }
}

/// Position a new todo of `user_id` takes: after the current last one.
pub async fn assign_on_create<C: ConnectionTrait>(db: &C, user_id: i64) -> Result<i32, DbErr> {
    Ok(Todo::max_order(db, user_id).await?.unwrap_or(0) + 1)
}

pub async fn move_todo<C: ConnectionTrait>(
    db: &C,
    todo_id: i64,
    new_order: i32,
) -> Result<Todo, OrderError> {
    let todo = Todo::find_by_id(db, todo_id)
        .await?
        .ok_or(OrderError::TodoNotFound(todo_id))?;
    let max = Todo::max_order(db, todo.user_id)
        .await?
        .unwrap_or(todo.order);

    let plan = MovePlan::new(todo.order, new_order, max)?;
    let (from, to, delta) = plan.shifted_range();
    let shifted = Todo::shift_orders(db, todo.user_id, from, Some(to), delta, todo.id).await?;
    tracing::debug!(
        todo_id,
        user_id = todo.user_id,
        from = plan.from,
        to = plan.to,
        shifted,
        "Moving todo"
    );

    Ok(Todo::set_order(db, todo.id, new_order).await?)
}

/// Closes the gap left by `todo_id`, then deletes it. Returns the removed todo.
pub async fn compact_and_delete<C: ConnectionTrait>(
    db: &C,
    todo_id: i64,
) -> Result<Todo, OrderError> {
    let todo = Todo::find_by_id(db, todo_id)
        .await?
        .ok_or(OrderError::TodoNotFound(todo_id))?;

    let shifted = Todo::shift_orders(db, todo.user_id, todo.order + 1, None, -1, todo.id).await?;
    let deleted = Todo::delete(db, todo.id).await?;
    if deleted == 0 {
        return Err(OrderError::TodoNotFound(todo_id));
    }
    tracing::debug!(todo_id, user_id = todo.user_id, shifted, "Deleted todo");

    Ok(todo)
}

#[cfg(test)]
mod tests {
    use sea_orm::DatabaseConnection;

    use super::*;
    use crate::models::{
        todo::{DEFAULT_CATEGORY, NewTodo},
        user::User,
    };

    /// Applies a plan to a dense list of labels the way the database shift does.
    fn apply(plan: MovePlan, items: &[char]) -> Vec<char> {
        let (from, to, delta) = plan.shifted_range();
        let mut positioned: Vec<(i32, char)> = items
            .iter()
            .enumerate()
            .map(|(idx, label)| {
                let order = idx as i32 + 1;
                let order = if order == plan.from {
                    plan.to
                } else if order >= from && order <= to {
                    order + delta
                } else {
                    order
                };
                (order, *label)
            })
            .collect();
        positioned.sort_by_key(|(order, _)| *order);
        positioned.into_iter().map(|(_, label)| label).collect()
    }

    async fn seed(db: &DatabaseConnection, user_id: i64, count: i32) -> Vec<Todo> {
        User::ensure(db, user_id, "secret").await.unwrap();
        let mut todos = Vec::new();
        for _ in 0..count {
            let order = assign_on_create(db, user_id).await.unwrap();
            let todo = Todo::insert(
                db,
                NewTodo {
                    user_id,
                    title: format!("item {order}"),
                    description: "desc".to_string(),
                    category: DEFAULT_CATEGORY.to_string(),
                    order,
                    completed: false,
                    original_todo_id: None,
                },
            )
            .await
            .unwrap();
            todos.push(todo);
        }
        todos
    }

    async fn ids_in_order(db: &DatabaseConnection, user_id: i64) -> Vec<i64> {
        let todos = Todo::find_by_user_id(db, user_id).await.unwrap();
        let orders: Vec<i32> = todos.iter().map(|todo| todo.order).collect();
        let expected: Vec<i32> = (1..=todos.len() as i32).collect();
        assert_eq!(orders, expected, "orders must stay dense");
        todos.into_iter().map(|todo| todo.id).collect()
    }

    #[test]
    fn plan_rejects_out_of_range_and_unchanged() {
        assert!(matches!(
            MovePlan::new(1, 4, 3),
            Err(OrderError::OutOfRange { requested: 4, max: 3 })
        ));
        assert!(matches!(
            MovePlan::new(1, 0, 3),
            Err(OrderError::OutOfRange { requested: 0, .. })
        ));
        assert!(matches!(MovePlan::new(2, 2, 3), Err(OrderError::Unchanged(2))));
    }

    #[test]
    fn plan_shifts_the_range_between_positions() {
        let down = MovePlan::new(2, 4, 5).unwrap();
        assert_eq!(down.shifted_range(), (3, 4, -1));

        let up = MovePlan::new(4, 2, 5).unwrap();
        assert_eq!(up.shifted_range(), (2, 3, 1));
    }

    #[test]
    fn plan_matches_remove_and_reinsert_for_every_pair() {
        let items = ['a', 'b', 'c', 'd', 'e'];
        let max = items.len() as i32;
        for from in 1..=max {
            for to in 1..=max {
                if from == to {
                    continue;
                }
                let plan = MovePlan::new(from, to, max).unwrap();
                let mut expected = items.to_vec();
                let moved = expected.remove(from as usize - 1);
                expected.insert(to as usize - 1, moved);
                assert_eq!(apply(plan, &items), expected, "move {from} -> {to}");

                let back = MovePlan::new(to, from, max).unwrap();
                assert_eq!(apply(back, &apply(plan, &items)), items.to_vec());
            }
        }
    }

    #[tokio::test]
    async fn assign_on_create_starts_at_one_and_appends() {
        let db = test_support::memory_db().await;
        User::ensure(&db, 3, "secret").await.unwrap();
        assert_eq!(assign_on_create(&db, 3).await.unwrap(), 1);

        seed(&db, 3, 2).await;
        assert_eq!(assign_on_create(&db, 3).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn move_down_and_back_restores_order() {
        let db = test_support::memory_db().await;
        let todos = seed(&db, 1, 4).await;
        let original = ids_in_order(&db, 1).await;

        let moved = move_todo(&db, todos[0].id, 3).await.unwrap();
        assert_eq!(moved.order, 3);
        assert_eq!(
            ids_in_order(&db, 1).await,
            vec![todos[1].id, todos[2].id, todos[0].id, todos[3].id]
        );

        move_todo(&db, todos[0].id, 1).await.unwrap();
        assert_eq!(ids_in_order(&db, 1).await, original);
    }

    #[tokio::test]
    async fn move_leaves_other_users_alone() {
        let db = test_support::memory_db().await;
        let mine = seed(&db, 1, 3).await;
        let theirs = seed(&db, 2, 3).await;
        let theirs_before = ids_in_order(&db, 2).await;

        move_todo(&db, mine[2].id, 1).await.unwrap();
        assert_eq!(
            ids_in_order(&db, 1).await,
            vec![mine[2].id, mine[0].id, mine[1].id]
        );
        assert_eq!(ids_in_order(&db, 2).await, theirs_before);
        assert_eq!(theirs.len(), 3);
    }

    #[tokio::test]
    async fn move_rejects_invalid_targets_without_writing() {
        let db = test_support::memory_db().await;
        let todos = seed(&db, 1, 3).await;
        let before = ids_in_order(&db, 1).await;

        assert!(matches!(
            move_todo(&db, todos[0].id, 4).await,
            Err(OrderError::OutOfRange { requested: 4, max: 3 })
        ));
        assert!(matches!(
            move_todo(&db, todos[1].id, 2).await,
            Err(OrderError::Unchanged(2))
        ));
        assert!(matches!(
            move_todo(&db, 999, 1).await,
            Err(OrderError::TodoNotFound(999))
        ));
        assert_eq!(ids_in_order(&db, 1).await, before);
    }

    #[tokio::test]
    async fn delete_compacts_remaining_todos() {
        let db = test_support::memory_db().await;
        let todos = seed(&db, 1, 5).await;

        let removed = compact_and_delete(&db, todos[1].id).await.unwrap();
        assert_eq!(removed.id, todos[1].id);
        assert_eq!(
            ids_in_order(&db, 1).await,
            vec![todos[0].id, todos[2].id, todos[3].id, todos[4].id]
        );
        assert_eq!(assign_on_create(&db, 1).await.unwrap(), 5);

        assert!(matches!(
            compact_and_delete(&db, todos[1].id).await,
            Err(OrderError::TodoNotFound(_))
        ));
    }
}
