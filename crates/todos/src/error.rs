use db::{
    DbErr,
    models::{ordering::OrderError, sharing::ShareError},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TodoError {
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error("{0}")]
    Validation(String),
    #[error("Todo not found: {0}")]
    TodoNotFound(i64),
    #[error("User not found: {0}")]
    UserNotFound(i64),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    InvalidOrder(String),
}

impl From<OrderError> for TodoError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::Database(db_err) => TodoError::Database(db_err),
            OrderError::TodoNotFound(id) => TodoError::TodoNotFound(id),
            OrderError::OutOfRange { .. } | OrderError::Unchanged(_) => {
                TodoError::InvalidOrder(err.to_string())
            }
        }
    }
}

impl From<ShareError> for TodoError {
    fn from(err: ShareError) -> Self {
        match err {
            ShareError::Database(db_err) => TodoError::Database(db_err),
            ShareError::TodoNotFound(id) => TodoError::TodoNotFound(id),
            ShareError::UserNotFound(id) => TodoError::UserNotFound(id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_errors_map_to_invalid_order() {
        let err: TodoError = OrderError::OutOfRange {
            requested: 5,
            max: 3,
        }
        .into();
        assert!(
            matches!(&err, TodoError::InvalidOrder(msg) if msg.contains("1..=3")),
            "unexpected: {err:?}"
        );

        let err: TodoError = OrderError::Unchanged(2).into();
        assert!(matches!(err, TodoError::InvalidOrder(_)));

        let err: TodoError = OrderError::TodoNotFound(4).into();
        assert!(matches!(err, TodoError::TodoNotFound(4)));
    }

    #[test]
    fn share_errors_keep_their_subject() {
        let err: TodoError = ShareError::UserNotFound(9).into();
        assert!(matches!(err, TodoError::UserNotFound(9)));
        let err: TodoError = ShareError::TodoNotFound(3).into();
        assert!(matches!(err, TodoError::TodoNotFound(3)));
    }
}
