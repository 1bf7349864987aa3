mod error;
mod service;

pub use db::models::{
    todo::{CreateTodo, DEFAULT_CATEGORY, SHARED_CATEGORY, Todo, UpdateTodo},
    user::User,
};
pub use error::TodoError;
pub use service::TodoService;
