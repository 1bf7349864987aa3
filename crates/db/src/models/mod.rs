pub mod ordering;
pub mod sharing;
pub mod todo;
pub mod user;
