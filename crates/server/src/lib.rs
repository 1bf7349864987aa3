use db::DBService;
use todos::TodoService;

pub mod error;
pub mod http;
pub mod middleware;
pub mod response;
pub mod routes;

/// Shared handler state. Cloned per request; the pool inside is the only shared resource.
#[derive(Clone)]
pub struct AppState {
    pub todos: TodoService,
}

impl AppState {
    pub fn new(db: DBService) -> Self {
        Self {
            todos: TodoService::new(db),
        }
    }

    pub fn db(&self) -> &DBService {
        self.todos.db()
    }
}
