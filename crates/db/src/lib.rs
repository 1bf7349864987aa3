use std::time::Duration;

use sea_orm::{ConnectOptions, ConnectionTrait, Database};
use sea_orm_migration::MigratorTrait;

pub use sea_orm::{
    DatabaseBackend, DatabaseConnection, DatabaseTransaction, DbErr, IsolationLevel,
    TransactionTrait,
};

pub mod entities;
pub mod models;

pub type DbPool = DatabaseConnection;

const SQLITE_BUSY_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct DBService {
    pub pool: DbPool,
}

impl DBService {
    /// Connects to `database_url` and brings the schema up to date.
    pub async fn new(database_url: &str) -> Result<DBService, DbErr> {
        let mut options = ConnectOptions::new(database_url.to_string());
        options
            .sqlx_logging(false)
            .map_sqlx_sqlite_opts(|opts| opts.busy_timeout(SQLITE_BUSY_TIMEOUT));

        let pool = Database::connect(options).await?;
        db_migration::Migrator::up(&pool, None).await?;
        tracing::debug!(
            backend = ?pool.get_database_backend(),
            "Database connected and migrated"
        );
        Ok(DBService { pool })
    }

    /// Wraps an already-migrated connection.
    pub fn from_pool(pool: DbPool) -> Self {
        DBService { pool }
    }

    /// Isolation level used for read-modify-write transactions.
    ///
    /// SQLite already serializes writers; Postgres needs `SERIALIZABLE` asked for.
    pub fn write_isolation(&self) -> Option<IsolationLevel> {
        match self.pool.get_database_backend() {
            DatabaseBackend::Postgres => Some(IsolationLevel::Serializable),
            _ => None,
        }
    }

    pub async fn begin_write(&self) -> Result<DatabaseTransaction, DbErr> {
        self.pool
            .begin_with_config(self.write_isolation(), None)
            .await
    }
}
