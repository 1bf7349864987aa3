use std::{
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard, OnceLock},
};

use db_migration::Migrator;
use sea_orm::{Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use tempfile::TempDir;

/// Fresh in-memory SQLite database with every migration applied.
pub async fn memory_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("connect in-memory sqlite");
    Migrator::up(&db, None).await.expect("apply migrations");
    db
}

pub fn test_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

const GUARDED_VARS: [&str; 7] = [
    "TODO_ASSET_DIR",
    "TODO_CONFIG_PATH",
    "DATABASE_URL",
    "HOST",
    "PORT",
    "BACKEND_PORT",
    "RUST_LOG",
];

/// Points the asset dir at a temp directory and clears the other config variables,
/// restoring all of them on drop. Holding one serializes env-touching tests.
pub struct TestEnvGuard {
    _lock: MutexGuard<'static, ()>,
    temp_dir: TempDir,
    previous: Vec<(&'static str, Option<String>)>,
}

impl TestEnvGuard {
    pub fn new() -> Self {
        let lock = test_lock().lock().unwrap_or_else(|err| err.into_inner());
        let temp_dir = TempDir::new().expect("create temp asset dir");
        let previous = GUARDED_VARS
            .iter()
            .map(|name| (*name, std::env::var(name).ok()))
            .collect();

        // SAFETY: tests using TestEnvGuard are serialized by test_lock.
        unsafe {
            for name in GUARDED_VARS {
                std::env::remove_var(name);
            }
            std::env::set_var("TODO_ASSET_DIR", temp_dir.path());
        }

        Self {
            _lock: lock,
            temp_dir,
            previous,
        }
    }

    pub fn asset_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    pub fn set(&self, name: &str, value: impl AsRef<std::ffi::OsStr>) {
        // SAFETY: tests using TestEnvGuard are serialized by test_lock.
        unsafe { std::env::set_var(name, value) };
    }
}

impl Default for TestEnvGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TestEnvGuard {
    fn drop(&mut self) {
        // SAFETY: tests using TestEnvGuard are serialized by test_lock.
        unsafe {
            for (name, value) in &self.previous {
                match value {
                    Some(value) => std::env::set_var(name, value),
                    None => std::env::remove_var(name),
                }
            }
        }
    }
}
