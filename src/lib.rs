use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use std::path::Path;

pub type DbPool = Pool<SqliteConnectionManager>;

pub mod config;
pub mod helper;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod setup;

/// Pool over the identity SQLite file. Pooled connections wait on a busy
/// database instead of failing straight away.
pub fn identity_pool(path: &Path) -> Result<DbPool, r2d2::Error> {
    let manager = SqliteConnectionManager::file(path)
        .with_init(|conn| conn.execute_batch("PRAGMA busy_timeout = 5000;"));
    Pool::builder().build(manager)
}
