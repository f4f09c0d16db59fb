//! SQLite document store
//!
//! Each collection is one table holding the full record as a JSON document,
//! plus the scalar columns that queries filter or sort on. Writes are single
//! statements; nothing here opens a transaction spanning several records.

mod departments;
mod logs;
mod volunteers;

pub use departments::SqliteDepartmentRepository;
pub use logs::SqliteLogRepository;
pub use volunteers::SqliteVolunteerRepository;

use crate::Result;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::path::Path;
use tracing::info;

/// Open (creating if needed) the database file and its tables
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // WAL lets list queries proceed while a batch import is writing
    sqlx::query("PRAGMA journal_mode = WAL")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&pool)
        .await?;

    create_tables(&pool).await?;

    Ok(pool)
}

/// Single-connection in-memory database with all tables created
///
/// Every pooled connection to `sqlite::memory:` would otherwise see its own
/// empty database, so the pool is capped at one connection.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await?;

    create_tables(&pool).await?;

    Ok(pool)
}

/// Create collection tables (idempotent)
pub async fn create_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS volunteers (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            created_at TEXT NOT NULL,
            document TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS departments (
            id TEXT PRIMARY KEY,
            department_name TEXT NOT NULL,
            created_at TEXT NOT NULL,
            document TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS system_logs (
            id TEXT PRIMARY KEY,
            log_type TEXT NOT NULL,
            category TEXT NOT NULL,
            severity TEXT NOT NULL,
            time_detected TEXT NOT NULL,
            document TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_system_logs_time ON system_logs(time_detected DESC)",
    )
    .execute(pool)
    .await?;

    info!("Database tables initialized (volunteers, departments, system_logs)");

    Ok(())
}
