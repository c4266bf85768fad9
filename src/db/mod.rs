use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::env;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS employees (
    employee_id   TEXT PRIMARY KEY,
    full_name     TEXT NOT NULL,
    email         TEXT NOT NULL,
    phone         TEXT NOT NULL,
    designation   TEXT NOT NULL,
    gender        TEXT NOT NULL,
    course        TEXT NOT NULL,
    profile_photo TEXT,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL
)
"#;

pub async fn create_pool() -> Result<SqlitePool, sqlx::Error> {
    let database_url =
        env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://staffdesk.db?mode=rwc".to_string());
    let pool = SqlitePoolOptions::new().connect(&database_url).await?;
    init_schema(&pool).await?;
    Ok(pool)
}

pub async fn init_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(SCHEMA).execute(pool).await?;
    Ok(())
}
