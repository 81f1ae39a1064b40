//! Database initialization
//!
//! Creates the SQLite database on first run and brings the schema up with
//! idempotent `CREATE TABLE IF NOT EXISTS` statements. The relational shape
//! is deliberately flat: recipes own their steps, images and basics through
//! plain foreign keys, and ingredients are a global table deduplicated by
//! unique lowercased name.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Options apply to every pooled connection; foreign keys and WAL set
    // through one-off PRAGMA queries would only reach one connection.
    // WAL allows concurrent readers with one writer, which matters during
    // parallel ingestion; the busy timeout waits on the write lock instead
    // of failing fast under contention.
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(5000));

    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_all_tables(&pool).await?;

    Ok(pool)
}

/// Create the full schema (idempotent, safe to call multiple times)
pub async fn create_all_tables(pool: &SqlitePool) -> Result<()> {
    create_users_table(pool).await?;
    create_api_tokens_table(pool).await?;
    create_recipes_table(pool).await?;
    create_ingredients_table(pool).await?;
    create_recipe_ingredients_table(pool).await?;
    create_instruction_steps_table(pool).await?;
    create_image_tables(pool).await?;
    create_recipe_basics_table(pool).await?;
    create_bad_slugs_table(pool).await?;

    info!("Database tables initialized");
    Ok(())
}

pub async fn create_users_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            email TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn create_api_tokens_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS api_tokens (
            token TEXT PRIMARY KEY,
            username TEXT NOT NULL,
            expires_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn create_recipes_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS recipes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            slug TEXT NOT NULL UNIQUE,
            title TEXT NOT NULL,
            gousto_uid TEXT NOT NULL,
            rating REAL,
            prep_time_minutes INTEGER,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn create_ingredients_table(pool: &SqlitePool) -> Result<()> {
    // The UNIQUE constraint on name is what makes concurrent
    // insert-on-conflict upserts safe
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ingredients (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn create_recipe_ingredients_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS recipe_ingredients (
            recipe_id INTEGER NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
            ingredient_id INTEGER NOT NULL REFERENCES ingredients(id),
            amount TEXT NOT NULL,
            position INTEGER NOT NULL,
            PRIMARY KEY (recipe_id, ingredient_id)
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn create_instruction_steps_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS instruction_steps (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            recipe_id INTEGER NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
            step_order INTEGER NOT NULL,
            description TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn create_image_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS recipe_images (
            recipe_id INTEGER NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
            url TEXT NOT NULL,
            width INTEGER NOT NULL,
            position INTEGER NOT NULL,
            PRIMARY KEY (recipe_id, position)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ingredient_images (
            ingredient_id INTEGER NOT NULL REFERENCES ingredients(id) ON DELETE CASCADE,
            url TEXT NOT NULL,
            width INTEGER NOT NULL,
            position INTEGER NOT NULL,
            PRIMARY KEY (ingredient_id, position)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS step_images (
            step_id INTEGER NOT NULL REFERENCES instruction_steps(id) ON DELETE CASCADE,
            url TEXT NOT NULL,
            width INTEGER NOT NULL,
            position INTEGER NOT NULL,
            PRIMARY KEY (step_id, position)
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn create_recipe_basics_table(pool: &SqlitePool) -> Result<()> {
    // Pantry staples named by the recipe but not shipped with it
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS recipe_basics (
            recipe_id INTEGER NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            position INTEGER NOT NULL,
            PRIMARY KEY (recipe_id, position)
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn create_bad_slugs_table(pool: &SqlitePool) -> Result<()> {
    // Negative cache of slugs that previously failed fetch or parse
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS bad_slugs (
            slug TEXT PRIMARY KEY,
            recorded_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}
