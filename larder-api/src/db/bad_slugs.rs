//! Negative cache of slugs that previously failed fetch or parse

use anyhow::Result;
use sqlx::SqlitePool;
use std::collections::HashSet;

/// All currently known-bad slugs
pub async fn list_bad_slugs(pool: &SqlitePool) -> Result<HashSet<String>> {
    let rows: Vec<(String,)> = sqlx::query_as("SELECT slug FROM bad_slugs")
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(|(slug,)| slug).collect())
}

/// Record a slug as bad; inserting an already-recorded slug is a no-op
pub async fn insert_bad_slug(pool: &SqlitePool, slug: &str) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO bad_slugs (slug) VALUES (?)")
        .bind(slug)
        .execute(pool)
        .await?;
    Ok(())
}

/// Remove a slug from the bad set; removing an absent slug is a no-op
pub async fn delete_bad_slug(pool: &SqlitePool, slug: &str) -> Result<()> {
    sqlx::query("DELETE FROM bad_slugs WHERE slug = ?")
        .bind(slug)
        .execute(pool)
        .await?;
    Ok(())
}
