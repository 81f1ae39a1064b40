//! Ingredient rows, deduplicated globally by lowercased name

use anyhow::Result;
use sqlx::SqlitePool;

use crate::gousto::ImageRef;

/// Look up or create the ingredient row for `name`, returning its id
///
/// Implemented as insert-on-conflict-return-existing against the UNIQUE
/// name column, so concurrent ingestion of recipes sharing an ingredient
/// cannot create duplicate rows.
pub async fn upsert_ingredient(pool: &SqlitePool, name: &str) -> Result<i64> {
    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO ingredients (name) VALUES (?)
        ON CONFLICT(name) DO UPDATE SET name = excluded.name
        RETURNING id
        "#,
    )
    .bind(name)
    .fetch_one(pool)
    .await?;
    Ok(id)
}

/// Attach image renditions to an ingredient; existing positions win
pub async fn attach_images(pool: &SqlitePool, ingredient_id: i64, images: &[ImageRef]) -> Result<()> {
    for (position, image) in images.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO ingredient_images (ingredient_id, url, width, position)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(ingredient_id)
        .bind(&image.url)
        .bind(image.width)
        .bind(position as i64)
        .execute(pool)
        .await?;
    }
    Ok(())
}

/// Image renditions for one ingredient, in position order
pub async fn load_images(pool: &SqlitePool, ingredient_id: i64) -> Result<Vec<ImageRef>> {
    let rows: Vec<(String, i64)> = sqlx::query_as(
        "SELECT url, width FROM ingredient_images WHERE ingredient_id = ? ORDER BY position",
    )
    .bind(ingredient_id)
    .fetch_all(pool)
    .await?;
    Ok(rows
        .into_iter()
        .map(|(url, width)| ImageRef { url, width })
        .collect())
}
