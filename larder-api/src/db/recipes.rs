//! Recipe persistence and retrieval
//!
//! A recipe row owns its steps, images and basics through plain foreign
//! keys. Persisting a parsed recipe is all-or-nothing: shared ingredient
//! rows are upserted first (they outlive any one recipe), then the recipe
//! and everything it owns is written inside a single transaction.

use anyhow::Result;
use serde::Serialize;
use sqlx::{Row, SqlitePool};
use std::collections::HashSet;

use crate::gousto::{ImageRef, Recipe};

/// Catalogue listing entry
#[derive(Debug, Clone, Serialize)]
pub struct RecipeSummary {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub rating: Option<f64>,
    pub prep_time_minutes: Option<i64>,
}

/// Fully loaded recipe as served by the API
#[derive(Debug, Clone, Serialize)]
pub struct StoredRecipe {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub gousto_uid: String,
    pub rating: Option<f64>,
    pub prep_time_minutes: Option<i64>,
    pub images: Vec<ImageRef>,
    pub ingredients: Vec<StoredIngredient>,
    pub instruction_steps: Vec<StoredStep>,
    pub basic_ingredients: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoredIngredient {
    pub name: String,
    pub amount: String,
    pub images: Vec<ImageRef>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoredStep {
    pub order: i64,
    pub description: String,
    pub images: Vec<ImageRef>,
}

/// Whether a recipe with this slug is already stored
pub async fn exists_slug(pool: &SqlitePool, slug: &str) -> Result<bool> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM recipes WHERE slug = ?")
        .bind(slug)
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}

/// All stored slugs
pub async fn list_slugs(pool: &SqlitePool) -> Result<HashSet<String>> {
    let rows: Vec<(String,)> = sqlx::query_as("SELECT slug FROM recipes")
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(|(slug,)| slug).collect())
}

/// Persist a parsed recipe under `slug`, returning the new recipe id
pub async fn persist_recipe(pool: &SqlitePool, slug: &str, recipe: &Recipe) -> Result<i64> {
    // Shared ingredient rows first, so the look-up-or-create happens
    // against the unique name regardless of which recipe gets there first
    let mut ingredient_ids = Vec::with_capacity(recipe.ingredients.len());
    for ingredient in &recipe.ingredients {
        let id = super::ingredients::upsert_ingredient(pool, &ingredient.name).await?;
        super::ingredients::attach_images(pool, id, &ingredient.images).await?;
        ingredient_ids.push(id);
    }

    // Everything the recipe owns is one atomic unit
    let mut tx = pool.begin().await?;

    let recipe_id = sqlx::query(
        r#"
        INSERT INTO recipes (slug, title, gousto_uid, rating, prep_time_minutes)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(slug)
    .bind(&recipe.title)
    .bind(&recipe.gousto_uid)
    .bind(recipe.rating)
    .bind(recipe.prep_time_minutes)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    for (position, (ingredient, ingredient_id)) in
        recipe.ingredients.iter().zip(&ingredient_ids).enumerate()
    {
        sqlx::query(
            r#"
            INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount, position)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(recipe_id)
        .bind(ingredient_id)
        .bind(&ingredient.amount)
        .bind(position as i64)
        .execute(&mut *tx)
        .await?;
    }

    for (position, image) in recipe.images.iter().enumerate() {
        sqlx::query(
            "INSERT INTO recipe_images (recipe_id, url, width, position) VALUES (?, ?, ?, ?)",
        )
        .bind(recipe_id)
        .bind(&image.url)
        .bind(image.width)
        .bind(position as i64)
        .execute(&mut *tx)
        .await?;
    }

    for step in &recipe.instruction_steps {
        let step_id = sqlx::query(
            "INSERT INTO instruction_steps (recipe_id, step_order, description) VALUES (?, ?, ?)",
        )
        .bind(recipe_id)
        .bind(step.order)
        .bind(&step.description)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        for (position, image) in step.images.iter().enumerate() {
            sqlx::query(
                "INSERT INTO step_images (step_id, url, width, position) VALUES (?, ?, ?, ?)",
            )
            .bind(step_id)
            .bind(&image.url)
            .bind(image.width)
            .bind(position as i64)
            .execute(&mut *tx)
            .await?;
        }
    }

    for (position, name) in recipe.basic_ingredients.iter().enumerate() {
        sqlx::query("INSERT INTO recipe_basics (recipe_id, name, position) VALUES (?, ?, ?)")
            .bind(recipe_id)
            .bind(name)
            .bind(position as i64)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(recipe_id)
}

/// Catalogue summaries, ordered by title
pub async fn list_recipes(pool: &SqlitePool) -> Result<Vec<RecipeSummary>> {
    let rows = sqlx::query(
        "SELECT id, slug, title, rating, prep_time_minutes FROM recipes ORDER BY title",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| RecipeSummary {
            id: row.get("id"),
            slug: row.get("slug"),
            title: row.get("title"),
            rating: row.get("rating"),
            prep_time_minutes: row.get("prep_time_minutes"),
        })
        .collect())
}

/// Load one recipe with all of its children eagerly
pub async fn get_recipe(pool: &SqlitePool, recipe_id: i64) -> Result<Option<StoredRecipe>> {
    let row = sqlx::query(
        "SELECT id, slug, title, gousto_uid, rating, prep_time_minutes FROM recipes WHERE id = ?",
    )
    .bind(recipe_id)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let ingredient_rows = sqlx::query(
        r#"
        SELECT i.id AS ingredient_id, i.name, ri.amount
        FROM recipe_ingredients ri
        JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE ri.recipe_id = ?
        ORDER BY ri.position
        "#,
    )
    .bind(recipe_id)
    .fetch_all(pool)
    .await?;

    let mut ingredients = Vec::with_capacity(ingredient_rows.len());
    for ingredient_row in ingredient_rows {
        let ingredient_id: i64 = ingredient_row.get("ingredient_id");
        ingredients.push(StoredIngredient {
            name: ingredient_row.get("name"),
            amount: ingredient_row.get("amount"),
            images: super::ingredients::load_images(pool, ingredient_id).await?,
        });
    }

    let step_rows = sqlx::query(
        "SELECT id, step_order, description FROM instruction_steps WHERE recipe_id = ? ORDER BY step_order",
    )
    .bind(recipe_id)
    .fetch_all(pool)
    .await?;

    let mut instruction_steps = Vec::with_capacity(step_rows.len());
    for step_row in step_rows {
        let step_id: i64 = step_row.get("id");
        let image_rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT url, width FROM step_images WHERE step_id = ? ORDER BY position",
        )
        .bind(step_id)
        .fetch_all(pool)
        .await?;

        instruction_steps.push(StoredStep {
            order: step_row.get("step_order"),
            description: step_row.get("description"),
            images: image_rows
                .into_iter()
                .map(|(url, width)| ImageRef { url, width })
                .collect(),
        });
    }

    let image_rows: Vec<(String, i64)> = sqlx::query_as(
        "SELECT url, width FROM recipe_images WHERE recipe_id = ? ORDER BY position",
    )
    .bind(recipe_id)
    .fetch_all(pool)
    .await?;

    let basics: Vec<(String,)> = sqlx::query_as(
        "SELECT name FROM recipe_basics WHERE recipe_id = ? ORDER BY position",
    )
    .bind(recipe_id)
    .fetch_all(pool)
    .await?;

    Ok(Some(StoredRecipe {
        id: row.get("id"),
        slug: row.get("slug"),
        title: row.get("title"),
        gousto_uid: row.get("gousto_uid"),
        rating: row.get("rating"),
        prep_time_minutes: row.get("prep_time_minutes"),
        images: image_rows
            .into_iter()
            .map(|(url, width)| ImageRef { url, width })
            .collect(),
        ingredients,
        instruction_steps,
        basic_ingredients: basics.into_iter().map(|(name,)| name).collect(),
    }))
}

/// Resolve a stored slug to its recipe id
pub async fn get_recipe_id_by_slug(pool: &SqlitePool, slug: &str) -> Result<Option<i64>> {
    let id: Option<i64> = sqlx::query_scalar("SELECT id FROM recipes WHERE slug = ?")
        .bind(slug)
        .fetch_optional(pool)
        .await?;
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gousto::{Ingredient, InstructionStep};

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePool::connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory database");
        sqlx::query("PRAGMA foreign_keys = ON")
            .execute(&pool)
            .await
            .unwrap();
        larder_common::db::init::create_all_tables(&pool)
            .await
            .unwrap();
        pool
    }

    fn sample_recipe() -> Recipe {
        Recipe {
            title: "Thai Green Curry".to_string(),
            gousto_uid: "uid-123".to_string(),
            images: vec![ImageRef {
                url: "https://img/hero.jpg".to_string(),
                width: 700,
            }],
            rating: Some(4.5),
            prep_time_minutes: Some(35),
            ingredients: vec![
                Ingredient {
                    name: "soy sauce".to_string(),
                    amount: "8ml + 15ml".to_string(),
                    images: vec![],
                },
                Ingredient {
                    name: "chicken breast".to_string(),
                    amount: "250g".to_string(),
                    images: vec![],
                },
            ],
            instruction_steps: vec![
                InstructionStep {
                    order: 2,
                    description: "Chop the things".to_string(),
                    images: vec![],
                },
                InstructionStep {
                    order: 4,
                    description: "Cook the things".to_string(),
                    images: vec![ImageRef {
                        url: "https://img/step.jpg".to_string(),
                        width: 400,
                    }],
                },
            ],
            basic_ingredients: vec!["Salt".to_string(), "Pepper".to_string()],
        }
    }

    #[tokio::test]
    async fn test_persist_and_load_roundtrip() {
        let pool = test_pool().await;

        let id = persist_recipe(&pool, "thai-green-curry", &sample_recipe())
            .await
            .unwrap();

        let stored = get_recipe(&pool, id).await.unwrap().expect("recipe stored");
        assert_eq!(stored.slug, "thai-green-curry");
        assert_eq!(stored.title, "Thai Green Curry");
        assert_eq!(stored.rating, Some(4.5));
        assert_eq!(stored.ingredients.len(), 2);
        assert_eq!(stored.ingredients[0].name, "soy sauce");
        assert_eq!(stored.ingredients[0].amount, "8ml + 15ml");

        // Upstream step ordering preserved
        let orders: Vec<i64> = stored.instruction_steps.iter().map(|s| s.order).collect();
        assert_eq!(orders, vec![2, 4]);
        assert_eq!(stored.instruction_steps[1].images.len(), 1);
        assert_eq!(stored.basic_ingredients, vec!["Salt", "Pepper"]);

        assert!(exists_slug(&pool, "thai-green-curry").await.unwrap());
        assert!(!exists_slug(&pool, "unknown").await.unwrap());
    }

    #[tokio::test]
    async fn test_two_recipes_share_ingredient_rows() {
        let pool = test_pool().await;

        let mut second = sample_recipe();
        second.title = "Another Curry".to_string();
        second.gousto_uid = "uid-456".to_string();

        persist_recipe(&pool, "first", &sample_recipe()).await.unwrap();
        persist_recipe(&pool, "second", &second).await.unwrap();

        let names: Vec<(String,)> = sqlx::query_as("SELECT name FROM ingredients ORDER BY name")
            .fetch_all(&pool)
            .await
            .unwrap();
        assert_eq!(
            names.into_iter().map(|(n,)| n).collect::<Vec<_>>(),
            vec!["chicken breast", "soy sauce"]
        );
    }

    #[tokio::test]
    async fn test_list_recipes_summaries() {
        let pool = test_pool().await;
        persist_recipe(&pool, "thai-green-curry", &sample_recipe())
            .await
            .unwrap();

        let summaries = list_recipes(&pool).await.unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].slug, "thai-green-curry");
        assert_eq!(summaries[0].prep_time_minutes, Some(35));
    }
}
