//! Ingestion orchestrator
//!
//! Drives the per-slug state machine: stored already? → fetch → parse →
//! persist, converting fetch/parse failures into bad-slug markers and
//! typed results. Failures are isolated per slug; nothing here aborts a
//! sibling ingestion or escapes as a panic.

use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::db;
use crate::gousto::{discover_all_slugs, parse_recipe, GoustoClient, GoustoError, Recipe};
use crate::ingest::reconcile::{reconcile, Reconciliation};

/// Typed outcome of a failed or short-circuited ingestion
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// Slug already stored; nothing was fetched
    #[error("Recipe already exists for slug '{slug}'")]
    AlreadyExists { slug: String },

    /// Fetch or parse failed; the slug was recorded as bad
    #[error("Ingestion of '{slug}' failed: {cause}")]
    Failed { slug: String, cause: GoustoError },

    /// Slug discovery could not complete
    #[error("Slug discovery failed: {0}")]
    Discovery(GoustoError),

    /// Storage failure; not attributable to upstream
    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

/// Summary of one batch ingestion run
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub ingested: Vec<String>,
    pub already_existed: Vec<String>,
    pub failed: Vec<(String, String)>,
    /// Slugs never attempted because the batch was cancelled
    pub skipped: Vec<String>,
}

/// Orchestrates discovery, reconciliation and per-slug ingestion
#[derive(Clone)]
pub struct Ingestor {
    db: SqlitePool,
    client: GoustoClient,
    discovery_concurrency: usize,
}

impl Ingestor {
    pub fn new(db: SqlitePool, client: GoustoClient, discovery_concurrency: usize) -> Self {
        Self {
            db,
            client,
            discovery_concurrency,
        }
    }

    /// Discover upstream slugs and reconcile them against storage
    pub async fn check_new(&self, cancel: &CancellationToken) -> Result<Reconciliation, IngestError> {
        let upstream = discover_all_slugs(&self.client, self.discovery_concurrency, cancel)
            .await
            .map_err(IngestError::Discovery)?;

        let stored = db::recipes::list_slugs(&self.db).await?;
        let bad = db::bad_slugs::list_bad_slugs(&self.db).await?;

        let result = reconcile(&upstream, &stored, &bad);
        info!(
            upstream = upstream.len(),
            new = result.new_slugs.len(),
            previously_bad = result.previously_bad.len(),
            "Reconciled upstream slugs against storage"
        );
        Ok(result)
    }

    /// Ingest a single slug
    ///
    /// State machine:
    /// - slug already stored → `AlreadyExists`, upstream never contacted
    /// - fetch/parse failure → slug marked bad (insert-if-absent), `Failed`
    /// - success → stale bad marker removed, recipe persisted atomically
    pub async fn ingest_slug(&self, slug: &str) -> Result<Recipe, IngestError> {
        if db::recipes::exists_slug(&self.db, slug).await? {
            return Err(IngestError::AlreadyExists {
                slug: slug.to_string(),
            });
        }

        let payload = match self.client.fetch_recipe(slug).await {
            Ok(payload) => payload,
            Err(cause) => return self.fail_slug(slug, cause).await,
        };

        let recipe = match parse_recipe(&payload) {
            Ok(recipe) => recipe,
            Err(cause) => return self.fail_slug(slug, cause).await,
        };

        // A slug that now parses cleanly is no longer bad
        db::bad_slugs::delete_bad_slug(&self.db, slug).await?;

        db::recipes::persist_recipe(&self.db, slug, &recipe).await?;
        info!(slug = %slug, title = %recipe.title, "Recipe ingested");
        Ok(recipe)
    }

    /// Ingest many slugs with a bounded worker count
    ///
    /// Each slug is an independent unit of work; one failure never aborts
    /// the others. Cancellation stops scheduling further slugs while
    /// letting in-flight ingestions run to completion, so no partial
    /// recipe writes are left behind.
    pub async fn ingest_batch(
        &self,
        slugs: Vec<String>,
        workers: usize,
        cancel: &CancellationToken,
    ) -> Result<BatchOutcome, IngestError> {
        let semaphore = Arc::new(Semaphore::new(workers.max(1)));
        let mut handles = Vec::with_capacity(slugs.len());

        for slug in slugs {
            let permit = semaphore.clone();
            let ingestor = self.clone();
            let cancel = cancel.clone();
            handles.push(tokio::spawn(async move {
                let _permit = permit.acquire_owned().await.expect("semaphore closed");
                if cancel.is_cancelled() {
                    return (slug, None);
                }
                let result = ingestor.ingest_slug(&slug).await;
                (slug, Some(result))
            }));
        }

        let mut outcome = BatchOutcome::default();
        for handle in handles {
            let (slug, result) = handle.await.map_err(|e| {
                IngestError::Storage(anyhow::anyhow!("ingestion task panicked: {}", e))
            })?;
            match result {
                None => outcome.skipped.push(slug),
                Some(Ok(_)) => outcome.ingested.push(slug),
                Some(Err(IngestError::AlreadyExists { .. })) => {
                    outcome.already_existed.push(slug)
                }
                Some(Err(e)) => {
                    warn!(slug = %slug, error = %e, "Slug ingestion failed");
                    outcome.failed.push((slug, e.to_string()));
                }
            }
        }

        info!(
            ingested = outcome.ingested.len(),
            already_existed = outcome.already_existed.len(),
            failed = outcome.failed.len(),
            skipped = outcome.skipped.len(),
            "Batch ingestion finished"
        );
        Ok(outcome)
    }

    /// Record a slug as bad and return the typed failure
    async fn fail_slug(&self, slug: &str, cause: GoustoError) -> Result<Recipe, IngestError> {
        warn!(slug = %slug, error = %cause, "Marking slug as bad");
        db::bad_slugs::insert_bad_slug(&self.db, slug).await?;
        Err(IngestError::Failed {
            slug: slug.to_string(),
            cause,
        })
    }
}
