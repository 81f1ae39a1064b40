//! Integration tests for the ingestion pipeline against a stub upstream

mod support;

use std::collections::{HashMap, HashSet};

use sqlx::SqlitePool;
use tokio_util::sync::CancellationToken;

use larder_api::db;
use larder_api::gousto::{discover_all_slugs, GoustoClient, GoustoError};
use larder_api::ingest::{IngestError, Ingestor};
use support::{malformed_payload, recipe_payload, StubUpstream};

async fn test_db() -> (tempfile::TempDir, SqlitePool) {
    let dir = tempfile::tempdir().expect("tempdir");
    let pool = larder_common::db::init::init_database(&dir.path().join("test.db"))
        .await
        .expect("init database");
    (dir, pool)
}

fn ingestor(pool: &SqlitePool, stub: &StubUpstream) -> Ingestor {
    let config = stub.config();
    Ingestor::new(
        pool.clone(),
        GoustoClient::new(&config),
        config.discovery_concurrency,
    )
}

#[tokio::test]
async fn test_ingest_slug_persists_full_recipe() {
    let stub = StubUpstream::start(
        vec![],
        HashMap::from([(
            "lemon-chicken".to_string(),
            recipe_payload("Lemon Chicken", "uid-1"),
        )]),
    )
    .await;
    let (_dir, pool) = test_db().await;

    let recipe = ingestor(&pool, &stub)
        .ingest_slug("lemon-chicken")
        .await
        .expect("ingestion succeeds");
    assert_eq!(recipe.title, "Lemon Chicken");

    let id = db::recipes::get_recipe_id_by_slug(&pool, "lemon-chicken")
        .await
        .unwrap()
        .expect("recipe stored");
    let stored = db::recipes::get_recipe(&pool, id)
        .await
        .unwrap()
        .expect("recipe loads");

    assert_eq!(stored.title, "Lemon Chicken");
    assert_eq!(stored.gousto_uid, "uid-1");
    assert_eq!(stored.rating, Some(4.0));
    assert_eq!(stored.prep_time_minutes, Some(25));
    assert_eq!(stored.images.len(), 1);
    assert_eq!(stored.ingredients.len(), 2);
    assert_eq!(stored.ingredients[0].name, "soy sauce");
    assert_eq!(stored.ingredients[0].amount, "15ml");
    assert_eq!(stored.ingredients[0].images.len(), 1);
    assert_eq!(stored.ingredients[1].amount, "1");
    assert_eq!(stored.instruction_steps.len(), 2);
    assert_eq!(stored.basic_ingredients, vec!["Salt"]);
}

#[tokio::test]
async fn test_stored_slug_short_circuits_without_fetch() {
    let stub = StubUpstream::start(
        vec![],
        HashMap::from([(
            "lemon-chicken".to_string(),
            recipe_payload("Lemon Chicken", "uid-1"),
        )]),
    )
    .await;
    let (_dir, pool) = test_db().await;
    let ingestor = ingestor(&pool, &stub);

    ingestor.ingest_slug("lemon-chicken").await.unwrap();
    assert_eq!(stub.recipe_hits().len(), 1);

    let err = ingestor.ingest_slug("lemon-chicken").await.unwrap_err();
    assert!(matches!(err, IngestError::AlreadyExists { .. }));

    // The second attempt never contacted upstream
    assert_eq!(stub.recipe_hits().len(), 1);
}

#[tokio::test]
async fn test_fetch_failure_marks_slug_bad() {
    let stub = StubUpstream::start(vec![], HashMap::new()).await;
    let (_dir, pool) = test_db().await;

    let err = ingestor(&pool, &stub)
        .ingest_slug("vanished-recipe")
        .await
        .unwrap_err();
    assert!(matches!(err, IngestError::Failed { .. }));

    let bad = db::bad_slugs::list_bad_slugs(&pool).await.unwrap();
    assert!(bad.contains("vanished-recipe"));
    assert!(!db::recipes::exists_slug(&pool, "vanished-recipe")
        .await
        .unwrap());
}

#[tokio::test]
async fn test_malformed_payload_marks_slug_bad() {
    let stub = StubUpstream::start(
        vec![],
        HashMap::from([("broken".to_string(), malformed_payload())]),
    )
    .await;
    let (_dir, pool) = test_db().await;

    let err = ingestor(&pool, &stub).ingest_slug("broken").await.unwrap_err();
    match err {
        IngestError::Failed { cause, .. } => assert!(!cause.is_transport()),
        other => panic!("expected Failed, got {:?}", other),
    }

    let bad = db::bad_slugs::list_bad_slugs(&pool).await.unwrap();
    assert!(bad.contains("broken"));
}

#[tokio::test]
async fn test_successful_ingest_clears_stale_bad_marker() {
    let stub = StubUpstream::start(
        vec![],
        HashMap::from([(
            "recovered".to_string(),
            recipe_payload("Recovered", "uid-2"),
        )]),
    )
    .await;
    let (_dir, pool) = test_db().await;

    db::bad_slugs::insert_bad_slug(&pool, "recovered").await.unwrap();

    ingestor(&pool, &stub).ingest_slug("recovered").await.unwrap();

    assert!(db::bad_slugs::list_bad_slugs(&pool).await.unwrap().is_empty());
    assert!(db::recipes::exists_slug(&pool, "recovered").await.unwrap());
}

#[tokio::test]
async fn test_batch_shares_ingredient_rows() {
    let stub = StubUpstream::start(
        vec![],
        HashMap::from([
            ("first".to_string(), recipe_payload("First", "uid-1")),
            ("second".to_string(), recipe_payload("Second", "uid-2")),
            ("third".to_string(), recipe_payload("Third", "uid-3")),
        ]),
    )
    .await;
    let (_dir, pool) = test_db().await;

    let outcome = ingestor(&pool, &stub)
        .ingest_batch(
            vec![
                "first".to_string(),
                "second".to_string(),
                "third".to_string(),
            ],
            2,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.ingested.len(), 3);
    assert!(outcome.failed.is_empty());

    // All three recipes reference the same two ingredient rows
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ingredients")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 2);
}

#[tokio::test]
async fn test_batch_isolates_failures() {
    let stub = StubUpstream::start(
        vec![],
        HashMap::from([
            ("good".to_string(), recipe_payload("Good", "uid-1")),
            ("bad".to_string(), malformed_payload()),
        ]),
    )
    .await;
    let (_dir, pool) = test_db().await;

    let outcome = ingestor(&pool, &stub)
        .ingest_batch(
            vec!["good".to_string(), "bad".to_string(), "missing".to_string()],
            2,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.ingested, vec!["good"]);
    assert_eq!(outcome.failed.len(), 2);
}

#[tokio::test]
async fn test_cancelled_batch_skips_unstarted_slugs() {
    let stub = StubUpstream::start(
        vec![],
        HashMap::from([("never".to_string(), recipe_payload("Never", "uid-1"))]),
    )
    .await;
    let (_dir, pool) = test_db().await;

    let cancel = CancellationToken::new();
    cancel.cancel();

    let outcome = ingestor(&pool, &stub)
        .ingest_batch(vec!["never".to_string()], 2, &cancel)
        .await
        .unwrap();

    assert_eq!(outcome.skipped, vec!["never"]);
    assert!(stub.recipe_hits().is_empty());
}

#[tokio::test]
async fn test_discovery_skips_failed_page_and_continues() {
    // Page 0 answers 500; with a single-page batch discovery must skip it
    // and still collect the entry on page 1
    let stub = StubUpstream::start_with_page_failures(
        vec![vec![], vec!["/recipes/survivor".to_string()]],
        HashMap::new(),
        HashSet::from([0]),
    )
    .await;
    let client = GoustoClient::new(&stub.config());

    let slugs = discover_all_slugs(&client, 1, &CancellationToken::new())
        .await
        .expect("discovery survives a failed page");

    assert_eq!(slugs, HashSet::from(["survivor".to_string()]));
}

#[tokio::test]
async fn test_discovery_failed_page_keeps_sibling_contributions() {
    // Both pages of one batch are in flight together; the 500 on page 0 is
    // skipped while page 1 still contributes
    let stub = StubUpstream::start_with_page_failures(
        vec![vec![], vec!["/recipes/sibling".to_string()]],
        HashMap::new(),
        HashSet::from([0]),
    )
    .await;
    let client = GoustoClient::new(&stub.config());

    let slugs = discover_all_slugs(&client, 2, &CancellationToken::new())
        .await
        .expect("discovery survives a failed page in a batch");

    assert_eq!(slugs, HashSet::from(["sibling".to_string()]));
}

#[tokio::test]
async fn test_discovery_gives_up_when_upstream_never_answers() {
    // Every page fails, so the end-of-listing sentinel can never arrive;
    // discovery must terminate with a transport error instead of walking
    // pages forever
    let stub = StubUpstream::start_with_page_failures(
        vec![],
        HashMap::new(),
        (0..32).collect(),
    )
    .await;
    let client = GoustoClient::new(&stub.config());

    let err = discover_all_slugs(&client, 2, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, GoustoError::Transport(_)));
}

#[tokio::test]
async fn test_check_new_reconciles_against_storage() {
    let stub = StubUpstream::start(
        vec![
            vec![
                "/recipes/already-stored".to_string(),
                "/recipes/brand-new".to_string(),
            ],
            vec![
                "/fish-recipes/previously-bad".to_string(),
                "/vegan-recipes/also-new".to_string(),
            ],
        ],
        HashMap::from([(
            "already-stored".to_string(),
            recipe_payload("Stored", "uid-1"),
        )]),
    )
    .await;
    let (_dir, pool) = test_db().await;
    let ingestor = ingestor(&pool, &stub);

    ingestor.ingest_slug("already-stored").await.unwrap();
    db::bad_slugs::insert_bad_slug(&pool, "previously-bad").await.unwrap();

    let result = ingestor.check_new(&CancellationToken::new()).await.unwrap();

    let mut new_slugs: Vec<String> = result.new_slugs.into_iter().collect();
    new_slugs.sort();
    assert_eq!(new_slugs, vec!["also-new", "brand-new"]);

    let previously_bad: Vec<String> = result.previously_bad.into_iter().collect();
    assert_eq!(previously_bad, vec!["previously-bad"]);
}
