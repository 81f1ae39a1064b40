//! Shared test support: a stub upstream server and payload fixtures

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use larder_common::config::UpstreamConfig;

/// In-process stand-in for the upstream recipe API
///
/// Serves a fixed set of listing pages and recipe payloads and records
/// every recipe fetch, so tests can assert on upstream traffic.
pub struct StubUpstream {
    pub addr: SocketAddr,
    state: Arc<StubState>,
}

struct StubState {
    pages: Vec<Vec<String>>,
    recipes: HashMap<String, Value>,
    failing_pages: HashSet<usize>,
    recipe_hits: Mutex<Vec<String>>,
}

#[derive(Deserialize)]
struct ListingQuery {
    limit: u32,
    offset: u32,
}

impl StubUpstream {
    /// Start the stub with listing pages of entry URLs and a slug-to-payload map
    pub async fn start(pages: Vec<Vec<String>>, recipes: HashMap<String, Value>) -> Self {
        Self::start_with_page_failures(pages, recipes, HashSet::new()).await
    }

    /// Start the stub with some listing pages answering HTTP 500
    pub async fn start_with_page_failures(
        pages: Vec<Vec<String>>,
        recipes: HashMap<String, Value>,
        failing_pages: HashSet<usize>,
    ) -> Self {
        let state = Arc::new(StubState {
            pages,
            recipes,
            failing_pages,
            recipe_hits: Mutex::new(Vec::new()),
        });

        let router = Router::new()
            .route("/listing", get(listing))
            .route("/recipes/:slug", get(recipe))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind stub upstream");
        let addr = listener.local_addr().expect("stub local addr");
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("stub upstream");
        });

        Self { addr, state }
    }

    /// Upstream configuration pointing the client at this stub
    pub fn config(&self) -> UpstreamConfig {
        UpstreamConfig {
            listing_endpoint: format!("http://{}/listing", self.addr),
            recipe_endpoint: format!("http://{}/recipes", self.addr),
            page_limit: 2,
            request_timeout_secs: 5,
            discovery_concurrency: 2,
        }
    }

    /// Slugs fetched from the recipe endpoint, in arrival order
    pub fn recipe_hits(&self) -> Vec<String> {
        self.state.recipe_hits.lock().expect("hits lock").clone()
    }
}

async fn listing(
    State(state): State<Arc<StubState>>,
    Query(query): Query<ListingQuery>,
) -> impl IntoResponse {
    let page = (query.offset / query.limit.max(1)) as usize;
    if state.failing_pages.contains(&page) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "listing unavailable").into_response();
    }
    let entries: Vec<Value> = state
        .pages
        .get(page)
        .map(|urls| urls.iter().map(|url| json!({ "url": url })).collect())
        .unwrap_or_default();
    Json(json!({ "data": { "entries": entries } })).into_response()
}

async fn recipe(
    State(state): State<Arc<StubState>>,
    Path(slug): Path<String>,
) -> impl IntoResponse {
    state.recipe_hits.lock().expect("hits lock").push(slug.clone());
    match state.recipes.get(&slug) {
        Some(payload) => (StatusCode::OK, Json(payload.clone())).into_response(),
        None => (StatusCode::NOT_FOUND, "no such recipe").into_response(),
    }
}

/// A minimal, well-formed recipe payload
pub fn recipe_payload(title: &str, uid: &str) -> Value {
    json!({
        "data": {
            "entry": {
                "title": title,
                "gousto_uid": uid,
                "rating": { "average": 4.0 },
                "prep_times": { "for_2": 25 },
                "media": { "images": [
                    { "image": "https://img/hero.jpg", "width": 700 }
                ]},
                "ingredients": [
                    {
                        "name": "soy sauce",
                        "label": "Soy sauce 15ml",
                        "media": { "images": [
                            { "image": "https://img/soy.jpg", "width": 200 }
                        ]}
                    },
                    {
                        "name": "garlic",
                        "label": "Garlic",
                        "media": { "images": [] }
                    }
                ],
                "cooking_instructions": [
                    { "order": 1, "instruction": "Chop", "media": { "images": [] } },
                    { "order": 2, "instruction": "Cook", "media": { "images": [] } }
                ],
                "basics": [ { "title": "Salt" } ]
            }
        }
    })
}

/// A payload the parser must reject (identity field missing)
pub fn malformed_payload() -> Value {
    json!({
        "data": {
            "entry": {
                "gousto_uid": "uid-broken",
                "ingredients": [],
                "cooking_instructions": []
            }
        }
    })
}
