//! larder-admin - Operator CLI for the recipe catalogue
//!
//! `add-user` writes directly to the database; `sync` drives a running
//! larder-api instance over HTTP, discovering and ingesting every new
//! upstream recipe.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use tokio::sync::Semaphore;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use larder_common::{auth, Config};

#[derive(Parser)]
#[command(name = "larder-admin", about = "Administration tool for larder-api")]
struct Cli {
    /// Path to the service configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a user account in the service database
    AddUser {
        username: String,
        password: String,
        email: String,
    },
    /// Ingest every new upstream recipe through a running service
    Sync {
        /// Base URL of the running larder-api instance
        #[arg(long, default_value = "http://127.0.0.1:8000")]
        base_url: String,
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
        /// Concurrent ingestion requests
        #[arg(long, default_value_t = 2)]
        workers: usize,
    },
}

#[derive(Deserialize)]
struct TokenResponse {
    token: String,
}

#[derive(Deserialize)]
struct CheckNewResponse {
    new_slugs: Vec<String>,
    previously_bad: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::AddUser {
            username,
            password,
            email,
        } => add_user(cli.config.as_deref(), &username, &password, &email).await,
        Command::Sync {
            base_url,
            username,
            password,
            workers,
        } => sync(&base_url, &username, &password, workers).await,
    }
}

async fn add_user(
    config_path: Option<&std::path::Path>,
    username: &str,
    password: &str,
    email: &str,
) -> Result<()> {
    let config = Config::load(config_path)?;
    let pool = larder_common::db::init::init_database(&config.database_path).await?;

    let user_id = auth::create_user(&pool, username, password, email)
        .await
        .with_context(|| format!("Failed to create user '{}'", username))?;

    info!(username = %username, user_id, "User created");
    Ok(())
}

async fn sync(base_url: &str, username: &str, password: &str, workers: usize) -> Result<()> {
    let http = reqwest::Client::new();

    let response = http
        .post(format!("{}/auth/token", base_url))
        .json(&serde_json::json!({ "username": username, "password": password }))
        .send()
        .await
        .context("Failed to reach larder-api")?;
    if !response.status().is_success() {
        bail!("Authentication failed: {}", response.status());
    }
    let token = response.json::<TokenResponse>().await?.token;

    info!("Checking for new recipes");
    let response = http
        .get(format!("{}/recipes/check-new", base_url))
        .bearer_auth(&token)
        .send()
        .await?;
    if !response.status().is_success() {
        bail!("check-new failed: {}", response.status());
    }
    let check = response.json::<CheckNewResponse>().await?;

    if !check.previously_bad.is_empty() {
        info!(
            count = check.previously_bad.len(),
            "Skipping slugs that previously failed ingestion"
        );
    }
    if check.new_slugs.is_empty() {
        info!("Catalogue is up to date");
        return Ok(());
    }

    let total = check.new_slugs.len();
    info!(total, workers, "Ingesting new recipes");

    let semaphore = Arc::new(Semaphore::new(workers.max(1)));
    let mut handles = Vec::with_capacity(total);
    for (index, slug) in check.new_slugs.into_iter().enumerate() {
        let permit = semaphore.clone();
        let http = http.clone();
        let token = token.clone();
        let url = format!("{}/recipes/add/{}", base_url, slug);
        handles.push(tokio::spawn(async move {
            let _permit = permit.acquire_owned().await.expect("semaphore closed");
            let result = http.post(url).bearer_auth(&token).send().await;
            (index, slug, result)
        }));
    }

    let mut failures = 0usize;
    for handle in handles {
        let (index, slug, result) = handle.await?;
        match result {
            Ok(response) if response.status().is_success() => {
                info!("[{}/{}] ingested {}", index + 1, total, slug);
            }
            Ok(response) => {
                failures += 1;
                warn!(
                    "[{}/{}] {} failed: {}",
                    index + 1,
                    total,
                    slug,
                    response.status()
                );
            }
            Err(e) => {
                failures += 1;
                warn!("[{}/{}] {} failed: {}", index + 1, total, slug, e);
            }
        }
    }

    info!(
        ingested = total - failures,
        failed = failures,
        "Sync finished"
    );
    if failures > 0 {
        bail!("{} of {} recipes failed to ingest", failures, total);
    }
    Ok(())
}
