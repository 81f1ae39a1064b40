//! Slug discovery over the paginated upstream listing
//!
//! Listing entries carry full URL paths such as `/recipes/thai-green-curry`
//! or `/chicken-recipes/thai-green-curry`; storage and the per-recipe
//! endpoint both want the bare slug. Discovery walks the listing pages in
//! concurrent batches until upstream reports the end of results.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::gousto::client::GoustoClient;
use crate::gousto::error::GoustoError;

/// Leading path prefix on listing entry URLs: `/recipes/` or a category
/// variant like `/chicken-recipes/`
static RECIPES_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/(?:[\w-]+-)?recipes/").expect("valid prefix regex"));

/// Reduce a listing entry URL to its bare slug
///
/// A URL that does not carry the recipes prefix (or carries nothing after
/// it) is a contract violation and returns `GoustoError::InvalidSlug`.
pub fn strip_recipes_prefix(url: &str) -> Result<String, GoustoError> {
    let Some(matched) = RECIPES_PREFIX.find(url) else {
        return Err(GoustoError::InvalidSlug(url.to_string()));
    };

    let slug = &url[matched.end()..];
    if slug.is_empty() {
        return Err(GoustoError::InvalidSlug(url.to_string()));
    }
    Ok(slug.to_string())
}

/// Consecutive fully-failed batches tolerated before discovery gives up
const MAX_FAILED_BATCHES: u32 = 3;

/// Discover the full set of upstream slugs
///
/// Pages are fetched in batches of `page_concurrency`. A page raising
/// `EndOfListing` completes discovery once the current batch is drained,
/// so in-flight sibling pages still contribute their entries. Individual
/// page failures and invalid entry URLs are logged and skipped, never
/// fatal. Only when `MAX_FAILED_BATCHES` batches in a row fail on every
/// page is upstream treated as unavailable, since the end-of-listing
/// sentinel could then never arrive. Cancellation is honoured at batch
/// boundaries.
pub async fn discover_all_slugs(
    client: &GoustoClient,
    page_concurrency: usize,
    cancel: &CancellationToken,
) -> Result<HashSet<String>, GoustoError> {
    let page_concurrency = page_concurrency.max(1);
    let mut slugs: HashSet<String> = HashSet::new();
    let mut page: u32 = 0;
    let mut failed_batches: u32 = 0;

    loop {
        if cancel.is_cancelled() {
            info!(pages_scanned = page, "Slug discovery cancelled");
            return Ok(slugs);
        }

        let batch = (0..page_concurrency).map(|i| client.fetch_listing_page(page + i as u32));
        let results = futures::future::join_all(batch).await;

        let mut exhausted = false;
        let mut page_failures = 0;

        for (i, result) in results.into_iter().enumerate() {
            match result {
                Ok(urls) => {
                    for url in urls {
                        match strip_recipes_prefix(&url) {
                            Ok(slug) => {
                                slugs.insert(slug);
                            }
                            Err(e) => {
                                error!(url = %url, error = %e, "Skipping listing entry with unexpected url shape");
                            }
                        }
                    }
                }
                Err(GoustoError::EndOfListing) => {
                    exhausted = true;
                }
                Err(e) => {
                    error!(page = page + i as u32, error = %e, "Listing page fetch failed, skipping");
                    page_failures += 1;
                }
            }
        }

        if exhausted {
            break;
        }
        if page_failures == page_concurrency {
            failed_batches += 1;
            if failed_batches >= MAX_FAILED_BATCHES {
                return Err(GoustoError::Transport(format!(
                    "{} consecutive listing batches failed entirely, giving up at page {}",
                    failed_batches, page
                )));
            }
        } else {
            failed_batches = 0;
        }

        page += page_concurrency as u32;
    }

    info!(slugs = slugs.len(), "Slug discovery complete");
    Ok(slugs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_recipes_prefix() {
        assert_eq!(
            strip_recipes_prefix("/recipes/thai-green-curry").unwrap(),
            "thai-green-curry"
        );
    }

    #[test]
    fn test_category_prefix_variant() {
        assert_eq!(
            strip_recipes_prefix("/chicken-recipes/thai-green-curry").unwrap(),
            "thai-green-curry"
        );
    }

    #[test]
    fn test_multi_word_category_prefix() {
        assert_eq!(
            strip_recipes_prefix("/fish-and-seafood-recipes/grilled-salmon").unwrap(),
            "grilled-salmon"
        );
    }

    #[test]
    fn test_non_matching_url_rejected() {
        assert!(matches!(
            strip_recipes_prefix("/not-a-match"),
            Err(GoustoError::InvalidSlug(_))
        ));
    }

    #[test]
    fn test_prefix_without_slug_rejected() {
        assert!(matches!(
            strip_recipes_prefix("/recipes/"),
            Err(GoustoError::InvalidSlug(_))
        ));
    }

    #[test]
    fn test_missing_leading_slash_rejected() {
        assert!(matches!(
            strip_recipes_prefix("recipes/thai-green-curry"),
            Err(GoustoError::InvalidSlug(_))
        ));
    }
}
