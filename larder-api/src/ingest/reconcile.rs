//! Slug set reconciliation
//!
//! Pure set algebra, no I/O. Classifies upstream slugs into "new" (worth
//! fetching) and "previously bad" (seen to fail before, skipped until
//! explicitly retried). Output sets carry no ordering guarantee.

use std::collections::HashSet;

/// Result of reconciling upstream slugs against storage
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Reconciliation {
    /// Upstream slugs not yet stored and not known-bad
    pub new_slugs: HashSet<String>,
    /// Upstream slugs not yet stored that previously failed fetch or parse
    pub previously_bad: HashSet<String>,
}

/// Classify upstream slugs against the stored and known-bad sets
pub fn reconcile(
    upstream: &HashSet<String>,
    stored: &HashSet<String>,
    bad: &HashSet<String>,
) -> Reconciliation {
    let candidates: HashSet<&String> = upstream.difference(stored).collect();

    let mut new_slugs = HashSet::new();
    let mut previously_bad = HashSet::new();
    for slug in candidates {
        if bad.contains(slug) {
            previously_bad.insert(slug.clone());
        } else {
            new_slugs.insert(slug.clone());
        }
    }

    Reconciliation {
        new_slugs,
        previously_bad,
    }
}
