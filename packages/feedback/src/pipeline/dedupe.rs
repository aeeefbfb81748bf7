//! Deduplicator: remove lexical near-duplicates, keeping first-seen order.
//!
//! Cross-posted and quoted reposts show up constantly across sources, so
//! every kept item's normalized text is compared against each candidate
//! under three symmetric tests: exact equality, mutual containment, and a
//! shared 100-character prefix. O(n²) over the survivors, which is fine
//! for the few hundred items one run sees.

use tracing::debug;

use crate::types::item::RawItem;

/// Normalized texts shorter than this carry too little signal to compare.
const MIN_COMPARE_LEN: usize = 20;

/// Prefix length for the shared-prefix test; catches reposts whose tails
/// diverge (edits, appended signatures).
const PREFIX_LEN: usize = 100;

/// Remove near-duplicate items, preserving first-seen order.
pub fn dedupe(items: Vec<RawItem>) -> Vec<RawItem> {
    let before = items.len();
    let mut kept: Vec<RawItem> = Vec::with_capacity(items.len());
    let mut seen: Vec<String> = Vec::with_capacity(items.len());

    for item in items {
        let normalized = normalize(&item.text);
        if normalized.chars().count() < MIN_COMPARE_LEN {
            continue;
        }

        if seen.iter().any(|prior| is_near_duplicate(prior, &normalized)) {
            continue;
        }

        seen.push(normalized);
        kept.push(item);
    }

    if kept.len() < before {
        debug!(before, after = kept.len(), "dropped near-duplicate items");
    }
    kept
}

/// Lowercase, collapse whitespace, trim.
fn normalize(text: &str) -> String {
    text.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_near_duplicate(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    // Containment either way catches quoted reposts.
    if a.contains(b) || b.contains(a) {
        return true;
    }
    shared_prefix(a, b)
}

/// Both strings at least `PREFIX_LEN` chars and identical over them.
fn shared_prefix(a: &str, b: &str) -> bool {
    let prefix_a: String = a.chars().take(PREFIX_LEN).collect();
    let prefix_b: String = b.chars().take(PREFIX_LEN).collect();
    prefix_a.chars().count() == PREFIX_LEN
        && prefix_b.chars().count() == PREFIX_LEN
        && prefix_a == prefix_b
}
