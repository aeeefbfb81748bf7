//! Relevance filter: does a raw item plausibly discuss the target product?
//!
//! Two gates. First a fuzzy name match (exact substring, per-token
//! word-boundary match, common suffix variants, bounded edit distance for
//! longer names). Then keyword density: a bare name mention with no
//! software-context keyword is likely incidental, so an exact match needs
//! one domain keyword and a fuzzy match needs two.

use crate::types::item::RawItem;

/// Software-context keywords counted toward the density gate.
const DOMAIN_KEYWORDS: &[&str] = &[
    "app",
    "software",
    "tool",
    "platform",
    "service",
    "pricing",
    "price",
    "subscription",
    "license",
    "plan",
    "alternative",
    "feature",
    "features",
    "update",
    "version",
    "release",
    "bug",
    "crash",
    "install",
    "setup",
    "support",
    "account",
    "api",
    "integration",
    "trial",
    "upgrade",
    "cancel",
];

/// Minimum name length before the edit-distance fallback applies; short
/// names would false-positive too easily.
const FUZZY_MIN_NAME_LEN: usize = 6;

/// How confidently the product name was found in a text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchStrength {
    /// Word-boundary hit on the name or a known variant
    Exact,
    /// Edit-distance-1 token match only
    Fuzzy,
}

/// Precomputed matcher for one product name.
pub struct NameMatcher {
    name: String,
    tokens: Vec<String>,
    variants: Vec<String>,
}

impl NameMatcher {
    pub fn new(product_name: &str) -> Self {
        let name = product_name.trim().to_lowercase();
        let tokens: Vec<String> = name.split_whitespace().map(str::to_string).collect();

        let mut variants = vec![name.clone()];
        if tokens.len() > 1 {
            variants.push(tokens.join(""));
            variants.push(tokens.join("-"));
        }
        variants.push(format!("{name}'s"));
        variants.push(format!("{name}s"));

        Self {
            name,
            tokens,
            variants,
        }
    }

    /// Look for the product name in `text` (already lowercased).
    pub fn matches(&self, text: &str) -> Option<MatchStrength> {
        if self
            .variants
            .iter()
            .any(|variant| contains_word(text, variant))
        {
            return Some(MatchStrength::Exact);
        }

        // Multi-word names also count when every token appears at a word
        // boundary, covering reordered or split mentions.
        if self.tokens.len() > 1 && self.tokens.iter().all(|token| contains_word(text, token)) {
            return Some(MatchStrength::Exact);
        }

        if self.name.len() >= FUZZY_MIN_NAME_LEN {
            let compact = self.tokens.join("");
            let fuzzy_hit = text
                .split(|c: char| !c.is_alphanumeric())
                .filter(|token| !token.is_empty())
                .any(|token| within_one_edit(token, &self.name) || within_one_edit(token, &compact));
            if fuzzy_hit {
                return Some(MatchStrength::Fuzzy);
            }
        }

        None
    }
}

/// Decide whether an item plausibly discusses the product.
pub fn is_relevant(item: &RawItem, matcher: &NameMatcher) -> bool {
    let text = item.text.to_lowercase();

    let required = match matcher.matches(&text) {
        None => return false,
        Some(MatchStrength::Exact) => 1,
        Some(MatchStrength::Fuzzy) => 2,
    };

    keyword_count(&text) >= required
}

/// Count distinct domain keywords present at word boundaries.
fn keyword_count(text: &str) -> usize {
    DOMAIN_KEYWORDS
        .iter()
        .filter(|keyword| contains_word(text, keyword))
        .count()
}

/// Substring match bounded by non-alphanumeric characters on both sides.
fn contains_word(text: &str, word: &str) -> bool {
    if word.is_empty() {
        return false;
    }

    let mut start = 0;
    while let Some(offset) = text[start..].find(word) {
        let begin = start + offset;
        let end = begin + word.len();

        let left_ok = begin == 0
            || text[..begin]
                .chars()
                .next_back()
                .is_some_and(|c| !c.is_alphanumeric());
        let right_ok = end == text.len()
            || text[end..].chars().next().is_some_and(|c| !c.is_alphanumeric());

        if left_ok && right_ok {
            return true;
        }
        // Advance one full character so the next slice stays on a char
        // boundary.
        let step = text[begin..].chars().next().map_or(1, char::len_utf8);
        start = begin + step;
        if start >= text.len() {
            break;
        }
    }
    false
}

/// Edit distance of at most one substitution, insertion, or deletion.
fn within_one_edit(a: &str, b: &str) -> bool {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    let (short, long) = if a.len() <= b.len() { (&a, &b) } else { (&b, &a) };
    match long.len() - short.len() {
        0 => {
            let mismatches = short.iter().zip(long.iter()).filter(|(x, y)| x != y).count();
            mismatches <= 1
        }
        1 => {
            // One skip allowed in the longer string.
            let mut skipped = false;
            let (mut i, mut j) = (0, 0);
            while i < short.len() && j < long.len() {
                if short[i] == long[j] {
                    i += 1;
                    j += 1;
                } else if skipped {
                    return false;
                } else {
                    skipped = true;
                    j += 1;
                }
            }
            true
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::item::SourceKind;

    fn item(text: &str) -> RawItem {
        RawItem::new(text, "tester", SourceKind::Forum)
    }

    #[test]
    fn exact_match_with_one_keyword_passes() {
        let matcher = NameMatcher::new("Acme Pro");
        assert!(is_relevant(
            &item("Just bought Acme Pro, pricing is steep but fair"),
            &matcher
        ));
    }

    #[test]
    fn bare_name_without_keywords_fails() {
        let matcher = NameMatcher::new("Acme Pro");
        assert!(!is_relevant(&item("Ran into Acme Pro at the gym"), &matcher));
    }

    #[test]
    fn name_variants_match_at_word_boundaries() {
        let matcher = NameMatcher::new("Acme Pro");
        assert!(is_relevant(
            &item("acmepro subscription renewed, still the best tool"),
            &matcher
        ));
        assert!(is_relevant(
            &item("acme-pro's latest update broke my setup"),
            &matcher
        ));
    }

    #[test]
    fn embedded_substring_is_not_a_word_match() {
        let matcher = NameMatcher::new("Acme");
        // "acmeist" contains the name but not at a word boundary, and
        // "acme" is too short for the fuzzy fallback.
        assert!(!is_relevant(&item("the acmeist movement in poetry"), &matcher));
    }

    #[test]
    fn misspelling_needs_two_keywords() {
        let matcher = NameMatcher::new("Widgetly");
        // One edit away ("Widgetly" -> "Widgetli"), single keyword: rejected.
        assert!(!is_relevant(&item("widgetli has nice pricing"), &matcher));
        // Two keywords: accepted.
        assert!(is_relevant(
            &item("widgetli has nice pricing for the subscription"),
            &matcher
        ));
    }

    #[test]
    fn short_names_never_fuzzy_match() {
        let matcher = NameMatcher::new("Nimb");
        assert!(matcher.matches("nims app pricing").is_none());
    }

    #[test]
    fn edit_distance_bounds() {
        assert!(within_one_edit("widgetly", "widgetly"));
        assert!(within_one_edit("widgetli", "widgetly"));
        assert!(within_one_edit("widgetl", "widgetly"));
        assert!(!within_one_edit("widgetxx", "widgetly"));
        assert!(!within_one_edit("wid", "widgetly"));
    }
}
