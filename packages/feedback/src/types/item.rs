//! Item types flowing through the pipeline.
//!
//! Tags are closed enums, never open strings, so exhaustiveness is checked
//! at compile time and LLM output is mapped through tolerant parsers.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which content source produced an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Forum-style Q&A site (questions and answers)
    Forum,
    /// Link-aggregator site (stories and comment threads)
    NewsAggregator,
    /// Developer blog platform (articles and comments)
    DevBlog,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SourceKind::Forum => "forum",
            SourceKind::NewsAggregator => "news_aggregator",
            SourceKind::DevBlog => "dev_blog",
        };
        f.write_str(label)
    }
}

/// Sentiment label assigned by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    /// Parse a label from LLM output, case-insensitively.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "positive" => Some(Sentiment::Positive),
            "neutral" => Some(Sentiment::Neutral),
            "negative" => Some(Sentiment::Negative),
            _ => None,
        }
    }
}

/// Topical aspect of product feedback. A closed set, not user-extensible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AspectTag {
    Price,
    Quality,
    Durability,
    Usability,
    Support,
    Performance,
}

impl AspectTag {
    /// The full enumeration, for exhaustive per-aspect aggregation.
    pub const ALL: [AspectTag; 6] = [
        AspectTag::Price,
        AspectTag::Quality,
        AspectTag::Durability,
        AspectTag::Usability,
        AspectTag::Support,
        AspectTag::Performance,
    ];

    /// Lowercase label used in prompts and serialized output.
    pub fn label(&self) -> &'static str {
        match self {
            AspectTag::Price => "price",
            AspectTag::Quality => "quality",
            AspectTag::Durability => "durability",
            AspectTag::Usability => "usability",
            AspectTag::Support => "support",
            AspectTag::Performance => "performance",
        }
    }

    /// Parse a label from LLM output. Unknown labels yield `None` and are
    /// dropped by callers rather than treated as errors.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "price" => Some(AspectTag::Price),
            "quality" => Some(AspectTag::Quality),
            "durability" => Some(AspectTag::Durability),
            "usability" => Some(AspectTag::Usability),
            "support" => Some(AspectTag::Support),
            "performance" => Some(AspectTag::Performance),
            _ => None,
        }
    }
}

impl fmt::Display for AspectTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A single raw piece of content fetched from a source.
///
/// Immutable once produced; discarded after classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawItem {
    /// Content text (title and body joined for parent items)
    pub text: String,

    /// Author handle as reported by the source
    pub author: String,

    /// Publication time
    pub timestamp: DateTime<Utc>,

    /// Canonical URL of the item
    pub url: String,

    /// Which source produced this item
    pub source: SourceKind,
}

impl RawItem {
    /// Create a new raw item.
    pub fn new(text: impl Into<String>, author: impl Into<String>, source: SourceKind) -> Self {
        Self {
            text: text.into(),
            author: author.into(),
            timestamp: Utc::now(),
            url: String::new(),
            source,
        }
    }

    /// Set the canonical URL.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Set the publication time.
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}

/// A raw item plus the labels assigned by the classifier.
///
/// Created once per surviving raw item; never mutated afterward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifiedItem {
    /// The underlying raw item
    #[serde(flatten)]
    pub item: RawItem,

    /// Sentiment label
    pub sentiment: Sentiment,

    /// Sentiment intensity, 0 (hostile) to 100 (enthusiastic)
    pub sentiment_score: u8,

    /// Topical aspects mentioned by the item
    pub aspects: BTreeSet<AspectTag>,

    /// Whether the item actually discusses the target product
    pub relevant: bool,
}

impl ClassifiedItem {
    /// Whether the classifier tagged this item with the given aspect.
    pub fn has_aspect(&self, aspect: AspectTag) -> bool {
        self.aspects.contains(&aspect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentiment_parses_case_insensitively() {
        assert_eq!(Sentiment::from_label("Positive"), Some(Sentiment::Positive));
        assert_eq!(Sentiment::from_label(" NEGATIVE "), Some(Sentiment::Negative));
        assert_eq!(Sentiment::from_label("meh"), None);
    }

    #[test]
    fn aspect_labels_round_trip() {
        for aspect in AspectTag::ALL {
            assert_eq!(AspectTag::from_label(aspect.label()), Some(aspect));
        }
        assert_eq!(AspectTag::from_label("shipping"), None);
    }

    #[test]
    fn raw_item_builder() {
        let item = RawItem::new("great tool", "alice", SourceKind::Forum)
            .with_url("https://example.com/q/1");

        assert_eq!(item.author, "alice");
        assert_eq!(item.url, "https://example.com/q/1");
        assert_eq!(item.source, SourceKind::Forum);
    }
}
