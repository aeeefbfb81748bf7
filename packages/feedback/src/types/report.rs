//! Report types assembled at the end of a pipeline run.
//!
//! All of these are derived values, recomputed on every run. Ownership of
//! the assembled [`Report`] transfers to the caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::item::{AspectTag, ClassifiedItem};

/// Direction of sentiment movement over the run's time window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Improving,
    Stable,
    Declining,
}

/// Score for one aspect over the relevant items tagged with it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AspectScore {
    pub aspect: AspectTag,

    /// 0..=100; 50 (neutral) when no items are tagged with this aspect
    pub score: u8,

    /// Number of relevant items tagged with this aspect
    pub mentions: usize,

    /// Sentiment movement, newest half vs oldest half of mentions
    pub trend: Trend,
}

/// One entry in the issue radar: aspects that are both frequently mentioned
/// and negatively scored rank highest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueRadarItem {
    pub aspect: AspectTag,

    /// `(mentions / total) * (100 - aspect_score)`, two decimals
    pub score: f64,

    pub mentions: usize,

    /// The aspect's sentiment score, for display
    pub sentiment_score: u8,
}

/// Composite measure of how trustworthy the aggregate score is.
///
/// `overall` is the true product of the three factors, so any single
/// near-zero factor dominates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Confidence {
    pub overall: f64,
    pub coverage: f64,
    pub agreement: f64,
    pub source_diversity: f64,
}

/// An evidence quote, copied verbatim from a classified item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub text: String,
    pub author: String,
    pub date: DateTime<Utc>,
    pub url: String,
}

impl Quote {
    /// Copy the quote fields from an existing classified item.
    ///
    /// This is the only way quotes are produced; the synthesizer never
    /// invents quote text.
    pub fn from_item(item: &ClassifiedItem) -> Self {
        Self {
            text: item.item.text.clone(),
            author: item.item.author.clone(),
            date: item.item.timestamp,
            url: item.item.url.clone(),
        }
    }
}

/// A narrative insight (strength or issue) with supporting evidence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Insight {
    pub title: String,
    pub description: String,

    /// How many classified items support this insight
    pub frequency: usize,

    pub quotes: Vec<Quote>,
}

/// The assembled output of one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub product_name: String,

    /// 0..=100 aggregate sentiment; 50 is neutral
    pub overall_score: u8,

    /// Count of relevant classified items contributing to the scores
    pub total_mentions: usize,

    pub summary: String,
    pub strengths: Vec<Insight>,
    pub issues: Vec<Insight>,
    pub aspects: Vec<AspectScore>,
    pub issue_radar: Vec<IssueRadarItem>,
    pub confidence: Confidence,

    pub generated_at: DateTime<Utc>,
}
