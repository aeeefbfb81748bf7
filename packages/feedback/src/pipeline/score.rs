//! Scorer: pure, deterministic aggregation over classified items.
//!
//! No external calls and no randomness; the same inputs always produce
//! the same summary. Only items with `relevant == true` contribute.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::types::item::{AspectTag, ClassifiedItem, Sentiment};
use crate::types::report::{AspectScore, Confidence, IssueRadarItem, Trend};

/// Aspects need more than this many mentions to count toward coverage.
const COVERAGE_MIN_MENTIONS: usize = 5;

/// Below this many mentions the trend stays `Stable`.
const TREND_MIN_MENTIONS: usize = 4;

/// Sentiment-score delta needed before a trend leaves `Stable`.
const TREND_DEAD_BAND: f64 = 5.0;

/// Everything the scorer derives from one run's classified items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreSummary {
    pub overall_score: u8,
    pub total_mentions: usize,
    pub aspects: Vec<AspectScore>,
    pub issue_radar: Vec<IssueRadarItem>,
    pub confidence: Confidence,
}

/// Compute the full score summary. Irrelevant items are excluded here, so
/// callers may pass the classifier output unfiltered.
pub fn score(items: &[ClassifiedItem]) -> ScoreSummary {
    let relevant: Vec<&ClassifiedItem> = items.iter().filter(|i| i.relevant).collect();
    let total = relevant.len();

    let overall_score = sentiment_balance(&relevant);

    let mut aspects = Vec::with_capacity(AspectTag::ALL.len());
    let mut radar = Vec::new();

    for aspect in AspectTag::ALL {
        let tagged: Vec<&ClassifiedItem> = relevant
            .iter()
            .copied()
            .filter(|i| i.has_aspect(aspect))
            .collect();

        let aspect_score = sentiment_balance(&tagged);
        aspects.push(AspectScore {
            aspect,
            score: aspect_score,
            mentions: tagged.len(),
            trend: trend(&tagged),
        });

        if total > 0 && !tagged.is_empty() {
            let weight = tagged.len() as f64 / total as f64;
            let severity = f64::from(100 - aspect_score);
            radar.push(IssueRadarItem {
                aspect,
                score: round2(weight * severity),
                mentions: tagged.len(),
                sentiment_score: aspect_score,
            });
        }
    }

    // Descending by score; equal scores fall back to aspect name so the
    // ordering is stable run to run.
    radar.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.aspect.label().cmp(b.aspect.label()))
    });

    let confidence = confidence(&relevant, &aspects);

    ScoreSummary {
        overall_score,
        total_mentions: total,
        aspects,
        issue_radar: radar,
        confidence,
    }
}

/// `round(clamp(50 + ((pos - neg) / n) * 50, 0, 100))`; 50 when empty.
fn sentiment_balance(items: &[&ClassifiedItem]) -> u8 {
    if items.is_empty() {
        return 50;
    }
    let pos = items
        .iter()
        .filter(|i| i.sentiment == Sentiment::Positive)
        .count() as f64;
    let neg = items
        .iter()
        .filter(|i| i.sentiment == Sentiment::Negative)
        .count() as f64;
    let n = items.len() as f64;

    let value = 50.0 + ((pos - neg) / n) * 50.0;
    value.clamp(0.0, 100.0).round() as u8
}

/// Newest-half mean sentiment score against oldest-half mean.
fn trend(items: &[&ClassifiedItem]) -> Trend {
    if items.len() < TREND_MIN_MENTIONS {
        return Trend::Stable;
    }

    let mut by_time: Vec<&ClassifiedItem> = items.to_vec();
    by_time.sort_by_key(|i| i.item.timestamp);

    let mid = by_time.len() / 2;
    let older = mean_score(&by_time[..mid]);
    let newer = mean_score(&by_time[mid..]);

    let delta = newer - older;
    if delta >= TREND_DEAD_BAND {
        Trend::Improving
    } else if delta <= -TREND_DEAD_BAND {
        Trend::Declining
    } else {
        Trend::Stable
    }
}

fn mean_score(items: &[&ClassifiedItem]) -> f64 {
    if items.is_empty() {
        return 0.0;
    }
    items.iter().map(|i| f64::from(i.sentiment_score)).sum::<f64>() / items.len() as f64
}

fn confidence(relevant: &[&ClassifiedItem], aspects: &[AspectScore]) -> Confidence {
    let aspect_count = aspects.len();

    let covered = aspects
        .iter()
        .filter(|a| a.mentions > COVERAGE_MIN_MENTIONS)
        .count();
    let coverage = if aspect_count == 0 {
        0.0
    } else {
        covered as f64 / aspect_count as f64
    };

    // An aspect with no mentions contributes full agreement vacuously, so
    // sparse data is not penalized twice (coverage already was).
    let agreement = if aspect_count == 0 {
        0.0
    } else {
        aspects
            .iter()
            .map(|a| dominant_share(relevant, a.aspect))
            .sum::<f64>()
            / aspect_count as f64
    };

    let source_diversity = if relevant.is_empty() {
        0.0
    } else {
        let authors: HashSet<&str> = relevant.iter().map(|i| i.item.author.as_str()).collect();
        (authors.len() as f64 / relevant.len() as f64).min(1.0)
    };

    Confidence {
        overall: coverage * agreement * source_diversity,
        coverage,
        agreement,
        source_diversity,
    }
}

/// Share of the dominant sentiment bucket among items tagged with the
/// aspect; 1.0 when nothing is tagged.
fn dominant_share(relevant: &[&ClassifiedItem], aspect: AspectTag) -> f64 {
    let tagged: Vec<&&ClassifiedItem> = relevant.iter().filter(|i| i.has_aspect(aspect)).collect();
    if tagged.is_empty() {
        return 1.0;
    }

    let buckets = [Sentiment::Positive, Sentiment::Neutral, Sentiment::Negative];
    let max_bucket = buckets
        .iter()
        .map(|s| tagged.iter().filter(|i| i.sentiment == *s).count())
        .max()
        .unwrap_or(0);

    max_bucket as f64 / tagged.len() as f64
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::item::{RawItem, SourceKind};
    use chrono::{Duration, Utc};
    use std::collections::BTreeSet;

    fn classified(
        sentiment: Sentiment,
        score: u8,
        aspects: &[AspectTag],
        author: &str,
        relevant: bool,
    ) -> ClassifiedItem {
        ClassifiedItem {
            item: RawItem::new("text long enough to matter", author, SourceKind::Forum),
            sentiment,
            sentiment_score: score,
            aspects: aspects.iter().copied().collect::<BTreeSet<_>>(),
            relevant,
        }
    }

    fn bulk(pos: usize, neg: usize, neutral: usize) -> Vec<ClassifiedItem> {
        let mut items = Vec::new();
        for i in 0..pos {
            items.push(classified(Sentiment::Positive, 80, &[], &format!("p{i}"), true));
        }
        for i in 0..neg {
            items.push(classified(Sentiment::Negative, 20, &[], &format!("n{i}"), true));
        }
        for i in 0..neutral {
            items.push(classified(Sentiment::Neutral, 50, &[], &format!("m{i}"), true));
        }
        items
    }

    #[test]
    fn overall_is_50_for_empty_or_irrelevant_input() {
        assert_eq!(score(&[]).overall_score, 50);

        let irrelevant = vec![classified(Sentiment::Positive, 90, &[], "a", false)];
        let summary = score(&irrelevant);
        assert_eq!(summary.overall_score, 50);
        assert_eq!(summary.total_mentions, 0);
    }

    #[test]
    fn overall_extremes_and_mixed() {
        assert_eq!(score(&bulk(5, 0, 0)).overall_score, 100);
        assert_eq!(score(&bulk(0, 5, 0)).overall_score, 0);
        // 6 positive + 2 negative + 2 neutral = 70
        assert_eq!(score(&bulk(6, 2, 2)).overall_score, 70);
    }

    #[test]
    fn untagged_aspects_default_to_neutral_with_zero_mentions() {
        let summary = score(&bulk(3, 1, 0));
        for aspect in &summary.aspects {
            assert_eq!(aspect.score, 50);
            assert_eq!(aspect.mentions, 0);
            assert_eq!(aspect.trend, Trend::Stable);
        }
    }

    #[test]
    fn issue_radar_extremes() {
        // 10/10 items negative on one aspect: (10/10) * (100 - 0) = 100
        let mut items = Vec::new();
        for i in 0..10 {
            items.push(classified(
                Sentiment::Negative,
                10,
                &[AspectTag::Price],
                &format!("a{i}"),
                true,
            ));
        }
        let summary = score(&items);
        assert_eq!(summary.issue_radar[0].aspect, AspectTag::Price);
        assert_eq!(summary.issue_radar[0].score, 100.0);

        // 1 negative tagged item out of 20 total: (1/20) * 100 = 5
        let mut items = bulk(19, 0, 0);
        items.push(classified(
            Sentiment::Negative,
            10,
            &[AspectTag::Support],
            "z",
            true,
        ));
        let summary = score(&items);
        let support = summary
            .issue_radar
            .iter()
            .find(|r| r.aspect == AspectTag::Support)
            .unwrap();
        assert_eq!(support.score, 5.0);
    }

    #[test]
    fn issue_radar_ties_break_by_aspect_name() {
        // Two aspects with identical mention counts and scores.
        let mut items = Vec::new();
        for i in 0..2 {
            items.push(classified(
                Sentiment::Negative,
                10,
                &[AspectTag::Usability],
                &format!("u{i}"),
                true,
            ));
            items.push(classified(
                Sentiment::Negative,
                10,
                &[AspectTag::Price],
                &format!("p{i}"),
                true,
            ));
        }
        let summary = score(&items);
        assert_eq!(summary.issue_radar[0].score, summary.issue_radar[1].score);
        assert_eq!(summary.issue_radar[0].aspect, AspectTag::Price);
        assert_eq!(summary.issue_radar[1].aspect, AspectTag::Usability);
    }

    #[test]
    fn source_diversity_bounds() {
        let mut same_author = Vec::new();
        for _ in 0..10 {
            same_author.push(classified(Sentiment::Positive, 80, &[], "alice", true));
        }
        let summary = score(&same_author);
        assert!((summary.confidence.source_diversity - 0.1).abs() < f64::EPSILON);

        let distinct = bulk(10, 0, 0);
        let summary = score(&distinct);
        assert!((summary.confidence.source_diversity - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn confidence_overall_is_product_of_factors() {
        let mut items = Vec::new();
        for i in 0..8 {
            items.push(classified(
                Sentiment::Positive,
                80,
                &[AspectTag::Quality],
                &format!("a{i}"),
                true,
            ));
        }
        let summary = score(&items);
        let c = &summary.confidence;
        assert!(
            (c.overall - c.coverage * c.agreement * c.source_diversity).abs() < 1e-12
        );
    }

    #[test]
    fn confidence_overall_is_zero_when_any_factor_is_zero() {
        // Few mentions per aspect: coverage 0 even though agreement is high.
        let summary = score(&bulk(3, 0, 0));
        assert_eq!(summary.confidence.coverage, 0.0);
        assert_eq!(summary.confidence.overall, 0.0);
    }

    #[test]
    fn trend_improves_when_newer_half_is_higher() {
        let base = Utc::now();
        let mut items = Vec::new();
        for i in 0..4u32 {
            let score = if i < 2 { 20 } else { 85 };
            let sentiment = if i < 2 {
                Sentiment::Negative
            } else {
                Sentiment::Positive
            };
            let mut item = classified(
                sentiment,
                score,
                &[AspectTag::Performance],
                &format!("a{i}"),
                true,
            );
            item.item.timestamp = base + Duration::hours(i64::from(i));
            items.push(item);
        }

        let summary = score(&items);
        let perf = summary
            .aspects
            .iter()
            .find(|a| a.aspect == AspectTag::Performance)
            .unwrap();
        assert_eq!(perf.trend, Trend::Improving);
    }

    #[test]
    fn trend_stable_under_minimum_mentions() {
        let items = vec![
            classified(Sentiment::Negative, 10, &[AspectTag::Price], "a", true),
            classified(Sentiment::Positive, 90, &[AspectTag::Price], "b", true),
        ];
        let summary = score(&items);
        let price = summary
            .aspects
            .iter()
            .find(|a| a.aspect == AspectTag::Price)
            .unwrap();
        assert_eq!(price.trend, Trend::Stable);
    }
}
