//! Synthesizer: narrative summary, strengths, and issues with evidence
//! quotes.
//!
//! The model only ever references items by index; quotes are resolved by
//! looking indices up against the original item list, so quote text is
//! always a copy, never generated. Each draft is scored by a pure quality
//! rubric; a below-threshold draft earns one corrective re-prompt at a
//! higher temperature, and the better-scoring attempt wins.

use std::collections::HashSet;

use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::pipeline::prompts;
use crate::pipeline::score::ScoreSummary;
use crate::traits::llm::{CompletionRequest, LanguageModel};
use crate::types::config::SynthesisConfig;
use crate::types::item::ClassifiedItem;
use crate::types::report::{Insight, Quote};

/// Fraction of distinct items that should be referenced across insights.
const MENTION_COVERAGE_TARGET: f64 = 0.3;

/// Titles that say nothing; drafts full of these get re-prompted.
const GENERIC_TITLES: &[&str] = &[
    "user feedback",
    "customer feedback",
    "general feedback",
    "positive feedback",
    "negative feedback",
    "user opinions",
    "user sentiment",
    "strengths",
    "issues",
    "problems",
    "complaints",
    "miscellaneous",
    "other",
    "general",
];

/// Draft shape requested from the model.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct SynthesisDraft {
    /// Executive summary of the overall reception
    pub summary: String,

    /// 2-4 praised behaviors with supporting item indices
    pub strengths: Vec<DraftInsight>,

    /// 2-4 complained-about behaviors with supporting item indices
    pub issues: Vec<DraftInsight>,

    /// Echo of the overall score the model was given
    pub overall_score: u8,
}

/// One insight in a draft, referencing items by index only.
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct DraftInsight {
    pub title: String,
    pub description: String,
    pub item_indices: Vec<usize>,
}

/// Quality rubric result for one draft.
#[derive(Debug, Clone)]
pub struct DraftQuality {
    /// Distinct valid indices referenced, against the coverage target
    pub mention_coverage: f64,

    /// Fraction of insight titles not on the generic blocklist
    pub title_specificity: f64,

    /// Fraction of referenced indices within bounds
    pub index_validity: f64,

    /// Counts, summary length, and score range all sane
    pub structure_ok: bool,

    /// Weighted combination in [0, 1]
    pub value: f64,
}

impl DraftQuality {
    /// Human-readable deficiencies, injected into the corrective re-prompt.
    pub fn deficiencies(&self) -> Vec<String> {
        let mut out = Vec::new();
        if self.mention_coverage < 1.0 {
            out.push(
                "insights reference too few distinct items; cite more of the provided indices"
                    .to_string(),
            );
        }
        if self.title_specificity < 1.0 {
            out.push(
                "some insight titles are generic category names; each title must name the \
                 concrete behavior users describe"
                    .to_string(),
            );
        }
        if self.index_validity < 1.0 {
            out.push("some referenced indices do not exist; only use indices from the item list"
                .to_string());
        }
        if !self.structure_ok {
            out.push(
                "structure incomplete: need 2-4 strengths, 2-4 issues, a summary of at least \
                 20 characters, and the overall score echoed in range"
                    .to_string(),
            );
        }
        out
    }
}

/// Score a draft against the quality rubric. Pure; testable without a
/// model.
pub fn score_draft(draft: &SynthesisDraft, item_count: usize) -> DraftQuality {
    let insights: Vec<&DraftInsight> = draft.strengths.iter().chain(draft.issues.iter()).collect();

    let all_refs: Vec<usize> = insights
        .iter()
        .flat_map(|i| i.item_indices.iter().copied())
        .collect();
    let valid_refs: Vec<usize> = all_refs.iter().copied().filter(|&i| i < item_count).collect();
    let distinct_valid: HashSet<usize> = valid_refs.iter().copied().collect();

    let coverage_fraction = if item_count == 0 {
        0.0
    } else {
        distinct_valid.len() as f64 / item_count as f64
    };
    let mention_coverage = (coverage_fraction / MENTION_COVERAGE_TARGET).min(1.0);

    let title_specificity = if insights.is_empty() {
        0.0
    } else {
        let specific = insights
            .iter()
            .filter(|i| !GENERIC_TITLES.contains(&i.title.trim().to_lowercase().as_str()))
            .count();
        specific as f64 / insights.len() as f64
    };

    let index_validity = if all_refs.is_empty() {
        1.0
    } else {
        valid_refs.len() as f64 / all_refs.len() as f64
    };

    let structure_ok = (2..=4).contains(&draft.strengths.len())
        && (2..=4).contains(&draft.issues.len())
        && draft.summary.trim().chars().count() >= 20
        && draft.overall_score <= 100;

    let value = 0.3 * mention_coverage
        + 0.3 * title_specificity
        + 0.2 * index_validity
        + 0.2 * f64::from(u8::from(structure_ok));

    DraftQuality {
        mention_coverage,
        title_specificity,
        index_validity,
        structure_ok,
        value,
    }
}

/// Final synthesis output, with quotes resolved.
#[derive(Debug, Clone)]
pub struct Synthesis {
    pub summary: String,
    pub strengths: Vec<Insight>,
    pub issues: Vec<Insight>,
}

/// Compact per-item view embedded in the synthesis prompt.
#[derive(Debug, Serialize)]
struct DigestEntry<'a> {
    index: usize,
    text: String,
    sentiment: &'a str,
    aspects: Vec<&'static str>,
}

/// Synthesizer for one pipeline run.
pub struct Synthesizer<'a, M: LanguageModel + ?Sized> {
    model: &'a M,
    config: SynthesisConfig,
}

impl<'a, M: LanguageModel + ?Sized> Synthesizer<'a, M> {
    pub fn new(model: &'a M, config: SynthesisConfig) -> Self {
        Self { model, config }
    }

    /// Produce the narrative for the given relevant items and scores.
    ///
    /// Degrades to a deterministic fallback (no model involvement in the
    /// text) when every attempt fails to parse; synthesis never fails the
    /// run.
    pub async fn synthesize(
        &self,
        product_name: &str,
        items: &[ClassifiedItem],
        scores: &ScoreSummary,
    ) -> Synthesis {
        if items.is_empty() {
            return fallback(product_name, items, scores);
        }

        let digest = match self.build_digest(items) {
            Ok(digest) => digest,
            Err(e) => {
                warn!(error = %e, "digest serialization failed, using fallback synthesis");
                return fallback(product_name, items, scores);
            }
        };

        let system = prompts::synthesis_system(product_name);
        let schema = serde_json::to_value(schema_for!(SynthesisDraft)).unwrap_or_default();
        let base_prompt =
            prompts::synthesis_user(&digest, scores.overall_score, scores.total_mentions);

        let mut best: Option<(SynthesisDraft, DraftQuality)> = None;
        let mut corrective: Option<Vec<String>> = None;
        let attempts = 1 + self.config.max_retries;

        for attempt in 0..attempts {
            let temperature = if attempt == 0 {
                self.config.base_temperature
            } else {
                self.config.retry_temperature
            };

            let mut prompt = base_prompt.clone();
            if let Some(deficiencies) = &corrective {
                prompt.push_str(&prompts::corrective_block(deficiencies));
            }

            let request = CompletionRequest::new(system.clone(), prompt)
                .with_schema(schema.clone())
                .with_temperature(temperature);

            let raw = match self.model.complete(request).await {
                Ok(raw) => raw,
                Err(e) => {
                    warn!(attempt, error = %e, "synthesis call failed");
                    corrective = Some(vec![
                        "the previous response could not be produced; return the requested \
                         JSON structure"
                            .to_string(),
                    ]);
                    continue;
                }
            };

            let draft: SynthesisDraft = match serde_json::from_str(&raw) {
                Ok(draft) => draft,
                Err(e) => {
                    warn!(attempt, error = %e, "synthesis draft did not parse");
                    corrective = Some(vec![
                        "the previous response was not valid JSON matching the schema".to_string(),
                    ]);
                    continue;
                }
            };

            let quality = score_draft(&draft, items.len());
            debug!(
                attempt,
                quality = quality.value,
                structure_ok = quality.structure_ok,
                "synthesis draft scored"
            );

            let improved = best
                .as_ref()
                .map_or(true, |(_, prior)| quality.value > prior.value);
            let accept = quality.value >= self.config.quality_threshold;
            let deficiencies = quality.deficiencies();

            if improved {
                best = Some((draft, quality));
            }
            if accept {
                break;
            }
            corrective = Some(deficiencies);
        }

        match best {
            Some((draft, _)) => self.resolve(draft, items),
            None => fallback(product_name, items, scores),
        }
    }

    fn build_digest(&self, items: &[ClassifiedItem]) -> Result<String, serde_json::Error> {
        let entries: Vec<DigestEntry<'_>> = items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                let mut text = item.item.text.clone();
                if text.chars().count() > self.config.max_digest_chars {
                    text = text.chars().take(self.config.max_digest_chars).collect();
                }
                DigestEntry {
                    index,
                    text,
                    sentiment: match item.sentiment {
                        crate::types::item::Sentiment::Positive => "positive",
                        crate::types::item::Sentiment::Neutral => "neutral",
                        crate::types::item::Sentiment::Negative => "negative",
                    },
                    aspects: item.aspects.iter().map(|a| a.label()).collect(),
                }
            })
            .collect();
        serde_json::to_string(&entries)
    }

    /// Map draft insights back to full records, copying quote fields from
    /// the referenced items. Out-of-bounds indices are discarded.
    fn resolve(&self, draft: SynthesisDraft, items: &[ClassifiedItem]) -> Synthesis {
        let resolve_insights = |drafts: Vec<DraftInsight>| -> Vec<Insight> {
            drafts
                .into_iter()
                .map(|insight| {
                    let mut seen = HashSet::new();
                    let valid: Vec<usize> = insight
                        .item_indices
                        .into_iter()
                        .filter(|&i| i < items.len() && seen.insert(i))
                        .collect();

                    let quotes: Vec<Quote> = valid
                        .iter()
                        .take(self.config.max_quotes)
                        .map(|&i| Quote::from_item(&items[i]))
                        .collect();

                    Insight {
                        title: insight.title,
                        description: insight.description,
                        frequency: valid.len(),
                        quotes,
                    }
                })
                .collect()
        };

        Synthesis {
            summary: draft.summary,
            strengths: resolve_insights(draft.strengths),
            issues: resolve_insights(draft.issues),
        }
    }
}

/// Deterministic degraded output: counts and aspect extremes, with quotes
/// still copied from real items.
fn fallback(product_name: &str, items: &[ClassifiedItem], scores: &ScoreSummary) -> Synthesis {
    let summary = format!(
        "Across {} relevant mentions, \"{}\" scores {}/100 overall. \
         Narrative synthesis was unavailable for this run; aspect scores \
         and the issue radar below are complete.",
        scores.total_mentions, product_name, scores.overall_score
    );

    let quotes_for = |aspect, positive: bool| -> Vec<Quote> {
        items
            .iter()
            .filter(|i| i.has_aspect(aspect))
            .filter(|i| (i.sentiment_score >= 50) == positive)
            .take(2)
            .map(Quote::from_item)
            .collect()
    };

    let strengths: Vec<Insight> = scores
        .aspects
        .iter()
        .filter(|a| a.mentions > 0 && a.score >= 60)
        .take(2)
        .map(|a| Insight {
            title: format!("{} rated highly", a.aspect),
            description: format!(
                "{} of {} mentions discuss {}, scoring {}/100.",
                a.mentions, scores.total_mentions, a.aspect, a.score
            ),
            frequency: a.mentions,
            quotes: quotes_for(a.aspect, true),
        })
        .collect();

    let issues: Vec<Insight> = scores
        .issue_radar
        .iter()
        .filter(|r| r.sentiment_score < 50)
        .take(2)
        .map(|r| Insight {
            title: format!("{} drawing complaints", r.aspect),
            description: format!(
                "{} mentions discuss {}, scoring {}/100.",
                r.mentions, r.aspect, r.sentiment_score
            ),
            frequency: r.mentions,
            quotes: quotes_for(r.aspect, false),
        })
        .collect();

    Synthesis {
        summary,
        strengths,
        issues,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::score::score;
    use crate::testing::MockLanguageModel;
    use crate::types::item::{AspectTag, RawItem, Sentiment, SourceKind};
    use std::collections::BTreeSet;

    fn classified_items(n: usize) -> Vec<ClassifiedItem> {
        (0..n)
            .map(|i| ClassifiedItem {
                item: RawItem::new(
                    format!("feedback item number {i} with enough text to quote"),
                    format!("author{i}"),
                    SourceKind::Forum,
                ),
                sentiment: if i % 3 == 0 {
                    Sentiment::Negative
                } else {
                    Sentiment::Positive
                },
                sentiment_score: if i % 3 == 0 { 25 } else { 80 },
                aspects: [AspectTag::Quality].into_iter().collect::<BTreeSet<_>>(),
                relevant: true,
            })
            .collect()
    }

    fn good_draft_json(_item_count: usize) -> String {
        serde_json::json!({
            "summary": "Reception is broadly positive with recurring quality praise.",
            "strengths": [
                {"title": "Export pipeline is fast", "description": "d", "item_indices": [0, 1]},
                {"title": "Quality holds up over time", "description": "d", "item_indices": [2, 3]},
            ],
            "issues": [
                {"title": "Subscription price feels high", "description": "d", "item_indices": [4]},
                {"title": "Updates break workflows", "description": "d", "item_indices": [5]},
            ],
            "overall_score": 64,
        })
        .to_string()
    }

    fn weak_draft_json() -> String {
        serde_json::json!({
            "summary": "Users have shared various feedback about the product.",
            "strengths": [
                {"title": "User Feedback", "description": "d", "item_indices": [0]},
                {"title": "General", "description": "d", "item_indices": [0]},
            ],
            "issues": [
                {"title": "Issues", "description": "d", "item_indices": [0]},
                {"title": "Other", "description": "d", "item_indices": [0]},
            ],
            "overall_score": 64,
        })
        .to_string()
    }

    #[test]
    fn well_formed_draft_scores_above_threshold() {
        let draft: SynthesisDraft = serde_json::from_str(&good_draft_json(7)).unwrap();
        let quality = score_draft(&draft, 7);

        assert!(quality.structure_ok);
        assert_eq!(quality.index_validity, 1.0);
        assert_eq!(quality.title_specificity, 1.0);
        assert!(quality.value >= 0.6, "quality was {}", quality.value);
    }

    #[test]
    fn generic_titles_drag_quality_below_threshold() {
        let draft: SynthesisDraft = serde_json::from_str(&weak_draft_json()).unwrap();
        let quality = score_draft(&draft, 7);

        assert_eq!(quality.title_specificity, 0.0);
        assert!(quality.value < 0.6, "quality was {}", quality.value);
        assert!(quality
            .deficiencies()
            .iter()
            .any(|d| d.contains("generic")));
    }

    #[test]
    fn out_of_bounds_indices_reduce_validity() {
        let mut draft: SynthesisDraft = serde_json::from_str(&good_draft_json(7)).unwrap();
        draft.issues[0].item_indices = vec![4, 99];
        let quality = score_draft(&draft, 7);

        assert!(quality.index_validity < 1.0);
        assert!(quality
            .deficiencies()
            .iter()
            .any(|d| d.contains("indices")));
    }

    #[test]
    fn empty_item_set_scores_zero_coverage() {
        let draft: SynthesisDraft = serde_json::from_str(&good_draft_json(7)).unwrap();
        let quality = score_draft(&draft, 0);
        assert_eq!(quality.mention_coverage, 0.0);
    }

    #[tokio::test]
    async fn quotes_are_always_copies_of_input_text() {
        let items = classified_items(7);
        let scores = score(&items);
        let model = MockLanguageModel::new().with_default_reply(good_draft_json(7));

        let synthesizer = Synthesizer::new(&model, SynthesisConfig::default());
        let synthesis = synthesizer.synthesize("WidgetPro", &items, &scores).await;

        let input_texts: Vec<&str> = items.iter().map(|i| i.item.text.as_str()).collect();
        for insight in synthesis.strengths.iter().chain(synthesis.issues.iter()) {
            for quote in &insight.quotes {
                assert!(input_texts.contains(&quote.text.as_str()));
            }
        }
        assert!(synthesis.strengths.len() + synthesis.issues.len() >= 4);
    }

    #[tokio::test]
    async fn weak_first_draft_triggers_one_corrective_retry() {
        let items = classified_items(7);
        let scores = score(&items);
        let model = MockLanguageModel::new()
            .with_reply("ITEMS_JSON", weak_draft_json())
            .with_reply("ITEMS_JSON", good_draft_json(7));

        let synthesizer = Synthesizer::new(&model, SynthesisConfig::default());
        let synthesis = synthesizer.synthesize("WidgetPro", &items, &scores).await;

        assert_eq!(model.call_count(), 2);

        // Retry runs hotter and carries the corrective block.
        let temperatures = model.recorded_temperatures();
        assert!(temperatures[1] > temperatures[0]);
        let prompts = model.recorded_prompts();
        assert!(prompts[1].contains("rejected"));

        // The better (second) attempt wins.
        assert!(synthesis
            .strengths
            .iter()
            .any(|s| s.title == "Export pipeline is fast"));
    }

    #[tokio::test]
    async fn unparseable_attempts_fall_back_without_fabricated_quotes() {
        let items = classified_items(7);
        let scores = score(&items);
        let model = MockLanguageModel::new().with_default_reply("not json at all");

        let synthesizer = Synthesizer::new(&model, SynthesisConfig::default());
        let synthesis = synthesizer.synthesize("WidgetPro", &items, &scores).await;

        assert_eq!(model.call_count(), 2);
        assert!(synthesis.summary.contains("WidgetPro"));

        let input_texts: Vec<&str> = items.iter().map(|i| i.item.text.as_str()).collect();
        for insight in synthesis.strengths.iter().chain(synthesis.issues.iter()) {
            for quote in &insight.quotes {
                assert!(input_texts.contains(&quote.text.as_str()));
            }
        }
    }

    #[tokio::test]
    async fn empty_input_skips_the_model() {
        let scores = score(&[]);
        let model = MockLanguageModel::new();

        let synthesizer = Synthesizer::new(&model, SynthesisConfig::default());
        let synthesis = synthesizer.synthesize("WidgetPro", &[], &scores).await;

        assert_eq!(model.call_count(), 0);
        assert!(!synthesis.summary.is_empty());
    }
}
