//! Classifier: label deduplicated items via the language-model service.
//!
//! Input is partitioned into fixed-size batches; calls within a batch run
//! concurrently. A failed call drops that one item with a warning, never
//! the batch or the run. The per-run system prompt is built once and
//! shared by every call so the service context is warm-started once.

use futures::future::join_all;
use schemars::{schema_for, JsonSchema};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::LlmError;
use crate::pipeline::prompts;
use crate::traits::llm::{CompletionRequest, LanguageModel};
use crate::types::config::ClassifyConfig;
use crate::types::item::{AspectTag, ClassifiedItem, RawItem, Sentiment};

/// Label shape requested from the model for one item.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ItemLabelResponse {
    /// "positive", "neutral", or "negative"
    pub sentiment: String,

    /// 0 to 100
    pub sentiment_score: u8,

    /// Aspect labels from the closed set; unknown labels are dropped
    pub aspects: Vec<String>,

    /// Whether the item actually discusses the target product
    pub relevant: bool,
}

/// Result of classifying one run's items.
#[derive(Debug)]
pub struct ClassifyOutcome {
    /// Successfully labeled items, in input order
    pub items: Vec<ClassifiedItem>,

    /// How many items were attempted
    pub attempted: usize,

    /// How many items were dropped on call or parse failure
    pub failed: usize,
}

/// Classifier for one pipeline run.
pub struct Classifier<'a, M: LanguageModel + ?Sized> {
    model: &'a M,
    system: String,
    config: ClassifyConfig,
}

impl<'a, M: LanguageModel + ?Sized> Classifier<'a, M> {
    /// Create a classifier for the given product.
    pub fn new(model: &'a M, product_name: &str, config: ClassifyConfig) -> Self {
        Self {
            model,
            system: prompts::classify_system(product_name),
            config,
        }
    }

    /// Label every item, batch by batch. Empty input returns immediately
    /// without contacting the service.
    pub async fn classify(&self, items: Vec<RawItem>) -> ClassifyOutcome {
        if items.is_empty() {
            return ClassifyOutcome {
                items: Vec::new(),
                attempted: 0,
                failed: 0,
            };
        }

        let attempted = items.len();
        let mut classified = Vec::with_capacity(attempted);
        let mut failed = 0usize;

        let schema = serde_json::to_value(schema_for!(ItemLabelResponse)).unwrap_or_default();

        for batch in items.chunks(self.config.batch_size) {
            let calls = batch.iter().map(|item| self.classify_one(item, &schema));
            let results = join_all(calls).await;

            for (item, result) in batch.iter().zip(results) {
                match result {
                    Ok(labels) => classified.push(apply_labels(item.clone(), labels)),
                    Err(e) => {
                        failed += 1;
                        warn!(
                            url = %item.url,
                            error = %e,
                            "classification failed for item, dropping"
                        );
                    }
                }
            }
        }

        debug!(
            attempted,
            labeled = classified.len(),
            failed,
            "classification finished"
        );

        ClassifyOutcome {
            items: classified,
            attempted,
            failed,
        }
    }

    async fn classify_one(
        &self,
        item: &RawItem,
        schema: &serde_json::Value,
    ) -> Result<ItemLabelResponse, LlmError> {
        let mut text = item.text.clone();
        if text.chars().count() > self.config.max_item_chars {
            text = text.chars().take(self.config.max_item_chars).collect();
        }

        let request = CompletionRequest::new(self.system.clone(), prompts::classify_item(&text))
            .with_schema(schema.clone())
            .with_temperature(self.config.temperature);

        let raw = self.model.complete(request).await?;
        parse_labels(&raw)
    }
}

/// Parse and validate a label response. Unknown sentiment is a failure;
/// unknown aspect labels are silently dropped.
fn parse_labels(raw: &str) -> Result<ItemLabelResponse, LlmError> {
    let labels: ItemLabelResponse = serde_json::from_str(raw)
        .map_err(|e| LlmError::MalformedResponse(format!("label parse failed: {e}")))?;

    if Sentiment::from_label(&labels.sentiment).is_none() {
        return Err(LlmError::MalformedResponse(format!(
            "unknown sentiment label: {}",
            labels.sentiment
        )));
    }

    Ok(labels)
}

fn apply_labels(item: RawItem, labels: ItemLabelResponse) -> ClassifiedItem {
    let sentiment =
        Sentiment::from_label(&labels.sentiment).unwrap_or(Sentiment::Neutral);
    let aspects = labels
        .aspects
        .iter()
        .filter_map(|label| AspectTag::from_label(label))
        .collect();

    ClassifiedItem {
        item,
        sentiment,
        sentiment_score: labels.sentiment_score.min(100),
        aspects,
        relevant: labels.relevant,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockLanguageModel;
    use crate::types::item::SourceKind;

    fn items(texts: &[&str]) -> Vec<RawItem> {
        texts
            .iter()
            .map(|t| RawItem::new(*t, "tester", SourceKind::Forum))
            .collect()
    }

    fn label_json(sentiment: &str, score: u8, aspects: &[&str], relevant: bool) -> String {
        serde_json::json!({
            "sentiment": sentiment,
            "sentiment_score": score,
            "aspects": aspects,
            "relevant": relevant,
        })
        .to_string()
    }

    #[tokio::test]
    async fn empty_input_never_contacts_the_model() {
        let model = MockLanguageModel::new();
        let classifier = Classifier::new(&model, "WidgetPro", ClassifyConfig::default());

        let outcome = classifier.classify(Vec::new()).await;
        assert_eq!(outcome.attempted, 0);
        assert_eq!(model.call_count(), 0);
    }

    #[tokio::test]
    async fn failed_items_are_dropped_not_fatal() {
        let model = MockLanguageModel::new()
            .with_reply("pricing is fine", label_json("positive", 80, &["price"], true))
            .with_failure("flaky item", "upstream timeout")
            .with_reply("quality is poor", label_json("negative", 20, &["quality"], true));

        let classifier = Classifier::new(&model, "WidgetPro", ClassifyConfig::default());
        let outcome = classifier
            .classify(items(&["pricing is fine", "flaky item", "quality is poor"]))
            .await;

        assert_eq!(outcome.attempted, 3);
        assert_eq!(outcome.failed, 1);
        assert_eq!(outcome.items.len(), 2);
        assert_eq!(outcome.items[0].sentiment, Sentiment::Positive);
        assert!(outcome.items[0].has_aspect(AspectTag::Price));
    }

    #[tokio::test]
    async fn unknown_aspects_are_dropped_unknown_sentiment_fails() {
        let model = MockLanguageModel::new()
            .with_reply(
                "odd aspects",
                label_json("positive", 75, &["price", "shipping"], true),
            )
            .with_reply("odd sentiment", label_json("lukewarm", 50, &[], true));

        let classifier = Classifier::new(&model, "WidgetPro", ClassifyConfig::default());
        let outcome = classifier.classify(items(&["odd aspects", "odd sentiment"])).await;

        assert_eq!(outcome.items.len(), 1);
        assert_eq!(outcome.failed, 1);
        let aspects: Vec<_> = outcome.items[0].aspects.iter().collect();
        assert_eq!(aspects, vec![&AspectTag::Price]);
    }

    #[tokio::test]
    async fn system_prompt_is_shared_across_batches() {
        let reply = label_json("neutral", 50, &[], true);
        let model = MockLanguageModel::new().with_default_reply(reply);

        let config = ClassifyConfig {
            batch_size: 2,
            ..Default::default()
        };
        let classifier = Classifier::new(&model, "WidgetPro", config);

        let outcome = classifier
            .classify(items(&["one about widgetpro", "two", "three", "four", "five"]))
            .await;
        assert_eq!(outcome.items.len(), 5);

        let systems = model.recorded_systems();
        assert_eq!(systems.len(), 5);
        assert!(systems.windows(2).all(|w| w[0] == w[1]));
    }
}
