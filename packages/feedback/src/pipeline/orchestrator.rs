//! Pipeline orchestrator: sequences the stages for one analysis run.
//!
//! `Pending → Fetching → Classifying → Analyzing → Complete | Error`.
//! Stages never overlap; within a stage, work fans out to bounded
//! concurrent tasks and fans back in. Partial failure is isolated per
//! task: one failed source or one failed classification call never aborts
//! its siblings or the run. Every transition is emitted to the status
//! sink; terminal errors carry a displayable message.

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use chrono::Utc;
use futures::future::join_all;
use futures::FutureExt;
use tracing::{debug, error, info, warn};

use crate::error::{PipelineError, PipelineResult};
use crate::pipeline::classify::Classifier;
use crate::pipeline::dedupe::dedupe;
use crate::pipeline::relevance::{is_relevant, NameMatcher};
use crate::pipeline::score::score;
use crate::pipeline::synthesize::Synthesizer;
use crate::traits::llm::LanguageModel;
use crate::traits::sink::{NoopSink, RunStage, StatusSink};
use crate::traits::source::{ContentSource, SearchOptions, SortOrder};
use crate::types::config::PipelineConfig;
use crate::types::item::{ClassifiedItem, RawItem};
use crate::types::report::Report;

/// One product-analysis pipeline over a set of sources and a language
/// model.
///
/// # Example
///
/// ```rust,ignore
/// let pipeline = Pipeline::new(model)
///     .with_source(Box::new(ForumClient::new(forum_config)))
///     .with_source(Box::new(NewsClient::new(news_config)))
///     .with_sink(Arc::new(sink));
///
/// let report = pipeline.run("WidgetPro").await?;
/// ```
pub struct Pipeline<M: LanguageModel> {
    sources: Vec<Box<dyn ContentSource>>,
    model: M,
    sink: Arc<dyn StatusSink>,
    config: PipelineConfig,
}

impl<M: LanguageModel> Pipeline<M> {
    /// Create a pipeline with no sources and a no-op sink.
    pub fn new(model: M) -> Self {
        Self {
            sources: Vec::new(),
            model,
            sink: Arc::new(NoopSink),
            config: PipelineConfig::default(),
        }
    }

    /// Add a content source.
    pub fn with_source(mut self, source: Box<dyn ContentSource>) -> Self {
        self.sources.push(source);
        self
    }

    /// Set the status sink.
    pub fn with_sink(mut self, sink: Arc<dyn StatusSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Set the run configuration.
    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// The language model this pipeline runs against.
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Run one full analysis. No resume on error; a fresh call starts
    /// over from `Pending`.
    ///
    /// A panic inside a stage is caught and mapped to
    /// [`PipelineError::Stage`] naming the stage that was running, so one
    /// bad run never takes down the caller.
    pub async fn run(&self, product_name: &str) -> PipelineResult<Report> {
        self.sink.stage_changed(RunStage::Pending, None);
        let reached = Mutex::new(RunStage::Pending);

        // AssertUnwindSafe is needed because &self is not UnwindSafe by
        // default; nothing reads pipeline state after a panic.
        let outcome = AssertUnwindSafe(self.run_stages(product_name, &reached))
            .catch_unwind()
            .await;

        let result = match outcome {
            Ok(result) => result,
            Err(panic_info) => {
                let stage = *reached.lock().expect("stage lock poisoned");
                let message = panic_message(&*panic_info);
                error!(%stage, panic = %message, "pipeline stage panicked");
                Err(PipelineError::Stage { stage, message })
            }
        };

        match result {
            Ok(report) => {
                self.sink.stage_changed(RunStage::Complete, None);
                Ok(report)
            }
            Err(e) => {
                self.sink.stage_changed(RunStage::Error, Some(&e.to_string()));
                Err(e)
            }
        }
    }

    fn enter_stage(&self, reached: &Mutex<RunStage>, stage: RunStage) {
        *reached.lock().expect("stage lock poisoned") = stage;
        self.sink.stage_changed(stage, None);
    }

    async fn run_stages(
        &self,
        product_name: &str,
        reached: &Mutex<RunStage>,
    ) -> PipelineResult<Report> {
        let run_start = Instant::now();
        info!(product = %product_name, sources = self.sources.len(), "pipeline run started");

        // Fetch: fan out to every source, all-settled.
        self.enter_stage(reached, RunStage::Fetching);
        let fetch_start = Instant::now();

        let options = SearchOptions::default()
            .with_limit(self.config.search_limit)
            .with_sort(SortOrder::Relevance)
            .with_children_per_parent(self.config.children_per_parent);

        let searches = self.sources.iter().map(|source| async {
            (source.kind(), source.search(product_name, &options).await)
        });
        let results = join_all(searches).await;

        let mut raw: Vec<RawItem> = Vec::new();
        let mut failed_sources = 0usize;
        for (kind, result) in results {
            match result {
                Ok(items) => {
                    debug!(source = %kind, count = items.len(), "source returned items");
                    raw.extend(items);
                }
                Err(e) => {
                    failed_sources += 1;
                    warn!(source = %kind, error = %e, "source failed, continuing without it");
                }
            }
        }

        if !self.sources.is_empty() && failed_sources == self.sources.len() {
            return Err(PipelineError::AllSourcesFailed);
        }

        info!(
            items = raw.len(),
            failed_sources,
            duration_ms = fetch_start.elapsed().as_millis() as u64,
            "fetch complete"
        );

        // Filter and dedupe.
        let matcher = NameMatcher::new(product_name);
        let fetched = raw.len();
        let relevant_raw: Vec<RawItem> = raw
            .into_iter()
            .filter(|item| is_relevant(item, &matcher))
            .collect();
        debug!(
            before = fetched,
            after = relevant_raw.len(),
            "relevance filter applied"
        );

        let unique = dedupe(relevant_raw);
        if unique.is_empty() {
            return Err(PipelineError::EmptyResult {
                product: product_name.to_string(),
            });
        }
        info!(unique = unique.len(), "items surviving filter and dedupe");

        // Classify.
        self.enter_stage(reached, RunStage::Classifying);
        let classify_start = Instant::now();

        let classifier = Classifier::new(&self.model, product_name, self.config.classify.clone());
        let outcome = classifier.classify(unique).await;
        if outcome.failed > 0 {
            warn!(
                failed = outcome.failed,
                attempted = outcome.attempted,
                "some items dropped during classification"
            );
        }
        info!(
            labeled = outcome.items.len(),
            duration_ms = classify_start.elapsed().as_millis() as u64,
            "classification complete"
        );

        // Analyze: score, then synthesize the narrative.
        self.enter_stage(reached, RunStage::Analyzing);
        let analyze_start = Instant::now();

        let summary = score(&outcome.items);
        let relevant: Vec<ClassifiedItem> = outcome
            .items
            .iter()
            .filter(|i| i.relevant)
            .cloned()
            .collect();

        let synthesizer = Synthesizer::new(&self.model, self.config.synthesis.clone());
        let synthesis = synthesizer
            .synthesize(product_name, &relevant, &summary)
            .await;

        info!(
            overall = summary.overall_score,
            mentions = summary.total_mentions,
            duration_ms = analyze_start.elapsed().as_millis() as u64,
            "analysis complete"
        );

        let report = Report {
            product_name: product_name.to_string(),
            overall_score: summary.overall_score,
            total_mentions: summary.total_mentions,
            summary: synthesis.summary,
            strengths: synthesis.strengths,
            issues: synthesis.issues,
            aspects: summary.aspects,
            issue_radar: summary.issue_radar,
            confidence: summary.confidence,
            generated_at: Utc::now(),
        };

        info!(
            duration_ms = run_start.elapsed().as_millis() as u64,
            "pipeline run finished"
        );
        Ok(report)
    }
}

/// Extract a displayable message from a caught panic payload.
fn panic_message(panic_info: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic_info.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic_info.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemorySink, MockLanguageModel, MockSource};
    use crate::types::item::SourceKind;

    fn relevant_item(text: &str, author: &str, kind: SourceKind) -> RawItem {
        RawItem::new(text, author, kind).with_url("https://example.com/x")
    }

    fn label_reply(sentiment: &str, score: u8) -> String {
        serde_json::json!({
            "sentiment": sentiment,
            "sentiment_score": score,
            "aspects": ["price"],
            "relevant": true,
        })
        .to_string()
    }

    fn draft_reply() -> String {
        serde_json::json!({
            "summary": "WidgetPro lands well overall, with pricing the sore spot.",
            "strengths": [
                {"title": "Fast setup on new projects", "description": "d", "item_indices": [0]},
                {"title": "Stable under heavy load", "description": "d", "item_indices": [1]},
            ],
            "issues": [
                {"title": "Subscription price creeps up", "description": "d", "item_indices": [2]},
                {"title": "Renewal flow is confusing", "description": "d", "item_indices": [3]},
            ],
            "overall_score": 75,
        })
        .to_string()
    }

    fn scripted_model() -> MockLanguageModel {
        MockLanguageModel::new()
            .with_reply("OVERALL_SCORE", draft_reply())
            .with_default_reply(label_reply("positive", 80))
    }

    fn sample_items(kind: SourceKind) -> Vec<RawItem> {
        vec![
            relevant_item(
                "WidgetPro setup took five minutes, great tool for the team",
                "alice",
                kind,
            ),
            relevant_item(
                "WidgetPro handled our biggest workload without a single crash",
                "bob",
                kind,
            ),
        ]
    }

    #[tokio::test]
    async fn happy_path_walks_every_stage() {
        let sink = Arc::new(MemorySink::new());
        let pipeline = Pipeline::new(scripted_model())
            .with_source(Box::new(
                MockSource::new(SourceKind::Forum).with_items(sample_items(SourceKind::Forum)),
            ))
            .with_source(Box::new(MockSource::new(SourceKind::DevBlog).with_items(vec![
                relevant_item(
                    "WidgetPro pricing jumped again this year, considering an alternative",
                    "carol",
                    SourceKind::DevBlog,
                ),
                relevant_item(
                    "The WidgetPro renewal flow buried the cancel option, bad support",
                    "dave",
                    SourceKind::DevBlog,
                ),
            ])))
            .with_sink(sink.clone());

        let report = pipeline.run("WidgetPro").await.unwrap();

        assert_eq!(
            sink.stages(),
            vec![
                RunStage::Pending,
                RunStage::Fetching,
                RunStage::Classifying,
                RunStage::Analyzing,
                RunStage::Complete,
            ]
        );
        assert_eq!(report.product_name, "WidgetPro");
        assert_eq!(report.total_mentions, 4);
        assert!(report.overall_score <= 100);
        assert!(!report.summary.is_empty());
        assert!(report.strengths.len() + report.issues.len() >= 4);
    }

    #[tokio::test]
    async fn all_sources_failing_is_terminal() {
        let sink = Arc::new(MemorySink::new());
        let pipeline = Pipeline::new(scripted_model())
            .with_source(Box::new(MockSource::new(SourceKind::Forum).with_failure()))
            .with_source(Box::new(
                MockSource::new(SourceKind::NewsAggregator).with_failure(),
            ))
            .with_sink(sink.clone());

        let err = pipeline.run("WidgetPro").await.unwrap_err();
        assert!(matches!(err, PipelineError::AllSourcesFailed));

        let transitions = sink.transitions();
        let (stage, message) = transitions.last().unwrap();
        assert_eq!(*stage, RunStage::Error);
        assert!(message.as_deref().unwrap_or_default().contains("sources"));
    }

    #[tokio::test]
    async fn one_failing_source_does_not_abort_the_run() {
        let pipeline = Pipeline::new(scripted_model())
            .with_source(Box::new(MockSource::new(SourceKind::Forum).with_failure()))
            .with_source(Box::new(
                MockSource::new(SourceKind::DevBlog).with_items(vec![
                    relevant_item(
                        "WidgetPro is a solid tool, the subscription is worth it",
                        "erin",
                        SourceKind::DevBlog,
                    ),
                    relevant_item(
                        "WidgetPro support replied fast when the update broke my setup",
                        "frank",
                        SourceKind::DevBlog,
                    ),
                ]),
            ));

        let report = pipeline.run("WidgetPro").await.unwrap();
        assert_eq!(report.total_mentions, 2);
    }

    #[tokio::test]
    async fn stage_panic_is_contained_as_a_stage_error() {
        let sink = Arc::new(MemorySink::new());
        let pipeline = Pipeline::new(scripted_model())
            .with_source(Box::new(MockSource::new(SourceKind::Forum).with_panic()))
            .with_sink(sink.clone());

        let err = pipeline.run("WidgetPro").await.unwrap_err();
        match err {
            PipelineError::Stage { stage, ref message } => {
                assert_eq!(stage, RunStage::Fetching);
                assert!(message.contains("injected source panic"));
            }
            other => panic!("expected a stage error, got {other}"),
        }

        let transitions = sink.transitions();
        let (stage, message) = transitions.last().unwrap();
        assert_eq!(*stage, RunStage::Error);
        assert!(message.as_deref().unwrap_or_default().contains("fetching"));
    }

    #[tokio::test]
    async fn nothing_relevant_yields_empty_result_error() {
        let sink = Arc::new(MemorySink::new());
        let pipeline = Pipeline::new(scripted_model())
            .with_source(Box::new(MockSource::new(SourceKind::Forum).with_items(vec![
                relevant_item(
                    "completely unrelated chatter about gardening and weather",
                    "gus",
                    SourceKind::Forum,
                ),
            ])))
            .with_sink(sink.clone());

        let err = pipeline.run("WidgetPro").await.unwrap_err();
        assert!(matches!(err, PipelineError::EmptyResult { .. }));
        assert!(err.to_string().contains("more specific"));
        assert_eq!(*sink.stages().last().unwrap(), RunStage::Error);
    }
}
