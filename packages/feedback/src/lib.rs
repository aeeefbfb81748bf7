//! Multi-Source Product Feedback Aggregation Library
//!
//! Ingests public discussion about a named product from several content
//! sources, removes near-duplicate text, labels each item with sentiment
//! and topical aspects via a language-model service, computes
//! deterministic aggregate scores, and produces a narrative report with
//! evidence quotes.
//!
//! # Design Philosophy
//!
//! - Closed enums for source/sentiment/aspect tags, never open strings
//! - Partial failure is per-task: one failed fetch or label call never
//!   aborts its siblings or the run
//! - Scoring is a pure function; the nondeterministic synthesis step is
//!   wrapped in a produce-score-retry loop with a pure quality rubric
//! - Quotes are only ever copies of classified item text
//! - External collaborators (sources, model, status sink) sit behind
//!   narrow traits; mocks live in [`testing`]
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use feedback::{Pipeline, ForumClient, NewsClient, DevBlogClient, ClientConfig};
//! use feedback::ai::OpenAiModel;
//!
//! let model = OpenAiModel::from_env("gpt-4o-mini")?;
//!
//! let pipeline = Pipeline::new(model)
//!     .with_source(Box::new(ForumClient::new(
//!         ClientConfig::new("https://api.stackexchange.com/2.3"),
//!     )))
//!     .with_source(Box::new(NewsClient::new(
//!         ClientConfig::new("https://hn.algolia.com/api/v1"),
//!     )))
//!     .with_source(Box::new(DevBlogClient::new(
//!         ClientConfig::new("https://dev.to/api"),
//!     )));
//!
//! let report = pipeline.run("WidgetPro").await?;
//! println!("{} scored {}/100", report.product_name, report.overall_score);
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Seams for external collaborators (sources, model, sink)
//! - [`types`] - Item, report, and config types
//! - [`sources`] - Source clients with caching, retry, and pacing
//! - [`pipeline`] - Filter, dedupe, classify, score, synthesize, orchestrate
//! - [`testing`] - Mock implementations for testing

pub mod ai;
pub mod error;
pub mod pipeline;
pub mod sources;
pub mod testing;
pub mod traits;
pub mod types;

// Re-export core types at crate root
pub use error::{LlmError, PipelineError, PipelineResult, SourceError};
pub use traits::{
    llm::{CompletionRequest, LanguageModel},
    sink::{NoopSink, RunStage, StatusSink},
    source::{ContentSource, SearchOptions, SortOrder},
};
pub use types::{
    config::{ClassifyConfig, ClientConfig, PipelineConfig, SynthesisConfig},
    item::{AspectTag, ClassifiedItem, RawItem, Sentiment, SourceKind},
    report::{AspectScore, Confidence, Insight, IssueRadarItem, Quote, Report, Trend},
};

// Re-export the pipeline entry point and stage functions
pub use pipeline::{
    dedupe, is_relevant, score, score_draft, Classifier, ClassifyOutcome, NameMatcher, Pipeline,
    ScoreSummary, Synthesis, Synthesizer,
};

// Re-export source clients
pub use sources::{DevBlogClient, ForumClient, NewsClient, SourceHttpClient};

#[cfg(feature = "openai")]
pub use ai::OpenAiModel;
