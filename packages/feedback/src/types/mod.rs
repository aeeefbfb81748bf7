//! Data types for the feedback pipeline.

pub mod config;
pub mod item;
pub mod report;

pub use config::{ClassifyConfig, ClientConfig, PipelineConfig, SynthesisConfig};
pub use item::{AspectTag, ClassifiedItem, RawItem, Sentiment, SourceKind};
pub use report::{AspectScore, Confidence, Insight, IssueRadarItem, Quote, Report, Trend};
