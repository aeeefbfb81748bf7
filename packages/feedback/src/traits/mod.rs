//! Trait seams for external collaborators.

pub mod llm;
pub mod sink;
pub mod source;

pub use llm::{CompletionRequest, LanguageModel};
pub use sink::{NoopSink, RunStage, StatusSink};
pub use source::{ContentSource, SearchOptions, SortOrder};
