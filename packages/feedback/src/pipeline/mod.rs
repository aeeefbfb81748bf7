//! The analysis pipeline - the core of the library.
//!
//! Stages, in run order:
//! - relevance filter (fuzzy name match + keyword density)
//! - deduplication (lexical near-duplicate removal)
//! - classification (batched LLM labeling with per-item failure isolation)
//! - scoring (pure, deterministic aggregation)
//! - synthesis (narrative with quality-scored retry)
//!
//! The [`orchestrator`] sequences them and owns the run state machine.

pub mod classify;
pub mod dedupe;
pub mod orchestrator;
pub mod prompts;
pub mod relevance;
pub mod score;
pub mod synthesize;

pub use classify::{Classifier, ClassifyOutcome, ItemLabelResponse};
pub use dedupe::dedupe;
pub use orchestrator::Pipeline;
pub use relevance::{is_relevant, MatchStrength, NameMatcher};
pub use score::{score, ScoreSummary};
pub use synthesize::{score_draft, DraftInsight, DraftQuality, Synthesis, SynthesisDraft, Synthesizer};
