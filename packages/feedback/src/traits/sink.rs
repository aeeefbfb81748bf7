//! Status-sink trait: stage-transition notifications for external
//! observers (persistence, progress UI).
//!
//! The pipeline emits discrete transition calls and makes no assumptions
//! about what the sink does with them. The final report is returned to the
//! caller, not pushed through the sink.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stages of one pipeline run.
///
/// `Pending → Fetching → Classifying → Analyzing → Complete | Error`.
/// No automatic resume from `Error`; a fresh run starts over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStage {
    Pending,
    Fetching,
    Classifying,
    Analyzing,
    Complete,
    Error,
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RunStage::Pending => "pending",
            RunStage::Fetching => "fetching",
            RunStage::Classifying => "classifying",
            RunStage::Analyzing => "analyzing",
            RunStage::Complete => "complete",
            RunStage::Error => "error",
        };
        f.write_str(label)
    }
}

/// Receiver for stage-transition notifications.
pub trait StatusSink: Send + Sync {
    /// Called on every stage transition. `error` is set only for the
    /// terminal `Error` stage.
    fn stage_changed(&self, stage: RunStage, error: Option<&str>);
}

/// A sink that ignores all notifications.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl StatusSink for NoopSink {
    fn stage_changed(&self, _stage: RunStage, _error: Option<&str>) {}
}
