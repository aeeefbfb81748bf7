//! Testing utilities including mock implementations.
//!
//! These make pipeline behavior testable without real network or model
//! calls: scripted responses, failure injection, and call tracking for
//! assertions.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;

use crate::error::{LlmError, SourceError};
use crate::traits::llm::{CompletionRequest, LanguageModel};
use crate::traits::sink::{RunStage, StatusSink};
use crate::traits::source::{ContentSource, SearchOptions};
use crate::types::item::{RawItem, SourceKind};

/// Record of one call made to [`MockLanguageModel`].
#[derive(Debug, Clone)]
pub struct RecordedCompletion {
    pub system: String,
    pub prompt: String,
    pub temperature: f32,
}

#[derive(Debug, Clone)]
enum Reply {
    Text(String),
    Fail(String),
}

struct Rule {
    needle: String,
    queue: VecDeque<Reply>,
}

/// A mock language model with scripted replies.
///
/// Replies are keyed by a substring of the user prompt; multiple replies
/// for the same needle are consumed in order, with the last one repeating.
/// Unmatched prompts fall back to the default reply, or fail the call.
#[derive(Default)]
pub struct MockLanguageModel {
    rules: Arc<Mutex<Vec<Rule>>>,
    default_reply: Arc<Mutex<Option<Reply>>>,
    calls: Arc<Mutex<Vec<RecordedCompletion>>>,
}

impl MockLanguageModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a reply for prompts containing `needle`.
    pub fn with_reply(self, needle: impl Into<String>, reply: impl Into<String>) -> Self {
        self.push_rule(needle.into(), Reply::Text(reply.into()));
        self
    }

    /// Script a failure for prompts containing `needle`.
    pub fn with_failure(self, needle: impl Into<String>, message: impl Into<String>) -> Self {
        self.push_rule(needle.into(), Reply::Fail(message.into()));
        self
    }

    /// Set the reply for any prompt no rule matches.
    pub fn with_default_reply(self, reply: impl Into<String>) -> Self {
        *self.default_reply.lock().expect("mock lock poisoned") = Some(Reply::Text(reply.into()));
        self
    }

    fn push_rule(&self, needle: String, reply: Reply) {
        let mut rules = self.rules.lock().expect("mock lock poisoned");
        if let Some(rule) = rules.iter_mut().find(|r| r.needle == needle) {
            rule.queue.push_back(reply);
        } else {
            let mut queue = VecDeque::new();
            queue.push_back(reply);
            rules.push(Rule { needle, queue });
        }
    }

    fn next_reply(&self, prompt: &str) -> Option<Reply> {
        let mut rules = self.rules.lock().expect("mock lock poisoned");
        for rule in rules.iter_mut() {
            if prompt.contains(&rule.needle) {
                return Some(if rule.queue.len() > 1 {
                    rule.queue.pop_front().expect("non-empty queue")
                } else {
                    rule.queue.front().cloned().expect("non-empty queue")
                });
            }
        }
        drop(rules);
        self.default_reply
            .lock()
            .expect("mock lock poisoned")
            .clone()
    }

    /// Total completion calls made.
    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("mock lock poisoned").len()
    }

    /// System prompts in call order.
    pub fn recorded_systems(&self) -> Vec<String> {
        self.calls
            .lock()
            .expect("mock lock poisoned")
            .iter()
            .map(|c| c.system.clone())
            .collect()
    }

    /// User prompts in call order.
    pub fn recorded_prompts(&self) -> Vec<String> {
        self.calls
            .lock()
            .expect("mock lock poisoned")
            .iter()
            .map(|c| c.prompt.clone())
            .collect()
    }

    /// Temperatures in call order.
    pub fn recorded_temperatures(&self) -> Vec<f32> {
        self.calls
            .lock()
            .expect("mock lock poisoned")
            .iter()
            .map(|c| c.temperature)
            .collect()
    }
}

#[async_trait]
impl LanguageModel for MockLanguageModel {
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError> {
        self.calls
            .lock()
            .expect("mock lock poisoned")
            .push(RecordedCompletion {
                system: request.system.clone(),
                prompt: request.prompt.clone(),
                temperature: request.temperature,
            });

        match self.next_reply(&request.prompt) {
            Some(Reply::Text(text)) => Ok(text),
            Some(Reply::Fail(message)) => Err(LlmError::Api(message)),
            None => Err(LlmError::Api(format!(
                "no scripted reply for prompt: {}",
                request.prompt.chars().take(80).collect::<String>()
            ))),
        }
    }
}

/// A mock content source returning scripted items or a scripted failure.
pub struct MockSource {
    kind: SourceKind,
    items: Vec<RawItem>,
    fail: bool,
    panic: bool,
    queries: Arc<RwLock<Vec<String>>>,
}

impl MockSource {
    pub fn new(kind: SourceKind) -> Self {
        Self {
            kind,
            items: Vec::new(),
            fail: false,
            panic: false,
            queries: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Script the items this source returns.
    pub fn with_items(mut self, items: Vec<RawItem>) -> Self {
        self.items = items;
        self
    }

    /// Make every search fail with an exhausted-retries error.
    pub fn with_failure(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Make every search panic, for testing panic containment.
    pub fn with_panic(mut self) -> Self {
        self.panic = true;
        self
    }

    /// Queries this source has seen.
    pub fn queries(&self) -> Vec<String> {
        self.queries.read().expect("mock lock poisoned").clone()
    }

    /// Handle for query assertions after the source is boxed.
    pub fn query_log(&self) -> Arc<RwLock<Vec<String>>> {
        Arc::clone(&self.queries)
    }
}

#[async_trait]
impl ContentSource for MockSource {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn search(
        &self,
        query: &str,
        _options: &SearchOptions,
    ) -> Result<Vec<RawItem>, SourceError> {
        self.queries
            .write()
            .expect("mock lock poisoned")
            .push(query.to_string());

        if self.panic {
            panic!("injected source panic");
        }
        if self.fail {
            return Err(SourceError::Exhausted {
                status: 503,
                attempts: 4,
            });
        }
        Ok(self.items.clone())
    }
}

/// A status sink that records every transition.
#[derive(Default)]
pub struct MemorySink {
    transitions: Mutex<Vec<(RunStage, Option<String>)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transitions seen so far, in order.
    pub fn transitions(&self) -> Vec<(RunStage, Option<String>)> {
        self.transitions.lock().expect("sink lock poisoned").clone()
    }

    /// Stages only, for compact assertions.
    pub fn stages(&self) -> Vec<RunStage> {
        self.transitions
            .lock()
            .expect("sink lock poisoned")
            .iter()
            .map(|(stage, _)| *stage)
            .collect()
    }
}

impl StatusSink for MemorySink {
    fn stage_changed(&self, stage: RunStage, error: Option<&str>) {
        self.transitions
            .lock()
            .expect("sink lock poisoned")
            .push((stage, error.map(str::to_string)));
    }
}
