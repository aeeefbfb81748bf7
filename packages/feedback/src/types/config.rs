//! Configuration for clients and pipeline stages.
//!
//! All config is carried by explicitly owned structs with `Default` and
//! `with_*` builders; there are no hidden singletons.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for one source's HTTP client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the source's read API
    pub base_url: String,

    /// Maximum retry attempts for 429/5xx responses
    pub max_retries: u32,

    /// Base backoff delay; attempt n sleeps `retry_delay * 2^n`
    pub retry_delay: Duration,

    /// Minimum spacing between requests to this source
    pub request_delay: Duration,

    /// How long cached responses stay fresh
    pub cache_ttl: Duration,

    /// User-Agent header sent with every request
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            max_retries: 3,
            retry_delay: Duration::from_millis(500),
            request_delay: Duration::from_millis(250),
            cache_ttl: Duration::from_secs(300),
            user_agent: "feedback-pipeline/0.1".to_string(),
        }
    }
}

impl ClientConfig {
    /// Create a config pointing at the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Set the maximum retry attempts.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the base backoff delay.
    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Set the spacing between requests.
    pub fn with_request_delay(mut self, request_delay: Duration) -> Self {
        self.request_delay = request_delay;
        self
    }

    /// Set the cache TTL.
    pub fn with_cache_ttl(mut self, cache_ttl: Duration) -> Self {
        self.cache_ttl = cache_ttl;
        self
    }
}

/// Configuration for the classification stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifyConfig {
    /// Items labeled concurrently per batch
    pub batch_size: usize,

    /// Sampling temperature for label calls
    pub temperature: f32,

    /// Truncate item text to this many characters before prompting
    pub max_item_chars: usize,
}

impl Default for ClassifyConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            temperature: 0.0,
            max_item_chars: 1200,
        }
    }
}

/// Configuration for the synthesis stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisConfig {
    /// Accept a draft at or above this quality value
    pub quality_threshold: f64,

    /// Re-prompts after the first attempt
    pub max_retries: u32,

    /// Temperature for the first attempt
    pub base_temperature: f32,

    /// Temperature for corrective re-prompts
    pub retry_temperature: f32,

    /// Truncate item text to this many characters in the digest
    pub max_digest_chars: usize,

    /// Quotes attached per insight
    pub max_quotes: usize,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            quality_threshold: 0.6,
            max_retries: 1,
            base_temperature: 0.3,
            retry_temperature: 0.7,
            max_digest_chars: 280,
            max_quotes: 3,
        }
    }
}

/// Configuration for a whole pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Items requested from each source
    pub search_limit: usize,

    /// Child items (answers/comments) requested per parent
    pub children_per_parent: usize,

    pub classify: ClassifyConfig,
    pub synthesis: SynthesisConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            search_limit: 25,
            children_per_parent: 10,
            classify: ClassifyConfig::default(),
            synthesis: SynthesisConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Set the per-source search limit.
    pub fn with_search_limit(mut self, limit: usize) -> Self {
        self.search_limit = limit;
        self
    }

    /// Set the classification config.
    pub fn with_classify(mut self, classify: ClassifyConfig) -> Self {
        self.classify = classify;
        self
    }

    /// Set the synthesis config.
    pub fn with_synthesis(mut self, synthesis: SynthesisConfig) -> Self {
        self.synthesis = synthesis;
        self
    }
}
