//! Content-source trait: the seam between the pipeline and the fetch
//! clients.
//!
//! Each implementation wraps one third-party read API and normalizes its
//! results to [`RawItem`]. Child-item expansion (answers, comments) happens
//! inside `search`, so callers see one flat item list per source.

use async_trait::async_trait;

use crate::error::SourceError;
use crate::types::item::{RawItem, SourceKind};

/// Sort order requested from a source, where the source supports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Relevance,
    Newest,
}

/// Options for a source search.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Maximum parent items to fetch
    pub limit: usize,

    /// Sort order, if the source supports one
    pub sort: Option<SortOrder>,

    /// Child items (answers/comments) to fetch per parent
    pub children_per_parent: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            limit: 25,
            sort: Some(SortOrder::Relevance),
            children_per_parent: 10,
        }
    }
}

impl SearchOptions {
    /// Set the parent item limit.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Set the sort order.
    pub fn with_sort(mut self, sort: SortOrder) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Set the per-parent child limit.
    pub fn with_children_per_parent(mut self, count: usize) -> Self {
        self.children_per_parent = count;
        self
    }
}

/// A content source the pipeline can fan out to.
///
/// Implementations own their HTTP machinery (caching, retry, pacing); one
/// `search` call covers parent items and their children.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Which kind of source this is.
    fn kind(&self) -> SourceKind;

    /// Fetch items discussing the query, normalized to [`RawItem`].
    async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<RawItem>, SourceError>;
}
