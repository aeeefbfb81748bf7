//! Link-aggregator source client (Algolia-style search API).
//!
//! Parents are stories found via `/search`; children are each story's
//! top-level comments from `/items/{id}`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;
use url::Url;

use crate::error::SourceError;
use crate::sources::http::{fetch_children_batched, SourceHttpClient};
use crate::sources::strip_tags;
use crate::traits::source::{ContentSource, SearchOptions, SortOrder};
use crate::types::config::ClientConfig;
use crate::types::item::{RawItem, SourceKind};

/// Client for an Algolia-style link-aggregator search API.
pub struct NewsClient {
    http: SourceHttpClient,
    /// Base for discussion-page URLs, joined with the story id
    discussion_base: String,
}

impl NewsClient {
    /// Create a client against the given API base URL.
    pub fn new(config: ClientConfig) -> Self {
        Self {
            http: SourceHttpClient::new(config),
            discussion_base: "https://news.ycombinator.com/item?id=".to_string(),
        }
    }

    /// Override the discussion-page URL base.
    pub fn with_discussion_base(mut self, base: impl Into<String>) -> Self {
        self.discussion_base = base.into();
        self
    }

    async fn fetch_comments(&self, story_id: String, limit: usize) -> Result<Vec<RawItem>, SourceError> {
        let endpoint = format!("/items/{story_id}");
        let body = self.http.get_json(&endpoint, &[]).await?;
        let url = format!("{}{}", self.discussion_base, story_id);
        Ok(parse_comments(&body, &url, limit))
    }
}

#[async_trait]
impl ContentSource for NewsClient {
    fn kind(&self) -> SourceKind {
        SourceKind::NewsAggregator
    }

    async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<RawItem>, SourceError> {
        let endpoint = match options.sort {
            Some(SortOrder::Newest) => "/search_by_date",
            _ => "/search",
        };
        let params = [
            ("query", query.to_string()),
            ("tags", "story".to_string()),
            ("hitsPerPage", options.limit.to_string()),
        ];

        let body = self.http.get_json(endpoint, &params).await?;
        let (mut items, story_ids) = parse_stories(&body, &self.discussion_base);
        debug!(count = items.len(), query = %query, "aggregator stories fetched");

        let comments = fetch_children_batched(&story_ids, |id| {
            self.fetch_comments(id, options.children_per_parent)
        })
        .await;

        items.extend(comments);
        Ok(items)
    }
}

/// Parse search hits into items plus the story ids needed for comments.
fn parse_stories(body: &serde_json::Value, discussion_base: &str) -> (Vec<RawItem>, Vec<String>) {
    let Some(hits) = body.get("hits").and_then(|v| v.as_array()) else {
        return (Vec::new(), Vec::new());
    };

    let mut items = Vec::new();
    let mut ids = Vec::new();

    for hit in hits {
        let Some(title) = hit.get("title").and_then(|v| v.as_str()) else {
            continue;
        };
        let Some(id) = hit.get("objectID").and_then(|v| v.as_str()) else {
            continue;
        };

        let story_text = hit
            .get("story_text")
            .and_then(|v| v.as_str())
            .map(strip_tags)
            .unwrap_or_default();
        let text = if story_text.is_empty() {
            title.to_string()
        } else {
            format!("{title}\n{story_text}")
        };

        let author = hit
            .get("author")
            .and_then(|v| v.as_str())
            .unwrap_or("anonymous")
            .to_string();

        // Prefer the submitted URL when it parses; fall back to the
        // discussion page.
        let url = hit
            .get("url")
            .and_then(|v| v.as_str())
            .filter(|u| Url::parse(u).is_ok())
            .map(|u| u.to_string())
            .unwrap_or_else(|| format!("{discussion_base}{id}"));

        items.push(
            RawItem::new(text, author, SourceKind::NewsAggregator)
                .with_url(url)
                .with_timestamp(iso_timestamp(hit.get("created_at"))),
        );
        ids.push(id.to_string());
    }

    (items, ids)
}

/// Parse the top-level comments of one story.
fn parse_comments(body: &serde_json::Value, story_url: &str, limit: usize) -> Vec<RawItem> {
    let Some(children) = body.get("children").and_then(|v| v.as_array()) else {
        return Vec::new();
    };

    children
        .iter()
        .filter_map(|child| {
            let html = child.get("text").and_then(|v| v.as_str())?;
            let text = strip_tags(html);
            if text.is_empty() {
                return None;
            }

            let author = child
                .get("author")
                .and_then(|v| v.as_str())
                .unwrap_or("anonymous")
                .to_string();

            Some(
                RawItem::new(text, author, SourceKind::NewsAggregator)
                    .with_url(story_url.to_string())
                    .with_timestamp(iso_timestamp(child.get("created_at"))),
            )
        })
        .take(limit)
        .collect()
}

fn iso_timestamp(value: Option<&serde_json::Value>) -> DateTime<Utc> {
    value
        .and_then(|v| v.as_str())
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(Utc::now)
}
