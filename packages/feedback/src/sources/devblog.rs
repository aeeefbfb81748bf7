//! Developer blog platform source client (Forem-compatible API).
//!
//! Parents are articles matching the product tag; children are each
//! article's top-level comments.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::SourceError;
use crate::sources::http::{fetch_children_batched, SourceHttpClient};
use crate::sources::strip_tags;
use crate::traits::source::{ContentSource, SearchOptions};
use crate::types::config::ClientConfig;
use crate::types::item::{RawItem, SourceKind};

/// Client for a Forem-compatible blog platform API.
pub struct DevBlogClient {
    http: SourceHttpClient,
}

impl DevBlogClient {
    /// Create a client against the given API base URL.
    pub fn new(config: ClientConfig) -> Self {
        Self {
            http: SourceHttpClient::new(config),
        }
    }

    async fn fetch_article_comments(
        &self,
        article_id: String,
        article_url: String,
        limit: usize,
    ) -> Result<Vec<RawItem>, SourceError> {
        let params = [("a_id", article_id)];
        let body = self.http.get_json("/comments", &params).await?;
        Ok(parse_comments(&body, &article_url, limit))
    }
}

#[async_trait]
impl ContentSource for DevBlogClient {
    fn kind(&self) -> SourceKind {
        SourceKind::DevBlog
    }

    async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<RawItem>, SourceError> {
        let params = [
            ("tag", tag_slug(query)),
            ("per_page", options.limit.to_string()),
        ];

        let body = self.http.get_json("/articles", &params).await?;
        let articles = parse_articles(&body);
        debug!(count = articles.len(), query = %query, "blog articles fetched");

        let refs: Vec<String> = articles.iter().map(|a| a.id.clone()).collect();
        let urls: std::collections::HashMap<String, String> = articles
            .iter()
            .map(|a| (a.id.clone(), a.item.url.clone()))
            .collect();

        let comments = fetch_children_batched(&refs, |id| {
            let url = urls.get(&id).cloned().unwrap_or_default();
            self.fetch_article_comments(id, url, options.children_per_parent)
        })
        .await;

        let mut items: Vec<RawItem> = articles.into_iter().map(|a| a.item).collect();
        items.extend(comments);
        Ok(items)
    }
}

/// Lowercase alphanumeric tag slug for the platform's tag index.
fn tag_slug(query: &str) -> String {
    query
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect::<String>()
        .to_lowercase()
}

struct ParentArticle {
    item: RawItem,
    id: String,
}

fn parse_articles(body: &serde_json::Value) -> Vec<ParentArticle> {
    let Some(entries) = body.as_array() else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| {
            let title = entry.get("title")?.as_str()?;
            let id = match entry.get("id") {
                Some(v) if v.is_u64() => v.to_string(),
                _ => return None,
            };

            let description = entry
                .get("description")
                .and_then(|v| v.as_str())
                .unwrap_or_default();
            let text = if description.is_empty() {
                title.to_string()
            } else {
                format!("{title}\n{description}")
            };

            let author = entry
                .pointer("/user/username")
                .and_then(|v| v.as_str())
                .unwrap_or("anonymous")
                .to_string();
            let url = entry
                .get("url")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();

            let item = RawItem::new(text, author, SourceKind::DevBlog)
                .with_url(url)
                .with_timestamp(iso_timestamp(entry.get("published_at")));

            Some(ParentArticle { item, id })
        })
        .collect()
}

fn parse_comments(body: &serde_json::Value, article_url: &str, limit: usize) -> Vec<RawItem> {
    let Some(entries) = body.as_array() else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| {
            let html = entry.get("body_html").and_then(|v| v.as_str())?;
            let text = strip_tags(html);
            if text.is_empty() {
                return None;
            }

            let author = entry
                .pointer("/user/username")
                .and_then(|v| v.as_str())
                .unwrap_or("anonymous")
                .to_string();

            Some(
                RawItem::new(text, author, SourceKind::DevBlog)
                    .with_url(article_url.to_string())
                    .with_timestamp(iso_timestamp(entry.get("created_at"))),
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
