//! Forum-style Q&A source client (StackExchange-compatible API).
//!
//! Parents are questions found via `/search/advanced`; children are their
//! answers, fetched per question in isolated groups.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::SourceError;
use crate::sources::http::{fetch_children_batched, SourceHttpClient};
use crate::sources::{decode_entities, strip_tags};
use crate::traits::source::{ContentSource, SearchOptions, SortOrder};
use crate::types::config::ClientConfig;
use crate::types::item::{RawItem, SourceKind};

/// A question surviving the search, with the id needed for answer fetches.
struct ParentQuestion {
    item: RawItem,
    id: String,
}

/// Client for a StackExchange-compatible Q&A API.
pub struct ForumClient {
    http: SourceHttpClient,
    site: String,
}

impl ForumClient {
    /// Create a client against the given API base URL.
    pub fn new(config: ClientConfig) -> Self {
        Self {
            http: SourceHttpClient::new(config),
            site: "stackoverflow".to_string(),
        }
    }

    /// Target a different site within the network.
    pub fn with_site(mut self, site: impl Into<String>) -> Self {
        self.site = site.into();
        self
    }

    async fn fetch_answers(&self, question_id: String, url: String, limit: usize) -> Result<Vec<RawItem>, SourceError> {
        let endpoint = format!("/questions/{question_id}/answers");
        let params = [
            ("site", self.site.clone()),
            ("filter", "withbody".to_string()),
            ("sort", "votes".to_string()),
            ("order", "desc".to_string()),
            ("pagesize", limit.to_string()),
        ];
        let body = self.http.get_json(&endpoint, &params).await?;
        Ok(parse_answers(&body, &url))
    }
}

#[async_trait]
impl ContentSource for ForumClient {
    fn kind(&self) -> SourceKind {
        SourceKind::Forum
    }

    async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<RawItem>, SourceError> {
        let sort = match options.sort {
            Some(SortOrder::Newest) => "creation",
            _ => "relevance",
        };
        let params = [
            ("q", query.to_string()),
            ("site", self.site.clone()),
            ("filter", "withbody".to_string()),
            ("sort", sort.to_string()),
            ("order", "desc".to_string()),
            ("pagesize", options.limit.to_string()),
        ];

        let body = self.http.get_json("/search/advanced", &params).await?;
        let parents = parse_questions(&body);
        debug!(count = parents.len(), query = %query, "forum questions fetched");

        let parent_refs: Vec<String> = parents.iter().map(|p| p.id.clone()).collect();
        let urls: std::collections::HashMap<String, String> = parents
            .iter()
            .map(|p| (p.id.clone(), p.item.url.clone()))
            .collect();

        let answers = fetch_children_batched(&parent_refs, |id| {
            let url = urls.get(&id).cloned().unwrap_or_default();
            self.fetch_answers(id, url, options.children_per_parent)
        })
        .await;

        let mut items: Vec<RawItem> = parents.into_iter().map(|p| p.item).collect();
        items.extend(answers);
        Ok(items)
    }
}

fn parse_questions(body: &serde_json::Value) -> Vec<ParentQuestion> {
    let Some(entries) = body.get("items").and_then(|v| v.as_array()) else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| {
            let title = decode_entities(entry.get("title")?.as_str()?);
            let question_body = entry
                .get("body")
                .and_then(|v| v.as_str())
                .map(|html| decode_entities(&strip_tags(html)))
                .unwrap_or_default();

            let text = if question_body.is_empty() {
                title
            } else {
                format!("{title}\n{question_body}")
            };

            let author = entry
                .pointer("/owner/display_name")
                .and_then(|v| v.as_str())
                .unwrap_or("anonymous")
                .to_string();
            let url = entry
                .get("link")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            let id = match entry.get("question_id") {
                Some(v) if v.is_u64() => v.to_string(),
                _ => return None,
            };

            let item = RawItem::new(text, author, SourceKind::Forum)
                .with_url(url)
                .with_timestamp(epoch_timestamp(entry.get("creation_date")));

            Some(ParentQuestion { item, id })
        })
        .collect()
}

fn parse_answers(body: &serde_json::Value, question_url: &str) -> Vec<RawItem> {
    let Some(entries) = body.get("items").and_then(|v| v.as_array()) else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| {
            let html = entry.get("body")?.as_str()?;
            let text = decode_entities(&strip_tags(html));
            if text.is_empty() {
                return None;
            }

            let author = entry
                .pointer("/owner/display_name")
                .and_then(|v| v.as_str())
                .unwrap_or("anonymous")
                .to_string();

            Some(
                RawItem::new(text, author, SourceKind::Forum)
                    .with_url(question_url.to_string())
                    .with_timestamp(epoch_timestamp(entry.get("creation_date"))),
            )
        })
        .collect()
}

fn epoch_timestamp(value: Option<&serde_json::Value>) -> DateTime<Utc> {
    value
        .and_then(|v| v.as_i64())
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .unwrap_or_else(Utc::now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_questions_with_bodies() {
        let body = json!({
            "items": [
                {
                    "title": "Is WidgetPro worth the price?",
                    "body": "<p>Considering the <b>subscription</b>.</p>",
                    "owner": {"display_name": "alice"},
                    "link": "https://example.com/q/1",
                    "question_id": 1,
                    "creation_date": 1700000000
                },
                {
                    "title": "Title only",
                    "owner": {"display_name": "bob"},
                    "link": "https://example.com/q/2",
                    "question_id": 2,
                    "creation_date": 1700000100
                }
            ]
        });

        let parents = parse_questions(&body);
        assert_eq!(parents.len(), 2);
        assert_eq!(
            parents[0].item.text,
            "Is WidgetPro worth the price?\nConsidering the subscription ."
        );
        assert_eq!(parents[0].id, "1");
        assert_eq!(parents[1].item.text, "Title only");
    }

    #[test]
    fn parses_answers_and_skips_empty_bodies() {
        let body = json!({
            "items": [
                {
                    "body": "<p>Worth it for the quality.</p>",
                    "owner": {"display_name": "carol"},
                    "creation_date": 1700000200
                },
                {
                    "body": "",
                    "owner": {"display_name": "dave"}
                }
            ]
        });

        let answers = parse_answers(&body, "https://example.com/q/1");
        assert_eq!(answers.len(), 1);
        assert_eq!(answers[0].author, "carol");
        assert_eq!(answers[0].url, "https://example.com/q/1");
    }

    #[test]
    fn missing_items_array_yields_nothing() {
        assert!(parse_questions(&json!({"error": "throttled"})).is_empty());
    }
}
