//! Source clients: normalize third-party read APIs to [`RawItem`].
//!
//! Each client owns a [`SourceHttpClient`] carrying the cache/retry/pacing
//! behavior, and maps one API's result shapes into the pipeline's item
//! type. Sources are uniform once normalized; the pipeline never looks
//! past `RawItem`.

pub mod devblog;
pub mod forum;
pub mod http;
pub mod news;

pub use devblog::DevBlogClient;
pub use forum::ForumClient;
pub use http::SourceHttpClient;
pub use news::NewsClient;

use regex::Regex;
use std::sync::OnceLock;

/// Strip markup tags from rendered HTML, leaving the text content.
///
/// Crude by design: source APIs return rendered HTML and the pipeline only
/// needs plain text for matching and classification.
pub(crate) fn strip_tags(html: &str) -> String {
    static TAG: OnceLock<Regex> = OnceLock::new();
    let tag = TAG.get_or_init(|| Regex::new(r"<[^>]+>").expect("valid tag regex"));

    let text = tag.replace_all(html, " ");
    collapse_whitespace(&text)
}

/// Decode the handful of HTML entities that show up in API payloads.
pub(crate) fn decode_entities(text: &str) -> String {
    text.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&nbsp;", " ")
}

pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tags_and_collapses_whitespace() {
        let html = "<p>Great   tool,\n<a href=\"x\">works</a> well.</p>";
        assert_eq!(strip_tags(html), "Great tool, works well.");
    }

    #[test]
    fn decodes_common_entities() {
        assert_eq!(
            decode_entities("cheap &amp; cheerful &#39;tool&#39;"),
            "cheap & cheerful 'tool'"
        );
    }
}
