//! Tolerant parsing of creative content out of agent message text.
//!
//! Writer output arrives in several shapes: a fenced JSON block, labeled
//! text using the upstream `标题:` / `标签:` convention, or plain prose.
//! Strategies are tried strictly in that order; the plain-prose fallback is
//! opt-in because applying it to intermediate agent output would misclassify
//! structured payloads as user-visible content.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static TITLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*(?:标题|Title)[:：]\s*(.+)$").unwrap()
});
static TAGS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*(?:标签|Tags)[:：]\s*(.+)$").unwrap()
});
static TAG_TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"#([^\s#]+)").unwrap());
static JSON_FENCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```(?:json)?\s*(\{.*?\}|\[.*?\])\s*```").unwrap()
});

/// Structured creative content recovered from free text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedContent {
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Parse creative content using the lenient strategy chain:
/// fenced JSON with a `title` field, then labeled title+tags text, then
/// labeled title-only text. Returns `None` when no strategy applies.
pub fn parse_creative_content(text: &str) -> Option<ParsedContent> {
    if let Some(parsed) = parse_json_fence(text) {
        return Some(parsed);
    }
    parse_labeled(text)
}

/// Like [`parse_creative_content`], but falls back to treating the first
/// non-empty line as a title and the rest as body. Only writer-agent prose
/// should go through this entry point.
pub fn parse_creative_content_or_plain(text: &str) -> Option<ParsedContent> {
    if let Some(parsed) = parse_creative_content(text) {
        return Some(parsed);
    }
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    let mut lines = trimmed.lines();
    let title = lines.next()?.trim().to_string();
    let body = lines.collect::<Vec<_>>().join("\n").trim().to_string();
    Some(ParsedContent {
        title,
        body,
        tags: Vec::new(),
    })
}

/// Last fenced JSON object in the text, if any.
pub fn last_json_fence(text: &str) -> Option<&str> {
    JSON_FENCE_RE
        .captures_iter(text)
        .last()
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

fn parse_json_fence(text: &str) -> Option<ParsedContent> {
    let fence = last_json_fence(text)?;
    let parsed: ParsedContent = serde_json::from_str(fence).ok()?;
    if parsed.title.is_empty() {
        return None;
    }
    Some(parsed)
}

fn parse_labeled(text: &str) -> Option<ParsedContent> {
    let title = TITLE_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())?;

    let tags = TAGS_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| extract_tags(m.as_str()))
        .unwrap_or_default();

    let body = text
        .lines()
        .filter(|line| !TITLE_RE.is_match(line) && !TAGS_RE.is_match(line))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string();

    Some(ParsedContent { title, body, tags })
}

fn extract_tags(line: &str) -> Vec<String> {
    TAG_TOKEN_RE
        .captures_iter(line)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}
