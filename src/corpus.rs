//! Author corpora and where they come from.
//!
//! A [`Corpus`] maps author ids to the concatenation of everything they wrote. Author
//! order is the order of first appearance and is preserved through caching, so
//! centroid iteration (and closest-author tie-breaking) is reproducible.
//!
//! [`RssCorpusProvider`] builds a corpus from an rss2json-style feed: a JSON object
//! with an `items` array whose entries carry `author` and HTML `content`.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use scraper::Html;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::cache::{content_hash, DiskCache, CORPUS_NAMESPACE};
use crate::error::{Result, StyleError};
use crate::retry::{send_with_retry, RetryPolicy};

/// Items shorter than this after HTML cleaning are skipped.
const MIN_ITEM_CHARS: usize = 50;
/// Items longer than this are truncated.
const MAX_ITEM_CHARS: usize = 50_000;
const UNKNOWN_AUTHOR: &str = "unknown_author";

/// Ordered `author_id -> text` mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Corpus {
    entries: Vec<(String, String)>,
}

impl Corpus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append text to an author, joining with a blank line. New authors go to the end.
    pub fn push_text(&mut self, author: &str, text: &str) {
        match self.entries.iter_mut().find(|(a, _)| a == author) {
            Some((_, existing)) => {
                existing.push_str("\n\n");
                existing.push_str(text);
            }
            None => self.entries.push((author.to_string(), text.to_string())),
        }
    }

    pub fn get(&self, author: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(a, _)| a == author)
            .map(|(_, text)| text.as_str())
    }

    pub fn authors(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(a, _)| a.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(a, t)| (a.as_str(), t.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<A: AsRef<str>, T: AsRef<str>> FromIterator<(A, T)> for Corpus {
    fn from_iter<I: IntoIterator<Item = (A, T)>>(iter: I) -> Self {
        let mut corpus = Corpus::new();
        for (author, text) in iter {
            corpus.push_text(author.as_ref(), text.as_ref());
        }
        corpus
    }
}

impl Serialize for Corpus {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(self.entries.iter().map(|(a, t)| (a, t)))
    }
}

impl<'de> Deserialize<'de> for Corpus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct CorpusVisitor;

        impl<'de> Visitor<'de> for CorpusVisitor {
            type Value = Corpus;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of author id to text")
            }

            fn visit_map<M: MapAccess<'de>>(self, mut access: M) -> std::result::Result<Corpus, M::Error> {
                let mut corpus = Corpus::new();
                while let Some((author, text)) = access.next_entry::<String, String>()? {
                    corpus.push_text(&author, &text);
                }
                Ok(corpus)
            }
        }

        deserializer.deserialize_map(CorpusVisitor)
    }
}

/// Source of author corpora.
#[async_trait]
pub trait CorpusProvider: Send + Sync {
    /// Fetch the corpus behind `url`.
    ///
    /// Transport failures are [`StyleError::Network`]; malformed or empty payloads are
    /// [`StyleError::Validation`].
    async fn fetch(&self, url: &str) -> Result<Corpus>;
}

/// Fetches rss2json-style feeds over HTTP, with an optional on-disk cache keyed by URL.
pub struct RssCorpusProvider {
    client: reqwest::Client,
    retry: RetryPolicy,
    timeout: Duration,
    cache: Option<DiskCache>,
}

impl RssCorpusProvider {
    pub fn new(timeout: Duration, retry: RetryPolicy, cache: Option<DiskCache>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StyleError::Configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            retry,
            timeout,
            cache,
        })
    }

    pub fn from_config(config: &crate::config::ScribeConfig) -> Result<Self> {
        let cache = config
            .cache
            .enabled
            .then(|| DiskCache::new(config.resolved_cache_dir()));
        Self::new(
            config.network.request_timeout(),
            RetryPolicy::from_config(&config.network),
            cache,
        )
    }
}

#[async_trait]
impl CorpusProvider for RssCorpusProvider {
    async fn fetch(&self, url: &str) -> Result<Corpus> {
        let key = content_hash(&[url]);
        if let Some(cache) = &self.cache {
            if let Some(corpus) = cache.read::<Corpus>(CORPUS_NAMESPACE, &key) {
                tracing::info!(url, authors = corpus.len(), "loaded author corpus from cache");
                return Ok(corpus);
            }
        }

        tracing::info!(url, timeout_secs = self.timeout.as_secs(), "fetching feed");
        let response = send_with_retry(&self.retry, "feed fetch", || self.client.get(url)).await?;
        let body = response
            .text()
            .await
            .map_err(|e| StyleError::Network(format!("failed to read feed body: {e}")))?;
        let payload: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| StyleError::Validation(format!("feed returned invalid JSON: {e}")))?;

        let corpus = corpus_from_feed(&payload)?;

        if let Some(cache) = &self.cache {
            if cache.write(CORPUS_NAMESPACE, &key, &corpus) {
                tracing::info!(path = %cache.path_for(CORPUS_NAMESPACE, &key).display(), "cached author corpus");
            }
        }
        Ok(corpus)
    }
}

/// Check the feed envelope: an object whose `items` is a non-empty list.
pub fn validate_feed(payload: &serde_json::Value) -> Result<&Vec<serde_json::Value>> {
    let object = payload
        .as_object()
        .ok_or_else(|| StyleError::Validation("feed payload must be a JSON object".into()))?;
    let items = object
        .get("items")
        .ok_or_else(|| StyleError::Validation("feed payload missing 'items' field".into()))?;
    let items = items
        .as_array()
        .ok_or_else(|| StyleError::Validation("feed 'items' must be a list".into()))?;
    if items.is_empty() {
        return Err(StyleError::Validation("feed contains no items".into()));
    }
    tracing::info!(items = items.len(), "feed validated");
    Ok(items)
}

/// Turn a validated feed into a corpus, one concatenated text per author.
pub fn corpus_from_feed(payload: &serde_json::Value) -> Result<Corpus> {
    let items = validate_feed(payload)?;
    let mut corpus = Corpus::new();
    let mut kept = 0usize;

    for item in items {
        let author = item
            .get("author")
            .and_then(|a| a.as_str())
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .unwrap_or(UNKNOWN_AUTHOR);

        let html = ["content", "content:encoded", "description"]
            .iter()
            .filter_map(|field| item.get(*field).and_then(|v| v.as_str()))
            .find(|s| !s.is_empty())
            .unwrap_or("");

        let mut text = clean_html(html);
        if text.chars().count() < MIN_ITEM_CHARS {
            continue;
        }
        if let Some((cut, _)) = text.char_indices().nth(MAX_ITEM_CHARS) {
            text.truncate(cut);
            tracing::warn!(author, "truncated oversized feed item");
        }

        corpus.push_text(author, &text);
        kept += 1;
    }

    if corpus.is_empty() {
        return Err(StyleError::Validation(
            "no usable blog content extracted from feed".into(),
        ));
    }
    tracing::info!(items = kept, authors = corpus.len(), "built author corpus");
    Ok(corpus)
}

const NON_CONTENT_TAGS: [&str; 5] = ["script", "style", "meta", "link", "noscript"];

/// Strip markup from feed HTML and collapse whitespace.
///
/// Text inside script, style, meta, link and noscript elements is dropped. Remaining
/// text nodes are trimmed and joined with single spaces; entities are decoded by the
/// parser.
pub fn clean_html(html: &str) -> String {
    if html.is_empty() {
        return String::new();
    }
    let fragment = Html::parse_fragment(html);
    let pieces: Vec<&str> = fragment
        .root_element()
        .descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let hidden = node.ancestors().any(|ancestor| {
                ancestor
                    .value()
                    .as_element()
                    .is_some_and(|element| NON_CONTENT_TAGS.contains(&element.name()))
            });
            (!hidden).then(|| text.trim())
        })
        .filter(|piece| !piece.is_empty())
        .collect();
    pieces.join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}
