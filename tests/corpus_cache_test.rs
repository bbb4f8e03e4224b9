mod helpers;

use std::time::Duration;

use helpers::*;
use scribetwin::cache::{content_hash, DiskCache, CORPUS_NAMESPACE};
use scribetwin::corpus::{Corpus, CorpusProvider, RssCorpusProvider};
use scribetwin::retry::RetryPolicy;
use tempfile::TempDir;

/// Nothing listens on the discard port, so any real request fails fast.
const DEAD_FEED: &str = "http://127.0.0.1:9/feed.json";

fn provider(cache: Option<DiskCache>) -> RssCorpusProvider {
    RssCorpusProvider::new(Duration::from_secs(2), RetryPolicy::none(), cache).unwrap()
}

#[tokio::test]
async fn cached_corpus_is_served_without_a_request() {
    let tmp = TempDir::new().unwrap();
    let cache = DiskCache::new(tmp.path());
    let mut corpus = Corpus::new();
    corpus.push_text("zed", "z text");
    corpus.push_text("amy", "a text");
    assert!(cache.write(CORPUS_NAMESPACE, &content_hash(&[DEAD_FEED]), &corpus));

    let fetched = provider(Some(cache)).fetch(DEAD_FEED).await.unwrap();

    assert_eq!(fetched, corpus);
    assert_eq!(fetched.authors().collect::<Vec<_>>(), vec!["zed", "amy"]);
}

#[tokio::test]
async fn cache_file_is_named_by_url_hash() {
    let tmp = TempDir::new().unwrap();
    let cache = DiskCache::new(tmp.path());
    cache.write(CORPUS_NAMESPACE, &content_hash(&[DEAD_FEED]), &two_author_corpus());

    let expected = tmp
        .path()
        .join(format!("rss_{}.json", content_hash(&[DEAD_FEED])));
    assert!(expected.exists());

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(expected).unwrap()).unwrap();
    assert_eq!(raw["ann"], ann_text());
    assert_eq!(raw["bob"], bob_text());
}

#[tokio::test]
async fn unreachable_feed_is_a_network_error() {
    let err = provider(None).fetch(DEAD_FEED).await.unwrap_err();
    assert_eq!(err.kind(), "NetworkError");
}

#[tokio::test]
async fn corrupt_cache_entry_falls_through_to_the_network() {
    let tmp = TempDir::new().unwrap();
    let cache = DiskCache::new(tmp.path());
    std::fs::write(
        cache.path_for(CORPUS_NAMESPACE, &content_hash(&[DEAD_FEED])),
        "{not json",
    )
    .unwrap();

    let err = provider(Some(cache)).fetch(DEAD_FEED).await.unwrap_err();
    assert_eq!(err.kind(), "NetworkError");
}
