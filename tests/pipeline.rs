// tests/pipeline.rs
//
// Orchestration tests with in-process fetchers and completion services (no network).

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use aura_intel::analyze::completion::{CompletionError, CompletionService, MockProvider};
use aura_intel::ingest::{analyze_page, run_analysis, FetchOutcome, Fetcher};
use aura_intel::UserProfile;
use serde_json::json;

/// Serves canned pages; unknown URLs fail. Tracks peak in-flight fetches.
struct MapFetcher {
    pages: HashMap<String, String>,
    delay: Duration,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    log: Mutex<Vec<String>>,
}

impl MapFetcher {
    fn new(pages: &[(&str, &str)], delay: Duration) -> Self {
        Self {
            pages: pages
                .iter()
                .map(|(u, m)| (u.to_string(), m.to_string()))
                .collect(),
            delay,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            log: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Fetcher for MapFetcher {
    async fn fetch(&self, url: &str) -> FetchOutcome {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.log.lock().unwrap().push(url.to_string());
        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.pages.get(url) {
            Some(markup) => FetchOutcome::Page {
                url: url.to_string(),
                markup: markup.clone(),
            },
            None => FetchOutcome::Failed {
                url: url.to_string(),
                error: "connection refused".to_string(),
            },
        }
    }

    fn name(&self) -> &'static str {
        "map"
    }
}

/// Answers based on the prompt content so each page gets a distinct result.
struct KeywordCompletion;

#[async_trait]
impl CompletionService for KeywordCompletion {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        if prompt.contains("explode") {
            return Err(CompletionError::Status(500));
        }
        if prompt.contains("Inflation") {
            return Ok("Here you go:\n```json\n{\"news\": [{\"title\": \"Inflation rises\", \"summary\": \"CPI up\"}], \"opportunities\": [], \"threats\": [], \"confidence\": \"high\"}\n```".to_string());
        }
        Ok("Sorry, nothing relevant.".to_string())
    }

    fn provider_name(&self) -> &'static str {
        "keyword"
    }
}

fn profile() -> UserProfile {
    UserProfile::from(json!({ "interests": ["inflation"] }))
}

fn urls(xs: &[&str]) -> Vec<String> {
    xs.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn one_record_per_url_with_failures_inline() {
    let fetcher = Arc::new(MapFetcher::new(
        &[
            ("https://a", "<title>A</title><p>Inflation hits 7%</p>"),
            ("https://c", "<title>C</title><p>Football scores</p>"),
            ("https://d", "<p>explode</p>"),
        ],
        Duration::ZERO,
    ));
    let targets = urls(&["https://a", "https://b", "https://c", "https://d"]);

    let records = run_analysis(
        fetcher.clone(),
        Arc::new(KeywordCompletion),
        &profile(),
        &targets,
        1,
    )
    .await;

    assert_eq!(records.len(), 4);
    let got: Vec<_> = records.iter().map(|r| r.url.as_str()).collect();
    assert_eq!(got, vec!["https://a", "https://b", "https://c", "https://d"]);

    // parsed page
    assert_eq!(records[0].title.as_deref(), Some("A"));
    assert!(records[0].error.is_none());
    assert_eq!(records[0].items.news.len(), 1);
    assert_eq!(records[0].extra.get("confidence"), Some(&json!("high")));

    // fetch failure
    assert_eq!(records[1].error.as_deref(), Some("connection refused"));
    assert!(records[1].items.is_empty());

    // unparseable answer degrades to empty, not an error
    assert!(records[2].error.is_none());
    assert_eq!(records[2].title.as_deref(), Some("C"));
    assert!(records[2].items.is_empty());

    // completion failure is isolated to its page
    assert!(records[3].error.as_deref().unwrap().contains("500"));
    assert!(records[3].items.is_empty());

    // sequential baseline: fetches never overlap and follow URL order
    assert_eq!(fetcher.peak.load(Ordering::SeqCst), 1);
    assert_eq!(*fetcher.log.lock().unwrap(), targets);
}

#[tokio::test]
async fn bounded_pool_preserves_order_and_limit() {
    let pages: Vec<(String, String)> = (0..6)
        .map(|i| (format!("https://p{i}"), format!("<title>P{i}</title><p>Inflation {i}</p>")))
        .collect();
    let page_refs: Vec<(&str, &str)> = pages.iter().map(|(u, m)| (u.as_str(), m.as_str())).collect();
    let fetcher = Arc::new(MapFetcher::new(&page_refs, Duration::from_millis(20)));
    let targets: Vec<String> = pages.iter().map(|(u, _)| u.clone()).collect();

    let records = run_analysis(
        fetcher.clone(),
        Arc::new(KeywordCompletion),
        &profile(),
        &targets,
        2,
    )
    .await;

    let got: Vec<_> = records.iter().map(|r| r.url.clone()).collect();
    assert_eq!(got, targets);
    assert!(records.iter().all(|r| r.items.news.len() == 1));
    let titles: Vec<_> = records.iter().map(|r| r.title.clone().unwrap()).collect();
    assert_eq!(titles, vec!["P0", "P1", "P2", "P3", "P4", "P5"]);
    assert!(fetcher.peak.load(Ordering::SeqCst) <= 2);
}

#[tokio::test]
async fn empty_target_list_yields_no_records() {
    let fetcher = Arc::new(MapFetcher::new(&[], Duration::ZERO));
    let records = run_analysis(fetcher, Arc::new(KeywordCompletion), &profile(), &[], 3).await;
    assert!(records.is_empty());
}

#[tokio::test]
async fn analyze_page_with_mock_provider_gives_empty_categories() {
    let mock = MockProvider::empty_analysis();
    let rec = analyze_page(&mock, &profile(), "https://m", "<title>M</title>body").await;
    assert_eq!(rec.url, "https://m");
    assert_eq!(rec.title.as_deref(), Some("M"));
    assert!(rec.error.is_none());
    assert!(rec.items.is_empty());
}
