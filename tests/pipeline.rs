//! End-to-end checks of scraping and ranking with in-memory collaborators.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use job_matcher::config::Config;
use job_matcher::descriptions::DescriptionFetcher;
use job_matcher::error::{LlmError, MatchError};
use job_matcher::job_matcher::JobMatcher;
use job_matcher::llm::LlmClient;
use job_matcher::models::{JobRecord, ParamValue, SearchParams};
use job_matcher::page_data::RenderedPage;
use job_matcher::traits::{PageFetcher, PageSession};

const SEARCH_URL: &str = "https://jobs.example.com/job/search";

/// Serves canned pages by URL and records every URL it was asked for.
#[derive(Default)]
struct FakeFetcher {
    pages: HashMap<String, String>,
    requested: Arc<Mutex<Vec<String>>>,
    sessions: AtomicUsize,
}

impl FakeFetcher {
    fn with_page(mut self, url: &str, document: &Value) -> Self {
        let encoded = STANDARD.encode(document.to_string());
        self.pages.insert(
            url.to_string(),
            format!("<html><head><script>var x = 1;</script><script>{encoded}</script></head></html>"),
        );
        self
    }

    fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

struct FakeSession {
    pages: HashMap<String, String>,
    requested: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl PageFetcher for FakeFetcher {
    async fn open_session(&self) -> Result<Box<dyn PageSession>> {
        self.sessions.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSession {
            pages: self.pages.clone(),
            requested: self.requested.clone(),
        }))
    }
}

#[async_trait]
impl PageSession for FakeSession {
    async fn fetch(&mut self, url: &str) -> Result<RenderedPage> {
        self.requested.lock().unwrap().push(url.to_string());
        let html = self
            .pages
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no page for {url}"))?;
        Ok(RenderedPage::new(url, html))
    }

    async fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

/// Returns a fixed reply and counts calls.
struct FakeLlm {
    reply: String,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl FakeLlm {
    fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl LlmClient for FakeLlm {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, LlmError> {
        assert_eq!(max_tokens, 16_000);
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.reply.clone())
    }
}

fn listing_page(last_page: u64, titles: &[&str]) -> Value {
    let docs: Vec<Value> = titles
        .iter()
        .map(|title| {
            json!({
                "type": "job",
                "id": title.to_lowercase().replace(' ', "-"),
                "job_title": title,
                "company_name": "Acme",
                "location": "Oslo"
            })
        })
        .collect();

    json!({"queries": [{"state": {"data": {
        "metadata": {"paging": {"last": last_page}},
        "docs": docs
    }}}]})
}

fn test_config() -> Config {
    Config {
        listing_search_url: SEARCH_URL.to_string(),
        job_ad_url_prefix: "https://jobs.example.com/job/ad/".to_string(),
        settle_delay: Duration::ZERO,
        ..Config::default()
    }
}

fn matcher(fetcher: Arc<FakeFetcher>, llm: Arc<FakeLlm>) -> JobMatcher {
    let descriptions = DescriptionFetcher::new(Duration::from_secs(2), 8).unwrap();
    JobMatcher::new(&test_config(), fetcher, descriptions, llm)
}

fn job(i: usize, url: String) -> JobRecord {
    JobRecord {
        title: format!("Job {i}"),
        employer: "Acme".to_string(),
        location: "Trondheim".to_string(),
        url,
        deadline: None,
        published: None,
    }
}

#[tokio::test]
async fn scrape_walks_every_page_in_order() {
    let base = format!("{SEARCH_URL}?q=rust");
    let fetcher = Arc::new(
        FakeFetcher::default()
            .with_page(&base, &listing_page(3, &["A1", "A2"]))
            .with_page(&format!("{base}&page=2"), &listing_page(3, &["B1"]))
            .with_page(&format!("{base}&page=3"), &listing_page(3, &["C1", "C2"])),
    );
    let matcher = matcher(fetcher.clone(), Arc::new(FakeLlm::new("[]")));

    let mut params = SearchParams::new();
    params.insert("q".to_string(), ParamValue::from("rust"));
    let jobs = matcher.scrape_listing(&params).await.unwrap();

    let titles: Vec<&str> = jobs.iter().map(|j| j.title.as_str()).collect();
    assert_eq!(titles, ["A1", "A2", "B1", "C1", "C2"]);
    assert_eq!(jobs[2].url, "https://jobs.example.com/job/ad/b1");
    assert_eq!(
        fetcher.requested(),
        vec![base.clone(), format!("{base}&page=2"), format!("{base}&page=3")]
    );
    assert_eq!(fetcher.sessions.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn scrape_without_params_uses_question_mark_for_pages() {
    let fetcher = Arc::new(
        FakeFetcher::default()
            .with_page(SEARCH_URL, &listing_page(2, &["A"]))
            .with_page(&format!("{SEARCH_URL}?page=2"), &listing_page(2, &["B"])),
    );
    let matcher = matcher(fetcher.clone(), Arc::new(FakeLlm::new("[]")));

    let jobs = matcher.scrape_listing(&SearchParams::new()).await.unwrap();

    assert_eq!(jobs.len(), 2);
    assert_eq!(fetcher.requested().len(), 2);
}

#[tokio::test]
async fn failing_page_fails_the_whole_scrape() {
    let fetcher = Arc::new(
        FakeFetcher::default().with_page(SEARCH_URL, &listing_page(3, &["A"])),
    );
    let matcher = matcher(fetcher.clone(), Arc::new(FakeLlm::new("[]")));

    let err = matcher.scrape_listing(&SearchParams::new()).await.unwrap_err();

    assert!(matches!(err, MatchError::Fetch(_)));
    assert_eq!(fetcher.requested().len(), 2);
}

#[tokio::test]
async fn filter_catalog_is_fetched_once() {
    let document = json!({"queries": [{"state": {"data": {"filters": [
        {"name": "industry", "filter_items": [{"display_name": "IT", "value": "65"}]}
    ]}}}]});
    let fetcher = Arc::new(FakeFetcher::default().with_page(SEARCH_URL, &document));
    let matcher = matcher(fetcher.clone(), Arc::new(FakeLlm::new("[]")));

    let first = matcher.get_filter_catalog().await.unwrap();
    let second = matcher.clone().get_filter_catalog().await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first["industry"][0].label, "IT");
    assert_eq!(fetcher.requested().len(), 1);
}

#[tokio::test]
async fn analyze_ranks_and_sorts_by_score() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ad/0"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<article><h1>Job 0</h1><p>Rust backend work</p></article>"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ad/1"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let reply = r#"Sure! ```json
[{"job_index": 1, "match_score": 35, "summary": "Little overlap"},
 {"job_index": 2, "match_score": 99, "summary": "Does not exist"},
 {"job_index": 0, "match_score": 88, "summary": "Strong Rust match"}]
```"#;
    let llm = Arc::new(FakeLlm::new(reply));
    let matcher = matcher(Arc::new(FakeFetcher::default()), llm.clone());
    matcher.profile().set_cv("Rust developer, 8 years".to_string()).await;

    let jobs = vec![
        job(0, format!("{}/ad/0", server.uri())),
        job(1, format!("{}/ad/1", server.uri())),
    ];
    let results = matcher.analyze(&jobs).await.unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].job.title, "Job 0");
    assert_eq!(results[0].match_score, 88);
    assert_eq!(results[1].summary, "Little overlap");
    assert!(results.windows(2).all(|w| w[0].match_score >= w[1].match_score));

    let prompts = llm.prompts.lock().unwrap();
    assert!(prompts[0].contains("Rust developer, 8 years"));
    assert!(prompts[0].contains("Rust backend work"));
    assert!(!prompts[0].contains("cover letter"));
}

#[tokio::test]
async fn analyze_rejects_oversized_batch_without_calling_llm() {
    let llm = Arc::new(FakeLlm::new("[]"));
    let matcher = matcher(Arc::new(FakeFetcher::default()), llm.clone());
    matcher.profile().set_cv("CV".to_string()).await;

    let jobs: Vec<JobRecord> = (0..151)
        .map(|i| job(i, format!("not-a-url/{i}")))
        .collect();
    let err = matcher.analyze(&jobs).await.unwrap_err();

    assert!(matches!(err, MatchError::TooManyJobs { count: 151, max: 150 }));
    assert!(err.is_client_error());
    assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn analyze_requires_cv_and_jobs() {
    let llm = Arc::new(FakeLlm::new("[]"));
    let matcher = matcher(Arc::new(FakeFetcher::default()), llm.clone());

    let jobs = vec![job(0, "not-a-url/0".to_string())];
    assert!(matches!(
        matcher.analyze(&jobs).await,
        Err(MatchError::NoProfile)
    ));

    matcher.profile().set_cv("CV".to_string()).await;
    assert!(matches!(
        matcher.analyze(&[]).await,
        Err(MatchError::EmptyBatch)
    ));
    assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn unparseable_reply_surfaces_ranking_error() {
    let llm = Arc::new(FakeLlm::new("I cannot help with that."));
    let matcher = matcher(Arc::new(FakeFetcher::default()), llm.clone());
    matcher.profile().set_cv("CV".to_string()).await;

    let err = matcher
        .analyze(&[job(0, "not-a-url/0".to_string())])
        .await
        .unwrap_err();

    match err {
        MatchError::RankingParse { preview } => assert_eq!(preview, "I cannot help with that."),
        other => panic!("expected RankingParse, got {other:?}"),
    }
    assert_eq!(llm.calls.load(Ordering::SeqCst), 1);
}
