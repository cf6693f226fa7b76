use std::collections::HashMap;
use std::fs;
use std::sync::{Arc, Mutex};

use harvester_core::{FinishReason, UrlStatus};
use harvester_engine::{
    CrawlSettings, Crawler, DataDir, EmailRegistry, FailureKind, FetchError, FetchMetadata,
    FetchOutput, Fetcher, FrontierManager, PageParser, ScraperParser, LINKS_TABLE,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

/// Serves canned pages and records every requested URL.
#[derive(Default)]
struct SiteFetcher {
    pages: HashMap<String, Result<String, u16>>,
    requested: Mutex<Vec<String>>,
}

impl SiteFetcher {
    fn page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), Ok(html.to_string()));
        self
    }

    fn status(mut self, url: &str, code: u16) -> Self {
        self.pages.insert(url.to_string(), Err(code));
        self
    }

    fn requested(&self) -> Vec<String> {
        let mut urls = self.requested.lock().unwrap().clone();
        urls.sort();
        urls
    }
}

#[async_trait::async_trait]
impl Fetcher for SiteFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchOutput, FetchError> {
        self.requested.lock().unwrap().push(url.to_string());
        match self.pages.get(url) {
            Some(Ok(html)) => Ok(FetchOutput {
                bytes: html.as_bytes().to_vec(),
                metadata: FetchMetadata {
                    original_url: url.to_string(),
                    final_url: url.to_string(),
                    status: 200,
                    content_type: Some("text/html; charset=utf-8".to_string()),
                    byte_len: html.len() as u64,
                },
            }),
            Some(Err(code)) => Err(FetchError {
                kind: FailureKind::HttpStatus(*code),
                message: format!("status {code}"),
            }),
            None => Err(FetchError {
                kind: FailureKind::HttpStatus(404),
                message: "not found".to_string(),
            }),
        }
    }
}

struct Harness {
    _temp: TempDir,
    store: DataDir,
    frontier: Arc<FrontierManager>,
    registry: Arc<EmailRegistry>,
    fetcher: Arc<SiteFetcher>,
}

impl Harness {
    fn new(fetcher: SiteFetcher, seeds: &[&str]) -> Self {
        harvest_logging::initialize_for_tests();
        let temp = TempDir::new().unwrap();
        Self::in_dir(temp, fetcher, seeds)
    }

    fn in_dir(temp: TempDir, fetcher: SiteFetcher, seeds: &[&str]) -> Self {
        let store = DataDir::open(temp.path()).unwrap();
        let frontier = Arc::new(FrontierManager::load(store.clone(), 100_000).unwrap());
        frontier.seed(seeds.iter().copied());
        let registry = Arc::new(EmailRegistry::load(&store).unwrap());
        Self {
            _temp: temp,
            store,
            frontier,
            registry,
            fetcher: Arc::new(fetcher),
        }
    }

    fn crawler(&self, settings: CrawlSettings) -> Crawler {
        let fetcher: Arc<dyn Fetcher> = self.fetcher.clone();
        let parser: Arc<dyn PageParser> = Arc::new(ScraperParser::new());
        Crawler::new(
            self.frontier.clone(),
            self.registry.clone(),
            fetcher,
            parser,
            settings,
        )
    }
}

fn settings() -> CrawlSettings {
    CrawlSettings {
        workers: 4,
        checkpoint_every: 2,
        ..CrawlSettings::default()
    }
}

fn home_site() -> SiteFetcher {
    SiteFetcher::default()
        .page(
            "https://site.org/",
            r##"<html><body>
                <p>Write to info@site.org for details.</p>
                <a href="/about">About</a>
                <a href="report.pdf">Annual report</a>
                <a href="https://www.google.com/url?q=https://target.org/x&sa=U">Partner</a>
                <a href="mailto:Boss@site.org?subject=hi">Boss</a>
                <a href="tel:+123456">Call</a>
                <a href="https://www.facebook.com/site">Facebook</a>
                <a href="#top">Top</a>
            </body></html>"##,
        )
        .page(
            "https://site.org/about",
            r#"<html><body><a href="https://site.org/">Home</a> sales@site.org</body></html>"#,
        )
        .page("https://target.org/x", "<html><body>No links here</body></html>")
}

#[tokio::test]
async fn crawl_follows_links_and_collects_addresses() {
    let harness = Harness::new(home_site(), &["http://Site.org"]);
    let summary = harness.crawler(settings()).run().await.unwrap();

    assert_eq!(summary.reason, FinishReason::FrontierExhausted);
    assert_eq!(summary.totals.rounds, 2);
    assert_eq!(summary.totals.crawled, 3);
    assert_eq!(summary.pending, 0);
    assert_eq!(
        harness.fetcher.requested(),
        vec![
            "https://site.org/".to_string(),
            "https://site.org/about".to_string(),
            "https://target.org/x".to_string(),
        ]
    );

    assert!(harness.registry.contains("info@site.org"));
    assert!(harness.registry.contains("Boss@site.org"));
    assert!(harness.registry.contains("sales@site.org"));
    assert_eq!(summary.emails_known, 3);
    assert_eq!(harness.store.load_emails().unwrap().len(), 3);
}

#[tokio::test]
async fn crawl_never_records_media_or_disallowed_links() {
    let harness = Harness::new(home_site(), &["https://site.org/"]);
    harness.crawler(settings()).run().await.unwrap();

    assert_eq!(harness.frontier.status("https://site.org/report.pdf"), None);
    assert_eq!(harness.frontier.status("https://www.facebook.com/site"), None);
    assert_eq!(
        harness.frontier.status("https://target.org/x"),
        Some(UrlStatus::Crawled)
    );
}

#[tokio::test]
async fn failed_fetch_is_still_marked_crawled() {
    let fetcher = SiteFetcher::default()
        .page(
            "https://site.org/",
            r#"<a href="https://broken.org/">Broken</a>"#,
        )
        .status("https://broken.org/", 500);
    let harness = Harness::new(fetcher, &["https://site.org/"]);
    let summary = harness.crawler(settings()).run().await.unwrap();

    assert_eq!(summary.totals.failed, 1);
    assert_eq!(
        harness.frontier.status("https://broken.org/"),
        Some(UrlStatus::Crawled)
    );
    assert_eq!(summary.reason, FinishReason::FrontierExhausted);
}

#[tokio::test]
async fn frontier_table_is_checkpointed() {
    let harness = Harness::new(home_site(), &["https://site.org/"]);
    harness.crawler(settings()).run().await.unwrap();

    let raw = fs::read_to_string(harness.store.path(LINKS_TABLE)).unwrap();
    assert!(raw.starts_with("url,status\n"));
    let rows = harness.store.load_frontier().unwrap();
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|(_, status)| *status == UrlStatus::Crawled));
}

#[tokio::test]
async fn restart_resumes_from_checkpointed_frontier() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().to_path_buf();
    {
        let store = DataDir::open(&root).unwrap();
        store
            .save_frontier([
                ("https://site.org/", UrlStatus::Crawled),
                ("https://target.org/x", UrlStatus::Pending),
            ])
            .unwrap();
    }

    let harness = Harness::in_dir(temp, home_site(), &["https://site.org/"]);
    let summary = harness.crawler(settings()).run().await.unwrap();

    assert_eq!(
        harness.fetcher.requested(),
        vec!["https://target.org/x".to_string()]
    );
    assert_eq!(summary.totals.crawled, 1);
}

#[tokio::test]
async fn round_limit_leaves_discoveries_pending() {
    let harness = Harness::new(home_site(), &["https://site.org/"]);
    let summary = harness
        .crawler(CrawlSettings {
            max_rounds: Some(1),
            ..settings()
        })
        .run()
        .await
        .unwrap();

    assert_eq!(summary.reason, FinishReason::RoundLimit);
    assert_eq!(summary.totals.rounds, 1);
    assert_eq!(summary.pending, 2);
    let rows = harness.store.load_frontier().unwrap();
    assert_eq!(
        rows.iter()
            .filter(|(_, status)| *status == UrlStatus::Pending)
            .count(),
        2
    );
}

#[tokio::test]
async fn cancelled_crawl_dispatches_nothing() {
    let harness = Harness::new(home_site(), &["https://site.org/"]);
    let cancel = CancellationToken::new();
    cancel.cancel();
    let summary = harness
        .crawler(settings())
        .with_cancellation(cancel)
        .run()
        .await
        .unwrap();

    assert_eq!(summary.reason, FinishReason::Stopped);
    assert!(harness.fetcher.requested().is_empty());
    assert_eq!(
        harness.frontier.status("https://site.org/"),
        Some(UrlStatus::Pending)
    );
}

#[tokio::test]
async fn media_url_in_frontier_is_skipped_without_request() {
    let fetcher = SiteFetcher::default().page("https://site.org/a", "<p>plain page</p>");
    let harness = Harness::new(fetcher, &["https://site.org/Report.PDF", "https://site.org/a"]);
    let summary = harness.crawler(settings()).run().await.unwrap();

    assert_eq!(
        harness.fetcher.requested(),
        vec!["https://site.org/a".to_string()]
    );
    assert_eq!(
        harness.frontier.status("https://site.org/Report.PDF"),
        Some(UrlStatus::Crawled)
    );
    assert_eq!(summary.totals.skipped, 1);
    assert_eq!(summary.totals.crawled, 2);
}
