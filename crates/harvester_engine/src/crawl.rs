//! Fetch-and-extract workers and the round-based driver around the pure
//! supervisor state machine in `harvester_core`.
use std::collections::{BTreeSet, HashSet, VecDeque};
use std::sync::Arc;

use futures_util::stream::{self, StreamExt};
use harvest_logging::{harvest_debug, harvest_error, harvest_info, harvest_warn};
use harvester_core::{
    address_from_mailto, extract_emails, is_disallowed_host, is_media_or_document,
    is_search_engine_url, is_web_url, resolve, update, CrawlState, CrawlTotals, Effect,
    FinishReason, Msg,
};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::decode::decode_html;
use crate::extract::{PageParser, ParsedPage, ScraperParser};
use crate::fetch::{FetchSettings, Fetcher, ReqwestFetcher};
use crate::frontier::{FrontierManager, MarkCrawledOnDrop};
use crate::persist::{DataDir, PersistError};
use crate::registry::EmailRegistry;
use crate::{FailureKind, FetchError, UnitOutcome};

#[derive(Debug, Clone)]
pub struct CrawlSettings {
    /// Concurrent fetch-and-extract units per round.
    pub workers: usize,
    /// Completed units between mid-round checkpoints; 0 disables them.
    pub checkpoint_every: usize,
    /// Retention ceiling for the frontier table.
    pub max_links: usize,
    /// Hard cap on rounds; `None` runs until the frontier is exhausted.
    pub max_rounds: Option<u32>,
    pub fetch: FetchSettings,
    pub seeds: Vec<String>,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            workers: 40,
            checkpoint_every: 40,
            max_links: 100_000,
            max_rounds: None,
            fetch: FetchSettings::default(),
            seeds: Vec::new(),
        }
    }
}

#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("persistence failed: {0}")]
    Persist(#[from] PersistError),
    #[error("could not build http client: {0}")]
    Client(#[from] FetchError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlSummary {
    pub reason: FinishReason,
    pub totals: CrawlTotals,
    pub frontier_size: usize,
    pub pending: usize,
    pub emails_known: usize,
}

/// Links and addresses found on one page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageHarvest {
    pub links: Vec<String>,
    pub emails: BTreeSet<String>,
}

/// Filter a parsed page into crawlable links and email addresses.
///
/// Links are resolved against `page_url`; disallowed hosts, media and
/// non-web references are dropped, and on a search-engine page so is
/// anything still on a search engine.
pub fn harvest_page(page_url: &str, page: &ParsedPage) -> PageHarvest {
    let on_search_engine = is_search_engine_url(page_url);
    let mut harvest = PageHarvest::default();
    let mut seen = HashSet::new();

    for href in &page.anchors {
        if let Some(address) = address_from_mailto(href) {
            harvest.emails.insert(address);
            continue;
        }
        if href.starts_with('#') || has_non_web_scheme(href) {
            continue;
        }
        let Some(link) = resolve(href, page_url) else {
            continue;
        };
        if !is_web_url(&link) || is_disallowed_host(&link) || is_media_or_document(&link) {
            continue;
        }
        if on_search_engine && is_search_engine_url(&link) {
            continue;
        }
        if seen.insert(link.clone()) {
            harvest.links.push(link);
        }
    }

    harvest.emails.extend(extract_emails(&page.text));
    harvest
}

fn has_non_web_scheme(href: &str) -> bool {
    const SCHEMES: [&str; 5] = ["mailto:", "tel:", "javascript:", "data:", "sms:"];
    let lower = href.trim_start().to_ascii_lowercase();
    SCHEMES.iter().any(|scheme| lower.starts_with(scheme))
}

/// One fetch-and-extract unit of work.
pub struct CrawlWorker {
    frontier: Arc<FrontierManager>,
    registry: Arc<EmailRegistry>,
    fetcher: Arc<dyn Fetcher>,
    parser: Arc<dyn PageParser>,
}

impl CrawlWorker {
    pub fn new(
        frontier: Arc<FrontierManager>,
        registry: Arc<EmailRegistry>,
        fetcher: Arc<dyn Fetcher>,
        parser: Arc<dyn PageParser>,
    ) -> Self {
        Self {
            frontier,
            registry,
            fetcher,
            parser,
        }
    }

    /// Crawl `url` once. The URL is marked Crawled however this returns,
    /// unless the unit is cancelled before it starts.
    ///
    /// Only a failed write to the email table is returned as an error.
    pub async fn crawl(
        &self,
        url: String,
        cancel: &CancellationToken,
    ) -> Result<UnitOutcome, PersistError> {
        if cancel.is_cancelled() {
            return Ok(UnitOutcome::Cancelled { url });
        }
        let _crawled = MarkCrawledOnDrop::new(&self.frontier, &url);

        if is_media_or_document(&url) {
            harvest_debug!("Skipping media or document {}", url);
            return Ok(UnitOutcome::Skipped { url: url.clone() });
        }

        let output = match self.fetcher.fetch(&url).await {
            Ok(output) => output,
            Err(err) => {
                harvest_warn!("Failed to fetch {}: {}", url, err);
                return Ok(UnitOutcome::Failed {
                    url: url.clone(),
                    kind: err.kind,
                });
            }
        };

        let decoded = decode_html(&output.bytes, output.metadata.content_type.as_deref());
        let page = self.parser.parse(&decoded.html);
        let harvest = harvest_page(&output.metadata.final_url, &page);

        let mut new_emails = 0;
        for address in &harvest.emails {
            if self.registry.add(address)? {
                harvest_debug!("New email {} on {}", address, url);
                new_emails += 1;
            }
        }

        let mut new_links = 0;
        for link in &harvest.links {
            if self.frontier.record_discovery(link) {
                harvest_debug!("New link {}", link);
                new_links += 1;
            }
        }

        Ok(UnitOutcome::Harvested {
            url: url.clone(),
            new_links,
            new_emails,
        })
    }
}

/// Drives crawl rounds until the frontier is exhausted, the round cap is
/// hit, or the cancellation token fires.
pub struct Crawler {
    worker: Arc<CrawlWorker>,
    frontier: Arc<FrontierManager>,
    registry: Arc<EmailRegistry>,
    settings: CrawlSettings,
    cancel: CancellationToken,
}

impl Crawler {
    pub fn new(
        frontier: Arc<FrontierManager>,
        registry: Arc<EmailRegistry>,
        fetcher: Arc<dyn Fetcher>,
        parser: Arc<dyn PageParser>,
        settings: CrawlSettings,
    ) -> Self {
        let worker = Arc::new(CrawlWorker::new(
            frontier.clone(),
            registry.clone(),
            fetcher,
            parser,
        ));
        Self {
            worker,
            frontier,
            registry,
            settings,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub async fn run(&self) -> Result<CrawlSummary, CrawlError> {
        let mut state = CrawlState::new(self.settings.checkpoint_every, self.settings.max_rounds);
        let mut queue = VecDeque::new();
        apply(&mut state, Msg::Start, &mut queue);

        while let Some(effect) = queue.pop_front() {
            match effect {
                Effect::ClaimPending => {
                    self.observe_cancel(&mut state, &mut queue);
                    let urls = self.frontier.claim_pending();
                    harvest_info!(
                        "Claimed {} pending urls (frontier size {})",
                        urls.len(),
                        self.frontier.size()
                    );
                    apply(&mut state, Msg::BatchClaimed { urls }, &mut queue);
                }
                Effect::Dispatch { round, urls } => {
                    self.run_round(&mut state, round, urls, &mut queue).await?;
                }
                Effect::Checkpoint { round_end } => {
                    self.checkpoint(round_end)?;
                    apply(&mut state, Msg::CheckpointWritten, &mut queue);
                }
                Effect::Finish { reason } => {
                    return Ok(self.summary(reason, state.totals()));
                }
            }
        }

        // The state machine always ends on Finish; reaching here means it
        // stalled, which is reported as a stop.
        Ok(self.summary(FinishReason::Stopped, state.totals()))
    }

    async fn run_round(
        &self,
        state: &mut CrawlState,
        round: u32,
        urls: Vec<String>,
        queue: &mut VecDeque<Effect>,
    ) -> Result<(), CrawlError> {
        harvest_info!(
            "Round {} started: {} urls, {} workers",
            round,
            urls.len(),
            self.settings.workers
        );

        let mut units = stream::iter(urls.into_iter().map(|url| {
            let worker = Arc::clone(&self.worker);
            let cancel = self.cancel.clone();
            async move {
                let task_url = url.clone();
                let handle =
                    tokio::spawn(async move { worker.crawl(task_url, &cancel).await });
                match handle.await {
                    Ok(result) => result,
                    Err(err) => {
                        harvest_error!("Worker for {} aborted: {}", url, err);
                        Ok(UnitOutcome::Failed {
                            url,
                            kind: FailureKind::Aborted,
                        })
                    }
                }
            }
        }))
        .buffer_unordered(self.settings.workers.max(1));

        let mut local = VecDeque::new();
        while let Some(result) = units.next().await {
            let outcome = result?;
            self.observe_cancel(state, &mut local);
            apply(state, Msg::UnitFinished(outcome.report()), &mut local);
            while let Some(effect) = local.pop_front() {
                match effect {
                    Effect::Checkpoint { round_end: false } => {
                        self.checkpoint(false)?;
                        apply(state, Msg::CheckpointWritten, &mut local);
                    }
                    other => queue.push_back(other),
                }
            }
        }

        let totals = state.totals();
        harvest_info!(
            "Round {} drained: {} crawled so far, {} failed, {} new links, {} new emails",
            round,
            totals.crawled,
            totals.failed,
            totals.new_links,
            totals.new_emails
        );
        apply(state, Msg::RoundDrained, queue);
        Ok(())
    }

    fn checkpoint(&self, round_end: bool) -> Result<(), PersistError> {
        match self.frontier.checkpoint() {
            Ok(stats) => {
                harvest_info!(
                    "Checkpoint{}: {} urls, {} pending, {} pruned",
                    if round_end { " (round end)" } else { "" },
                    stats.size,
                    stats.pending,
                    stats.pruned
                );
                Ok(())
            }
            Err(err) => {
                harvest_error!("Frontier checkpoint failed: {}", err);
                Err(err)
            }
        }
    }

    fn observe_cancel(&self, state: &mut CrawlState, queue: &mut VecDeque<Effect>) {
        if self.cancel.is_cancelled() {
            apply(state, Msg::StopRequested, queue);
        }
    }

    fn summary(&self, reason: FinishReason, totals: CrawlTotals) -> CrawlSummary {
        CrawlSummary {
            reason,
            totals,
            frontier_size: self.frontier.size(),
            pending: self.frontier.pending_count(),
            emails_known: self.registry.len(),
        }
    }
}

fn apply(state: &mut CrawlState, msg: Msg, queue: &mut VecDeque<Effect>) {
    let (next, effects) = update(std::mem::take(state), msg);
    *state = next;
    queue.extend(effects);
}

/// Load persisted state from `store`, seed it, and crawl to completion with
/// the reqwest fetcher and scraper parser.
pub async fn run_crawl(
    store: DataDir,
    settings: CrawlSettings,
    cancel: CancellationToken,
) -> Result<CrawlSummary, CrawlError> {
    let frontier = Arc::new(FrontierManager::load(store.clone(), settings.max_links)?);
    let seeded = frontier.seed(&settings.seeds);
    if seeded > 0 {
        harvest_info!("Seeded {} new urls", seeded);
    }
    let registry = Arc::new(EmailRegistry::load(&store)?);
    let fetcher: Arc<dyn Fetcher> = Arc::new(ReqwestFetcher::new(settings.fetch.clone())?);
    let parser: Arc<dyn PageParser> = Arc::new(ScraperParser::new());

    Crawler::new(frontier, registry, fetcher, parser, settings)
        .with_cancellation(cancel)
        .run()
        .await
}
