use std::sync::{Mutex, MutexGuard, PoisonError};

use harvest_logging::{harvest_debug, harvest_info};
use harvester_core::{is_web_url, normalize, Frontier, UrlStatus};

use crate::persist::{DataDir, PersistError};

/// Size of the frontier after a checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckpointStats {
    pub size: usize,
    pub pending: usize,
    pub pruned: usize,
}

/// Lock-guarded owner of the crawl frontier and its durable table.
///
/// Every read-modify-write goes through one mutex; checkpoints write the
/// table while holding it.
#[derive(Debug)]
pub struct FrontierManager {
    inner: Mutex<Frontier>,
    store: DataDir,
    max_links: usize,
}

impl FrontierManager {
    /// Load the frontier table from `store`; a missing table starts empty.
    pub fn load(store: DataDir, max_links: usize) -> Result<Self, PersistError> {
        let frontier = Frontier::from_records(store.load_frontier()?);
        harvest_info!(
            "Loaded frontier from {:?}: {} urls, {} pending",
            store.root(),
            frontier.len(),
            frontier.pending_count()
        );
        Ok(Self {
            inner: Mutex::new(frontier),
            store,
            max_links,
        })
    }

    /// Normalize and record seed URLs. Non-web seeds are ignored.
    pub fn seed<I, S>(&self, seeds: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut frontier = self.lock();
        let mut added = 0;
        for seed in seeds {
            let url = normalize(seed.as_ref().trim());
            if !is_web_url(&url) {
                harvest_debug!("Ignoring seed {:?}: not an http(s) url", seed.as_ref());
                continue;
            }
            if frontier.record_discovery(&url) {
                added += 1;
            }
        }
        added
    }

    /// Every Pending URL, in discovery order. Statuses are not changed.
    pub fn claim_pending(&self) -> Vec<String> {
        self.lock().claim_pending()
    }

    /// Insert `url` as Pending unless already known. Returns whether it was new.
    pub fn record_discovery(&self, url: &str) -> bool {
        self.lock().record_discovery(url)
    }

    pub fn mark_crawled(&self, url: &str) {
        self.lock().mark_crawled(url);
    }

    pub fn status(&self, url: &str) -> Option<UrlStatus> {
        self.lock().status(url)
    }

    pub fn size(&self) -> usize {
        self.lock().len()
    }

    pub fn pending_count(&self) -> usize {
        self.lock().pending_count()
    }

    /// Prune Crawled entries if over the retention ceiling, then rewrite the
    /// frontier table.
    pub fn checkpoint(&self) -> Result<CheckpointStats, PersistError> {
        let mut frontier = self.lock();
        let pruned = frontier.compact(self.max_links);
        if pruned > 0 {
            harvest_info!(
                "Frontier over {} urls; dropped {} crawled entries",
                self.max_links,
                pruned
            );
        }
        self.store.save_frontier(frontier.records())?;
        Ok(CheckpointStats {
            size: frontier.len(),
            pending: frontier.pending_count(),
            pruned,
        })
    }

    fn lock(&self) -> MutexGuard<'_, Frontier> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Marks its URL Crawled when dropped, including on early return or unwind.
pub(crate) struct MarkCrawledOnDrop<'a> {
    frontier: &'a FrontierManager,
    url: &'a str,
}

impl<'a> MarkCrawledOnDrop<'a> {
    pub(crate) fn new(frontier: &'a FrontierManager, url: &'a str) -> Self {
        Self { frontier, url }
    }
}

impl Drop for MarkCrawledOnDrop<'_> {
    fn drop(&mut self) {
        self.frontier.mark_crawled(self.url);
    }
}
