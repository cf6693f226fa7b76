use std::collections::HashMap;

/// Crawl status of one frontier URL. Persisted as `0` / `1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UrlStatus {
    Pending,
    Crawled,
}

impl UrlStatus {
    pub fn as_flag(self) -> u8 {
        match self {
            UrlStatus::Pending => 0,
            UrlStatus::Crawled => 1,
        }
    }

    pub fn from_flag(flag: u8) -> Option<Self> {
        match flag {
            0 => Some(UrlStatus::Pending),
            1 => Some(UrlStatus::Crawled),
            _ => None,
        }
    }
}

/// Known URLs keyed by canonical string, in discovery order.
///
/// Not synchronized; the engine wraps it in a lock.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frontier {
    order: Vec<String>,
    statuses: HashMap<String, UrlStatus>,
    pending: usize,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted rows. A URL listed more than once is Crawled
    /// if any of its rows says so.
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = (String, UrlStatus)>,
    {
        let mut frontier = Self::new();
        for (url, status) in records {
            match status {
                UrlStatus::Pending => {
                    frontier.record_discovery(&url);
                }
                UrlStatus::Crawled => {
                    frontier.mark_crawled(&url);
                }
            }
        }
        frontier
    }

    /// Insert `url` as Pending unless already known. Returns whether it was new.
    pub fn record_discovery(&mut self, url: &str) -> bool {
        if self.statuses.contains_key(url) {
            return false;
        }
        self.order.push(url.to_string());
        self.statuses.insert(url.to_string(), UrlStatus::Pending);
        self.pending += 1;
        true
    }

    /// Transition `url` to Crawled. Unknown URLs are inserted as Crawled.
    /// Returns whether anything changed.
    pub fn mark_crawled(&mut self, url: &str) -> bool {
        match self.statuses.get_mut(url) {
            Some(UrlStatus::Crawled) => false,
            Some(status) => {
                *status = UrlStatus::Crawled;
                self.pending -= 1;
                true
            }
            None => {
                self.order.push(url.to_string());
                self.statuses.insert(url.to_string(), UrlStatus::Crawled);
                true
            }
        }
    }

    /// Snapshot of every Pending URL in discovery order. Statuses are untouched.
    pub fn claim_pending(&self) -> Vec<String> {
        self.order
            .iter()
            .filter(|url| self.statuses.get(url.as_str()) == Some(&UrlStatus::Pending))
            .cloned()
            .collect()
    }

    pub fn status(&self, url: &str) -> Option<UrlStatus> {
        self.statuses.get(url).copied()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.pending
    }

    /// Rows in discovery order, as written to the frontier table.
    pub fn records(&self) -> impl Iterator<Item = (&str, UrlStatus)> + '_ {
        self.order.iter().filter_map(|url| {
            self.statuses
                .get(url.as_str())
                .map(|status| (url.as_str(), *status))
        })
    }

    /// Drop every Crawled entry once the table holds more than `max_links`
    /// URLs. Pending entries always survive. Returns the number dropped.
    pub fn compact(&mut self, max_links: usize) -> usize {
        if self.order.len() <= max_links {
            return 0;
        }
        let before = self.order.len();
        let statuses = &mut self.statuses;
        self.order.retain(|url| {
            let keep = statuses.get(url.as_str()) == Some(&UrlStatus::Pending);
            if !keep {
                statuses.remove(url.as_str());
            }
            keep
        });
        before - self.order.len()
    }
}
