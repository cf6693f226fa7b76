use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutput {
    pub bytes: Vec<u8>,
    pub metadata: FetchMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchMetadata {
    pub original_url: String,
    pub final_url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub byte_len: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Why a unit of crawl work produced no page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    RedirectLimitExceeded,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    UnsupportedContentType { content_type: String },
    Network,
    /// The worker task panicked.
    Aborted,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::RedirectLimitExceeded => write!(f, "redirect limit exceeded"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::UnsupportedContentType { content_type } => {
                write!(f, "unsupported content type {content_type}")
            }
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Aborted => write!(f, "worker aborted"),
        }
    }
}

/// Typed result of one crawl unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitOutcome {
    Harvested {
        url: String,
        new_links: usize,
        new_emails: usize,
    },
    Failed {
        url: String,
        kind: FailureKind,
    },
    /// Media or document URL; no request issued.
    Skipped { url: String },
    /// Not started because the crawl is stopping. The URL stays Pending.
    Cancelled { url: String },
}

impl UnitOutcome {
    pub fn url(&self) -> &str {
        match self {
            UnitOutcome::Harvested { url, .. }
            | UnitOutcome::Failed { url, .. }
            | UnitOutcome::Skipped { url }
            | UnitOutcome::Cancelled { url } => url,
        }
    }

    pub(crate) fn report(&self) -> harvester_core::UnitReport {
        use harvester_core::UnitReport;

        match self {
            UnitOutcome::Harvested {
                new_links,
                new_emails,
                ..
            } => UnitReport::Harvested {
                new_links: *new_links,
                new_emails: *new_emails,
            },
            UnitOutcome::Failed { .. } => UnitReport::Failed,
            UnitOutcome::Skipped { .. } => UnitReport::Skipped,
            UnitOutcome::Cancelled { .. } => UnitReport::Cancelled,
        }
    }
}
