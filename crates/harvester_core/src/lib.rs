//! Harvester core: URL canonicalization, crawl bookkeeping, email scoring and
//! the pure crawl supervisor state machine. No IO happens here.
mod domains;
mod effect;
mod email;
mod frontier;
mod msg;
mod normalize;
mod state;
mod update;
mod verdict;

pub use domains::{
    is_denylisted_email_domain, is_search_engine_domain, is_trusted_email_provider,
    registrable_domain, SearchRedirect, DENYLISTED_EMAIL_DOMAINS, DISALLOWED_HOSTS,
    MEDIA_EXTENSIONS, SEARCH_ENGINE_HOSTS, SEARCH_REDIRECTS, TRUSTED_EMAIL_PROVIDERS,
};
pub use effect::{Effect, FinishReason};
pub use email::{address_from_mailto, email_domain, extract_emails, is_valid_syntax};
pub use frontier::{Frontier, UrlStatus};
pub use msg::{Msg, UnitReport};
pub use normalize::{
    domain_of, is_disallowed_host, is_media_or_document, is_search_engine_url, is_web_url,
    normalize, resolve,
};
pub use state::{CrawlPhase, CrawlState, CrawlTotals};
pub use update::update;
pub use verdict::{
    prepare_address, screen, Check, Recorded, Rejection, ScoreCard, ScoreWeights, Screening,
    Verdict, VerdictBook,
};
