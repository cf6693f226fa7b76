//! Harvester engine: fetching, parsing, persistence and the two worker
//! pipelines (crawl-and-harvest, email validation).
mod crawl;
mod decode;
mod dns;
mod extract;
mod fetch;
mod frontier;
mod persist;
mod registry;
mod smtp;
mod types;
mod validate;

pub use crawl::{
    harvest_page, run_crawl, CrawlError, CrawlSettings, CrawlSummary, CrawlWorker, Crawler,
    PageHarvest,
};
pub use decode::{decode_html, DecodedHtml};
pub use dns::{HickoryMxResolver, LookupError, MxResolver};
pub use extract::{PageParser, ParsedPage, ScraperParser};
pub use fetch::{FetchSettings, Fetcher, ReqwestFetcher};
pub use frontier::{CheckpointStats, FrontierManager};
pub use persist::{
    ensure_output_dir, AtomicFileWriter, DataDir, EmailAppender, PersistError, EMAILS_TABLE,
    LINKS_TABLE, PROCESSED_TABLE, VALID_TABLE,
};
pub use registry::EmailRegistry;
pub use smtp::{MailboxProber, ProbeError, ProbeSettings, SmtpProber};
pub use types::{FailureKind, FetchError, FetchMetadata, FetchOutput, UnitOutcome};
pub use validate::{
    run_validation, ValidateError, ValidateSettings, ValidationRun, ValidationSummary, Validator,
};
