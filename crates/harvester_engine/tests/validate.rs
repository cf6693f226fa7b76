use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use harvester_core::{Check, Rejection, ScoreWeights};
use harvester_engine::{
    DataDir, LookupError, MailboxProber, MxResolver, ProbeError, ValidateSettings, ValidationRun,
    Validator, EMAILS_TABLE,
};
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

/// Answers MX queries from a fixed table and counts them.
#[derive(Default)]
struct TableResolver {
    records: HashMap<String, Vec<String>>,
    lookups: AtomicUsize,
}

impl TableResolver {
    fn with(mut self, domain: &str, exchanges: &[&str]) -> Self {
        self.records.insert(
            domain.to_string(),
            exchanges.iter().map(|e| e.to_string()).collect(),
        );
        self
    }

    fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl MxResolver for TableResolver {
    async fn resolve_mx(&self, domain: &str) -> Result<Vec<String>, LookupError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.records
            .get(domain)
            .cloned()
            .ok_or_else(|| LookupError::Resolve {
                domain: domain.to_string(),
                message: "NXDOMAIN".to_string(),
            })
    }
}

/// Accepts every recipient at one exchanger; fails elsewhere.
struct OneExchangeProber {
    accepting: &'static str,
    probes: AtomicUsize,
}

#[async_trait::async_trait]
impl MailboxProber for OneExchangeProber {
    async fn probe(&self, exchange: &str, _address: &str) -> Result<bool, ProbeError> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        if exchange == self.accepting {
            Ok(true)
        } else {
            Err(ProbeError::Timeout)
        }
    }
}

fn validator(resolver: Arc<TableResolver>) -> Validator {
    Validator::new(ScoreWeights::default(), resolver)
}

#[tokio::test]
async fn trusted_provider_scores_without_dns() {
    let resolver = Arc::new(TableResolver::default());
    let verdict = validator(resolver.clone()).score("someone@gmail.com").await;

    assert_eq!(verdict.score, 5);
    assert_eq!(verdict.passed, vec![Check::Regex, Check::Whitelist]);
    assert_eq!(resolver.lookups(), 0);
}

#[tokio::test]
async fn denylisted_domain_scores_zero_without_dns() {
    let resolver = Arc::new(TableResolver::default().with("mailinator.com", &["mx.mailinator.com"]));
    let verdict = validator(resolver.clone()).score("x@mailinator.com").await;

    assert_eq!(verdict.score, 0);
    assert_eq!(verdict.rejection, Some(Rejection::Denylisted));
    assert!(!verdict.is_valid(4));
    assert_eq!(resolver.lookups(), 0);
}

#[tokio::test]
async fn malformed_address_scores_zero() {
    let resolver = Arc::new(TableResolver::default());
    let verdict = validator(resolver.clone()).score("not-an-address").await;

    assert_eq!(verdict.score, 0);
    assert_eq!(verdict.rejection, Some(Rejection::Syntax));
    assert_eq!(resolver.lookups(), 0);
}

#[tokio::test]
async fn failed_mx_lookup_leaves_syntax_weight_only() {
    let resolver = Arc::new(TableResolver::default());
    let verdict = validator(resolver.clone()).score("info@nowhere.org").await;

    assert_eq!(verdict.score, 2);
    assert!(!verdict.is_valid(4));
    assert_eq!(resolver.lookups(), 1);
}

#[tokio::test]
async fn mx_records_reach_the_threshold() {
    let resolver = Arc::new(TableResolver::default().with("corp.io", &["mx1.corp.io"]));
    let verdict = validator(resolver).score("info@corp.io").await;

    assert_eq!(verdict.score, 4);
    assert!(verdict.is_valid(4));
}

#[tokio::test]
async fn probe_uses_primary_exchanger_only() {
    let resolver = Arc::new(
        TableResolver::default()
            .with("corp.io", &["mx1.corp.io", "mx2.corp.io"])
            .with("other.io", &["mx.backup.net"]),
    );
    let prober = Arc::new(OneExchangeProber {
        accepting: "mx1.corp.io",
        probes: AtomicUsize::new(0),
    });
    let validator = validator(resolver).with_prober(prober.clone());

    let accepted = validator.score("info@corp.io").await;
    assert_eq!(accepted.score, 6);
    assert_eq!(accepted.passed.last(), Some(&Check::Smtp));

    let unreachable = validator.score("info@other.io").await;
    assert_eq!(unreachable.score, 4);
    assert_eq!(prober.probes.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn trusted_provider_is_never_probed() {
    let resolver = Arc::new(TableResolver::default());
    let prober = Arc::new(OneExchangeProber {
        accepting: "gmail-smtp-in.l.google.com",
        probes: AtomicUsize::new(0),
    });
    let verdict = validator(resolver)
        .with_prober(prober.clone())
        .score("a@gmail.com")
        .await;

    assert_eq!(verdict.score, 5);
    assert_eq!(prober.probes.load(Ordering::SeqCst), 0);
}

fn settings() -> ValidateSettings {
    ValidateSettings {
        workers: 3,
        checkpoint_every: 2,
        ..ValidateSettings::default()
    }
}

fn inputs() -> Vec<String> {
    [
        " Someone@Gmail.com ",
        "someone@gmail.com",
        "x@mailinator.com",
        "info@corp.io",
        "info@nowhere.org",
        "",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

#[tokio::test]
async fn run_writes_valid_and_processed_tables() {
    let temp = TempDir::new().unwrap();
    let store = DataDir::open(temp.path()).unwrap();
    let resolver = Arc::new(TableResolver::default().with("corp.io", &["mx1.corp.io"]));
    let run = ValidationRun::load(store.clone(), validator(resolver), &settings()).unwrap();

    let summary = run.run(inputs(), CancellationToken::new()).await.unwrap();

    assert_eq!(summary.scored, 4);
    assert_eq!(summary.already_processed, 0);
    assert_eq!(summary.processed_total, 4);
    assert_eq!(summary.valid_total, 2);
    assert_eq!(
        store.load_valid().unwrap(),
        vec![
            ("info@corp.io".to_string(), 4),
            ("someone@gmail.com".to_string(), 5),
        ]
    );
    assert_eq!(
        store.load_processed().unwrap(),
        vec![
            "info@corp.io".to_string(),
            "info@nowhere.org".to_string(),
            "someone@gmail.com".to_string(),
            "x@mailinator.com".to_string(),
        ]
    );
}

#[tokio::test]
async fn restart_skips_processed_addresses() {
    let temp = TempDir::new().unwrap();
    let store = DataDir::open(temp.path()).unwrap();
    store.save_processed(["info@corp.io", "x@mailinator.com"]).unwrap();
    store.save_valid([("info@corp.io", 4u32)]).unwrap();

    let resolver = Arc::new(TableResolver::default().with("corp.io", &["mx1.corp.io"]));
    let run = ValidationRun::load(store.clone(), validator(resolver.clone()), &settings()).unwrap();
    assert!(run.is_processed("info@corp.io"));

    let summary = run.run(inputs(), CancellationToken::new()).await.unwrap();

    assert_eq!(summary.already_processed, 2);
    assert_eq!(summary.scored, 2);
    // Only nowhere.org needed a lookup; corp.io was already settled.
    assert_eq!(resolver.lookups(), 1);
    assert_eq!(summary.valid_total, 2);
}

#[tokio::test]
async fn cancelled_run_scores_nothing() {
    let temp = TempDir::new().unwrap();
    let store = DataDir::open(temp.path()).unwrap();
    let resolver = Arc::new(TableResolver::default());
    let run = ValidationRun::load(store.clone(), validator(resolver), &settings()).unwrap();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let summary = run.run(inputs(), cancel).await.unwrap();

    assert_eq!(summary.scored, 0);
    assert_eq!(summary.cancelled, 4);
    assert!(store.load_processed().unwrap().is_empty());
}

#[tokio::test]
async fn validation_reads_the_harvested_table() {
    let temp = TempDir::new().unwrap();
    let store = DataDir::open(temp.path()).unwrap();
    std::fs::write(
        store.path(EMAILS_TABLE),
        "email\nsomeone@gmail.com\nx@mailinator.com\n",
    )
    .unwrap();

    let resolver = Arc::new(TableResolver::default());
    let run = ValidationRun::load(store.clone(), validator(resolver), &settings()).unwrap();
    let summary = run
        .run(store.load_emails().unwrap(), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.processed_total, 2);
    assert_eq!(summary.valid_total, 1);
}
