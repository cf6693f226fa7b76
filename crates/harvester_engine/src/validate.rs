//! Scored email validation: denylist, syntax, allowlist or MX, optional
//! mailbox probe. Verdicts are checkpointed every few addresses so an
//! interrupted run resumes where it stopped.
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::stream::{self, StreamExt};
use harvest_logging::{harvest_debug, harvest_error, harvest_info, harvest_warn};
use harvester_core::{
    prepare_address, screen, Check, ScoreCard, ScoreWeights, Screening, Verdict, VerdictBook,
};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::dns::{HickoryMxResolver, MxResolver};
use crate::persist::{DataDir, PersistError};
use crate::smtp::{MailboxProber, ProbeSettings, SmtpProber};

#[derive(Debug, Clone)]
pub struct ValidateSettings {
    pub workers: usize,
    /// Processed addresses between checkpoints; 0 checkpoints only at the end.
    pub checkpoint_every: usize,
    pub threshold: u32,
    pub weights: ScoreWeights,
    pub dns_timeout: Duration,
    /// Mailbox probe; disabled when `None`.
    pub smtp_probe: Option<ProbeSettings>,
}

impl Default for ValidateSettings {
    fn default() -> Self {
        Self {
            workers: 20,
            checkpoint_every: 50,
            threshold: 4,
            weights: ScoreWeights::default(),
            dns_timeout: Duration::from_secs(3),
            smtp_probe: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ValidateError {
    #[error("persistence failed: {0}")]
    Persist(#[from] PersistError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ValidationSummary {
    /// Addresses scored during this run.
    pub scored: usize,
    /// Inputs skipped because an earlier run already processed them.
    pub already_processed: usize,
    /// Inputs left unscored because the run was stopped.
    pub cancelled: usize,
    pub processed_total: usize,
    pub valid_total: usize,
}

/// Runs the check chain for one address.
pub struct Validator {
    weights: ScoreWeights,
    resolver: Arc<dyn MxResolver>,
    prober: Option<Arc<dyn MailboxProber>>,
}

impl Validator {
    pub fn new(weights: ScoreWeights, resolver: Arc<dyn MxResolver>) -> Self {
        Self {
            weights,
            resolver,
            prober: None,
        }
    }

    pub fn with_prober(mut self, prober: Arc<dyn MailboxProber>) -> Self {
        self.prober = Some(prober);
        self
    }

    /// Score `address`. Remote failures contribute nothing; they never abort.
    pub async fn score(&self, address: &str) -> Verdict {
        match screen(address, self.weights) {
            Screening::Rejected(verdict) => verdict,
            Screening::Trusted(card) => card.finish(),
            Screening::NeedsMx(card) => self.score_remote(card).await,
        }
    }

    async fn score_remote(&self, mut card: ScoreCard) -> Verdict {
        let exchanges = match self.resolver.resolve_mx(card.domain()).await {
            Ok(exchanges) => exchanges,
            Err(err) => {
                harvest_debug!("{}", err);
                Vec::new()
            }
        };
        if exchanges.is_empty() {
            return card.finish();
        }
        card.award(Check::Mx);

        if let (Some(prober), Some(primary)) = (&self.prober, exchanges.first()) {
            match prober.probe(primary, card.address()).await {
                Ok(true) => card.award(Check::Smtp),
                Ok(false) => harvest_debug!("{} rejected {}", primary, card.address()),
                Err(err) => harvest_debug!("Probe of {} via {} failed: {}", card.address(), primary, err),
            }
        }
        card.finish()
    }
}

/// Lock-guarded verdict book plus its durable tables.
pub struct ValidationRun {
    book: Mutex<VerdictBook>,
    store: DataDir,
    validator: Arc<Validator>,
    workers: usize,
}

impl ValidationRun {
    /// Restore processed and valid tables from `store`.
    pub fn load(
        store: DataDir,
        validator: Validator,
        settings: &ValidateSettings,
    ) -> Result<Self, PersistError> {
        let mut book = VerdictBook::new(settings.threshold, settings.checkpoint_every);
        book.restore(store.load_processed()?, store.load_valid()?);
        harvest_info!(
            "Restored {} processed addresses, {} valid",
            book.processed_count(),
            book.valid_count()
        );
        Ok(Self {
            book: Mutex::new(book),
            store,
            validator: Arc::new(validator),
            workers: settings.workers.max(1),
        })
    }

    pub fn is_processed(&self, address: &str) -> bool {
        self.lock().is_processed(address)
    }

    /// Score every unprocessed address in `inputs`.
    ///
    /// Inputs are trimmed, lower-cased and de-duplicated first.
    pub async fn run(
        &self,
        inputs: Vec<String>,
        cancel: CancellationToken,
    ) -> Result<ValidationSummary, ValidateError> {
        let mut summary = ValidationSummary::default();
        let mut seen = HashSet::new();
        let mut queue = Vec::new();
        for address in inputs.iter().filter_map(|raw| prepare_address(raw)) {
            if !seen.insert(address.clone()) {
                continue;
            }
            if self.is_processed(&address) {
                summary.already_processed += 1;
            } else {
                queue.push(address);
            }
        }
        harvest_info!(
            "Validating {} addresses ({} already processed)",
            queue.len(),
            summary.already_processed
        );

        let mut verdicts = stream::iter(queue.into_iter().map(|address| {
            let validator = Arc::clone(&self.validator);
            let cancel = cancel.clone();
            async move {
                if cancel.is_cancelled() {
                    return None;
                }
                let task_address = address.clone();
                let handle =
                    tokio::spawn(async move { validator.score(&task_address).await });
                match handle.await {
                    Ok(verdict) => Some(verdict),
                    Err(err) => {
                        harvest_error!("Scoring {} aborted: {}", address, err);
                        Some(Verdict {
                            address,
                            score: 0,
                            passed: Vec::new(),
                            rejection: None,
                        })
                    }
                }
            }
        }))
        .buffer_unordered(self.workers);

        while let Some(verdict) = verdicts.next().await {
            let Some(verdict) = verdict else {
                summary.cancelled += 1;
                continue;
            };
            summary.scored += 1;
            self.record(verdict)?;
        }

        self.checkpoint()?;
        let book = self.lock();
        summary.processed_total = book.processed_count();
        summary.valid_total = book.valid_count();
        Ok(summary)
    }

    fn record(&self, verdict: Verdict) -> Result<(), PersistError> {
        let mut book = self.lock();
        let address = verdict.address.clone();
        let score = verdict.score;
        let Some(recorded) = book.record(verdict) else {
            return Ok(());
        };
        if recorded.valid {
            harvest_debug!("Valid {} (score {})", address, score);
        }
        if recorded.checkpoint_due {
            self.write_tables(&book)?;
            harvest_info!(
                "Checkpoint: {} processed, {} valid",
                book.processed_count(),
                book.valid_count()
            );
        }
        Ok(())
    }

    /// Rewrite both verdict tables.
    pub fn checkpoint(&self) -> Result<(), PersistError> {
        let book = self.lock();
        self.write_tables(&book)
    }

    fn write_tables(&self, book: &VerdictBook) -> Result<(), PersistError> {
        let result = self
            .store
            .save_valid(book.valid())
            .and_then(|_| self.store.save_processed(book.processed()));
        if let Err(err) = &result {
            harvest_error!("Validation checkpoint failed: {}", err);
        }
        result.map(|_| ())
    }

    fn lock(&self) -> MutexGuard<'_, VerdictBook> {
        self.book.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Validate the harvested email table in `store` with the hickory resolver
/// and, if configured, the SMTP probe.
pub async fn run_validation(
    store: DataDir,
    settings: ValidateSettings,
    cancel: CancellationToken,
) -> Result<ValidationSummary, ValidateError> {
    let resolver: Arc<dyn MxResolver> = Arc::new(HickoryMxResolver::new(settings.dns_timeout));
    let mut validator = Validator::new(settings.weights, resolver);
    if let Some(probe) = settings.smtp_probe.clone() {
        harvest_warn!("Mailbox probe enabled; connecting to port {} of mail exchangers", probe.port);
        validator = validator.with_prober(Arc::new(SmtpProber::new(probe)));
    }

    let inputs = store.load_emails()?;
    let run = ValidationRun::load(store, validator, &settings)?;
    run.run(inputs, cancel).await
}
