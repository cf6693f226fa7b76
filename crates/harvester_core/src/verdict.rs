//! Scoring primitives for the validation pipeline.
//!
//! The network-free prefix of the check chain lives here as [`screen`]; the
//! engine finishes a [`ScoreCard`] with the MX and mailbox results and files
//! the resulting [`Verdict`] in a [`VerdictBook`].
use std::collections::{BTreeMap, BTreeSet};

use crate::domains::{is_denylisted_email_domain, is_trusted_email_provider};
use crate::email::{email_domain, is_valid_syntax};

/// One scored check in the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Check {
    Regex,
    Whitelist,
    Mx,
    Smtp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreWeights {
    pub regex: u32,
    pub whitelist: u32,
    pub mx: u32,
    pub smtp: u32,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            regex: 2,
            whitelist: 3,
            mx: 2,
            smtp: 2,
        }
    }
}

impl ScoreWeights {
    pub fn weight(&self, check: Check) -> u32 {
        match check {
            Check::Regex => self.regex,
            Check::Whitelist => self.whitelist,
            Check::Mx => self.mx,
            Check::Smtp => self.smtp,
        }
    }
}

/// Why an address was stopped before scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Denylisted,
    Syntax,
}

/// Points accumulated along the path taken through the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreCard {
    address: String,
    weights: ScoreWeights,
    score: u32,
    passed: Vec<Check>,
}

impl ScoreCard {
    pub fn new(address: impl Into<String>, weights: ScoreWeights) -> Self {
        Self {
            address: address.into(),
            weights,
            score: 0,
            passed: Vec::new(),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn domain(&self) -> &str {
        email_domain(&self.address).unwrap_or_default()
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    /// Add the weight of `check`. Each check counts at most once.
    pub fn award(&mut self, check: Check) {
        if self.passed.contains(&check) {
            return;
        }
        self.score += self.weights.weight(check);
        self.passed.push(check);
    }

    pub fn finish(self) -> Verdict {
        Verdict {
            address: self.address,
            score: self.score,
            passed: self.passed,
            rejection: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub address: String,
    pub score: u32,
    pub passed: Vec<Check>,
    pub rejection: Option<Rejection>,
}

impl Verdict {
    pub fn rejected(address: impl Into<String>, rejection: Rejection) -> Self {
        Self {
            address: address.into(),
            score: 0,
            passed: Vec::new(),
            rejection: Some(rejection),
        }
    }

    pub fn is_valid(&self, threshold: u32) -> bool {
        self.rejection.is_none() && self.score >= threshold
    }
}

/// Result of the checks that need no network access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screening {
    /// Denylisted or malformed; final score 0.
    Rejected(Verdict),
    /// Trusted provider; syntax and allowlist weights awarded, no MX lookup.
    Trusted(ScoreCard),
    /// Syntax weight awarded; MX lookup still to do.
    NeedsMx(ScoreCard),
}

/// Run the denylist, syntax and allowlist steps for one address.
pub fn screen(address: &str, weights: ScoreWeights) -> Screening {
    let domain = email_domain(address).unwrap_or_default();
    if is_denylisted_email_domain(domain) {
        return Screening::Rejected(Verdict::rejected(address, Rejection::Denylisted));
    }
    if !is_valid_syntax(address) {
        return Screening::Rejected(Verdict::rejected(address, Rejection::Syntax));
    }

    let mut card = ScoreCard::new(address, weights);
    card.award(Check::Regex);
    if is_trusted_email_provider(domain) {
        card.award(Check::Whitelist);
        Screening::Trusted(card)
    } else {
        Screening::NeedsMx(card)
    }
}

/// Trim and lower-case an address before it enters validation.
pub fn prepare_address(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_lowercase())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recorded {
    pub valid: bool,
    pub checkpoint_due: bool,
}

/// Processed set and valid verdicts of one validation run.
///
/// Not synchronized; the engine wraps it in a lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerdictBook {
    threshold: u32,
    checkpoint_every: usize,
    processed: BTreeSet<String>,
    valid: BTreeMap<String, u32>,
    since_checkpoint: usize,
}

impl VerdictBook {
    pub fn new(threshold: u32, checkpoint_every: usize) -> Self {
        Self {
            threshold,
            checkpoint_every,
            processed: BTreeSet::new(),
            valid: BTreeMap::new(),
            since_checkpoint: 0,
        }
    }

    /// Seed from a previous run's tables.
    pub fn restore<P, V>(&mut self, processed: P, valid: V)
    where
        P: IntoIterator<Item = String>,
        V: IntoIterator<Item = (String, u32)>,
    {
        self.processed.extend(processed);
        for (address, score) in valid {
            self.processed.insert(address.clone());
            self.valid.insert(address, score);
        }
    }

    pub fn is_processed(&self, address: &str) -> bool {
        self.processed.contains(address)
    }

    /// File a verdict and mark its address processed.
    ///
    /// Returns `None` if the address was already processed; its earlier
    /// verdict stands.
    pub fn record(&mut self, verdict: Verdict) -> Option<Recorded> {
        if !self.processed.insert(verdict.address.clone()) {
            return None;
        }
        let valid = verdict.is_valid(self.threshold);
        if valid {
            self.valid.insert(verdict.address, verdict.score);
        }
        self.since_checkpoint += 1;
        let checkpoint_due =
            self.checkpoint_every > 0 && self.since_checkpoint >= self.checkpoint_every;
        if checkpoint_due {
            self.since_checkpoint = 0;
        }
        Some(Recorded {
            valid,
            checkpoint_due,
        })
    }

    pub fn processed(&self) -> impl Iterator<Item = &str> + '_ {
        self.processed.iter().map(String::as_str)
    }

    pub fn valid(&self) -> impl Iterator<Item = (&str, u32)> + '_ {
        self.valid.iter().map(|(address, score)| (address.as_str(), *score))
    }

    pub fn processed_count(&self) -> usize {
        self.processed.len()
    }

    pub fn valid_count(&self) -> usize {
        self.valid.len()
    }
}
