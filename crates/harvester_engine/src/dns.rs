use std::time::Duration;

use harvest_logging::harvest_warn;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::TokioAsyncResolver;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("mx lookup for {domain} timed out")]
    Timeout { domain: String },
    #[error("mx lookup for {domain} failed: {message}")]
    Resolve { domain: String, message: String },
}

/// The DNS capability used by the validator.
#[async_trait::async_trait]
pub trait MxResolver: Send + Sync {
    /// Mail exchangers for `domain`, most preferred first.
    async fn resolve_mx(&self, domain: &str) -> Result<Vec<String>, LookupError>;
}

/// `hickory-resolver` backed MX lookups with a hard deadline per query.
pub struct HickoryMxResolver {
    resolver: TokioAsyncResolver,
    timeout: Duration,
}

impl HickoryMxResolver {
    /// Use the system resolver configuration, falling back to public
    /// defaults when it cannot be read.
    pub fn new(timeout: Duration) -> Self {
        let (config, mut opts) = hickory_resolver::system_conf::read_system_conf()
            .unwrap_or_else(|err| {
                harvest_warn!("Could not read system DNS config ({}); using defaults", err);
                (ResolverConfig::default(), ResolverOpts::default())
            });
        opts.timeout = timeout;
        opts.attempts = 1;
        Self {
            resolver: TokioAsyncResolver::tokio(config, opts),
            timeout,
        }
    }
}

#[async_trait::async_trait]
impl MxResolver for HickoryMxResolver {
    async fn resolve_mx(&self, domain: &str) -> Result<Vec<String>, LookupError> {
        let lookup = tokio::time::timeout(self.timeout, self.resolver.mx_lookup(domain))
            .await
            .map_err(|_| LookupError::Timeout {
                domain: domain.to_string(),
            })?
            .map_err(|err| LookupError::Resolve {
                domain: domain.to_string(),
                message: err.to_string(),
            })?;

        let mut records: Vec<(u16, String)> = lookup
            .iter()
            .map(|mx| {
                let exchange = mx.exchange().to_utf8();
                (mx.preference(), exchange.trim_end_matches('.').to_string())
            })
            .filter(|(_, exchange)| !exchange.is_empty())
            .collect();
        records.sort();
        Ok(records.into_iter().map(|(_, exchange)| exchange).collect())
    }
}
