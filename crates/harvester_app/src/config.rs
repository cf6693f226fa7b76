//! RON configuration file, layered under the command-line flags.
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use harvest_logging::harvest_info;
use harvester_core::ScoreWeights;
use harvester_engine::{CrawlSettings, FetchSettings, ProbeSettings, ValidateSettings};
use serde::{Deserialize, Serialize};

pub(crate) const DEFAULT_CONFIG_FILE: &str = "harvester.ron";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct HarvesterConfig {
    pub data_dir: PathBuf,
    pub crawl: CrawlConfig,
    pub validate: ValidateConfig,
}

impl Default for HarvesterConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            crawl: CrawlConfig::default(),
            validate: ValidateConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct CrawlConfig {
    pub workers: usize,
    pub checkpoint_every: usize,
    pub max_links: usize,
    pub max_rounds: Option<u32>,
    pub seeds: Vec<String>,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub redirect_limit: usize,
    pub max_bytes: u64,
    pub allowed_content_types: Vec<String>,
    pub accept_invalid_certs: bool,
    pub user_agent: String,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        let settings = CrawlSettings::default();
        let fetch = settings.fetch;
        Self {
            workers: settings.workers,
            checkpoint_every: settings.checkpoint_every,
            max_links: settings.max_links,
            max_rounds: settings.max_rounds,
            seeds: settings.seeds,
            connect_timeout_secs: fetch.connect_timeout.as_secs(),
            request_timeout_secs: fetch.request_timeout.as_secs(),
            redirect_limit: fetch.redirect_limit,
            max_bytes: fetch.max_bytes,
            allowed_content_types: fetch.allowed_content_types,
            accept_invalid_certs: fetch.accept_invalid_certs,
            user_agent: fetch.user_agent,
        }
    }
}

impl CrawlConfig {
    pub fn into_settings(self) -> CrawlSettings {
        CrawlSettings {
            workers: self.workers,
            checkpoint_every: self.checkpoint_every,
            max_links: self.max_links,
            max_rounds: self.max_rounds,
            seeds: self.seeds,
            fetch: FetchSettings {
                connect_timeout: Duration::from_secs(self.connect_timeout_secs),
                request_timeout: Duration::from_secs(self.request_timeout_secs),
                redirect_limit: self.redirect_limit,
                max_bytes: self.max_bytes,
                allowed_content_types: self.allowed_content_types,
                accept_invalid_certs: self.accept_invalid_certs,
                user_agent: self.user_agent,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct ValidateConfig {
    pub workers: usize,
    pub checkpoint_every: usize,
    pub threshold: u32,
    pub weights: WeightsConfig,
    pub dns_timeout_secs: u64,
    /// Mailbox probe; absent means disabled.
    pub smtp_probe: Option<ProbeConfig>,
}

impl Default for ValidateConfig {
    fn default() -> Self {
        let settings = ValidateSettings::default();
        Self {
            workers: settings.workers,
            checkpoint_every: settings.checkpoint_every,
            threshold: settings.threshold,
            weights: WeightsConfig::default(),
            dns_timeout_secs: settings.dns_timeout.as_secs(),
            smtp_probe: None,
        }
    }
}

impl ValidateConfig {
    pub fn into_settings(self) -> ValidateSettings {
        ValidateSettings {
            workers: self.workers,
            checkpoint_every: self.checkpoint_every,
            threshold: self.threshold,
            weights: self.weights.into(),
            dns_timeout: Duration::from_secs(self.dns_timeout_secs),
            smtp_probe: self.smtp_probe.map(ProbeSettings::from),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct WeightsConfig {
    pub regex: u32,
    pub whitelist: u32,
    pub mx: u32,
    pub smtp: u32,
}

impl Default for WeightsConfig {
    fn default() -> Self {
        let weights = ScoreWeights::default();
        Self {
            regex: weights.regex,
            whitelist: weights.whitelist,
            mx: weights.mx,
            smtp: weights.smtp,
        }
    }
}

impl From<WeightsConfig> for ScoreWeights {
    fn from(config: WeightsConfig) -> Self {
        ScoreWeights {
            regex: config.regex,
            whitelist: config.whitelist,
            mx: config.mx,
            smtp: config.smtp,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct ProbeConfig {
    pub helo_domain: String,
    pub sender: String,
    pub port: u16,
    pub timeout_secs: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        let settings = ProbeSettings::default();
        Self {
            helo_domain: settings.helo_domain,
            sender: settings.sender,
            port: settings.port,
            timeout_secs: settings.timeout.as_secs(),
        }
    }
}

impl From<ProbeConfig> for ProbeSettings {
    fn from(config: ProbeConfig) -> Self {
        ProbeSettings {
            helo_domain: config.helo_domain,
            sender: config.sender,
            port: config.port,
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

/// Load the configuration.
///
/// An explicit `path` must exist. Without one, `harvester.ron` in the working
/// directory is used when present, otherwise built-in defaults.
pub(crate) fn load(path: Option<&Path>) -> anyhow::Result<HarvesterConfig> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_FILE);
            if !default.exists() {
                return Ok(HarvesterConfig::default());
            }
            default
        }
    };

    let content = fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let config: HarvesterConfig = ron::from_str(&content)
        .with_context(|| format!("failed to parse config file {}", path.display()))?;
    harvest_info!("Loaded configuration from {:?}", path);
    Ok(config)
}
