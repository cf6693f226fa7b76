mod config;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use harvest_logging::{harvest_error, harvest_info, harvest_warn, LogDestination};
use harvester_engine::{run_crawl, run_validation, CrawlSummary, DataDir, ValidationSummary};
use log::LevelFilter;
use tokio_util::sync::CancellationToken;

use crate::config::{CrawlConfig, ProbeConfig, ValidateConfig};

const LOG_FILE: &str = "harvester.log";

#[derive(Parser, Debug)]
#[command(
    name = "harvester",
    version,
    about = "Crawl the web for email addresses, then score them"
)]
struct Cli {
    /// RON configuration file (defaults to ./harvester.ron when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the CSV tables and the log file
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Log verbosity
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,

    /// Where log output goes
    #[arg(long, global = true, value_enum, default_value_t = LogTarget::Both)]
    log_to: LogTarget,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl from the seeds and the stored frontier, harvesting addresses
    Crawl(CrawlArgs),
    /// Score every harvested address not yet processed
    Validate(ValidateArgs),
}

#[derive(Args, Debug)]
struct CrawlArgs {
    /// Seed URLs recorded before the first round
    seeds: Vec<String>,

    /// Concurrent fetches per round
    #[arg(long)]
    workers: Option<usize>,

    /// Completed pages between checkpoints (0 = round ends only)
    #[arg(long)]
    checkpoint_every: Option<usize>,

    /// Frontier retention ceiling
    #[arg(long)]
    max_links: Option<usize>,

    /// Stop after this many rounds
    #[arg(long)]
    max_rounds: Option<u32>,

    /// Verify TLS certificates of crawled sites
    #[arg(long)]
    strict_tls: bool,
}

impl CrawlArgs {
    fn apply(self, mut config: CrawlConfig) -> CrawlConfig {
        config.seeds.extend(self.seeds);
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(every) = self.checkpoint_every {
            config.checkpoint_every = every;
        }
        if let Some(max_links) = self.max_links {
            config.max_links = max_links;
        }
        if self.max_rounds.is_some() {
            config.max_rounds = self.max_rounds;
        }
        if self.strict_tls {
            config.accept_invalid_certs = false;
        }
        config
    }
}

#[derive(Args, Debug)]
struct ValidateArgs {
    /// Concurrent address checks
    #[arg(long)]
    workers: Option<usize>,

    /// Processed addresses between checkpoints (0 = end only)
    #[arg(long)]
    checkpoint_every: Option<usize>,

    /// Minimum score of a valid address
    #[arg(long)]
    threshold: Option<u32>,

    /// Ask the primary mail exchanger whether each mailbox exists
    #[arg(long)]
    smtp_probe: bool,

    /// Domain announced in HELO when probing
    #[arg(long, requires = "smtp_probe")]
    helo_domain: Option<String>,

    /// Envelope sender used when probing
    #[arg(long, requires = "smtp_probe")]
    sender: Option<String>,
}

impl ValidateArgs {
    fn apply(self, mut config: ValidateConfig) -> ValidateConfig {
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(every) = self.checkpoint_every {
            config.checkpoint_every = every;
        }
        if let Some(threshold) = self.threshold {
            config.threshold = threshold;
        }
        if self.smtp_probe {
            let probe = config.smtp_probe.get_or_insert_with(ProbeConfig::default);
            if let Some(helo_domain) = self.helo_domain {
                probe.helo_domain = helo_domain;
            }
            if let Some(sender) = self.sender {
                probe.sender = sender;
            }
        }
        config
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogTarget {
    Terminal,
    File,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

impl From<LogTarget> for LogDestination {
    fn from(target: LogTarget) -> Self {
        match target {
            LogTarget::Terminal => LogDestination::Terminal,
            LogTarget::File => LogDestination::File,
            LogTarget::Both => LogDestination::Both,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            harvest_error!("{:#}", err);
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = config::load(cli.config.as_deref())?;
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }
    let store = DataDir::open(&config.data_dir)
        .with_context(|| format!("cannot use data directory {}", config.data_dir.display()))?;
    harvest_logging::initialize(
        cli.log_to.into(),
        cli.log_level.into(),
        &store.path(LOG_FILE),
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")?;
    let cancel = CancellationToken::new();
    runtime.spawn(stop_on_ctrl_c(cancel.clone()));

    match cli.command {
        Command::Crawl(args) => {
            let settings = args.apply(config.crawl).into_settings();
            let summary = runtime
                .block_on(run_crawl(store, settings, cancel))
                .context("crawl failed")?;
            report_crawl(&summary);
        }
        Command::Validate(args) => {
            let settings = args.apply(config.validate).into_settings();
            let summary = runtime
                .block_on(run_validation(store, settings, cancel))
                .context("validation failed")?;
            report_validation(&summary);
        }
    }
    Ok(())
}

async fn stop_on_ctrl_c(cancel: CancellationToken) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            harvest_warn!("Interrupt received; finishing in-flight work and checkpointing");
            cancel.cancel();
        }
        Err(err) => harvest_warn!("Cannot listen for Ctrl-C: {}", err),
    }
}

fn report_crawl(summary: &CrawlSummary) {
    let totals = summary.totals;
    harvest_info!("Crawl finished: {:?}", summary.reason);
    println!("Crawl finished ({:?})", summary.reason);
    println!("  rounds:      {}", totals.rounds);
    println!(
        "  crawled:     {} ({} failed, {} skipped)",
        totals.crawled, totals.failed, totals.skipped
    );
    println!("  new links:   {}", totals.new_links);
    println!("  new emails:  {}", totals.new_emails);
    println!(
        "  frontier:    {} urls, {} pending",
        summary.frontier_size, summary.pending
    );
    println!("  emails:      {} known", summary.emails_known);
}

fn report_validation(summary: &ValidationSummary) {
    harvest_info!(
        "Validation finished: {} scored, {} valid in total",
        summary.scored,
        summary.valid_total
    );
    println!("Validation finished");
    println!(
        "  scored:      {} ({} already processed, {} left for next run)",
        summary.scored, summary.already_processed, summary.cancelled
    );
    println!("  processed:   {}", summary.processed_total);
    println!("  valid:       {}", summary.valid_total);
}
