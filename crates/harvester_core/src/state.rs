#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CrawlPhase {
    #[default]
    Idle,
    RoundRunning,
    Checkpointing,
    Done,
}

/// Counters reported in the final crawl summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CrawlTotals {
    pub rounds: u32,
    pub crawled: usize,
    pub failed: usize,
    pub skipped: usize,
    pub cancelled: usize,
    pub new_links: usize,
    pub new_emails: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlState {
    phase: CrawlPhase,
    checkpoint_every: usize,
    max_rounds: Option<u32>,
    round: u32,
    completed_in_round: usize,
    round_end_checkpoint: bool,
    stop_requested: bool,
    totals: CrawlTotals,
}

impl Default for CrawlState {
    fn default() -> Self {
        Self::new(40, None)
    }
}

impl CrawlState {
    /// `checkpoint_every` of 0 disables mid-round checkpoints.
    pub fn new(checkpoint_every: usize, max_rounds: Option<u32>) -> Self {
        Self {
            phase: CrawlPhase::Idle,
            checkpoint_every,
            max_rounds,
            round: 0,
            completed_in_round: 0,
            round_end_checkpoint: false,
            stop_requested: false,
            totals: CrawlTotals::default(),
        }
    }

    pub fn phase(&self) -> CrawlPhase {
        self.phase
    }

    pub fn totals(&self) -> CrawlTotals {
        self.totals
    }

    pub fn is_done(&self) -> bool {
        self.phase == CrawlPhase::Done
    }

    pub(crate) fn set_phase(&mut self, phase: CrawlPhase) {
        self.phase = phase;
    }

    pub(crate) fn stop_requested(&self) -> bool {
        self.stop_requested
    }

    pub(crate) fn request_stop(&mut self) {
        self.stop_requested = true;
    }

    pub(crate) fn round_limit_reached(&self) -> bool {
        self.max_rounds.is_some_and(|max| self.round >= max)
    }

    pub(crate) fn begin_round(&mut self) -> u32 {
        self.round += 1;
        self.totals.rounds = self.round;
        self.completed_in_round = 0;
        self.phase = CrawlPhase::RoundRunning;
        self.round
    }

    /// Count a finished unit; true when a mid-round checkpoint is due.
    pub(crate) fn complete_unit(&mut self, report: crate::UnitReport) -> bool {
        use crate::UnitReport;

        match report {
            UnitReport::Harvested {
                new_links,
                new_emails,
            } => {
                self.totals.crawled += 1;
                self.totals.new_links += new_links;
                self.totals.new_emails += new_emails;
            }
            UnitReport::Failed => {
                self.totals.crawled += 1;
                self.totals.failed += 1;
            }
            UnitReport::Skipped => {
                self.totals.crawled += 1;
                self.totals.skipped += 1;
            }
            UnitReport::Cancelled => {
                self.totals.cancelled += 1;
                return false;
            }
        }
        self.completed_in_round += 1;
        self.checkpoint_every > 0 && self.completed_in_round % self.checkpoint_every == 0
    }

    pub(crate) fn enter_checkpoint(&mut self, round_end: bool) {
        self.phase = CrawlPhase::Checkpointing;
        self.round_end_checkpoint = round_end;
    }

    pub(crate) fn round_end_checkpoint(&self) -> bool {
        self.round_end_checkpoint
    }
}
