#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Begin the first round.
    Start,
    /// Result of `Effect::ClaimPending`.
    BatchClaimed { urls: Vec<String> },
    /// One worker unit of the current round completed.
    UnitFinished(UnitReport),
    /// Every unit of the dispatched batch completed.
    RoundDrained,
    /// The requested checkpoint is on disk.
    CheckpointWritten,
    /// Stop after the current round (Ctrl-C).
    StopRequested,
}

/// Per-unit result as seen by the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitReport {
    Harvested { new_links: usize, new_emails: usize },
    Failed,
    /// Media/document URL, marked Crawled without a request.
    Skipped,
    /// Not started because a stop was requested; the URL stays Pending.
    Cancelled,
}
