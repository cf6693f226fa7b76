/// Work the crawl driver must perform after an [`update`](crate::update).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Snapshot every Pending URL and report it back as `Msg::BatchClaimed`.
    ClaimPending,
    /// Run the worker pool over `urls`, reporting each unit as `Msg::UnitFinished`
    /// and the drained batch as `Msg::RoundDrained`.
    Dispatch { round: u32, urls: Vec<String> },
    /// Persist the frontier table, pruning if over the retention ceiling, then
    /// report `Msg::CheckpointWritten`.
    Checkpoint { round_end: bool },
    /// The crawl is over.
    Finish { reason: FinishReason },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    FrontierExhausted,
    RoundLimit,
    Stopped,
}
