use crate::{CrawlPhase, CrawlState, Effect, FinishReason, Msg};

/// Pure supervisor transition: applies a message to state and returns any effects.
///
/// Phases run `Idle -> RoundRunning -> Checkpointing -> (RoundRunning | Done)`.
/// Messages that do not fit the current phase are ignored.
pub fn update(mut state: CrawlState, msg: Msg) -> (CrawlState, Vec<Effect>) {
    let effects = match msg {
        Msg::Start => {
            if state.phase() == CrawlPhase::Idle {
                state.set_phase(CrawlPhase::RoundRunning);
                vec![Effect::ClaimPending]
            } else {
                Vec::new()
            }
        }
        Msg::BatchClaimed { urls } => {
            if state.phase() != CrawlPhase::RoundRunning {
                return (state, Vec::new());
            }
            if state.stop_requested() {
                finish(&mut state, FinishReason::Stopped)
            } else if urls.is_empty() {
                finish(&mut state, FinishReason::FrontierExhausted)
            } else if state.round_limit_reached() {
                finish(&mut state, FinishReason::RoundLimit)
            } else {
                let round = state.begin_round();
                vec![Effect::Dispatch { round, urls }]
            }
        }
        Msg::UnitFinished(report) => {
            if state.phase() != CrawlPhase::RoundRunning {
                return (state, Vec::new());
            }
            if state.complete_unit(report) {
                state.enter_checkpoint(false);
                vec![Effect::Checkpoint { round_end: false }]
            } else {
                Vec::new()
            }
        }
        Msg::RoundDrained => {
            if state.phase() == CrawlPhase::RoundRunning {
                state.enter_checkpoint(true);
                vec![Effect::Checkpoint { round_end: true }]
            } else {
                Vec::new()
            }
        }
        Msg::CheckpointWritten => {
            if state.phase() != CrawlPhase::Checkpointing {
                return (state, Vec::new());
            }
            if !state.round_end_checkpoint() {
                state.set_phase(CrawlPhase::RoundRunning);
                Vec::new()
            } else if state.stop_requested() {
                finish(&mut state, FinishReason::Stopped)
            } else if state.round_limit_reached() {
                finish(&mut state, FinishReason::RoundLimit)
            } else {
                state.set_phase(CrawlPhase::RoundRunning);
                vec![Effect::ClaimPending]
            }
        }
        Msg::StopRequested => {
            state.request_stop();
            if state.phase() == CrawlPhase::Idle {
                finish(&mut state, FinishReason::Stopped)
            } else {
                Vec::new()
            }
        }
    };

    (state, effects)
}

fn finish(state: &mut CrawlState, reason: FinishReason) -> Vec<Effect> {
    state.set_phase(CrawlPhase::Done);
    vec![Effect::Finish { reason }]
}
