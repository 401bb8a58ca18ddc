use std::{cell::RefCell, fmt::Display};

use tracing::{error, info, warn};

use crate::error::Error;

/// Stages of one download/mux run, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Resolving,
    SelectingStreams,
    Downloading,
    DerivingChapters,
    Muxing,
    InjectingChapters,
    CleaningUp,
    /// Moving the muxed file to its final name
    Finalizing,
    Finalized,
    Failed,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Finalized | RunState::Failed)
    }
}

impl Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RunState::Resolving => "resolving",
            RunState::SelectingStreams => "selecting streams",
            RunState::Downloading => "downloading",
            RunState::DerivingChapters => "deriving chapters",
            RunState::Muxing => "muxing",
            RunState::InjectingChapters => "injecting chapters",
            RunState::CleaningUp => "cleaning up",
            RunState::Finalizing => "finalizing",
            RunState::Finalized => "finalized",
            RunState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Records the stages a run goes through.
///
/// Once a terminal state is reached, further transitions are ignored.
#[derive(Debug, Default)]
pub struct RunTracker {
    history: RefCell<Vec<RunState>>,
}

impl RunTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<RunState> {
        self.history.borrow().last().copied()
    }

    pub fn history(&self) -> Vec<RunState> {
        self.history.borrow().clone()
    }

    pub fn enter(&self, next: RunState) {
        if let Some(current) = self.current().filter(|s| s.is_terminal()) {
            warn!("Ignoring transition to '{next}', the run is already {current}");
            return;
        }

        info!("Run is {next}");
        self.history.borrow_mut().push(next);
    }

    pub fn fail(&self, err: &Error) {
        let stage = self
            .current()
            .map_or_else(|| "starting".to_owned(), |s| s.to_string());
        error!("Run failed while {stage}: {err}");
        self.enter(RunState::Failed);
    }
}
