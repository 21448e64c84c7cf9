//! Exit code logic for the tracker-session process.
//!
//! Single responsibility: map a run's outcome to the process exit status.

use std::process::ExitCode;

use tracker_session::RunOutcome;

/// Process exit statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProcessExit {
    /// Session authenticated and post-login steps ran.
    Success,
    /// The tracker reported a login ban.
    Banned,
    /// Any other fatal error.
    Failure,
}

impl ProcessExit {
    pub(crate) fn code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Banned => 1,
            Self::Failure => 2,
        }
    }
}

impl From<ProcessExit> for ExitCode {
    fn from(exit: ProcessExit) -> Self {
        ExitCode::from(exit.code())
    }
}

/// Determines the process exit outcome from a finished run.
pub(crate) fn determine_exit_outcome(outcome: &RunOutcome) -> ProcessExit {
    match outcome {
        RunOutcome::Completed { .. } => ProcessExit::Success,
        RunOutcome::Banned(_) => ProcessExit::Banned,
    }
}
