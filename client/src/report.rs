//! Results of detached background tasks.
//!
//! Session start and the per-sense proof/submission pipeline run detached
//! from the caller. They never touch game state directly; they send a
//! [Report] which the orchestrator applies on its own task.

use futures::channel::mpsc;
use sabirth_types::{ProofArtifact, Sense};

/// Identifies the playthrough a report belongs to. Reports from before a
/// restart are ignored.
pub type Epoch = u64;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Report {
    /// `start_session` and `set_character` succeeded.
    SessionOpened { epoch: Epoch, session_id: u32 },
    SessionFailed { epoch: Epoch, error: String },
    /// The start was dropped because another action held the lock.
    SessionDropped { epoch: Epoch },
    ProofReady {
        epoch: Epoch,
        sense: Sense,
        proof: ProofArtifact,
    },
    ProofFailed {
        epoch: Epoch,
        sense: Sense,
        error: String,
    },
    Submitted { epoch: Epoch, sense: Sense },
    SubmissionFailed {
        epoch: Epoch,
        sense: Sense,
        error: String,
    },
    SubmissionDropped { epoch: Epoch, sense: Sense },
}

impl Report {
    pub fn epoch(&self) -> Epoch {
        match self {
            Report::SessionOpened { epoch, .. }
            | Report::SessionFailed { epoch, .. }
            | Report::SessionDropped { epoch }
            | Report::ProofReady { epoch, .. }
            | Report::ProofFailed { epoch, .. }
            | Report::Submitted { epoch, .. }
            | Report::SubmissionFailed { epoch, .. }
            | Report::SubmissionDropped { epoch, .. } => *epoch,
        }
    }

    /// The sense whose pipeline this report ends, if it is a final report.
    pub fn finishes(&self) -> Option<Sense> {
        match self {
            Report::ProofFailed { sense, .. }
            | Report::Submitted { sense, .. }
            | Report::SubmissionFailed { sense, .. }
            | Report::SubmissionDropped { sense, .. } => Some(*sense),
            _ => None,
        }
    }

    /// Error to surface to the player, if any.
    pub fn error(&self) -> Option<&str> {
        match self {
            Report::SessionFailed { error, .. }
            | Report::ProofFailed { error, .. }
            | Report::SubmissionFailed { error, .. } => Some(error),
            _ => None,
        }
    }
}

pub type ReportSender = mpsc::UnboundedSender<Report>;
pub type ReportReceiver = mpsc::UnboundedReceiver<Report>;

pub fn channel() -> (ReportSender, ReportReceiver) {
    mpsc::unbounded()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_final_reports() {
        let submitted = Report::Submitted {
            epoch: 1,
            sense: Sense::Smell,
        };
        assert_eq!(submitted.finishes(), Some(Sense::Smell));
        assert_eq!(submitted.epoch(), 1);
        assert_eq!(submitted.error(), None);

        let failed = Report::SubmissionFailed {
            epoch: 2,
            sense: Sense::Taste,
            error: "verification failed".into(),
        };
        assert_eq!(failed.finishes(), Some(Sense::Taste));
        assert_eq!(failed.error(), Some("verification failed"));

        let opened = Report::SessionOpened {
            epoch: 3,
            session_id: 9,
        };
        assert_eq!(opened.finishes(), None);
        assert_eq!(opened.epoch(), 3);
    }
}
