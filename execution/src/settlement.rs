//! Exit verdicts.
//!
//! The contract's `(success, total_score)` answer is authoritative. When the
//! exit call never returns an answer (transport or signing error) the verdict
//! is derived from local state so the player is never stuck.

use crate::Playthrough;
use sabirth_types::{constants::SCORE_CAP, GamePhase};
use serde::{Deserialize, Serialize};

/// How a playthrough ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Success,
    Failure,
    Overload,
}

impl Verdict {
    /// Terminal phase for this verdict.
    pub fn phase(self) -> GamePhase {
        match self {
            Verdict::Success => GamePhase::Success,
            Verdict::Failure => GamePhase::Failure,
            Verdict::Overload => GamePhase::Overload,
        }
    }

    /// Classify the contract's answer.
    ///
    /// Overload is judged on the contract's `total_score`, not the local
    /// total. The two differ when a submission was dropped or failed; the
    /// chain's figure is the one the points settlement used.
    pub fn authoritative(success: bool, total_score: u64) -> Self {
        if success {
            Verdict::Success
        } else if total_score > SCORE_CAP {
            Verdict::Overload
        } else {
            Verdict::Failure
        }
    }

    /// Classify from local state only.
    pub fn local(playthrough: &Playthrough) -> Self {
        if !playthrough.is_complete() {
            Verdict::Failure
        } else if playthrough.total_score() > SCORE_CAP {
            Verdict::Overload
        } else {
            Verdict::Success
        }
    }
}

/// Where a verdict came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Settlement {
    /// The contract answered.
    Contract { success: bool, total_score: u64 },
    /// The exit call failed; the local verdict stands in.
    Fallback { verdict: Verdict },
}

/// Outside notifications owed for a settlement.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Notifications {
    pub awaken: bool,
    pub game_complete: bool,
    pub standings_refresh: bool,
}

impl Settlement {
    pub fn contract(success: bool, total_score: u64) -> Self {
        Settlement::Contract {
            success,
            total_score,
        }
    }

    pub fn fallback(playthrough: &Playthrough) -> Self {
        Settlement::Fallback {
            verdict: Verdict::local(playthrough),
        }
    }

    pub fn verdict(&self) -> Verdict {
        match *self {
            Settlement::Contract {
                success,
                total_score,
            } => Verdict::authoritative(success, total_score),
            Settlement::Fallback { verdict } => verdict,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Settlement::Fallback { .. })
    }

    /// Notifications to emit once the verdict is applied.
    ///
    /// A fallback failure notifies nobody: the session may still be open on
    /// chain and nothing was settled.
    pub fn notifications(&self) -> Notifications {
        match (self.is_fallback(), self.verdict()) {
            (false, Verdict::Success) => Notifications {
                awaken: true,
                game_complete: true,
                standings_refresh: true,
            },
            (false, _) => Notifications {
                game_complete: true,
                ..Notifications::default()
            },
            (true, Verdict::Success) => Notifications {
                awaken: true,
                game_complete: true,
                standings_refresh: false,
            },
            (true, Verdict::Overload) => Notifications {
                game_complete: true,
                ..Notifications::default()
            },
            (true, Verdict::Failure) => Notifications::default(),
        }
    }
}
