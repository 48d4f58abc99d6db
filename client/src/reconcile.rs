//! Comparison of local state with the on-chain session.
//!
//! Local state is optimistic: a failed submission leaves a sense calibrated
//! locally but not on chain. [Reconciliation] lists every field that differs
//! so callers can show or log it. It never changes local state.

use sabirth_execution::SessionMachine;
use sabirth_types::{CalibrationSession, GamePhase};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Divergence {
    /// A character was selected locally but the chain has no session.
    MissingSession,
    SessionId { local: u32, chain: u32 },
    Character { local: u32, chain: u32 },
    CompletedSenses { local: u32, chain: u32 },
    TotalScore { local: u64, chain: u64 },
    Active { local: bool, chain: bool },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reconciliation {
    pub session: Option<CalibrationSession>,
    pub divergences: Vec<Divergence>,
}

impl Reconciliation {
    pub fn compare(machine: &SessionMachine, session: Option<CalibrationSession>) -> Self {
        let mut divergences = Vec::new();
        let character = machine.character();
        match (&session, character) {
            (None, Some(_)) => divergences.push(Divergence::MissingSession),
            (None, None) | (Some(_), None) => {}
            (Some(chain), Some(character)) => {
                let playthrough = machine.playthrough();
                if chain.session_id != playthrough.session_id() {
                    divergences.push(Divergence::SessionId {
                        local: playthrough.session_id(),
                        chain: chain.session_id,
                    });
                }
                if chain.character != character.index() {
                    divergences.push(Divergence::Character {
                        local: character.index(),
                        chain: chain.character,
                    });
                }
                if chain.completed_senses != playthrough.completed_mask() {
                    divergences.push(Divergence::CompletedSenses {
                        local: playthrough.completed_mask(),
                        chain: chain.completed_senses,
                    });
                }
                if chain.total_score != playthrough.total_score() {
                    divergences.push(Divergence::TotalScore {
                        local: playthrough.total_score(),
                        chain: chain.total_score,
                    });
                }
                // Locally a session is open until a verdict lands.
                let local_active = !machine.phase().is_terminal()
                    && machine.phase() != GamePhase::Success;
                if chain.active != local_active {
                    divergences.push(Divergence::Active {
                        local: local_active,
                        chain: chain.active,
                    });
                }
            }
        }
        Self {
            session,
            divergences,
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.divergences.is_empty()
    }
}
