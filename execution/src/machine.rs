//! Session state machine.
//!
//! [SessionMachine] owns the current [GamePhase], the exit-confirmation
//! overlay, the maze-completion latch and the [Playthrough]. Every event is a
//! method that either applies its transition or returns a [TransitionError]
//! without touching state. Nothing here performs I/O; time is passed in as
//! milliseconds from whatever clock the caller uses.
//!
//! ## Transitions
//!
//! ```text
//! intro -> select -> lore -(display)-> hub <-> maze
//!                                      hub <- integration (display) <- maze
//!                                      hub <- senseFailure <- maze
//!                                      hub -> success | failure | overload (exit)
//! success -> leaderboard
//! leaderboard | failure | overload -> intro (restart)
//! ```

use crate::{
    playthrough::{Commit, Playthrough, PlaythroughError},
    settlement::{Settlement, Verdict},
};
use rand::Rng;
use sabirth_types::{
    constants::{INTEGRATION_DISPLAY_MS, LORE_DISPLAY_MS, SCORE_CAP},
    Character, GamePhase, MazeId, ProofArtifact, Sense, SenseOutcome,
};
use thiserror::Error;
use tracing::debug;

/// Minimum time the timed screens stay up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DisplayConfig {
    pub lore_ms: u64,
    pub integration_ms: u64,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            lore_ms: LORE_DISPLAY_MS,
            integration_ms: INTEGRATION_DISPLAY_MS,
        }
    }
}

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("{event} is not allowed in phase {phase:?}")]
    InvalidPhase {
        event: &'static str,
        phase: GamePhase,
    },
    #[error("screen must stay up for another {remaining_ms}ms")]
    DisplayPending { remaining_ms: u64 },
    #[error("sense {0} is already calibrated")]
    AlreadyCalibrated(Sense),
    #[error("exit in progress")]
    ExitInProgress,
    #[error("exit confirmation is not shown")]
    NoConfirmation,
    #[error("no exit in progress")]
    NoExitPending,
    #[error("no character selected")]
    NoCharacter,
    #[error("maze run ended before reaching the goal")]
    GoalNotReached,
    #[error("maze run does not belong to the open maze")]
    RunMismatch,
}

impl From<PlaythroughError> for TransitionError {
    fn from(err: PlaythroughError) -> Self {
        match err {
            PlaythroughError::AlreadyCalibrated(sense) => TransitionError::AlreadyCalibrated(sense),
            PlaythroughError::NoCharacter => TransitionError::NoCharacter,
        }
    }
}

/// Maze-completion latch. Set by the first completion of a run and cleared
/// only when a new maze is entered or the game restarts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MazeLatch {
    Open,
    Latched,
}

/// Result of reporting a finished maze run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MazeCompletion {
    /// The run exceeded the per-sense cap.
    Failed { sense: Sense, score: u64 },
    /// The run was accepted and the integration screen is up.
    Accepted {
        sense: Sense,
        maze_id: MazeId,
        points: u64,
        time_ms: u64,
        score: u64,
        /// Whether the run qualifies for proving and submission.
        prove: bool,
    },
    /// This run was already completed; the event was ignored.
    Duplicate,
}

/// Result of an exit request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExitRequest {
    /// Not every sense is calibrated; the confirmation overlay is shown.
    ConfirmationShown,
    /// Settlement should be attempted now.
    Settle,
    /// An exit is already pending; nothing changed.
    Ignored,
}

/// What the caller needs to open a session on chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionStart {
    pub session_id: u32,
    pub character: Character,
}

#[derive(Clone, Debug)]
pub struct SessionMachine {
    config: DisplayConfig,
    phase: GamePhase,
    exit_confirmation: bool,
    exit_in_progress: bool,
    latch: MazeLatch,
    current_maze: Option<Sense>,
    last_sense: Option<Sense>,
    display_until: Option<u64>,
    playthrough: Playthrough,
}

/// Draw a fresh session id: non-zero and different from `previous`.
pub fn new_session_id<R: Rng>(rng: &mut R, previous: u32) -> u32 {
    loop {
        let candidate: u32 = rng.gen();
        if candidate != 0 && candidate != previous {
            return candidate;
        }
    }
}

impl SessionMachine {
    pub fn new<R: Rng>(config: DisplayConfig, rng: &mut R) -> Self {
        Self {
            config,
            phase: GamePhase::Intro,
            exit_confirmation: false,
            exit_in_progress: false,
            latch: MazeLatch::Open,
            current_maze: None,
            last_sense: None,
            display_until: None,
            playthrough: Playthrough::new(new_session_id(rng, 0)),
        }
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn playthrough(&self) -> &Playthrough {
        &self.playthrough
    }

    pub fn session_id(&self) -> u32 {
        self.playthrough.session_id()
    }

    pub fn character(&self) -> Option<Character> {
        self.playthrough.character()
    }

    pub fn current_maze(&self) -> Option<Sense> {
        self.current_maze
    }

    pub fn last_sense(&self) -> Option<Sense> {
        self.last_sense
    }

    pub fn latch(&self) -> MazeLatch {
        self.latch
    }

    pub fn exit_confirmation_shown(&self) -> bool {
        self.exit_confirmation
    }

    pub fn exit_in_progress(&self) -> bool {
        self.exit_in_progress
    }

    /// Deadline of the timed screen currently shown, if any.
    pub fn display_deadline(&self) -> Option<u64> {
        self.display_until
    }

    fn expect_phase(&self, event: &'static str, phase: GamePhase) -> Result<(), TransitionError> {
        if self.phase != phase {
            return Err(TransitionError::InvalidPhase {
                event,
                phase: self.phase,
            });
        }
        Ok(())
    }

    fn expect_displayed(&self, now_ms: u64) -> Result<(), TransitionError> {
        match self.display_until {
            Some(deadline) if now_ms < deadline => Err(TransitionError::DisplayPending {
                remaining_ms: deadline - now_ms,
            }),
            _ => Ok(()),
        }
    }

    pub fn acknowledge_intro(&mut self) -> Result<(), TransitionError> {
        self.expect_phase("acknowledge_intro", GamePhase::Intro)?;
        self.phase = GamePhase::Select;
        Ok(())
    }

    pub fn select_character(
        &mut self,
        character: Character,
        now_ms: u64,
    ) -> Result<SessionStart, TransitionError> {
        self.expect_phase("select_character", GamePhase::Select)?;
        self.playthrough.select(character);
        self.phase = GamePhase::Lore;
        self.display_until = Some(now_ms.saturating_add(self.config.lore_ms));
        Ok(SessionStart {
            session_id: self.playthrough.session_id(),
            character,
        })
    }

    pub fn confirm_lore(&mut self, now_ms: u64) -> Result<(), TransitionError> {
        self.expect_phase("confirm_lore", GamePhase::Lore)?;
        self.expect_displayed(now_ms)?;
        self.display_until = None;
        self.phase = GamePhase::Hub;
        Ok(())
    }

    pub fn enter_maze(&mut self, sense: Sense) -> Result<MazeId, TransitionError> {
        self.expect_phase("enter_maze", GamePhase::Hub)?;
        if self.exit_in_progress {
            return Err(TransitionError::ExitInProgress);
        }
        if self.playthrough.is_completed(sense) {
            return Err(TransitionError::AlreadyCalibrated(sense));
        }
        let maze_id = self.playthrough.maze_id(sense)?;
        self.exit_confirmation = false;
        self.latch = MazeLatch::Open;
        self.current_maze = Some(sense);
        self.phase = GamePhase::Maze;
        Ok(maze_id)
    }

    /// Leave the maze without a result.
    pub fn abort_maze(&mut self) -> Result<(), TransitionError> {
        self.expect_phase("abort_maze", GamePhase::Maze)?;
        self.current_maze = None;
        self.phase = GamePhase::Hub;
        Ok(())
    }

    /// Report a finished run.
    ///
    /// The outcome is recorded immediately. An accepted run is committed later
    /// by [Self::commit_sense] or [Self::confirm_integration], whichever comes
    /// first.
    pub fn complete_maze(
        &mut self,
        outcome: SenseOutcome,
        now_ms: u64,
    ) -> Result<MazeCompletion, TransitionError> {
        if self.latch == MazeLatch::Latched {
            debug!(phase = ?self.phase, "ignoring duplicate maze completion");
            return Ok(MazeCompletion::Duplicate);
        }
        self.expect_phase("complete_maze", GamePhase::Maze)?;
        let Some(sense) = self.current_maze else {
            return Err(TransitionError::InvalidPhase {
                event: "complete_maze",
                phase: self.phase,
            });
        };
        let maze_id = self.playthrough.maze_id(sense)?;

        let (points, time_ms, score) = (outcome.cells_explored, outcome.elapsed_ms, outcome.score);
        let within_cap = outcome.within_sense_cap();
        self.playthrough.record(sense, outcome)?;
        self.latch = MazeLatch::Latched;
        self.current_maze = None;
        self.last_sense = Some(sense);

        if !within_cap {
            self.phase = GamePhase::SenseFailure;
            return Ok(MazeCompletion::Failed { sense, score });
        }

        self.phase = GamePhase::Integration;
        self.display_until = Some(now_ms.saturating_add(self.config.integration_ms));
        Ok(MazeCompletion::Accepted {
            sense,
            maze_id,
            points,
            time_ms,
            score,
            prove: score <= SCORE_CAP,
        })
    }

    /// Attach a finished proof to a recorded run.
    pub fn attach_proof(&mut self, sense: Sense, proof: ProofArtifact) -> bool {
        self.playthrough.attach_proof(sense, proof)
    }

    /// Commit an accepted run. Idempotent.
    pub fn commit_sense(&mut self, sense: Sense) -> Commit {
        self.playthrough.commit(sense)
    }

    pub fn adopt_session_id(&mut self, session_id: u32) {
        self.playthrough.adopt_session_id(session_id);
    }

    pub fn confirm_integration(&mut self, now_ms: u64) -> Result<Commit, TransitionError> {
        self.expect_phase("confirm_integration", GamePhase::Integration)?;
        self.expect_displayed(now_ms)?;
        let commit = match self.last_sense {
            Some(sense) => self.playthrough.commit(sense),
            None => Commit::NotRecorded,
        };
        self.display_until = None;
        self.phase = GamePhase::Hub;
        Ok(commit)
    }

    pub fn confirm_sense_failure(&mut self) -> Result<(), TransitionError> {
        self.expect_phase("confirm_sense_failure", GamePhase::SenseFailure)?;
        self.phase = GamePhase::Hub;
        Ok(())
    }

    pub fn request_exit(&mut self) -> Result<ExitRequest, TransitionError> {
        self.expect_phase("request_exit", GamePhase::Hub)?;
        if self.exit_in_progress {
            return Ok(ExitRequest::Ignored);
        }
        if self.playthrough.is_complete() {
            self.exit_in_progress = true;
            return Ok(ExitRequest::Settle);
        }
        self.exit_confirmation = true;
        Ok(ExitRequest::ConfirmationShown)
    }

    pub fn confirm_exit(&mut self) -> Result<ExitRequest, TransitionError> {
        self.expect_phase("confirm_exit", GamePhase::Hub)?;
        if !self.exit_confirmation {
            return Err(TransitionError::NoConfirmation);
        }
        self.exit_confirmation = false;
        if self.exit_in_progress {
            return Ok(ExitRequest::Ignored);
        }
        self.exit_in_progress = true;
        Ok(ExitRequest::Settle)
    }

    pub fn cancel_exit(&mut self) -> Result<(), TransitionError> {
        if !self.exit_confirmation {
            return Err(TransitionError::NoConfirmation);
        }
        self.exit_confirmation = false;
        Ok(())
    }

    /// Drop a pending exit without a verdict; the player stays at the hub.
    pub fn abandon_exit(&mut self) -> Result<(), TransitionError> {
        if !self.exit_in_progress {
            return Err(TransitionError::NoExitPending);
        }
        self.exit_in_progress = false;
        Ok(())
    }

    /// Apply the settlement and move to the terminal phase it selects.
    pub fn settle(&mut self, settlement: Settlement) -> Result<Verdict, TransitionError> {
        self.expect_phase("settle", GamePhase::Hub)?;
        if !self.exit_in_progress {
            return Err(TransitionError::NoExitPending);
        }
        let verdict = settlement.verdict();
        self.exit_in_progress = false;
        self.phase = verdict.phase();
        Ok(verdict)
    }

    pub fn continue_to_leaderboard(&mut self) -> Result<(), TransitionError> {
        self.expect_phase("continue_to_leaderboard", GamePhase::Success)?;
        self.phase = GamePhase::Leaderboard;
        Ok(())
    }

    /// Start over with a fresh playthrough and a new session id.
    pub fn restart<R: Rng>(&mut self, rng: &mut R) -> Result<u32, TransitionError> {
        if !self.phase.is_terminal() {
            return Err(TransitionError::InvalidPhase {
                event: "restart",
                phase: self.phase,
            });
        }
        let session_id = new_session_id(rng, self.playthrough.session_id());
        *self = Self {
            config: self.config,
            phase: GamePhase::Intro,
            exit_confirmation: false,
            exit_in_progress: false,
            latch: MazeLatch::Open,
            current_maze: None,
            last_sense: None,
            display_until: None,
            playthrough: Playthrough::new(session_id),
        };
        Ok(session_id)
    }
}
