//! In-memory mirror of the calibration contract's rules.
//!
//! [CalibrationLedger] applies the same validation the deployed contract
//! does, so client tests and the bot can run complete playthroughs without a
//! network.

use sabirth_types::{
    constants::{ALL_SENSES_MASK, MAX_SUBMITTED_SCORE, SCORE_CAP},
    Address, CalibrationSession, Character, ContractError, LeaderboardEntry, MazeId, Sense,
    SenseResult,
};
use std::collections::HashMap;
use tracing::debug;

#[derive(Clone, Debug, Default)]
pub struct CalibrationLedger {
    sessions: HashMap<Address, CalibrationSession>,
    results: HashMap<(Address, u32), SenseResult>,
    leaderboard: Vec<LeaderboardEntry>,
    /// Net points won or lost per address across settled sessions.
    standings: HashMap<Address, i128>,
    session_counter: u32,
    timestamp: u64,
}

impl CalibrationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the timestamp written into new leaderboard entries.
    pub fn set_timestamp(&mut self, timestamp: u64) {
        self.timestamp = timestamp;
    }

    fn active_session(&mut self, player: &Address) -> Result<&mut CalibrationSession, ContractError> {
        let session = self
            .sessions
            .get_mut(player)
            .ok_or(ContractError::GameNotFound)?;
        if !session.active {
            return Err(ContractError::SessionNotActive);
        }
        Ok(session)
    }

    fn settle_points(&mut self, session: &CalibrationSession, player_won: bool) {
        let (winner, loser, amount) = if player_won {
            (&session.player, &session.player2, session.player2_points)
        } else {
            (&session.player2, &session.player, session.player1_points)
        };
        *self.standings.entry(winner.clone()).or_default() += amount;
        *self.standings.entry(loser.clone()).or_default() -= amount;
    }

    /// Open a session for `player1` against the house. An orphaned active
    /// session is closed first with the house winning.
    pub fn start_session(
        &mut self,
        session_id: u32,
        player1: &Address,
        player2: &Address,
        player1_points: i128,
        player2_points: i128,
    ) -> Result<(), ContractError> {
        if player1 == player2 {
            return Err(ContractError::NotPlayer);
        }
        if let Some(existing) = self.sessions.get(player1).cloned() {
            if existing.active {
                debug!(session_id = existing.session_id, "closing orphaned session");
                self.settle_points(&existing, false);
            }
        }
        self.sessions.insert(
            player1.clone(),
            CalibrationSession {
                player: player1.clone(),
                player2: player2.clone(),
                character: 0,
                completed_senses: 0,
                total_score: 0,
                session_id,
                player1_points,
                player2_points,
                active: true,
            },
        );
        Ok(())
    }

    /// Record the character and return the session id.
    pub fn set_character(&mut self, player: &Address, character: u32) -> Result<u32, ContractError> {
        if Character::from_index(character).is_none() {
            return Err(ContractError::InvalidCharacter);
        }
        let session = self.active_session(player)?;
        session.character = character;
        let session_id = session.session_id;
        self.session_counter = self.session_counter.saturating_add(1);
        Ok(session_id)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn submit_sense_completion(
        &mut self,
        player: &Address,
        sense_id: u32,
        maze_id: MazeId,
        points: u64,
        time_ms: u64,
        score: u64,
        proof: &[u8],
    ) -> Result<(), ContractError> {
        let sense = Sense::from_index(sense_id).ok_or(ContractError::InvalidSense)?;
        let session = self.active_session(player)?;
        if session.has_sense(sense) {
            return Err(ContractError::AlreadyGuessed);
        }
        let expected = (session.character << 8) | sense_id;
        if maze_id.raw() != expected {
            return Err(ContractError::VerificationFailed);
        }
        let product = points
            .checked_mul(time_ms)
            .ok_or(ContractError::VerificationFailed)?;
        if score != product {
            return Err(ContractError::VerificationFailed);
        }
        if points == 0 || time_ms == 0 || score > MAX_SUBMITTED_SCORE {
            return Err(ContractError::VerificationFailed);
        }
        if proof.is_empty() {
            return Err(ContractError::VerificationFailed);
        }

        session.completed_senses |= sense.bit();
        session.total_score = session.total_score.saturating_add(score);
        self.results.insert(
            (player.clone(), sense_id),
            SenseResult {
                sense_id,
                points,
                time_ms,
                score,
            },
        );
        Ok(())
    }

    /// Close the session and judge it.
    ///
    /// Incomplete or overloaded sessions return `(false, total)` rather than
    /// an error. A win is appended to the leaderboard.
    pub fn attempt_exit(&mut self, player: &Address) -> Result<(bool, u64), ContractError> {
        let timestamp = self.timestamp;
        let session = self.active_session(player)?;
        session.active = false;
        let session = session.clone();

        let success =
            session.completed_senses == ALL_SENSES_MASK && session.total_score <= SCORE_CAP;
        self.settle_points(&session, success);
        if success {
            self.leaderboard.push(LeaderboardEntry {
                player: player.clone(),
                character: session.character,
                total_score: session.total_score,
                timestamp,
            });
        }
        Ok((success, session.total_score))
    }

    pub fn get_session(&self, player: &Address) -> Option<CalibrationSession> {
        self.sessions.get(player).cloned()
    }

    pub fn get_sense_result(&self, player: &Address, sense_id: u32) -> Option<SenseResult> {
        self.results.get(&(player.clone(), sense_id)).cloned()
    }

    /// Leaderboard sorted ascending by total score.
    pub fn get_leaderboard(&self) -> Vec<LeaderboardEntry> {
        let mut entries = self.leaderboard.clone();
        entries.sort_by_key(|entry| entry.total_score);
        entries
    }

    pub fn standing(&self, address: &Address) -> i128 {
        self.standings.get(address).copied().unwrap_or_default()
    }

    /// Number of successful `set_character` calls.
    pub fn session_counter(&self) -> u32 {
        self.session_counter
    }
}
