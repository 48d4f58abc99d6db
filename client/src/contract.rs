//! Calibration contract collaborator.

use bytes::Bytes;
use sabirth_types::{Address, CalibrationSession, LeaderboardEntry, MazeId, Sense};
use std::future::Future;

/// A per-sense submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Submission {
    pub player: Address,
    pub sense: Sense,
    pub maze_id: MazeId,
    pub points: u64,
    pub time_ms: u64,
    pub score: u64,
    pub proof: Bytes,
}

/// Trait for interacting with the calibration contract.
///
/// Every call is independent. Implementations sign and submit on behalf of
/// `player`; signing and transport are their concern.
pub trait Contract: Clone + Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Open a session, locking both sides' points.
    fn start_session(
        &self,
        session_id: u32,
        player1: Address,
        player2: Address,
        player1_points: i128,
        player2_points: i128,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Record the character. Returns the authoritative session id.
    fn set_character(
        &self,
        player: Address,
        character: u32,
    ) -> impl Future<Output = Result<u32, Self::Error>> + Send;

    fn submit_sense_completion(
        &self,
        submission: Submission,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Close the session. Returns `(success, total_score)`.
    fn attempt_exit(
        &self,
        player: Address,
    ) -> impl Future<Output = Result<(bool, u64), Self::Error>> + Send;

    fn get_session(
        &self,
        player: Address,
    ) -> impl Future<Output = Result<Option<CalibrationSession>, Self::Error>> + Send;

    /// Leaderboard entries, lowest total first.
    fn get_leaderboard(
        &self,
    ) -> impl Future<Output = Result<Vec<LeaderboardEntry>, Self::Error>> + Send;
}
