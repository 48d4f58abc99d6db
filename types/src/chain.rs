//! Records owned by the calibration contract.
//!
//! The client never owns these. It submits transactions that mutate them and
//! reads them back to reconcile local state.

use crate::{constants::ALL_SENSES_MASK, Address, Character, Sense};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A player's calibration session as stored on-chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalibrationSession {
    pub player: Address,
    /// House side of the stake; receives the prize when the player loses.
    pub player2: Address,
    pub character: u32,
    /// Bitfield, bit `n` set when sense `n` was accepted.
    pub completed_senses: u32,
    pub total_score: u64,
    pub session_id: u32,
    pub player1_points: i128,
    pub player2_points: i128,
    pub active: bool,
}

impl CalibrationSession {
    pub fn has_sense(&self, sense: Sense) -> bool {
        self.completed_senses & sense.bit() != 0
    }

    pub fn completed_count(&self) -> u32 {
        (self.completed_senses & ALL_SENSES_MASK).count_ones()
    }

    pub fn all_senses_complete(&self) -> bool {
        self.completed_senses == ALL_SENSES_MASK
    }

    pub fn character(&self) -> Option<Character> {
        Character::from_index(self.character)
    }
}

/// Per-sense result kept by the contract (the proof itself is not stored).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenseResult {
    pub sense_id: u32,
    pub points: u64,
    pub time_ms: u64,
    pub score: u64,
}

/// Append-only record written when an exit succeeds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub player: Address,
    pub character: u32,
    pub total_score: u64,
    pub timestamp: u64,
}

/// Error codes returned by the calibration contract.
///
/// Codes 1-5 are shared with the other studio games; some are reused with a
/// calibration-specific meaning noted on the variant.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[repr(u32)]
pub enum ContractError {
    #[error("game not found")]
    GameNotFound = 1,
    #[error("not a player of this game")]
    NotPlayer = 2,
    /// Sense already completed.
    #[error("sense already completed")]
    AlreadyGuessed = 3,
    /// Not every sense has been completed.
    #[error("senses incomplete")]
    BothPlayersNotGuessed = 4,
    #[error("game already ended")]
    GameAlreadyEnded = 5,
    #[error("session already active")]
    SessionAlreadyActive = 6,
    #[error("invalid character")]
    InvalidCharacter = 7,
    #[error("invalid sense")]
    InvalidSense = 8,
    #[error("verification failed")]
    VerificationFailed = 9,
    #[error("session not active")]
    SessionNotActive = 10,
    #[error("game hub call failed")]
    HubCallFailed = 11,
    #[error("overload exceeded")]
    OverloadExceeded = 12,
}

impl ContractError {
    pub fn code(self) -> u32 {
        self as u32
    }

    pub fn from_code(code: u32) -> Option<Self> {
        Some(match code {
            1 => Self::GameNotFound,
            2 => Self::NotPlayer,
            3 => Self::AlreadyGuessed,
            4 => Self::BothPlayersNotGuessed,
            5 => Self::GameAlreadyEnded,
            6 => Self::SessionAlreadyActive,
            7 => Self::InvalidCharacter,
            8 => Self::InvalidSense,
            9 => Self::VerificationFailed,
            10 => Self::SessionNotActive,
            11 => Self::HubCallFailed,
            12 => Self::OverloadExceeded,
            _ => return None,
        })
    }
}
