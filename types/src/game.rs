use crate::constants::{MAZE_ID_SENSE_BITS, SENSE_SCORE_CAP};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Playable character. The discriminant is the on-chain index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
#[repr(u8)]
pub enum Character {
    Alice = 0,
    Robert = 1,
    Carol = 2,
}

impl Character {
    pub const ALL: [Character; 3] = [Character::Alice, Character::Robert, Character::Carol];

    pub fn index(self) -> u32 {
        self as u32
    }

    pub fn from_index(index: u32) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            Character::Alice => "ALICE",
            Character::Robert => "ROBERT",
            Character::Carol => "CAROL",
        }
    }
}

impl fmt::Display for Character {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One of the six calibrated senses. The discriminant is the on-chain index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Sense {
    Hearing = 0,
    Smell = 1,
    Taste = 2,
    Touch = 3,
    Sight = 4,
    Proprioception = 5,
}

impl Sense {
    pub const ALL: [Sense; 6] = [
        Sense::Hearing,
        Sense::Smell,
        Sense::Taste,
        Sense::Touch,
        Sense::Sight,
        Sense::Proprioception,
    ];

    pub fn index(self) -> u32 {
        self as u32
    }

    pub fn from_index(index: u32) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    /// Bit used for this sense in the on-chain completion bitfield.
    pub fn bit(self) -> u32 {
        1 << self.index()
    }

    pub fn name(self) -> &'static str {
        match self {
            Sense::Hearing => "hearing",
            Sense::Smell => "smell",
            Sense::Taste => "taste",
            Sense::Touch => "touch",
            Sense::Sight => "sight",
            Sense::Proprioception => "proprioception",
        }
    }
}

impl fmt::Display for Sense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Screen the player is on. Exactly one is active at a time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GamePhase {
    Intro,
    Select,
    Lore,
    Hub,
    Maze,
    Integration,
    SenseFailure,
    Success,
    Leaderboard,
    Failure,
    Overload,
}

impl GamePhase {
    /// Phases a playthrough can be restarted from.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            GamePhase::Leaderboard | GamePhase::Failure | GamePhase::Overload
        )
    }
}

/// Stellar account or contract address in strkey form.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Maze identifier, `(character << 8) | sense`.
///
/// The contract recomputes this from the session's character and rejects a
/// submission that does not match, and the proof commits to it as a public
/// input.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MazeId(u32);

impl MazeId {
    pub fn new(character: Character, sense: Sense) -> Self {
        Self((character.index() << MAZE_ID_SENSE_BITS) | sense.index())
    }

    pub fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u32 {
        self.0
    }

    pub fn character(self) -> Option<Character> {
        Character::from_index(self.0 >> MAZE_ID_SENSE_BITS)
    }

    pub fn sense(self) -> Option<Sense> {
        Sense::from_index(self.0 & ((1 << MAZE_ID_SENSE_BITS) - 1))
    }
}

impl From<MazeId> for u32 {
    fn from(id: MazeId) -> Self {
        id.0
    }
}

impl fmt::Display for MazeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

/// Score for a run: distinct cells visited times elapsed milliseconds.
///
/// Lower is better. Saturates instead of wrapping; a saturated score is far
/// above every cap.
pub fn score(cells_explored: u64, elapsed_ms: u64) -> u64 {
    cells_explored.saturating_mul(elapsed_ms)
}

/// Zero-knowledge proof that a run's score was computed honestly.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProofArtifact {
    pub proof: Bytes,
    /// `[score, score_cap, maze_id]` as 0x-prefixed hex.
    pub public_inputs: Vec<String>,
    pub verified: bool,
    pub maze_id: MazeId,
    pub score: u64,
}

/// Result of one finished maze run.
///
/// The numbers never change once recorded. The proof may be attached once,
/// after the run is recorded, when proving finishes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SenseOutcome {
    pub score: u64,
    pub cells_explored: u64,
    pub elapsed_ms: u64,
    pub proof: Option<ProofArtifact>,
}

impl SenseOutcome {
    pub fn new(cells_explored: u64, elapsed_ms: u64) -> Self {
        Self {
            score: score(cells_explored, elapsed_ms),
            cells_explored,
            elapsed_ms,
            proof: None,
        }
    }

    /// Whether this run stays within the per-sense cap.
    pub fn within_sense_cap(&self) -> bool {
        self.score <= SENSE_SCORE_CAP
    }
}
