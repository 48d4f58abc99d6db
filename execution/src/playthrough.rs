//! Local score bookkeeping for one playthrough.
//!
//! A finished run is *recorded* as soon as the maze ends and *committed* once
//! the run is accepted. Only committed senses count towards the total, so
//! `total_score` always equals the sum of the committed outcomes.

use sabirth_types::{
    constants::SENSE_COUNT, Character, MazeId, ProofArtifact, Sense, SenseOutcome,
};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum PlaythroughError {
    #[error("sense {0} is already calibrated")]
    AlreadyCalibrated(Sense),
    #[error("no character selected")]
    NoCharacter,
}

/// Result of committing a recorded run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Commit {
    /// The sense was added to the completed set.
    Committed { score: u64, total_score: u64 },
    /// The sense was committed earlier; nothing changed.
    AlreadyCommitted,
    /// The recorded score is above the per-sense cap.
    OverCap { score: u64 },
    /// Nothing was recorded for this sense.
    NotRecorded,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Playthrough {
    session_id: u32,
    character: Option<Character>,
    outcomes: BTreeMap<Sense, SenseOutcome>,
    completed: BTreeSet<Sense>,
    total_score: u64,
}

impl Playthrough {
    pub fn new(session_id: u32) -> Self {
        Self {
            session_id,
            character: None,
            outcomes: BTreeMap::new(),
            completed: BTreeSet::new(),
            total_score: 0,
        }
    }

    pub fn session_id(&self) -> u32 {
        self.session_id
    }

    /// Replace the local session id with the one the contract reported.
    pub fn adopt_session_id(&mut self, session_id: u32) {
        self.session_id = session_id;
    }

    pub fn character(&self) -> Option<Character> {
        self.character
    }

    pub fn select(&mut self, character: Character) {
        self.character = Some(character);
    }

    pub fn maze_id(&self, sense: Sense) -> Result<MazeId, PlaythroughError> {
        let character = self.character.ok_or(PlaythroughError::NoCharacter)?;
        Ok(MazeId::new(character, sense))
    }

    /// Store the outcome of a finished run.
    ///
    /// A failed run may be replaced by a later retry; a committed one may not.
    pub fn record(&mut self, sense: Sense, outcome: SenseOutcome) -> Result<(), PlaythroughError> {
        if self.completed.contains(&sense) {
            return Err(PlaythroughError::AlreadyCalibrated(sense));
        }
        self.outcomes.insert(sense, outcome);
        Ok(())
    }

    /// Add a recorded sense to the completed set. Safe to call repeatedly.
    pub fn commit(&mut self, sense: Sense) -> Commit {
        if self.completed.contains(&sense) {
            return Commit::AlreadyCommitted;
        }
        let Some(outcome) = self.outcomes.get(&sense) else {
            return Commit::NotRecorded;
        };
        if !outcome.within_sense_cap() {
            return Commit::OverCap {
                score: outcome.score,
            };
        }
        let score = outcome.score;
        self.completed.insert(sense);
        self.total_score = self.total_score.saturating_add(score);
        Commit::Committed {
            score,
            total_score: self.total_score,
        }
    }

    /// Attach a proof to a recorded run. Returns false if there is no such
    /// run or it already carries a proof.
    pub fn attach_proof(&mut self, sense: Sense, proof: ProofArtifact) -> bool {
        match self.outcomes.get_mut(&sense) {
            Some(outcome) if outcome.proof.is_none() => {
                outcome.proof = Some(proof);
                true
            }
            _ => false,
        }
    }

    pub fn outcome(&self, sense: Sense) -> Option<&SenseOutcome> {
        self.outcomes.get(&sense)
    }

    pub fn outcomes(&self) -> impl Iterator<Item = (Sense, &SenseOutcome)> {
        self.outcomes.iter().map(|(sense, outcome)| (*sense, outcome))
    }

    pub fn is_completed(&self, sense: Sense) -> bool {
        self.completed.contains(&sense)
    }

    pub fn completed(&self) -> impl Iterator<Item = Sense> + '_ {
        self.completed.iter().copied()
    }

    pub fn completed_count(&self) -> usize {
        self.completed.len()
    }

    /// Completed senses as the contract's bitfield.
    pub fn completed_mask(&self) -> u32 {
        self.completed.iter().fold(0, |mask, sense| mask | sense.bit())
    }

    pub fn is_complete(&self) -> bool {
        self.completed.len() == SENSE_COUNT
    }

    pub fn total_score(&self) -> u64 {
        self.total_score
    }
}
