//! Proving collaborator.

use sabirth_types::{constants::SCORE_CAP, MazeId, ProofArtifact};
use std::future::Future;

/// Inputs to the maze circuit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProofRequest {
    pub points: u64,
    pub time_ms: u64,
    pub score: u64,
    pub maze_id: MazeId,
}

impl ProofRequest {
    /// Public inputs committed to by the proof: score, cap and maze id.
    pub fn public_inputs(&self) -> Vec<String> {
        [self.score, SCORE_CAP, u64::from(self.maze_id.raw())]
            .iter()
            .map(|value| format!("0x{}", hex::encode(value.to_be_bytes())))
            .collect()
    }
}

/// Trait for generating maze proofs. Calls may take seconds.
pub trait Prover: Clone + Send + Sync + 'static {
    type Error: std::error::Error + Send + Sync + 'static;

    fn generate_proof(
        &self,
        request: ProofRequest,
    ) -> impl Future<Output = Result<ProofArtifact, Self::Error>> + Send;
}
