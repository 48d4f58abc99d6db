//! Session orchestration for SA:BIRTH.
//!
//! The [Orchestrator] owns the game state machine and drives the calibration
//! contract and the maze prover through the [Contract] and [Prover] traits.
//! Time comes from a [Clock] and settled playthroughs are announced to an
//! [Observer].

pub mod clock;
pub mod config;
pub mod contract;
pub mod lock;
#[cfg(any(test, feature = "mocks"))]
pub mod mocks;
pub mod observer;
pub mod orchestrator;
pub mod prover;
pub mod reconcile;
pub mod report;

pub use clock::{Clock, SystemClock};
pub use config::{Config, ConfigError, ValidatedConfig};
pub use contract::{Contract, Submission};
pub use lock::{ActionGuard, ActionKind, ActionLock, LockState};
pub use observer::{NoopObserver, Observer};
pub use orchestrator::{ExitOutcome, Orchestrator};
pub use prover::{ProofRequest, Prover};
pub use reconcile::{Divergence, Reconciliation};
pub use report::Report;

use sabirth_execution::TransitionError;
use thiserror::Error;

/// Error type for orchestrator operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("transition rejected: {0}")]
    Transition(#[from] TransitionError),
    #[error("invalid config: {0}")]
    Config(#[from] ConfigError),
    #[error("contract call failed: {0}")]
    Contract(Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    pub fn contract<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Contract(Box::new(err))
    }
}

/// Result type for orchestrator operations.
pub type Result<T> = std::result::Result<T, Error>;
