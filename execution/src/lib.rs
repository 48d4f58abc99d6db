//! SA:BIRTH game logic.
//!
//! This crate contains the deterministic pieces of a playthrough: local score
//! bookkeeping ([Playthrough]), the phase state machine ([SessionMachine]),
//! maze runs ([maze::MazeRun]), exit verdicts ([Verdict]) and leaderboard
//! ranking. It performs no I/O and reads no clock; callers pass time in.
//!
//! ## Determinism requirements
//! - Do not use wall-clock time here.
//! - Randomness only comes from the RNG handed to [SessionMachine::new] and
//!   [SessionMachine::restart].
//!
//! ## Example
//! ```rust
//! use rand::{rngs::StdRng, SeedableRng};
//! use sabirth_execution::{DisplayConfig, MazeCompletion, SessionMachine};
//! use sabirth_types::{Character, GamePhase, Sense, SenseOutcome};
//!
//! let mut rng = StdRng::seed_from_u64(0);
//! let mut machine = SessionMachine::new(DisplayConfig::default(), &mut rng);
//! machine.acknowledge_intro().unwrap();
//! machine.select_character(Character::Alice, 0).unwrap();
//! machine.confirm_lore(8_000).unwrap();
//! machine.enter_maze(Sense::Hearing).unwrap();
//! let completion = machine
//!     .complete_maze(SenseOutcome::new(40, 12_000), 20_000)
//!     .unwrap();
//! assert!(matches!(completion, MazeCompletion::Accepted { score: 480_000, .. }));
//! machine.confirm_integration(30_000).unwrap();
//! assert_eq!(machine.phase(), GamePhase::Hub);
//! assert_eq!(machine.playthrough().total_score(), 480_000);
//! ```

pub mod leaderboard;
pub mod machine;
pub mod maze;
pub mod playthrough;
pub mod settlement;

#[cfg(any(test, feature = "mocks"))]
pub mod mocks;

pub use machine::{
    DisplayConfig, ExitRequest, MazeCompletion, MazeLatch, SessionMachine, SessionStart,
    TransitionError,
};
pub use playthrough::{Commit, Playthrough};
pub use settlement::{Notifications, Settlement, Verdict};
