use rand::{seq::SliceRandom, Rng};
use sabirth_execution::{maze::MazeRun, Playthrough};
use sabirth_types::{Character, Direction, Position, Sense};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// How the bot walks a maze.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Walk the shortest path to each collectible, then to the goal.
    #[default]
    Shortest,
    /// Prefer unvisited cells at random. Falls back to the shortest path once
    /// the step budget runs out.
    Wander,
}

/// What the bot does next at the hub.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    Calibrate(Sense),
    /// Leave without calibrating every sense.
    ExitEarly,
    Exit,
}

/// Per-playthrough decisions: character, sense order and maze moves.
pub struct Engine<R: Rng> {
    rng: R,
    strategy: Strategy,
    wander_steps: usize,
    exit_early_rate: f64,
    max_failures: usize,

    failures: usize,
}

impl<R: Rng> Engine<R> {
    pub fn new(
        rng: R,
        strategy: Strategy,
        wander_steps: usize,
        exit_early_rate: f64,
        max_failures: usize,
    ) -> Self {
        Self {
            rng,
            strategy,
            wander_steps,
            exit_early_rate,
            max_failures,
            failures: 0,
        }
    }

    /// Forget per-playthrough counters.
    pub fn reset(&mut self) {
        self.failures = 0;
    }

    pub fn pick_character(&mut self) -> Character {
        Character::ALL[self.rng.gen_range(0..Character::ALL.len())]
    }

    pub fn record_failure(&mut self) {
        self.failures += 1;
    }

    pub fn failures(&self) -> usize {
        self.failures
    }

    pub fn next(&mut self, playthrough: &Playthrough) -> Status {
        if playthrough.is_complete() {
            return Status::Exit;
        }
        if self.failures >= self.max_failures {
            debug!(failures = self.failures, "too many failed senses");
            return Status::ExitEarly;
        }
        if playthrough.completed_count() > 0 && self.rng.gen_bool(self.exit_early_rate) {
            return Status::ExitEarly;
        }
        let remaining: Vec<Sense> = Sense::ALL
            .into_iter()
            .filter(|sense| !playthrough.is_completed(*sense))
            .collect();
        match remaining.choose(&mut self.rng) {
            Some(sense) => Status::Calibrate(*sense),
            None => Status::Exit,
        }
    }

    /// Next move in `run`, or `None` once the run is at an open goal.
    pub fn next_move(&mut self, run: &MazeRun, steps: usize) -> Option<Direction> {
        if run.at_goal() {
            return None;
        }
        if self.strategy == Strategy::Wander && steps < self.wander_steps {
            let moves = run.open_moves();
            let fresh: Vec<Direction> = moves
                .iter()
                .copied()
                .filter(|dir| !run.is_visited(run.position().step(*dir)))
                .collect();
            let pool = if fresh.is_empty() { &moves } else { &fresh };
            return pool.choose(&mut self.rng).copied();
        }
        let target = nearest(run.position(), run.remaining_collectibles())
            .unwrap_or(run.layout().goal);
        run.layout()
            .shortest_path(run.position(), target)
            .and_then(|path| path.first().copied())
    }
}

fn nearest(from: Position, targets: impl Iterator<Item = Position>) -> Option<Position> {
    targets.min_by_key(|target| from.manhattan(*target))
}
