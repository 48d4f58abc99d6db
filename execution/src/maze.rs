//! Maze runs.
//!
//! A [MazeRun] walks one of the static layouts. Each character adds a twist:
//! ALICE must pick up every collectible before the goal opens, ROBERT loses
//! time on hazards and CAROL only sees the cells near her or the goal.
//!
//! Challenge cells that cannot be reached from the start are dropped for that
//! layout so every run remains finishable.

use sabirth_types::{
    constants::{FOG_RADIUS, HAZARD_PENALTY_MS},
    layout, Character, Direction, MazeLayout, Position, Sense, SenseOutcome,
};
use std::collections::{BTreeSet, HashSet};

/// Collectibles ALICE must gather before the goal counts.
pub const COLLECTIBLES: [Position; 3] = [
    Position::new(7, 5),
    Position::new(15, 9),
    Position::new(11, 14),
];

/// Hazards that cost ROBERT time.
pub const HAZARDS: [Position; 3] = [
    Position::new(5, 7),
    Position::new(13, 11),
    Position::new(9, 15),
];

/// Result of a single step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    /// Wall or edge; nothing changed.
    Blocked,
    Moved,
    Collected { remaining: usize },
    Hazard { penalty_ms: u64 },
    /// On the goal with collectibles still missing.
    GoalLocked { remaining: usize },
    ReachedGoal,
}

#[derive(Clone, Debug)]
pub struct MazeRun {
    sense: Sense,
    character: Character,
    layout: &'static MazeLayout,
    position: Position,
    visited: HashSet<Position>,
    collectibles: BTreeSet<Position>,
    hazards: BTreeSet<Position>,
    started_ms: u64,
    penalty_ms: u64,
}

impl MazeRun {
    pub fn new(character: Character, sense: Sense, now_ms: u64) -> Self {
        let layout = layout(sense);
        let reachable = layout.reachable();
        let keep = |positions: &[Position]| -> BTreeSet<Position> {
            positions
                .iter()
                .copied()
                .filter(|pos| reachable.contains(pos))
                .collect()
        };
        let (collectibles, hazards) = match character {
            Character::Alice => (keep(&COLLECTIBLES), BTreeSet::new()),
            Character::Robert => (BTreeSet::new(), keep(&HAZARDS)),
            Character::Carol => (BTreeSet::new(), BTreeSet::new()),
        };
        Self {
            sense,
            character,
            layout,
            position: layout.start,
            visited: HashSet::from([layout.start]),
            collectibles,
            hazards,
            started_ms: now_ms,
            penalty_ms: 0,
        }
    }

    pub fn sense(&self) -> Sense {
        self.sense
    }

    pub fn character(&self) -> Character {
        self.character
    }

    pub fn layout(&self) -> &'static MazeLayout {
        self.layout
    }

    pub fn started_ms(&self) -> u64 {
        self.started_ms
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn cells_explored(&self) -> u64 {
        self.visited.len() as u64
    }

    pub fn penalty_ms(&self) -> u64 {
        self.penalty_ms
    }

    pub fn is_visited(&self, pos: Position) -> bool {
        self.visited.contains(&pos)
    }

    /// Collectibles still on the board.
    pub fn remaining_collectibles(&self) -> impl Iterator<Item = Position> + '_ {
        self.collectibles.iter().copied()
    }

    /// Hazards not yet touched.
    pub fn remaining_hazards(&self) -> impl Iterator<Item = Position> + '_ {
        self.hazards.iter().copied()
    }

    pub fn goal_open(&self) -> bool {
        self.collectibles.is_empty()
    }

    pub fn at_goal(&self) -> bool {
        self.position == self.layout.goal && self.goal_open()
    }

    pub fn step(&mut self, direction: Direction) -> StepOutcome {
        let next = self.position.step(direction);
        if !self.layout.is_walkable(next) {
            return StepOutcome::Blocked;
        }
        self.position = next;
        self.visited.insert(next);

        let mut outcome = StepOutcome::Moved;
        if self.collectibles.remove(&next) {
            outcome = StepOutcome::Collected {
                remaining: self.collectibles.len(),
            };
        }
        if self.hazards.remove(&next) {
            self.penalty_ms = self.penalty_ms.saturating_add(HAZARD_PENALTY_MS);
            outcome = StepOutcome::Hazard {
                penalty_ms: HAZARD_PENALTY_MS,
            };
        }
        if next == self.layout.goal {
            outcome = if self.goal_open() {
                StepOutcome::ReachedGoal
            } else {
                StepOutcome::GoalLocked {
                    remaining: self.collectibles.len(),
                }
            };
        }
        outcome
    }

    /// Whether `pos` is drawn. Only CAROL's runs have fog.
    pub fn is_visible(&self, pos: Position) -> bool {
        if self.character != Character::Carol {
            return true;
        }
        pos.manhattan(self.position) <= FOG_RADIUS || pos.manhattan(self.layout.goal) <= FOG_RADIUS
    }

    /// Close the run at `now_ms`.
    pub fn finish(&self, now_ms: u64) -> SenseOutcome {
        let elapsed = now_ms
            .saturating_sub(self.started_ms)
            .saturating_add(self.penalty_ms);
        SenseOutcome::new(self.cells_explored(), elapsed)
    }

    /// Directions that lead to an unvisited walkable cell first, then the rest.
    pub fn open_moves(&self) -> Vec<Direction> {
        let (mut fresh, seen): (Vec<_>, Vec<_>) = Direction::ALL
            .into_iter()
            .filter(|dir| self.layout.is_walkable(self.position.step(*dir)))
            .partition(|dir| !self.visited.contains(&self.position.step(*dir)));
        fresh.extend(seen);
        fresh
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn walk(run: &mut MazeRun, path: &[Direction]) -> Vec<StepOutcome> {
        path.iter().map(|dir| run.step(*dir)).collect()
    }

    /// Visit every remaining collectible then the goal.
    fn solve(run: &mut MazeRun) -> StepOutcome {
        let mut last = StepOutcome::Moved;
        loop {
            let Some(target) = run.remaining_collectibles().next() else {
                break;
            };
            let path = run.layout().shortest_path(run.position(), target).unwrap();
            last = *walk(run, &path).last().unwrap();
        }
        let path = run
            .layout()
            .shortest_path(run.position(), run.layout().goal)
            .unwrap();
        if let Some(outcome) = walk(run, &path).last() {
            last = *outcome;
        }
        last
    }

    #[test]
    fn test_blocked_move_changes_nothing() {
        let mut run = MazeRun::new(Character::Robert, Sense::Hearing, 0);
        let start = run.position();
        let blocked = Direction::ALL
            .into_iter()
            .find(|dir| !run.layout().is_walkable(start.step(*dir)))
            .unwrap();
        assert_eq!(run.step(blocked), StepOutcome::Blocked);
        assert_eq!(run.position(), start);
        assert_eq!(run.cells_explored(), 1);
    }

    #[test]
    fn test_shortest_run_scores_path_length() {
        let mut run = MazeRun::new(Character::Carol, Sense::Hearing, 1_000);
        let path = run
            .layout()
            .shortest_path(run.layout().start, run.layout().goal)
            .unwrap();
        let outcomes = walk(&mut run, &path);
        assert_eq!(outcomes.last(), Some(&StepOutcome::ReachedGoal));
        assert!(run.at_goal());

        let outcome = run.finish(13_000);
        assert_eq!(outcome.cells_explored, path.len() as u64 + 1);
        assert_eq!(outcome.elapsed_ms, 12_000);
        assert_eq!(outcome.score, outcome.cells_explored * 12_000);
    }

    #[test]
    fn test_revisits_do_not_count() {
        let mut run = MazeRun::new(Character::Carol, Sense::Smell, 0);
        let first = run.open_moves()[0];
        run.step(first);
        let back = Direction::ALL
            .into_iter()
            .find(|dir| run.position().step(*dir) == run.layout().start)
            .unwrap();
        run.step(back);
        run.step(first);
        assert_eq!(run.cells_explored(), 2);
    }

    #[test]
    fn test_alice_goal_locked_until_collected() {
        let mut run = MazeRun::new(Character::Alice, Sense::Hearing, 0);
        assert!(!run.goal_open());

        let path = run
            .layout()
            .shortest_path(run.layout().start, run.layout().goal)
            .unwrap();
        let outcomes = walk(&mut run, &path);
        assert!(matches!(
            outcomes.last(),
            Some(StepOutcome::GoalLocked { .. })
        ));
        assert!(!run.at_goal());

        assert_eq!(solve(&mut run), StepOutcome::ReachedGoal);
        assert!(run.goal_open());
    }

    #[test]
    fn test_alice_unreachable_collectibles_are_dropped() {
        for sense in Sense::ALL {
            let run = MazeRun::new(Character::Alice, sense, 0);
            let reachable = run.layout().reachable();
            for pos in run.remaining_collectibles() {
                assert!(reachable.contains(&pos), "{sense}: {pos:?}");
            }
        }
        // (7,5) is sealed off in the touch layout.
        let touch = MazeRun::new(Character::Alice, Sense::Touch, 0);
        assert!(!touch
            .remaining_collectibles()
            .any(|pos| pos == Position::new(7, 5)));
    }

    #[test]
    fn test_every_alice_run_is_finishable() {
        for sense in Sense::ALL {
            let mut run = MazeRun::new(Character::Alice, sense, 0);
            assert_eq!(solve(&mut run), StepOutcome::ReachedGoal, "{sense}");
        }
    }

    #[test]
    fn test_robert_hazard_penalises_once() {
        let mut run = MazeRun::new(Character::Robert, Sense::Hearing, 0);
        let hazard = Position::new(5, 7);
        assert!(run.remaining_hazards().any(|pos| pos == hazard));

        let path = run.layout().shortest_path(run.position(), hazard).unwrap();
        let outcomes = walk(&mut run, &path);
        assert_eq!(
            outcomes.last(),
            Some(&StepOutcome::Hazard {
                penalty_ms: HAZARD_PENALTY_MS
            })
        );
        assert_eq!(run.penalty_ms(), HAZARD_PENALTY_MS);

        // Step off and back on.
        let off = run.open_moves()[0];
        run.step(off);
        let back = Direction::ALL
            .into_iter()
            .find(|dir| run.position().step(*dir) == hazard)
            .unwrap();
        assert_eq!(run.step(back), StepOutcome::Moved);
        assert_eq!(run.penalty_ms(), HAZARD_PENALTY_MS);

        let outcome = run.finish(1_000);
        assert_eq!(outcome.elapsed_ms, 1_000 + HAZARD_PENALTY_MS);
    }

    #[test]
    fn test_robert_goal_hazard_still_finishes() {
        // The proprioception goal sits on a hazard.
        let mut run = MazeRun::new(Character::Robert, Sense::Proprioception, 0);
        assert!(run
            .remaining_hazards()
            .any(|pos| pos == run.layout().goal));
        let path = run
            .layout()
            .shortest_path(run.position(), run.layout().goal)
            .unwrap();
        assert_eq!(walk(&mut run, &path).last(), Some(&StepOutcome::ReachedGoal));
        assert!(run.penalty_ms() >= HAZARD_PENALTY_MS);
    }

    #[test]
    fn test_carol_fog() {
        let run = MazeRun::new(Character::Carol, Sense::Sight, 0);
        let layout = run.layout();
        let start = layout.start;
        assert!(run.is_visible(start));
        assert!(run.is_visible(layout.goal));

        let far = (0..layout.height as i32)
            .flat_map(|y| (0..layout.width as i32).map(move |x| Position::new(x, y)))
            .find(|pos| pos.manhattan(start) > FOG_RADIUS && pos.manhattan(layout.goal) > FOG_RADIUS);
        if let Some(far) = far {
            assert!(!run.is_visible(far));
            let robert = MazeRun::new(Character::Robert, Sense::Sight, 0);
            assert!(robert.is_visible(far));
        }
    }

    #[test]
    fn test_finish_saturates() {
        let run = MazeRun::new(Character::Carol, Sense::Taste, 10);
        let outcome = run.finish(5);
        assert_eq!(outcome.elapsed_ms, 0);
        assert_eq!(outcome.score, 0);
    }

    #[test]
    fn test_open_moves_prefer_unvisited() {
        let run = MazeRun::new(Character::Carol, Sense::Hearing, 0);
        let moves = run.open_moves();
        assert!(!moves.is_empty());
        for dir in moves {
            assert!(run.layout().is_walkable(run.position().step(dir)));
        }
    }
}
