//! Static maze layouts, one per sense.

use crate::Sense;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::OnceLock;
use thiserror::Error;

/// Grid coordinate. Signed so that a step off the edge is representable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn manhattan(self, other: Position) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    pub fn step(self, direction: Direction) -> Position {
        let (dx, dy) = direction.delta();
        Position::new(self.x + dx, self.y + dy)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LayoutError {
    #[error("layout has no rows")]
    Empty,
    #[error("row {row} has width {got} (expected {expected})")]
    Ragged { row: usize, expected: usize, got: usize },
    #[error("{what} at ({x},{y}) is not walkable")]
    Blocked { what: &'static str, x: i32, y: i32 },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MazeLayout {
    pub title: &'static str,
    pub description: &'static str,
    pub width: usize,
    pub height: usize,
    walls: Vec<bool>,
    ragged: Option<(usize, usize)>,
    pub start: Position,
    pub goal: Position,
}

impl MazeLayout {
    /// Builds a layout from rows where `#` is a wall and anything else is floor.
    pub fn from_pattern(
        title: &'static str,
        description: &'static str,
        rows: &[&str],
        start: Position,
        goal: Position,
    ) -> Self {
        let height = rows.len();
        let width = rows.first().map_or(0, |row| row.len());
        let mut walls = Vec::with_capacity(width * height);
        let mut ragged = None;
        for (index, row) in rows.iter().enumerate() {
            if row.len() != width && ragged.is_none() {
                ragged = Some((index, row.len()));
            }
            walls.extend(row.bytes().map(|cell| cell == b'#'));
        }
        Self {
            title,
            description,
            width,
            height,
            walls,
            ragged,
            start,
            goal,
        }
    }

    /// Checks that the grid is rectangular and that start and goal are floor.
    pub fn validate(&self) -> Result<(), LayoutError> {
        if self.height == 0 || self.width == 0 {
            return Err(LayoutError::Empty);
        }
        if let Some((row, got)) = self.ragged {
            return Err(LayoutError::Ragged {
                row,
                expected: self.width,
                got,
            });
        }
        for (what, pos) in [("start", self.start), ("goal", self.goal)] {
            if !self.is_walkable(pos) {
                return Err(LayoutError::Blocked {
                    what,
                    x: pos.x,
                    y: pos.y,
                });
            }
        }
        Ok(())
    }

    pub fn contains(&self, pos: Position) -> bool {
        pos.x >= 0 && pos.y >= 0 && (pos.x as usize) < self.width && (pos.y as usize) < self.height
    }

    pub fn is_walkable(&self, pos: Position) -> bool {
        if !self.contains(pos) {
            return false;
        }
        let index = pos.y as usize * self.width + pos.x as usize;
        matches!(self.walls.get(index), Some(false))
    }

    pub fn walkable_cells(&self) -> usize {
        self.walls.iter().filter(|wall| !**wall).count()
    }

    /// Every floor cell reachable from the start cell.
    pub fn reachable(&self) -> HashSet<Position> {
        let mut seen = HashSet::new();
        if !self.is_walkable(self.start) {
            return seen;
        }
        let mut queue = VecDeque::from([self.start]);
        seen.insert(self.start);
        while let Some(pos) = queue.pop_front() {
            for direction in Direction::ALL {
                let next = pos.step(direction);
                if self.is_walkable(next) && seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        seen
    }

    /// Moves along a shortest floor path from `from` to `to` (breadth-first).
    pub fn shortest_path(&self, from: Position, to: Position) -> Option<Vec<Direction>> {
        if !self.is_walkable(from) || !self.is_walkable(to) {
            return None;
        }
        let mut came_from: HashMap<Position, (Position, Direction)> = HashMap::new();
        let mut queue = VecDeque::from([from]);
        let mut seen = HashSet::from([from]);
        while let Some(pos) = queue.pop_front() {
            if pos == to {
                let mut path = Vec::new();
                let mut cursor = pos;
                while let Some(&(prev, direction)) = came_from.get(&cursor) {
                    path.push(direction);
                    cursor = prev;
                }
                path.reverse();
                return Some(path);
            }
            for direction in Direction::ALL {
                let next = pos.step(direction);
                if self.is_walkable(next) && seen.insert(next) {
                    came_from.insert(next, (pos, direction));
                    queue.push_back(next);
                }
            }
        }
        None
    }
}

/// Layout for the given sense.
pub fn layout(sense: Sense) -> &'static MazeLayout {
    static LAYOUTS: OnceLock<[MazeLayout; 6]> = OnceLock::new();
    let layouts = LAYOUTS.get_or_init(|| Sense::ALL.map(build));
    &layouts[sense.index() as usize]
}

fn build(sense: Sense) -> MazeLayout {
    match sense {
        Sense::Hearing => MazeLayout::from_pattern(
            "HEARING Calibration",
            "Navigate by listening to the echoes. Sound waves reveal the path.",
            &[
                "###########",
                "#.........#",
                "#.###.###.#",
                "#.#.....#.#",
                "#.#.###.#.#",
                "#.#.#...#.#",
                "#.#.#.###.#",
                "#.........#",
                "###########",
            ],
            Position::new(1, 1),
            Position::new(9, 7),
        ),
        Sense::Smell => MazeLayout::from_pattern(
            "SMELL Calibration",
            "Follow the chemical gradients. The scent grows stronger near the goal.",
            &[
                "#############",
                "#...#.......#",
                "#.#.#.#####.#",
                "#.#...#...#.#",
                "#.#####.#.#.#",
                "#.......#.#.#",
                "#.#######.#.#",
                "#.........#.#",
                "#############",
            ],
            Position::new(1, 1),
            Position::new(11, 7),
        ),
        Sense::Taste => MazeLayout::from_pattern(
            "TASTE Calibration",
            "Distinguish molecular structures. Sweet, sour, bitter, umami. Learn them all.",
            &[
                "###########",
                "#.........#",
                "#.#######.#",
                "#.#.....#.#",
                "#.#.###.#.#",
                "#...#.#...#",
                "#.###.###.#",
                "#.#.....#.#",
                "#.#.###.#.#",
                "#.......#.#",
                "###########",
            ],
            Position::new(1, 1),
            Position::new(9, 9),
        ),
        Sense::Touch => MazeLayout::from_pattern(
            "TOUCH Calibration",
            "Feel pressure, temperature, texture. Your synthetic skin comes alive.",
            &[
                "#############",
                "#.....#.....#",
                "#.###.#.###.#",
                "#.#.#...#.#.#",
                "#.#.#####.#.#",
                "#.#.......#.#",
                "#.#########.#",
                "#.#.......#.#",
                "#.#.#####.#.#",
                "#...#.......#",
                "#############",
            ],
            Position::new(1, 1),
            Position::new(11, 9),
        ),
        Sense::Sight => MazeLayout::from_pattern(
            "SIGHT Calibration",
            "Process wavelengths. Light, shadow, color, depth must all integrate.",
            &[
                "###############",
                "#.............#",
                "#.###.#.###.#.#",
                "#.#...#...#.#.#",
                "#.#.#####.#.#.#",
                "#.#.......#.#.#",
                "#.#.#######.#.#",
                "#.#.#.......#.#",
                "#.#.#.#######.#",
                "#.....#.......#",
                "###############",
            ],
            Position::new(1, 1),
            Position::new(13, 9),
        ),
        Sense::Proprioception => MazeLayout::from_pattern(
            "PROPRIOCEPTION Calibration",
            "Know where your body is in space. Integration of all sensory data.",
            &[
                "###############",
                "#.............#",
                "#.###########.#",
                "#.#.........#.#",
                "#.#.#######.#.#",
                "#.#.#.....#.#.#",
                "#.#.#.###.#.#.#",
                "#.#.#.#.#.#.#.#",
                "#.#.#.#.#.#.#.#",
                "#.#...#...#...#",
                "#.#########.#.#",
                "#...........#.#",
                "###############",
            ],
            Position::new(1, 1),
            Position::new(13, 11),
        ),
    }
}
