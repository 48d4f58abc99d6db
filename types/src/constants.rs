/// Total score cap. A playthrough wins only when every sense is complete and
/// the summed score stays at or below this value.
pub const SCORE_CAP: u64 = 20_000_000;

/// Per-sense score cap. A single maze run above this fails immediately.
pub const SENSE_SCORE_CAP: u64 = 10_000_000;

/// Largest single-sense score the contract accepts at all.
pub const MAX_SUBMITTED_SCORE: u64 = 10_000_000_000;

/// Number of senses that must be calibrated.
pub const SENSE_COUNT: usize = 6;

/// Bitfield with every sense bit set (bits 0-5).
pub const ALL_SENSES_MASK: u32 = 0b11_1111;

/// Points locked by each side when a session starts.
pub const DEFAULT_STAKE_POINTS: i128 = 1_000_000_000;

/// Time the lore screen stays up before it can be dismissed.
pub const LORE_DISPLAY_MS: u64 = 8_000;

/// Time the integration screen stays up before it can be dismissed.
pub const INTEGRATION_DISPLAY_MS: u64 = 10_000;

/// Time added to a run for every distinct hazard touched.
pub const HAZARD_PENALTY_MS: u64 = 20_000;

/// Manhattan radius of visibility under fog of war.
pub const FOG_RADIUS: u32 = 6;

/// Bits reserved for the sense index inside a maze id.
pub const MAZE_ID_SENSE_BITS: u32 = 8;
