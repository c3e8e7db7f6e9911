//! Room puzzle engines
//!
//! One engine per room. Each exposes a generate operation (puzzle
//! content from a source track) and a check operation (validate a
//! guess, optionally produce a reward clue). Reward clues are produced
//! only on success; a failed check always carries an empty reward and
//! never unlocks anything.

pub mod aurora;
pub mod comet;
pub mod cradle;
pub mod nebula;
pub mod nova;

/// Fixed reward points per room
pub const NEBULA_POINTS: i64 = 100;
pub const CRADLE_POINTS: i64 = 150;
pub const COMET_POINTS: i64 = 100;
pub const NOVA_POINTS: i64 = 200;

/// Aurora awards score x multiplier when the threshold is met
pub const AURORA_POINT_MULTIPLIER: i64 = 10;
pub const AURORA_REWARD_THRESHOLD: u8 = 7;

/// Cradle free-text question quota per session
pub const CRADLE_MAX_QUESTIONS: i64 = 5;

/// Clue text recorded when a room is skipped
pub const SKIP_CLUE: &str = "Room skipped";

/// Result of a guess-check: reward clue is non-empty only on success
#[derive(Debug, Clone)]
pub struct GuessOutcome {
    pub correct: bool,
    pub score: i64,
    pub reward_clue: String,
}

impl GuessOutcome {
    pub fn failure() -> Self {
        Self {
            correct: false,
            score: 0,
            reward_clue: String::new(),
        }
    }
}
