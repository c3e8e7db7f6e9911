//! External collaborator facades and swappable policies
//!
//! Each collaborator sits behind a trait so integration tests can pin
//! deterministic stand-ins: the content generator, the track oracle,
//! the song selection policy, and the Aurora emotion scorer.

pub mod content_generator;
pub mod emotion;
pub mod selection;
pub mod track_oracle;

pub use content_generator::{ContentGenerator, HttpContentGenerator};
pub use emotion::{EmotionScorer, GeneratorEmotionScorer};
pub use selection::{RandomSelector, Selection, SongSelector};
pub use track_oracle::{SpotifyOracle, TrackOracle};
