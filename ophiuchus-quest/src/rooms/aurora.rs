//! Aurora room - emotional vignette
//!
//! The generator distills the cosmic song into a single target emotion
//! and an emotional vignette. The player answers with a song of their
//! own; the emotion scorer judges the match 0-10, and a score at or
//! above the threshold unlocks the reward clue. Points scale with the
//! score.

use crate::rooms::{AURORA_POINT_MULTIPLIER, AURORA_REWARD_THRESHOLD, GuessOutcome};
use crate::services::{ContentGenerator, EmotionScorer};
use ophiuchus_common::models::Song;
use ophiuchus_common::Result;

/// Generated puzzle content: the vignette shown to the player and the
/// target emotion pinned for scoring.
#[derive(Debug, Clone)]
pub struct Vignette {
    pub text: String,
    pub emotion: String,
}

/// Distill the cosmic song's dominant emotion, then write the vignette
/// around it. The emotion is stored with the room clue so scoring stays
/// pinned to one descriptor.
pub async fn generate_vignette(
    generator: &dyn ContentGenerator,
    cosmic: &Song,
) -> Result<Vignette> {
    let emotion_prompt = format!(
        "Name the single dominant emotion of the song \"{}\" by {}. \
         Reply with one lowercase word and nothing else.",
        cosmic.name,
        cosmic.artists.join(", "),
    );
    let emotion = generator
        .generate(&emotion_prompt)
        .await?
        .to_lowercase()
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_string();

    let vignette_prompt = format!(
        "Write a three-sentence emotional vignette evoking {}, inspired by the song \
         \"{}\" by {}, without naming the song or the artist.",
        emotion,
        cosmic.name,
        cosmic.artists.join(", "),
    );
    let text = generator.generate(&vignette_prompt).await?;

    Ok(Vignette { text, emotion })
}

/// Whether a score unlocks the reward clue
pub fn unlocks_reward(score: u8) -> bool {
    score >= AURORA_REWARD_THRESHOLD
}

/// Points awarded for a passing score
pub fn points_for(score: u8) -> i64 {
    score as i64 * AURORA_POINT_MULTIPLIER
}

/// Score a guessed song against the stored target emotion and resolve
/// the outcome. Reward clue only when the threshold is met.
pub async fn resolve_guess(
    generator: &dyn ContentGenerator,
    scorer: &dyn EmotionScorer,
    guess: &Song,
    cosmic: &Song,
    emotion: &str,
) -> Result<(GuessOutcome, u8)> {
    let score = scorer.score(guess, cosmic, emotion).await?;

    if !unlocks_reward(score) {
        return Ok((GuessOutcome::failure(), score));
    }

    let reward_clue = reward_clue(generator, cosmic).await?;

    Ok((
        GuessOutcome {
            correct: true,
            score: points_for(score),
            reward_clue,
        },
        score,
    ))
}

/// Reward clue toward the cosmic song
pub async fn reward_clue(generator: &dyn ContentGenerator, cosmic: &Song) -> Result<String> {
    let prompt = format!(
        "Write one clue about the hidden song \"{}\" by {}, describing the feeling of its \
         opening moments without naming the title or artist.",
        cosmic.name,
        cosmic.artists.join(", "),
    );
    generator.generate(&prompt).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_is_seven() {
        assert!(!unlocks_reward(0));
        assert!(!unlocks_reward(6));
        assert!(unlocks_reward(7));
        assert!(unlocks_reward(10));
    }

    #[test]
    fn test_points_scale_with_score() {
        assert_eq!(points_for(7), 70);
        assert_eq!(points_for(10), 100);
    }
}
