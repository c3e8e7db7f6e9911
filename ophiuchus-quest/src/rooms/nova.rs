//! Nova room - final identity reveal
//!
//! The terminal room: the player names the cosmic song itself. Exact
//! identifier equality; a correct guess produces the Ophiuchus identity
//! narrative and makes the session eligible for completion. Nova can
//! never be skipped.

use crate::rooms::{GuessOutcome, NOVA_POINTS};
use crate::services::ContentGenerator;
use ophiuchus_common::models::Song;
use ophiuchus_common::Result;

/// Prompt text framing the final guess
pub async fn generate_prompt(generator: &dyn ContentGenerator, cosmic: &Song) -> Result<String> {
    let prompt = format!(
        "Write a two-sentence dramatic invitation for a player about to name the hidden \
         cosmic song. The song is \"{}\" by {}; do not reveal either.",
        cosmic.name,
        cosmic.artists.join(", "),
    );
    generator.generate(&prompt).await
}

/// Exact identifier equality against the cosmic song
pub fn check(guess_id: &str, cosmic: &Song) -> bool {
    guess_id == cosmic.id
}

/// Outcome of a final guess plus, on success, the identity narrative
pub struct NovaResolution {
    pub outcome: GuessOutcome,
    pub identity: Option<String>,
}

/// Resolve a final identity guess
pub async fn resolve_guess(
    generator: &dyn ContentGenerator,
    guess_id: &str,
    cosmic: &Song,
) -> Result<NovaResolution> {
    if !check(guess_id, cosmic) {
        return Ok(NovaResolution {
            outcome: GuessOutcome::failure(),
            identity: None,
        });
    }

    let identity = generate_identity(generator, cosmic).await?;

    Ok(NovaResolution {
        outcome: GuessOutcome {
            correct: true,
            score: NOVA_POINTS,
            reward_clue: identity.clone(),
        },
        identity: Some(identity),
    })
}

/// The narrative reveal unlocked at quest completion
pub async fn generate_identity(
    generator: &dyn ContentGenerator,
    cosmic: &Song,
) -> Result<String> {
    let prompt = format!(
        "The player has found their cosmic song: \"{}\" by {}. Write a short celestial \
         'Ophiuchus identity' for them in two sentences, weaving in the song's character.",
        cosmic.name,
        cosmic.artists.join(", "),
    );
    generator.generate(&prompt).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_is_exact_id_equality() {
        let cosmic = Song {
            id: "cosmic1".to_string(),
            name: "Track".to_string(),
            artists: vec!["Artist".to_string()],
            album: "Album".to_string(),
            image_url: String::new(),
            spotify_url: None,
        };
        assert!(check("cosmic1", &cosmic));
        assert!(!check("Cosmic1", &cosmic));
        assert!(!check("cosmic", &cosmic));
    }
}
