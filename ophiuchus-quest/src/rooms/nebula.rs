//! Nebula room - riddle puzzle
//!
//! The guessable riddle is built from the first intermediary song; the
//! reward and penalty clues are built from the cosmic song. The two
//! slots stay independently addressable: the song the riddle describes
//! is never the song the reward clue hints at.

use crate::rooms::{GuessOutcome, NEBULA_POINTS};
use crate::services::ContentGenerator;
use ophiuchus_common::models::Song;
use ophiuchus_common::{Error, Result};

/// The intermediary song the riddle is built from and the player must
/// guess.
pub fn puzzle_source(intermediaries: &[Song]) -> Result<&Song> {
    intermediaries
        .first()
        .ok_or_else(|| Error::Internal("Session has no intermediary songs".to_string()))
}

/// Generate the riddle describing the puzzle source song
pub async fn generate_riddle(generator: &dyn ContentGenerator, source: &Song) -> Result<String> {
    let prompt = format!(
        "Write a short, evocative riddle in at most four lines whose answer is the song \
         \"{}\" by {}. Hint at its mood and imagery without naming the title or artist.",
        source.name,
        source.artists.join(", "),
    );
    generator.generate(&prompt).await
}

/// Exact identifier equality - no fuzzy matching or partial credit
pub fn check(guess_id: &str, target: &Song) -> bool {
    guess_id == target.id
}

/// Resolve a guess. A correct guess earns the fixed reward points and a
/// reward clue about the cosmic song; a wrong guess earns a vaguer
/// penalty clue in the response but no reward.
pub async fn resolve_guess(
    generator: &dyn ContentGenerator,
    guess_id: &str,
    target: &Song,
    cosmic: &Song,
) -> Result<GuessOutcome> {
    if !check(guess_id, target) {
        return Ok(GuessOutcome::failure());
    }

    let reward_clue = reward_clue(generator, cosmic).await?;

    Ok(GuessOutcome {
        correct: true,
        score: NEBULA_POINTS,
        reward_clue,
    })
}

/// Reward variant: a pointed clue toward the cosmic song
pub async fn reward_clue(generator: &dyn ContentGenerator, cosmic: &Song) -> Result<String> {
    let prompt = format!(
        "Write one revealing clue about the hidden song \"{}\" by {}. Mention a distinctive \
         detail of its sound or story, but do not name the title or artist.",
        cosmic.name,
        cosmic.artists.join(", "),
    );
    generator.generate(&prompt).await
}

/// Penalty variant: a deliberately vague consolation hint
pub async fn penalty_clue(generator: &dyn ContentGenerator, cosmic: &Song) -> Result<String> {
    let prompt = format!(
        "Write one vague, teasing hint about a hidden song in the genre of \"{}\" by {}. \
         Give away as little as possible; do not name the title or artist.",
        cosmic.name,
        cosmic.artists.join(", "),
    );
    generator.generate(&prompt).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn song(id: &str) -> Song {
        Song {
            id: id.to_string(),
            name: "Track".to_string(),
            artists: vec!["Artist".to_string()],
            album: "Album".to_string(),
            image_url: String::new(),
            spotify_url: None,
        }
    }

    #[test]
    fn test_check_is_exact_id_equality() {
        let target = song("abc123");
        assert!(check("abc123", &target));
        assert!(!check("ABC123", &target));
        assert!(!check("abc1234", &target));
        assert!(!check("", &target));
    }

    #[test]
    fn test_puzzle_source_is_first_intermediary() {
        let songs = vec![song("i1"), song("i2")];
        assert_eq!(puzzle_source(&songs).unwrap().id, "i1");
        assert!(puzzle_source(&[]).is_err());
    }
}
