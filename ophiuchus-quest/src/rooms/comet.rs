//! Comet room - lyric flash puzzle
//!
//! A fragment-style lyric impression of an intermediary song; the
//! player must name the track it came from. Uses the second
//! intermediary when the session has at least two, otherwise the first.

use crate::rooms::{COMET_POINTS, GuessOutcome};
use crate::services::ContentGenerator;
use ophiuchus_common::models::Song;
use ophiuchus_common::{Error, Result};

/// The intermediary song the lyric flash is built from: index 1 when at
/// least two intermediaries exist, else index 0.
pub fn puzzle_source(intermediaries: &[Song]) -> Result<&Song> {
    let index = if intermediaries.len() >= 2 { 1 } else { 0 };
    intermediaries
        .get(index)
        .ok_or_else(|| Error::Internal("Session has no intermediary songs".to_string()))
}

/// Generate the lyric flash for the source song
pub async fn generate_lyric_flash(
    generator: &dyn ContentGenerator,
    source: &Song,
) -> Result<String> {
    let prompt = format!(
        "Write a brief, original lyric fragment of two or three lines in the spirit of the \
         song \"{}\" by {}. Echo its themes and tone, but never quote it or name it.",
        source.name,
        source.artists.join(", "),
    );
    generator.generate(&prompt).await
}

/// Exact identifier equality - no fuzzy matching or partial credit
pub fn check(guess_id: &str, target: &Song) -> bool {
    guess_id == target.id
}

/// Resolve a track guess against the puzzle source
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
        score: COMET_POINTS,
        reward_clue,
    })
}

/// Reward clue toward the cosmic song
pub async fn reward_clue(generator: &dyn ContentGenerator, cosmic: &Song) -> Result<String> {
    let prompt = format!(
        "Write one clue about the hidden song \"{}\" by {}, hinting at the era or album it \
         belongs to without naming the title or artist.",
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
            name: format!("Track {}", id),
            artists: vec!["Artist".to_string()],
            album: "Album".to_string(),
            image_url: String::new(),
            spotify_url: None,
        }
    }

    #[test]
    fn test_source_is_second_intermediary_when_two_exist() {
        let songs = vec![song("i1"), song("i2"), song("i3")];
        assert_eq!(puzzle_source(&songs).unwrap().id, "i2");

        let two = vec![song("i1"), song("i2")];
        assert_eq!(puzzle_source(&two).unwrap().id, "i2");
    }

    #[test]
    fn test_source_falls_back_to_first_intermediary() {
        let one = vec![song("i1")];
        assert_eq!(puzzle_source(&one).unwrap().id, "i1");
        assert!(puzzle_source(&[]).is_err());
    }

    #[test]
    fn test_check_is_exact_id_equality() {
        let target = song("xyz");
        assert!(check("xyz", &target));
        assert!(!check("XYZ", &target));
        assert!(!check("xy", &target));
    }
}
