//! Cradle room - hidden artist trivia
//!
//! The player may ask up to five free-text questions about the hidden
//! artist (the cosmic song's first-credited artist), then guess the
//! name. The guess check is exact string equality after normalization
//! (trim + case-fold); fuzzy matching is an explicit non-feature for
//! now.

use crate::rooms::{CRADLE_MAX_QUESTIONS, CRADLE_POINTS, GuessOutcome};
use crate::services::ContentGenerator;
use ophiuchus_common::models::Song;
use ophiuchus_common::{Error, Result};

/// The artist the player must identify
pub fn hidden_artist(cosmic: &Song) -> Result<&str> {
    cosmic
        .primary_artist()
        .ok_or_else(|| Error::Internal("Cosmic song has no credited artist".to_string()))
}

/// Opening trivia framing shown when the room is entered
pub async fn generate_intro(generator: &dyn ContentGenerator, cosmic: &Song) -> Result<String> {
    let artist = hidden_artist(cosmic)?;
    let prompt = format!(
        "Write a two-sentence mysterious introduction for a guessing game about the musical \
         artist \"{}\". Do not reveal the name or any song title.",
        artist,
    );
    generator.generate(&prompt).await
}

/// Questions left given how many were already asked
pub fn questions_remaining(questions_asked: i64) -> i64 {
    (CRADLE_MAX_QUESTIONS - questions_asked).max(0)
}

/// Whether another question may be asked
pub fn can_ask(questions_asked: i64) -> bool {
    questions_asked < CRADLE_MAX_QUESTIONS
}

/// Answer one free-text question about the hidden artist
pub async fn answer_question(
    generator: &dyn ContentGenerator,
    cosmic: &Song,
    question: &str,
) -> Result<String> {
    let artist = hidden_artist(cosmic)?;
    let prompt = format!(
        "You are the keeper of a secret: the musical artist \"{}\". A player asks: \"{}\". \
         Answer truthfully in one or two sentences without ever naming the artist or their songs.",
        artist, question,
    );
    generator.generate(&prompt).await
}

/// Trim and case-fold for comparison
pub fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Exact match after normalization
pub fn check_artist(guess: &str, target_artist: &str) -> bool {
    let guess = normalize(guess);
    !guess.is_empty() && guess == normalize(target_artist)
}

/// Resolve an artist guess against the cosmic song's first artist
pub async fn resolve_guess(
    generator: &dyn ContentGenerator,
    guess: &str,
    cosmic: &Song,
) -> Result<GuessOutcome> {
    let artist = hidden_artist(cosmic)?;

    if !check_artist(guess, artist) {
        return Ok(GuessOutcome::failure());
    }

    let reward_clue = reward_clue(generator, cosmic).await?;

    Ok(GuessOutcome {
        correct: true,
        score: CRADLE_POINTS,
        reward_clue,
    })
}

/// Reward clue toward the cosmic song, unlocked by naming the artist
pub async fn reward_clue(generator: &dyn ContentGenerator, cosmic: &Song) -> Result<String> {
    let prompt = format!(
        "The player has discovered the artist {}. Write one clue about which of their songs \
         is the hidden one, alluding to \"{}\" without naming it.",
        cosmic.artists.join(", "),
        cosmic.name,
    );
    generator.generate(&prompt).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_artist_normalizes_case_and_whitespace() {
        assert!(check_artist("The Killers", "The Killers"));
        assert!(check_artist("  the killers  ", "The Killers"));
        assert!(check_artist("THE KILLERS", "the killers"));
    }

    #[test]
    fn test_check_artist_is_exact_after_normalization() {
        assert!(!check_artist("Killers", "The Killers"));
        assert!(!check_artist("The Killer", "The Killers"));
        assert!(!check_artist("", "The Killers"));
        assert!(!check_artist("   ", "The Killers"));
    }

    #[test]
    fn test_question_quota() {
        assert!(can_ask(0));
        assert!(can_ask(4));
        assert!(!can_ask(5));
        assert!(!can_ask(6));

        assert_eq!(questions_remaining(0), 5);
        assert_eq!(questions_remaining(5), 0);
        assert_eq!(questions_remaining(7), 0);
    }
}
