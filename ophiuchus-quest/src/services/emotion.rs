//! Aurora emotion-match scoring
//!
//! Scores how well a guessed song matches the cosmic song's target
//! emotion on a 0-10 scale. The scorer is a pure interface over its
//! three inputs so tests can stub it; the production implementation
//! delegates the semantic judgment to the content generator with a
//! fixed prompt template and parses the numeric reply.

use std::sync::Arc;

use async_trait::async_trait;

use crate::services::ContentGenerator;
use ophiuchus_common::models::Song;
use ophiuchus_common::{Error, Result};

/// Maximum emotion-match score
pub const MAX_SCORE: u8 = 10;

/// Emotion-match scorer: deterministic given the same three inputs
#[async_trait]
pub trait EmotionScorer: Send + Sync {
    /// Score 0-10 for how strongly `guess` evokes `emotion` relative to
    /// the cosmic song.
    async fn score(&self, guess: &Song, cosmic: &Song, emotion: &str) -> Result<u8>;
}

/// Scorer backed by the content generator
pub struct GeneratorEmotionScorer {
    generator: Arc<dyn ContentGenerator>,
}

impl GeneratorEmotionScorer {
    pub fn new(generator: Arc<dyn ContentGenerator>) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl EmotionScorer for GeneratorEmotionScorer {
    async fn score(&self, guess: &Song, cosmic: &Song, emotion: &str) -> Result<u8> {
        let prompt = format!(
            "On a scale from 0 to 10, how strongly does the song \"{}\" by {} \
             evoke the emotion \"{}\" carried by \"{}\" by {}? \
             Reply with a single integer between 0 and 10 and nothing else.",
            guess.name,
            guess.artists.join(", "),
            emotion,
            cosmic.name,
            cosmic.artists.join(", "),
        );

        let reply = self.generator.generate(&prompt).await?;

        parse_score(&reply).ok_or_else(|| {
            Error::Generation(format!("Unparseable emotion score reply: {:?}", reply))
        })
    }
}

/// Extract the first integer from a generator reply, clamped to 0-10
pub fn parse_score(text: &str) -> Option<u8> {
    let digits: String = text
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();

    if digits.is_empty() {
        return None;
    }

    let value: u64 = digits.parse().ok()?;
    Some(value.min(MAX_SCORE as u64) as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_integer() {
        assert_eq!(parse_score("7"), Some(7));
        assert_eq!(parse_score("0"), Some(0));
        assert_eq!(parse_score("10"), Some(10));
    }

    #[test]
    fn test_parse_integer_embedded_in_prose() {
        assert_eq!(parse_score("I'd say 8 out of 10."), Some(8));
        assert_eq!(parse_score("Score: 3"), Some(3));
    }

    #[test]
    fn test_out_of_range_clamps_to_max() {
        assert_eq!(parse_score("11"), Some(10));
        assert_eq!(parse_score("100"), Some(10));
    }

    #[test]
    fn test_no_digits_is_none() {
        assert_eq!(parse_score("no idea"), None);
        assert_eq!(parse_score(""), None);
    }
}
