//! Cosmic/intermediary song selection policy
//!
//! The draw from a player's listening history is an explicit, swappable
//! strategy so tests can pin a deterministic one.

use ophiuchus_common::models::Song;
use ophiuchus_common::{Error, Result};
use rand::seq::SliceRandom;

/// Result of a draw: one hidden target plus supporting tracks
#[derive(Debug, Clone)]
pub struct Selection {
    pub cosmic: Song,
    pub intermediaries: Vec<Song>,
}

/// Song selection strategy
pub trait SongSelector: Send + Sync {
    /// Draw a cosmic song and intermediary songs from the candidates.
    ///
    /// Requires at least two candidates (one cosmic, one intermediary).
    fn select(&self, candidates: &[Song]) -> Result<Selection>;
}

/// Uniform random draw: one cosmic song, then up to `intermediary_count`
/// distinct intermediaries from the remainder.
pub struct RandomSelector {
    pub intermediary_count: usize,
}

impl Default for RandomSelector {
    fn default() -> Self {
        Self {
            intermediary_count: 3,
        }
    }
}

impl SongSelector for RandomSelector {
    fn select(&self, candidates: &[Song]) -> Result<Selection> {
        if candidates.len() < 2 {
            return Err(Error::InvalidInput(
                "Not enough listening history to start a quest (need at least 2 tracks)"
                    .to_string(),
            ));
        }

        let mut rng = rand::thread_rng();
        let mut pool: Vec<&Song> = candidates.iter().collect();
        pool.shuffle(&mut rng);

        let cosmic = pool[0].clone();
        let intermediaries = pool[1..]
            .iter()
            .take(self.intermediary_count)
            .map(|s| (*s).clone())
            .collect();

        Ok(Selection {
            cosmic,
            intermediaries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn songs(n: usize) -> Vec<Song> {
        (0..n)
            .map(|i| Song {
                id: format!("id{}", i),
                name: format!("Track {}", i),
                artists: vec![format!("Artist {}", i)],
                album: "Album".to_string(),
                image_url: String::new(),
                spotify_url: None,
            })
            .collect()
    }

    #[test]
    fn test_rejects_too_few_candidates() {
        let selector = RandomSelector::default();
        assert!(selector.select(&songs(0)).is_err());
        assert!(selector.select(&songs(1)).is_err());
    }

    #[test]
    fn test_cosmic_is_distinct_from_intermediaries() {
        let selector = RandomSelector::default();
        for _ in 0..50 {
            let selection = selector.select(&songs(10)).unwrap();
            assert_eq!(selection.intermediaries.len(), 3);
            assert!(!selection
                .intermediaries
                .iter()
                .any(|s| s.id == selection.cosmic.id));
        }
    }

    #[test]
    fn test_small_history_yields_fewer_intermediaries() {
        let selector = RandomSelector::default();
        let selection = selector.select(&songs(2)).unwrap();
        assert_eq!(selection.intermediaries.len(), 1);
    }
}
