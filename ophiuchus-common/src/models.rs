//! Game data model
//!
//! Value types shared between the quest service, the persistence layer,
//! and the archival rollups. Aggregates (`GameSession`, `UserProfile`)
//! are stored as JSON text columns; everything here derives serde.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A track drawn from the player's listening history.
///
/// Identity is `id` (opaque catalog identifier). Immutable once embedded
/// in a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Song {
    /// Opaque external catalog identifier
    pub id: String,
    /// Track title
    pub name: String,
    /// Credited artists, primary artist first
    pub artists: Vec<String>,
    /// Album title
    pub album: String,
    /// Cover art URL
    pub image_url: String,
    /// External catalog page URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spotify_url: Option<String>,
}

impl Song {
    /// Primary (first-credited) artist, if any
    pub fn primary_artist(&self) -> Option<&str> {
        self.artists.first().map(String::as_str)
    }
}

/// The five quest rooms, in traversal order.
///
/// Identifiers are fixed and case-sensitive on the wire (`nebula`,
/// `cradle`, `comet`, `aurora`, `nova`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Room {
    Nebula,
    Cradle,
    Comet,
    Aurora,
    Nova,
}

impl Room {
    /// All rooms in traversal order
    pub const ALL: [Room; 5] = [
        Room::Nebula,
        Room::Cradle,
        Room::Comet,
        Room::Aurora,
        Room::Nova,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Room::Nebula => "nebula",
            Room::Cradle => "cradle",
            Room::Comet => "comet",
            Room::Aurora => "aurora",
            Room::Nova => "nova",
        }
    }

    /// Whether the room may be skipped. Nova is the terminal identity
    /// room and can never be skipped.
    pub fn skippable(&self) -> bool {
        !matches!(self, Room::Nova)
    }
}

impl fmt::Display for Room {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Room {
    type Err = crate::Error;

    /// Case-sensitive parse; rejects anything outside the fixed set.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "nebula" => Ok(Room::Nebula),
            "cradle" => Ok(Room::Cradle),
            "comet" => Ok(Room::Comet),
            "aurora" => Ok(Room::Aurora),
            "nova" => Ok(Room::Nova),
            other => Err(crate::Error::InvalidInput(format!(
                "Invalid room identifier: {}",
                other
            ))),
        }
    }
}

/// Persisted outcome record for one room within one session.
///
/// Once `completed` is true the record is frozen: repeated puzzle
/// requests for the room must return the stored fields verbatim rather
/// than regenerate content.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoomClue {
    /// Puzzle or reward text shown to the player
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clue: Option<String>,
    /// Whether the last guess was correct
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct: Option<bool>,
    /// Points awarded for this room
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<i64>,
    /// Guess attempts made so far
    #[serde(default)]
    pub attempts: i64,
    /// Whether the room is resolved (frozen)
    #[serde(default)]
    pub completed: bool,
    /// Opaque audio blob reference, where the room has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    /// Free-text questions consumed (Cradle only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub questions_asked: Option<i64>,
    /// Target emotion descriptor pinned at puzzle time (Aurora only);
    /// scoring must judge guesses against this stored value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_emotion: Option<String>,
}

/// The central mutable aggregate: one in-flight quest per player.
///
/// Mutated exclusively by the progression controller; deleted after
/// successful archival into the profile/leaderboard rollups.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSession {
    pub session_id: Uuid,
    /// Owning user; every read/write must verify ownership
    pub user_id: String,
    pub spotify_user_id: String,
    /// The hidden target track. Never exposed pre-completion.
    pub cosmic_song: Song,
    /// Supporting tracks used as puzzle source material
    pub intermediary_songs: Vec<Song>,
    pub initial_clue: String,
    /// Append-only, no duplicates
    pub rooms_completed: Vec<Room>,
    pub room_clues: HashMap<Room, RoomClue>,
    /// Final identity guess counter
    pub final_guesses: i64,
    pub completed: bool,
    /// Narrative reveal payload, set when Nova is resolved
    pub ophiuchus_identity: Option<String>,
    /// Optimistic-concurrency counter for read-modify-write merges
    #[serde(default)]
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

impl GameSession {
    /// Sum of awarded points over all room clues
    pub fn total_points(&self) -> i64 {
        self.room_clues.values().filter_map(|c| c.score).sum()
    }

    /// Stored clue record for a room, if any interaction happened yet
    pub fn room_clue(&self, room: Room) -> Option<&RoomClue> {
        self.room_clues.get(&room)
    }

    /// Whether a room has been resolved (completed or skipped)
    pub fn is_room_completed(&self, room: Room) -> bool {
        self.room_clues
            .get(&room)
            .map(|c| c.completed)
            .unwrap_or(false)
    }

    /// Per-room point breakdown for archival
    pub fn room_points(&self) -> HashMap<Room, i64> {
        self.room_clues
            .iter()
            .map(|(room, clue)| (*room, clue.score.unwrap_or(0)))
            .collect()
    }
}

/// Immutable snapshot of a finished quest, appended to the profile
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedGame {
    pub session_id: Uuid,
    /// Summary of the revealed cosmic song
    pub cosmic_song: Song,
    pub total_points: i64,
    pub room_points: HashMap<Room, i64>,
    pub final_guess_attempts: i64,
    pub ophiuchus_identity: Option<String>,
    pub completed_at: DateTime<Utc>,
}

/// Durable per-user record; `completed_games` is append-only and only
/// the archival step mutates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: String,
    pub spotify_user_id: String,
    pub username: String,
    pub total_games_played: i64,
    pub total_points: i64,
    pub completed_games: Vec<CompletedGame>,
}

impl UserProfile {
    /// Fresh profile for a user with no archived games yet
    pub fn new(user_id: &str, spotify_user_id: &str, username: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            spotify_user_id: spotify_user_id.to_string(),
            username: username.to_string(),
            total_games_played: 0,
            total_points: 0,
            completed_games: Vec::new(),
        }
    }

    /// Whether a session has already been folded into this profile
    pub fn has_archived(&self, session_id: Uuid) -> bool {
        self.completed_games
            .iter()
            .any(|g| g.session_id == session_id)
    }
}

/// Durable per-user ranking rollup. `total_points` only increases;
/// `highest_single_game_points` is a running max.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub user_id: String,
    pub username: String,
    pub spotify_user_id: String,
    pub total_points: i64,
    pub total_games_completed: i64,
    pub highest_single_game_points: i64,
    pub last_played_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn song(id: &str) -> Song {
        Song {
            id: id.to_string(),
            name: format!("Track {}", id),
            artists: vec!["Artist A".to_string(), "Artist B".to_string()],
            album: "Album".to_string(),
            image_url: "https://img.example/cover.jpg".to_string(),
            spotify_url: None,
        }
    }

    #[test]
    fn test_room_parse_is_case_sensitive() {
        assert_eq!("nebula".parse::<Room>().unwrap(), Room::Nebula);
        assert!("Nebula".parse::<Room>().is_err());
        assert!("NOVA".parse::<Room>().is_err());
        assert!("void".parse::<Room>().is_err());
    }

    #[test]
    fn test_nova_is_not_skippable() {
        assert!(Room::Nebula.skippable());
        assert!(Room::Cradle.skippable());
        assert!(Room::Comet.skippable());
        assert!(Room::Aurora.skippable());
        assert!(!Room::Nova.skippable());
    }

    #[test]
    fn test_room_clue_map_round_trips_as_json() {
        let mut clues = HashMap::new();
        clues.insert(
            Room::Comet,
            RoomClue {
                clue: Some("a lyric".to_string()),
                correct: Some(true),
                score: Some(100),
                attempts: 2,
                completed: true,
                ..Default::default()
            },
        );

        let json = serde_json::to_string(&clues).unwrap();
        assert!(json.contains("\"comet\""));

        let back: HashMap<Room, RoomClue> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, clues);
    }

    #[test]
    fn test_total_points_sums_over_rooms() {
        let mut session = GameSession {
            session_id: Uuid::new_v4(),
            user_id: "u1".to_string(),
            spotify_user_id: "sp1".to_string(),
            cosmic_song: song("cosmic"),
            intermediary_songs: vec![song("i1"), song("i2")],
            initial_clue: "look up".to_string(),
            rooms_completed: Vec::new(),
            room_clues: HashMap::new(),
            final_guesses: 0,
            completed: false,
            ophiuchus_identity: None,
            version: 0,
            created_at: Utc::now(),
        };

        session.room_clues.insert(
            Room::Nebula,
            RoomClue {
                score: Some(100),
                completed: true,
                ..Default::default()
            },
        );
        session.room_clues.insert(
            Room::Aurora,
            RoomClue {
                score: Some(80),
                completed: true,
                ..Default::default()
            },
        );
        // Skipped room contributes nothing
        session.room_clues.insert(
            Room::Cradle,
            RoomClue {
                score: Some(0),
                completed: true,
                clue: Some("Room skipped".to_string()),
                ..Default::default()
            },
        );

        assert_eq!(session.total_points(), 180);
    }

    #[test]
    fn test_profile_detects_already_archived_session() {
        let sid = Uuid::new_v4();
        let mut profile = UserProfile::new("u1", "sp1", "player one");
        assert!(!profile.has_archived(sid));

        profile.completed_games.push(CompletedGame {
            session_id: sid,
            cosmic_song: song("cosmic"),
            total_points: 250,
            room_points: HashMap::new(),
            final_guess_attempts: 1,
            ophiuchus_identity: Some("Serpent Bearer".to_string()),
            completed_at: Utc::now(),
        });

        assert!(profile.has_archived(sid));
        assert!(!profile.has_archived(Uuid::new_v4()));
    }
}
