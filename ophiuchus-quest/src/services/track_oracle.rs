//! Track oracle client (Spotify Web API)
//!
//! Read-only music catalog access: ranked listening history, free-text
//! track search, and lookup by ID. The oracle's wire format is mapped to
//! the internal `Song` value type once here at the boundary; untyped
//! responses never propagate inward.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use ophiuchus_common::config::OracleConfig;
use ophiuchus_common::models::Song;
use ophiuchus_common::{Error, Result};

/// Music catalog collaborator
#[async_trait]
pub trait TrackOracle: Send + Sync {
    /// Ranked listening history for the bearer's user
    async fn top_tracks(&self, bearer: &str, limit: usize) -> Result<Vec<Song>>;

    /// Free-text track search
    async fn search_track(&self, bearer: &str, query: &str, limit: usize) -> Result<Vec<Song>>;

    /// Resolve a single track by catalog ID
    async fn get_track(&self, bearer: &str, id: &str) -> Result<Song>;
}

// Wire format structs - Spotify Web API shapes

#[derive(Debug, Deserialize)]
struct WireTrack {
    id: String,
    name: String,
    artists: Vec<WireArtist>,
    album: WireAlbum,
    #[serde(default)]
    external_urls: WireExternalUrls,
}

#[derive(Debug, Deserialize)]
struct WireArtist {
    name: String,
}

#[derive(Debug, Deserialize)]
struct WireAlbum {
    name: String,
    #[serde(default)]
    images: Vec<WireImage>,
}

#[derive(Debug, Deserialize)]
struct WireImage {
    url: String,
}

#[derive(Debug, Default, Deserialize)]
struct WireExternalUrls {
    spotify: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WirePaging {
    items: Vec<WireTrack>,
}

#[derive(Debug, Deserialize)]
struct WireSearchResponse {
    tracks: WirePaging,
}

impl From<WireTrack> for Song {
    fn from(track: WireTrack) -> Self {
        Song {
            id: track.id,
            name: track.name,
            artists: track.artists.into_iter().map(|a| a.name).collect(),
            album: track.album.name,
            image_url: track
                .album
                .images
                .into_iter()
                .next()
                .map(|i| i.url)
                .unwrap_or_default(),
            spotify_url: track.external_urls.spotify,
        }
    }
}

/// Spotify Web API client
pub struct SpotifyOracle {
    http_client: reqwest::Client,
    base_url: String,
}

impl SpotifyOracle {
    pub fn new(config: &OracleConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Oracle(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        bearer: &str,
        url: &str,
    ) -> Result<T> {
        let response = self
            .http_client
            .get(url)
            .bearer_auth(bearer)
            .send()
            .await
            .map_err(|e| Error::Oracle(format!("Request failed: {}", e)))?;

        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(Error::Unauthorized(
                "Catalog credential rejected or expired".to_string(),
            ));
        }

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::NotFound("Track not found in catalog".to_string()));
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(Error::Oracle(format!(
                "Catalog returned {}: {}",
                status, error_text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| Error::Oracle(format!("Invalid response body: {}", e)))
    }
}

#[async_trait]
impl TrackOracle for SpotifyOracle {
    async fn top_tracks(&self, bearer: &str, limit: usize) -> Result<Vec<Song>> {
        let url = format!("{}/me/top/tracks?limit={}", self.base_url, limit);
        let paging: WirePaging = self.get_json(bearer, &url).await?;

        tracing::debug!(count = paging.items.len(), "Fetched top tracks from catalog");

        Ok(paging.items.into_iter().map(Song::from).collect())
    }

    async fn search_track(&self, bearer: &str, query: &str, limit: usize) -> Result<Vec<Song>> {
        let url = format!(
            "{}/search?q={}&type=track&limit={}",
            self.base_url,
            urlencode(query),
            limit
        );
        let search: WireSearchResponse = self.get_json(bearer, &url).await?;

        Ok(search.tracks.items.into_iter().map(Song::from).collect())
    }

    async fn get_track(&self, bearer: &str, id: &str) -> Result<Song> {
        let url = format!("{}/tracks/{}", self.base_url, id);
        let track: WireTrack = self.get_json(bearer, &url).await?;
        Ok(track.into())
    }
}

/// Minimal percent-encoding for query strings
fn urlencode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            b' ' => out.push('+'),
            other => out.push_str(&format!("%{:02X}", other)),
        }
    }
    out
}
