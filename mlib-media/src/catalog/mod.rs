//! Catalog lookup: song id → servable media asset
//!
//! The catalog is owned by the library importer; the media server only
//! reads it. A song may have several assets (re-encodes). Only `completed`
//! assets are servable, and the most recently created one wins.

mod sqlite;

pub use sqlite::{init_schema, SqliteCatalog};

use crate::error::{MediaError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// Encoding status of an asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetStatus {
    Pending,
    Completed,
    Failed,
}

impl AssetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetStatus::Pending => "pending",
            AssetStatus::Completed => "completed",
            AssetStatus::Failed => "failed",
        }
    }
}

impl FromStr for AssetStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(AssetStatus::Pending),
            "completed" => Ok(AssetStatus::Completed),
            "failed" => Ok(AssetStatus::Failed),
            other => Err(format!("unknown asset status '{}'", other)),
        }
    }
}

/// One encoded file for a song
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaAsset {
    pub song_id: String,
    /// Absolute, or relative to the server's root folder
    pub file_path: PathBuf,
    pub status: AssetStatus,
    pub created_at: DateTime<Utc>,
}

/// Read access to the song catalog
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Whether the song id is known at all
    async fn song_exists(&self, song_id: &str) -> Result<bool>;

    /// Every asset recorded for the song, in any status
    async fn assets_for_song(&self, song_id: &str) -> Result<Vec<MediaAsset>>;
}

/// Pick the authoritative asset: latest `completed` one
///
/// Ties on `created_at` keep the first asset listed.
pub fn select_authoritative(assets: Vec<MediaAsset>) -> Option<MediaAsset> {
    assets
        .into_iter()
        .filter(|asset| asset.status == AssetStatus::Completed)
        .reduce(|best, asset| {
            if asset.created_at > best.created_at {
                asset
            } else {
                best
            }
        })
}

/// Resolve a song id to the asset that should be served
pub async fn resolve_completed_asset<C>(catalog: &C, song_id: &str) -> Result<MediaAsset>
where
    C: Catalog + ?Sized,
{
    if !catalog.song_exists(song_id).await? {
        return Err(MediaError::SongNotFound(song_id.to_string()));
    }

    let assets = catalog.assets_for_song(song_id).await?;
    select_authoritative(assets).ok_or_else(|| MediaError::NoCompletedAsset(song_id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn asset(path: &str, status: AssetStatus, day: u32) -> MediaAsset {
        MediaAsset {
            song_id: "song-a".to_string(),
            file_path: PathBuf::from(path),
            status,
            created_at: Utc.with_ymd_and_hms(2025, 3, day, 12, 0, 0).unwrap(),
        }
    }

    struct FixedCatalog {
        songs: Vec<&'static str>,
        assets: Vec<MediaAsset>,
    }

    #[async_trait]
    impl Catalog for FixedCatalog {
        async fn song_exists(&self, song_id: &str) -> Result<bool> {
            Ok(self.songs.contains(&song_id))
        }

        async fn assets_for_song(&self, song_id: &str) -> Result<Vec<MediaAsset>> {
            Ok(self
                .assets
                .iter()
                .filter(|a| a.song_id == song_id)
                .cloned()
                .collect())
        }
    }

    #[test]
    fn test_latest_completed_wins() {
        let selected = select_authoritative(vec![
            asset("old.mp3", AssetStatus::Completed, 1),
            asset("newest-pending.mp3", AssetStatus::Pending, 9),
            asset("new.mp3", AssetStatus::Completed, 5),
            asset("failed.mp3", AssetStatus::Failed, 7),
        ])
        .unwrap();

        assert_eq!(selected.file_path, PathBuf::from("new.mp3"));
    }

    #[test]
    fn test_tie_keeps_first() {
        let selected = select_authoritative(vec![
            asset("first.mp3", AssetStatus::Completed, 2),
            asset("second.mp3", AssetStatus::Completed, 2),
        ])
        .unwrap();

        assert_eq!(selected.file_path, PathBuf::from("first.mp3"));
    }

    #[test]
    fn test_no_completed_asset() {
        assert!(select_authoritative(vec![asset("p.mp3", AssetStatus::Pending, 1)]).is_none());
        assert!(select_authoritative(Vec::new()).is_none());
    }

    #[tokio::test]
    async fn test_resolve_distinguishes_unknown_song() {
        let catalog = FixedCatalog {
            songs: vec!["song-a"],
            assets: vec![asset("p.mp3", AssetStatus::Pending, 1)],
        };

        let unknown = resolve_completed_asset(&catalog, "song-z").await;
        assert!(matches!(unknown, Err(MediaError::SongNotFound(_))));

        let not_ready = resolve_completed_asset(&catalog, "song-a").await;
        assert!(matches!(not_ready, Err(MediaError::NoCompletedAsset(_))));
    }

    #[test]
    fn test_status_round_trip_strings() {
        for status in [AssetStatus::Pending, AssetStatus::Completed, AssetStatus::Failed] {
            assert_eq!(status.as_str().parse::<AssetStatus>().unwrap(), status);
        }
        assert!("encoding".parse::<AssetStatus>().is_err());
    }
}
