//! SQLite-backed catalog

use super::{AssetStatus, Catalog, MediaAsset};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite, SqlitePool};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use uuid::Uuid;

/// Create catalog tables if missing
///
/// `files.created_at` is stored as RFC 3339 text.
pub async fn init_schema(pool: &Pool<Sqlite>) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS songs (
            song_id TEXT PRIMARY KEY,
            title TEXT,
            creator_name TEXT,
            created_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS files (
            file_id TEXT PRIMARY KEY,
            song_id TEXT NOT NULL,
            path TEXT NOT NULL,
            status TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_files_song_id ON files(song_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Catalog reader over the `songs` and `files` tables
#[derive(Clone)]
pub struct SqliteCatalog {
    pool: SqlitePool,
}

impl SqliteCatalog {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if needed) the database file and ensure the schema
    pub async fn connect(path: &Path) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        init_schema(&pool).await?;
        info!("Catalog database ready: {}", path.display());

        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Insert or replace a song row
    pub async fn register_song(&self, song_id: &str, title: &str, creator_name: &str) -> Result<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO songs (song_id, title, creator_name, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(song_id)
        .bind(title)
        .bind(creator_name)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Record an asset for a song, returning its generated file id
    pub async fn register_asset(&self, asset: &MediaAsset) -> Result<Uuid> {
        let file_id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO files (file_id, song_id, path, status, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(file_id.to_string())
        .bind(&asset.song_id)
        .bind(asset.file_path.to_string_lossy().to_string())
        .bind(asset.status.as_str())
        .bind(asset.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(file_id)
    }
}

#[async_trait]
impl Catalog for SqliteCatalog {
    async fn song_exists(&self, song_id: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM songs WHERE song_id = ?)")
            .bind(song_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn assets_for_song(&self, song_id: &str) -> Result<Vec<MediaAsset>> {
        let rows = sqlx::query_as::<_, (String, String, String)>(
            "SELECT path, status, created_at FROM files WHERE song_id = ?",
        )
        .bind(song_id)
        .fetch_all(&self.pool)
        .await?;

        // Rows with an unknown status or unreadable timestamp are not servable
        let assets = rows
            .into_iter()
            .filter_map(|(path, status, created_at)| {
                let status = match status.parse::<AssetStatus>() {
                    Ok(status) => status,
                    Err(e) => {
                        warn!("Skipping asset {} of song {}: {}", path, song_id, e);
                        return None;
                    }
                };
                let created_at = match DateTime::parse_from_rfc3339(&created_at) {
                    Ok(ts) => ts.with_timezone(&Utc),
                    Err(e) => {
                        warn!(
                            "Skipping asset {} of song {}: bad created_at '{}': {}",
                            path, song_id, created_at, e
                        );
                        return None;
                    }
                };
                Some(MediaAsset {
                    song_id: song_id.to_string(),
                    file_path: PathBuf::from(path),
                    status,
                    created_at,
                })
            })
            .collect();

        Ok(assets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::resolve_completed_asset;
    use crate::error::MediaError;
    use chrono::Duration;

    async fn memory_catalog() -> SqliteCatalog {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        init_schema(&pool).await.unwrap();
        SqliteCatalog::new(pool)
    }

    #[tokio::test]
    async fn test_song_exists() {
        let catalog = memory_catalog().await;
        catalog.register_song("sm1", "Title", "Creator").await.unwrap();

        assert!(catalog.song_exists("sm1").await.unwrap());
        assert!(!catalog.song_exists("sm2").await.unwrap());
    }

    #[tokio::test]
    async fn test_resolve_latest_completed() {
        let catalog = memory_catalog().await;
        catalog.register_song("sm1", "Title", "Creator").await.unwrap();

        let now = Utc::now();
        for (path, status, age_days) in [
            ("v1.mp3", AssetStatus::Completed, 10),
            ("v2.mp3", AssetStatus::Completed, 2),
            ("v3.mp3", AssetStatus::Pending, 0),
        ] {
            catalog
                .register_asset(&MediaAsset {
                    song_id: "sm1".to_string(),
                    file_path: PathBuf::from(path),
                    status,
                    created_at: now - Duration::days(age_days),
                })
                .await
                .unwrap();
        }

        let asset = resolve_completed_asset(&catalog, "sm1").await.unwrap();
        assert_eq!(asset.file_path, PathBuf::from("v2.mp3"));
    }

    #[tokio::test]
    async fn test_unknown_status_is_skipped() {
        let catalog = memory_catalog().await;
        catalog.register_song("sm1", "Title", "Creator").await.unwrap();

        sqlx::query(
            "INSERT INTO files (file_id, song_id, path, status, created_at) VALUES ('f1', 'sm1', 'x.mp3', 'encoding', ?)",
        )
        .bind(Utc::now().to_rfc3339())
        .execute(catalog.pool())
        .await
        .unwrap();

        assert!(catalog.assets_for_song("sm1").await.unwrap().is_empty());
        assert!(matches!(
            resolve_completed_asset(&catalog, "sm1").await,
            Err(MediaError::NoCompletedAsset(_))
        ));
    }
}
