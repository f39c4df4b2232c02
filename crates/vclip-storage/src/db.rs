//! Embedded relational store for analyzed videos (SQLite + pooled connections).

use std::path::Path;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension};
use tracing::info;
use vclip_models::{Platform, VideoRecord};

use crate::error::{StorageError, StorageResult};

const DEFAULT_POOL_SIZE: u32 = 10;

#[derive(Debug, Clone, serde::Serialize)]
pub struct GenreCount {
    pub genre: String,
    pub count: i64,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct PlatformCount {
    pub platform: String,
    pub count: i64,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct Statistics {
    pub total_videos: i64,
    pub genres: Vec<GenreCount>,
    pub platforms: Vec<PlatformCount>,
}

#[derive(Debug, Default, Clone)]
pub struct SearchFilter {
    pub genre: Option<String>,
    pub tags: Vec<String>,
    pub keyword: Option<String>,
    pub limit: u32,
    pub offset: u32,
}

/// Pooled SQLite store. Every public method wraps its blocking rusqlite
/// call in `spawn_blocking`; the pool itself is cheap to clone (an `Arc`
/// internally) so the store can be shared freely across workers.
#[derive(Clone)]
pub struct VideoStore {
    pool: Pool<SqliteConnectionManager>,
}

impl VideoStore {
    pub fn open(db_path: impl AsRef<Path>) -> StorageResult<Self> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StorageError::Sqlite(rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
            })?;
        }

        let manager = SqliteConnectionManager::file(db_path).with_init(|conn| {
            conn.execute_batch(
                "PRAGMA journal_mode=WAL;
                 PRAGMA synchronous=NORMAL;
                 PRAGMA cache_size=10000;",
            )
        });
        let pool = Pool::builder().max_size(DEFAULT_POOL_SIZE).build(manager)?;

        let store = Self { pool };
        store.migrate()?;
        info!(path = %db_path.display(), "video store opened");
        Ok(store)
    }

    pub fn open_from_env() -> StorageResult<Self> {
        let path = std::env::var("DATABASE_PATH").unwrap_or_else(|_| "data/videos.db".to_string());
        Self::open(path)
    }

    fn migrate(&self) -> StorageResult<()> {
        let conn = self.pool.get()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS videos (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                url TEXT UNIQUE NOT NULL,
                title TEXT NOT NULL,
                platform TEXT NOT NULL,
                video_id TEXT NOT NULL,
                duration REAL NOT NULL,
                view_count INTEGER NOT NULL,
                upload_date TEXT,
                genre TEXT NOT NULL,
                mood TEXT NOT NULL,
                tags TEXT NOT NULL,
                analysis_result TEXT NOT NULL,
                thumbnail_path TEXT,
                scenes_count INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_videos_url ON videos(url);
            CREATE INDEX IF NOT EXISTS idx_videos_platform ON videos(platform);
            CREATE INDEX IF NOT EXISTS idx_videos_genre ON videos(genre);
            CREATE INDEX IF NOT EXISTS idx_videos_created_at ON videos(created_at);",
        )?;
        Ok(())
    }

    /// Insert a new video record, or update the existing row for that URL.
    pub async fn upsert(&self, record: VideoRecord) -> StorageResult<i64> {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let tags_json = serde_json::to_string(&record.tags)?;
            let analysis_json = serde_json::to_string(&record.analysis_result)?;

            let existing: Option<i64> = conn
                .query_row("SELECT id FROM videos WHERE url = ?1", params![record.url], |row| {
                    row.get(0)
                })
                .optional()?;

            if let Some(id) = existing {
                conn.execute(
                    "UPDATE videos SET title=?1, platform=?2, video_id=?3, duration=?4,
                        view_count=?5, upload_date=?6, genre=?7, mood=?8, tags=?9,
                        analysis_result=?10, thumbnail_path=?11, scenes_count=?12, updated_at=?13
                     WHERE id=?14",
                    params![
                        record.title,
                        record.platform.as_str(),
                        record.video_id,
                        record.duration,
                        record.view_count as i64,
                        record.upload_date,
                        record.genre,
                        record.mood,
                        tags_json,
                        analysis_json,
                        record.thumbnail_path,
                        record.scenes_count,
                        record.updated_at.to_rfc3339(),
                        id,
                    ],
                )?;
                Ok(id)
            } else {
                conn.execute(
                    "INSERT INTO videos (
                        url, title, platform, video_id, duration, view_count, upload_date,
                        genre, mood, tags, analysis_result, thumbnail_path, scenes_count,
                        created_at, updated_at
                     ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15)",
                    params![
                        record.url,
                        record.title,
                        record.platform.as_str(),
                        record.video_id,
                        record.duration,
                        record.view_count as i64,
                        record.upload_date,
                        record.genre,
                        record.mood,
                        tags_json,
                        analysis_json,
                        record.thumbnail_path,
                        record.scenes_count,
                        record.created_at.to_rfc3339(),
                        record.updated_at.to_rfc3339(),
                    ],
                )?;
                Ok(conn.last_insert_rowid())
            }
        })
        .await?
    }

    pub async fn get_by_url(&self, url: impl Into<String>) -> StorageResult<Option<VideoRecord>> {
        let pool = self.pool.clone();
        let url = url.into();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            conn.query_row("SELECT * FROM videos WHERE url = ?1", params![url], row_to_record)
                .optional()
                .map_err(StorageError::from)
        })
        .await?
    }

    pub async fn get_by_id(&self, id: i64) -> StorageResult<Option<VideoRecord>> {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            conn.query_row("SELECT * FROM videos WHERE id = ?1", params![id], row_to_record)
                .optional()
                .map_err(StorageError::from)
        })
        .await?
    }

    pub async fn search(&self, filter: SearchFilter) -> StorageResult<Vec<VideoRecord>> {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let mut clauses = Vec::new();
            let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

            if let Some(genre) = &filter.genre {
                clauses.push("genre = ?".to_string());
                params_vec.push(Box::new(genre.clone()));
            }
            if let Some(keyword) = &filter.keyword {
                clauses.push("title LIKE ?".to_string());
                params_vec.push(Box::new(format!("%{}%", keyword)));
            }
            for tag in &filter.tags {
                clauses.push("tags LIKE ?".to_string());
                params_vec.push(Box::new(format!("%{}%", tag)));
            }

            let where_sql = if clauses.is_empty() {
                "1=1".to_string()
            } else {
                clauses.join(" AND ")
            };
            let sql = format!(
                "SELECT * FROM videos WHERE {} ORDER BY created_at DESC LIMIT ? OFFSET ?",
                where_sql
            );
            params_vec.push(Box::new(filter.limit.max(1) as i64));
            params_vec.push(Box::new(filter.offset as i64));

            let param_refs: Vec<&dyn rusqlite::ToSql> =
                params_vec.iter().map(|p| p.as_ref()).collect();

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(param_refs.as_slice(), row_to_record)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await?
    }

    pub async fn recent(&self, limit: u32) -> StorageResult<Vec<VideoRecord>> {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let mut stmt =
                conn.prepare("SELECT * FROM videos ORDER BY created_at DESC LIMIT ?1")?;
            let rows = stmt
                .query_map(params![limit], row_to_record)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await?
    }

    pub async fn statistics(&self) -> StorageResult<Statistics> {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let total_videos: i64 = conn.query_row("SELECT COUNT(*) FROM videos", [], |r| r.get(0))?;

            let mut genre_stmt = conn.prepare(
                "SELECT genre, COUNT(*) as count FROM videos WHERE genre != '' GROUP BY genre ORDER BY count DESC",
            )?;
            let genres = genre_stmt
                .query_map([], |row| {
                    Ok(GenreCount {
                        genre: row.get(0)?,
                        count: row.get(1)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;

            let mut platform_stmt = conn.prepare(
                "SELECT platform, COUNT(*) as count FROM videos GROUP BY platform ORDER BY count DESC",
            )?;
            let platforms = platform_stmt
                .query_map([], |row| {
                    Ok(PlatformCount {
                        platform: row.get(0)?,
                        count: row.get(1)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(Statistics {
                total_videos,
                genres,
                platforms,
            })
        })
        .await?
    }

    pub async fn delete_by_id(&self, id: i64) -> StorageResult<bool> {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            let affected = conn.execute("DELETE FROM videos WHERE id = ?1", params![id])?;
            Ok(affected > 0)
        })
        .await?
    }
}

fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<VideoRecord> {
    let tags_json: String = row.get("tags")?;
    let analysis_json: String = row.get("analysis_result")?;
    let platform_str: String = row.get("platform")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;

    Ok(VideoRecord {
        id: row.get("id")?,
        url: row.get("url")?,
        title: row.get("title")?,
        platform: parse_platform(&platform_str),
        video_id: row.get("video_id")?,
        duration: row.get("duration")?,
        view_count: row.get::<_, i64>("view_count")? as u64,
        upload_date: row.get("upload_date")?,
        genre: row.get("genre")?,
        mood: row.get("mood")?,
        tags: serde_json::from_str(&tags_json).unwrap_or_default(),
        analysis_result: serde_json::from_str(&analysis_json).unwrap_or(serde_json::Value::Null),
        thumbnail_path: row.get("thumbnail_path")?,
        scenes_count: row.get::<_, i64>("scenes_count")? as u32,
        created_at: chrono::DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&chrono::Utc))
            .unwrap_or_else(|_| chrono::Utc::now()),
        updated_at: chrono::DateTime::parse_from_rfc3339(&updated_at)
            .map(|dt| dt.with_timezone(&chrono::Utc))
            .unwrap_or_else(|_| chrono::Utc::now()),
    })
}

fn parse_platform(s: &str) -> Platform {
    match s {
        "youtube" => Platform::Youtube,
        "vimeo" => Platform::Vimeo,
        _ => Platform::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vclip_models::ParsedAnalysis;

    fn sample_record(url: &str) -> VideoRecord {
        let analysis = ParsedAnalysis {
            genre: "comedy".to_string(),
            reasoning: "a".repeat(25),
            features: "b".repeat(25),
            tags: vec!["funny".to_string(); 10],
            expression_style: "upbeat".to_string(),
            mood_tone: "playful".to_string(),
            target_audience: "general".to_string(),
            model_used: "gemini".to_string(),
            analysis_date: chrono::Utc::now(),
            raw_response: String::new(),
        };
        VideoRecord::from_analysis(
            &vclip_models::VideoMetadata {
                video_id: vclip_models::VideoId::new("abc123"),
                platform: Platform::Youtube,
                title: "A video".to_string(),
                uploader: String::new(),
                upload_date: None,
                description: String::new(),
                language: None,
                tags: vec![],
                categories: vec![],
                duration_seconds: 60.0,
                width: 1920,
                height: 1080,
                view_count: 100,
                like_count: 0,
                comment_count: 0,
                url: url.to_string(),
                webpage_url: url.to_string(),
                thumbnail_url: None,
                subtitle_files: Default::default(),
            },
            &analysis,
            None,
            3,
        )
    }

    #[tokio::test]
    async fn upsert_then_get_by_url_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let store = VideoStore::open(dir.path().join("videos.db")).unwrap();

        let record = sample_record("https://youtube.com/watch?v=abc123");
        let id = store.upsert(record.clone()).await.unwrap();
        assert!(id > 0);

        let fetched = store.get_by_url(&record.url).await.unwrap().unwrap();
        assert_eq!(fetched.title, record.title);
        assert_eq!(fetched.genre, "comedy");
    }

    #[tokio::test]
    async fn upsert_is_idempotent_on_url() {
        let dir = tempfile::tempdir().unwrap();
        let store = VideoStore::open(dir.path().join("videos.db")).unwrap();

        let mut record = sample_record("https://youtube.com/watch?v=xyz789");
        let id1 = store.upsert(record.clone()).await.unwrap();
        record.title = "Updated title".to_string();
        let id2 = store.upsert(record.clone()).await.unwrap();

        assert_eq!(id1, id2);
        let fetched = store.get_by_url(&record.url).await.unwrap().unwrap();
        assert_eq!(fetched.title, "Updated title");
    }

    #[tokio::test]
    async fn delete_by_id_removes_row() {
        let dir = tempfile::tempdir().unwrap();
        let store = VideoStore::open(dir.path().join("videos.db")).unwrap();

        let id = store.upsert(sample_record("https://youtube.com/watch?v=del1")).await.unwrap();
        assert!(store.delete_by_id(id).await.unwrap());
        assert!(store.get_by_id(id).await.unwrap().is_none());
        assert!(!store.delete_by_id(id).await.unwrap());
    }
}
