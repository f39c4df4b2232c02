//! Video metadata and the pipeline's in-flight `Video` aggregate.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::analysis::ParsedAnalysis;
use crate::ids::VideoId;
use crate::platform::Platform;
use crate::scene::Scene;

/// Bibliographic and measured metadata fetched from the source platform.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct VideoMetadata {
    pub video_id: VideoId,
    pub platform: Platform,

    pub title: String,
    #[serde(default)]
    pub uploader: String,
    #[serde(default)]
    pub upload_date: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,

    pub duration_seconds: f64,
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub view_count: u64,
    #[serde(default)]
    pub like_count: u64,
    #[serde(default)]
    pub comment_count: u64,

    pub url: String,
    pub webpage_url: String,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub subtitle_files: HashMap<String, PathBuf>,
}

impl VideoMetadata {
    /// A video is short-form when it's brief or shot in a vertical
    /// aspect ratio, which relaxes scene-detection sensitivity.
    pub fn is_short_form(&self) -> bool {
        if self.duration_seconds <= 60.0 {
            return true;
        }
        if self.width == 0 {
            return false;
        }
        (self.height as f64 / self.width as f64) > 1.5
    }
}

/// The in-flight aggregate the pipeline builds up one stage at a time.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Video {
    pub session_id: String,
    pub url: String,
    #[serde(default)]
    pub local_path: Option<PathBuf>,
    pub metadata: Option<VideoMetadata>,
    #[serde(default)]
    pub scenes: Vec<Scene>,
    #[serde(default)]
    pub grouped_scenes: Vec<Scene>,
    #[serde(default)]
    pub analysis_result: Option<ParsedAnalysis>,
    pub session_dir: PathBuf,
}

impl Video {
    pub fn new(session_id: impl Into<String>, url: impl Into<String>, session_dir: PathBuf) -> Self {
        Self {
            session_id: session_id.into(),
            url: url.into(),
            local_path: None,
            metadata: None,
            scenes: Vec::new(),
            grouped_scenes: Vec::new(),
            analysis_result: None,
            session_dir,
        }
    }
}

/// The persisted record of a fully analyzed video.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct VideoRecord {
    pub id: Option<i64>,
    pub url: String,
    pub title: String,
    pub platform: Platform,
    pub video_id: String,
    pub duration: f64,
    pub view_count: u64,
    pub upload_date: Option<String>,

    pub genre: String,
    pub mood: String,
    pub tags: Vec<String>,
    /// Opaque structured payload (the full `ParsedAnalysis`, serialized).
    pub analysis_result: serde_json::Value,
    pub thumbnail_path: Option<String>,
    pub scenes_count: u32,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VideoRecord {
    pub fn from_analysis(
        metadata: &VideoMetadata,
        analysis: &ParsedAnalysis,
        thumbnail_path: Option<String>,
        scenes_count: u32,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            url: metadata.webpage_url.clone(),
            title: metadata.title.clone(),
            platform: metadata.platform,
            video_id: metadata.video_id.as_str().to_string(),
            duration: metadata.duration_seconds,
            view_count: metadata.view_count,
            upload_date: metadata.upload_date.clone(),
            genre: analysis.genre.clone(),
            mood: analysis.mood_tone.clone(),
            tags: analysis.tags.clone(),
            analysis_result: serde_json::to_value(analysis).unwrap_or(serde_json::Value::Null),
            thumbnail_path,
            scenes_count,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_form_detection() {
        let mut m = sample_metadata();
        m.duration_seconds = 45.0;
        assert!(m.is_short_form());

        m.duration_seconds = 600.0;
        m.width = 1080;
        m.height = 1920;
        assert!(m.is_short_form());

        m.height = 1080;
        assert!(!m.is_short_form());
    }

    fn sample_metadata() -> VideoMetadata {
        VideoMetadata {
            video_id: VideoId::new("abc"),
            platform: Platform::Youtube,
            title: "t".into(),
            uploader: String::new(),
            upload_date: None,
            description: String::new(),
            language: None,
            tags: Vec::new(),
            categories: Vec::new(),
            duration_seconds: 120.0,
            width: 1920,
            height: 1080,
            view_count: 0,
            like_count: 0,
            comment_count: 0,
            url: String::new(),
            webpage_url: String::new(),
            thumbnail_url: None,
            subtitle_files: HashMap::new(),
        }
    }
}
