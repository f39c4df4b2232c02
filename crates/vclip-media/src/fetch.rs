//! Remote metadata extraction via yt-dlp, paired with the file download.

use std::path::Path;
use std::process::Stdio;

use serde::Deserialize;
use tokio::process::Command;
use tracing::info;
use vclip_models::{Platform, VideoId, VideoMetadata};

use crate::download::download_video;
use crate::error::{MediaError, MediaResult};

#[derive(Debug, Deserialize)]
struct YtDlpInfo {
    id: String,
    title: String,
    #[serde(default)]
    uploader: Option<String>,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    upload_date: Option<String>,
    #[serde(default)]
    description: String,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    categories: Vec<String>,
    #[serde(default)]
    duration: f64,
    #[serde(default)]
    width: u32,
    #[serde(default)]
    height: u32,
    #[serde(default)]
    view_count: u64,
    #[serde(default)]
    like_count: u64,
    #[serde(default)]
    comment_count: u64,
    #[serde(default)]
    webpage_url: Option<String>,
    #[serde(default)]
    thumbnail: Option<String>,
}

/// Extract metadata without downloading the video file.
pub async fn fetch_metadata(url: &str, platform: Platform) -> MediaResult<VideoMetadata> {
    which::which("yt-dlp").map_err(|_| MediaError::YtDlpNotFound)?;

    let output = Command::new("yt-dlp")
        .args(["--dump-json", "--no-warnings", "--quiet"])
        .arg(url)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(MediaError::download_failed(format!(
            "yt-dlp metadata extraction failed: {}",
            stderr.lines().last().unwrap_or("unknown error")
        )));
    }

    let info: YtDlpInfo = serde_json::from_slice(&output.stdout)?;
    info!(video_id = %info.id, title = %info.title, "fetched video metadata");

    Ok(VideoMetadata {
        video_id: VideoId::new(info.id),
        platform,
        title: info.title,
        uploader: info.uploader.or(info.channel).unwrap_or_default(),
        upload_date: info.upload_date,
        description: info.description,
        language: info.language,
        tags: info.tags,
        categories: info.categories,
        duration_seconds: info.duration,
        width: info.width,
        height: info.height,
        view_count: info.view_count,
        like_count: info.like_count,
        comment_count: info.comment_count,
        url: url.to_string(),
        webpage_url: info.webpage_url.unwrap_or_else(|| url.to_string()),
        thumbnail_url: info.thumbnail,
        subtitle_files: Default::default(),
    })
}

/// Fetch metadata, then download the source file to `output_path`.
pub async fn fetch(url: &str, platform: Platform, output_path: &Path) -> MediaResult<VideoMetadata> {
    let metadata = fetch_metadata(url, platform).await?;
    download_video(url, output_path).await?;
    Ok(metadata)
}

/// Best-effort thumbnail download to `<video_id>_Thumbnail.jpg` alongside
/// the source file; a missing or unfetchable thumbnail is not an error.
pub async fn download_thumbnail(metadata: &VideoMetadata, output_dir: &Path) -> Option<std::path::PathBuf> {
    let thumbnail_url = metadata.thumbnail_url.as_ref()?;
    let response = reqwest::get(thumbnail_url).await.ok()?;
    let bytes = response.bytes().await.ok()?;

    let path = output_dir.join(format!("{}_Thumbnail.jpg", metadata.video_id));
    tokio::fs::write(&path, &bytes).await.ok()?;
    Some(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use vclip_models::Platform;

    fn sample_metadata(thumbnail_url: Option<String>) -> VideoMetadata {
        VideoMetadata {
            video_id: VideoId::new("abc123"),
            platform: Platform::Youtube,
            title: "title".to_string(),
            uploader: String::new(),
            upload_date: None,
            description: String::new(),
            language: None,
            tags: Vec::new(),
            categories: Vec::new(),
            duration_seconds: 0.0,
            width: 0,
            height: 0,
            view_count: 0,
            like_count: 0,
            comment_count: 0,
            url: "https://youtube.com/watch?v=abc123".to_string(),
            webpage_url: "https://youtube.com/watch?v=abc123".to_string(),
            thumbnail_url,
            subtitle_files: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn no_thumbnail_url_returns_none_without_network_access() {
        let metadata = sample_metadata(None);
        let result = download_thumbnail(&metadata, Path::new("/tmp")).await;
        assert!(result.is_none());
    }
}
