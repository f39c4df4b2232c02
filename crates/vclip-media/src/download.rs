//! Video download using yt-dlp, with a cascading retry strategy for
//! cookie-gated sources.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::{MediaError, MediaResult};

/// Minimum video file size threshold (50MB) to consider download complete.
const MIN_VIDEO_FILE_SIZE: u64 = 50 * 1024 * 1024;

/// One fetch attempt's extra yt-dlp arguments, tried against a URL in
/// order until one succeeds.
struct DownloadStrategy {
    name: &'static str,
    extra_args: Vec<String>,
}

fn cookies_file_path() -> PathBuf {
    PathBuf::from("cookies.txt")
}

/// Ordered fallback cascade for a generic source: browser-cookie
/// impersonation, cookie-file impersonation (only if `cookies.txt`
/// exists in the project root), an alternate browser, a no-cookie
/// anonymous attempt, then a TLS-fingerprint-imitating "aggressive
/// bypass" attempt.
fn generic_strategies() -> Vec<DownloadStrategy> {
    let mut strategies = vec![DownloadStrategy {
        name: "browser-cookie",
        extra_args: vec!["--cookies-from-browser".into(), "chrome".into()],
    }];

    if cookies_file_path().exists() {
        strategies.push(DownloadStrategy {
            name: "cookie-file",
            extra_args: vec![
                "--cookies".into(),
                cookies_file_path().to_string_lossy().into_owned(),
            ],
        });
    }

    strategies.push(DownloadStrategy {
        name: "alt-browser-cookie",
        extra_args: vec!["--cookies-from-browser".into(), "safari".into()],
    });
    strategies.push(DownloadStrategy {
        name: "no-cookie",
        extra_args: vec![],
    });
    strategies.push(DownloadStrategy {
        name: "aggressive-bypass",
        extra_args: vec!["--impersonate".into(), "chrome".into()],
    });

    strategies
}

/// Extracts a Vimeo video ID from either `vimeo.com/<id>` or
/// `player.vimeo.com/video/<id>` forms.
fn vimeo_id(url: &str) -> Option<String> {
    let after = url.split("vimeo.com/").nth(1)?;
    let tail = after.split(['?', '#']).next().unwrap_or(after);
    let tail = tail.rsplit('/').next().unwrap_or(tail);
    let id: String = tail.chars().take_while(|c| c.is_ascii_digit()).collect();
    if id.is_empty() {
        None
    } else {
        Some(id)
    }
}

/// Vimeo-specific authenticated cascade attempted before the generic
/// cascade: cookie and no-cookie strategies against the player URL
/// form, referencing the original watch page, which Vimeo serves
/// without the web player's stricter referrer checks.
fn vimeo_strategies(url: &str) -> Vec<(String, DownloadStrategy)> {
    let Some(id) = vimeo_id(url) else {
        return Vec::new();
    };
    let player_url = format!("https://player.vimeo.com/video/{id}");

    vec![
        (
            player_url.clone(),
            DownloadStrategy {
                name: "vimeo-player-browser-cookie",
                extra_args: vec![
                    "--cookies-from-browser".into(),
                    "chrome".into(),
                    "--referer".into(),
                    url.to_string(),
                ],
            },
        ),
        (
            player_url,
            DownloadStrategy {
                name: "vimeo-player-no-cookie",
                extra_args: vec!["--referer".into(), url.to_string()],
            },
        ),
    ]
}

/// Download a video from URL using yt-dlp, retrying through the
/// platform's fallback cascade until one strategy succeeds.
pub async fn download_video(url: &str, output_path: impl AsRef<Path>) -> MediaResult<()> {
    let output_path = output_path.as_ref();

    // Check if file already exists and is large enough
    if output_path.exists() {
        if let Ok(metadata) = output_path.metadata() {
            if metadata.len() > MIN_VIDEO_FILE_SIZE {
                info!("Using existing video file: {}", output_path.display());
                return Ok(());
            }
            warn!(
                "Existing file {} is too small ({} bytes), re-downloading",
                output_path.display(),
                metadata.len()
            );
            tokio::fs::remove_file(output_path).await?;
        }
    }

    // Check yt-dlp exists
    which::which("yt-dlp").map_err(|_| MediaError::YtDlpNotFound)?;

    let format_selector = video_format_selector();
    info!("Downloading video from {} to {}", url, output_path.display());

    let mut attempts: Vec<(String, DownloadStrategy)> = Vec::new();
    if url.contains("vimeo.com") {
        attempts.extend(vimeo_strategies(url));
    }
    attempts.extend(
        generic_strategies()
            .into_iter()
            .map(|strategy| (url.to_string(), strategy)),
    );

    let mut last_error = String::from("unknown error");
    for (attempt_url, strategy) in attempts {
        info!(strategy = strategy.name, "attempting download");

        let output = Command::new("yt-dlp")
            .args(["--remote-components", "ejs:github", "-f", format_selector])
            .args(&strategy.extra_args)
            .arg("-o")
            .arg(output_path)
            .arg(&attempt_url)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if output.status.success() && output_path.exists() {
            let file_size = output_path.metadata()?.len();
            info!(
                "Downloaded video via {}: {} ({:.1} MB)",
                strategy.name,
                output_path.display(),
                file_size as f64 / (1024.0 * 1024.0)
            );
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        debug!("yt-dlp stderr ({}): {}", strategy.name, stderr);
        last_error = stderr
            .lines()
            .last()
            .unwrap_or("unknown error")
            .to_string();
        warn!(strategy = strategy.name, error = %last_error, "download strategy failed");
    }

    Err(MediaError::download_failed(format!(
        "all download strategies exhausted: {last_error}"
    )))
}

/// yt-dlp format selector for the `VIDEO_QUALITY` tier (`fast`, `balanced`,
/// default `best`), preferring H.264/AAC MP4 at each tier.
fn video_format_selector() -> &'static str {
    match std::env::var("VIDEO_QUALITY").ok().as_deref() {
        Some("fast") => "bv*[vcodec^=avc1]+ba[acodec^=mp4a]/best[ext=mp4]",
        Some("balanced") => {
            "bv*[height<=720][vcodec^=avc1]+ba[acodec^=mp4a]/best[height<=720][ext=mp4]/best[height<=720]/best"
        }
        _ => "bv*[height>=1080][vcodec^=avc1]+ba[acodec^=mp4a]/best[height>=1080][ext=mp4]/bv*[vcodec^=avc1]+ba[acodec^=mp4a]/best[ext=mp4]/best",
    }
}

/// Check if a URL is a supported video platform.
pub fn is_supported_url(url: &str) -> bool {
    let supported_domains = [
        "youtube.com",
        "youtu.be",
        "vimeo.com",
        "twitter.com",
        "x.com",
        "twitch.tv",
        "tiktok.com",
    ];

    supported_domains.iter().any(|domain| url.contains(domain))
}

#[cfg(test)]
mod tests {
    use super::*;
    use vclip_models::extract_youtube_id;

    #[test]
    fn test_is_supported_url() {
        assert!(is_supported_url("https://youtube.com/watch?v=abc"));
        assert!(is_supported_url("https://youtu.be/abc"));
        assert!(is_supported_url("https://vimeo.com/123"));
        assert!(!is_supported_url("https://example.com/video"));
    }

    #[test]
    fn test_extract_youtube_id() {
        // Standard youtube.com format
        assert_eq!(
            extract_youtube_id("https://youtube.com/watch?v=abc123def45"),
            Some("abc123def45".to_string())
        );

        // youtu.be format
        assert_eq!(
            extract_youtube_id("https://youtu.be/abc123def45"),
            Some("abc123def45".to_string())
        );

        // With query parameters
        assert_eq!(
            extract_youtube_id("https://youtube.com/watch?v=abc123def45&list=xyz"),
            Some("abc123def45".to_string())
        );

        // Embed format
        assert_eq!(
            extract_youtube_id("https://youtube.com/embed/abc123def45"),
            Some("abc123def45".to_string())
        );

        // Invalid formats
        assert_eq!(extract_youtube_id("https://example.com"), None);
        assert_eq!(extract_youtube_id("https://youtube.com/watch"), None);
        assert_eq!(extract_youtube_id("https://youtu.be/"), None);

        // Invalid video ID format (wrong length)
        assert_eq!(extract_youtube_id("https://youtube.com/watch?v=abc123"), None);

        // Invalid video ID format (invalid characters)
        assert_eq!(extract_youtube_id("https://youtube.com/watch?v=abc123def!!"), None);
    }

    #[test]
    fn test_vimeo_id() {
        assert_eq!(vimeo_id("https://vimeo.com/76979871"), Some("76979871".to_string()));
        assert_eq!(
            vimeo_id("https://player.vimeo.com/video/76979871"),
            Some("76979871".to_string())
        );
        assert_eq!(vimeo_id("https://youtube.com/watch?v=abc"), None);
    }

    #[test]
    fn vimeo_strategies_empty_for_non_vimeo_url() {
        assert!(vimeo_strategies("https://youtube.com/watch?v=abc").is_empty());
    }

    #[test]
    fn vimeo_strategies_use_player_url() {
        let strategies = vimeo_strategies("https://vimeo.com/76979871");
        assert_eq!(strategies.len(), 2);
        assert!(strategies
            .iter()
            .all(|(url, _)| url == "https://player.vimeo.com/video/76979871"));
    }
}
