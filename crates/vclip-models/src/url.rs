//! URL shape recognition, platform detection and canonicalization.
//!
//! Supports the standard, short, embed and player URL variants of the
//! two recognized platforms.

use crate::ids::VideoId;
use crate::platform::Platform;

/// Errors recognizing or normalizing a source URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlError {
    /// URL does not match any recognized platform pattern.
    Unsupported,
}

impl std::fmt::Display for UrlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UrlError::Unsupported => write!(f, "URL does not match a supported platform"),
        }
    }
}

impl std::error::Error for UrlError {}

/// Detect which platform a URL belongs to, if any.
pub fn detect_platform(url: &str) -> Platform {
    let lower = url.trim().to_ascii_lowercase();
    if lower.contains("youtube.com") || lower.contains("youtu.be") {
        Platform::Youtube
    } else if lower.contains("vimeo.com") {
        Platform::Vimeo
    } else {
        Platform::Unknown
    }
}

/// Extract the platform-scoped video id from a URL, trying every known
/// shape for that platform's URLs (standard, short, embed, player).
pub fn extract_video_id(url: &str) -> Result<(Platform, VideoId), UrlError> {
    match detect_platform(url) {
        Platform::Youtube => extract_youtube_id(url)
            .map(|id| (Platform::Youtube, VideoId::new(id)))
            .ok_or(UrlError::Unsupported),
        Platform::Vimeo => extract_vimeo_id(url)
            .map(|id| (Platform::Vimeo, VideoId::new(id)))
            .ok_or(UrlError::Unsupported),
        Platform::Unknown => Err(UrlError::Unsupported),
    }
}

/// Canonicalize a recognized URL to its standard-shape form.
///
/// `https://youtu.be/<id>?t=30` and `https://youtube.com/embed/<id>`
/// both canonicalize to `https://www.youtube.com/watch?v=<id>`; Vimeo
/// URLs canonicalize to `https://vimeo.com/<id>`.
pub fn canonicalize_url(url: &str) -> Result<String, UrlError> {
    let (platform, id) = extract_video_id(url)?;
    Ok(match platform {
        Platform::Youtube => format!("https://www.youtube.com/watch?v={}", id.as_str()),
        Platform::Vimeo => format!("https://vimeo.com/{}", id.as_str()),
        Platform::Unknown => unreachable!("extract_video_id rejects Unknown"),
    })
}

fn extract_youtube_id(url: &str) -> Option<String> {
    let url = url.trim();

    if let Some(id) = find_after(url, "?v=").or_else(|| find_after(url, "&v=")) {
        return validate_youtube_id(id);
    }
    if let Some(id) = find_after(url, "youtu.be/") {
        return validate_youtube_id(id);
    }
    if let Some(id) = find_after(url, "/embed/") {
        return validate_youtube_id(id);
    }
    if let Some(id) = find_after(url, "/shorts/") {
        return validate_youtube_id(id);
    }
    // player URL variant: youtube.com/v/<id>
    if let Some(id) = find_after(url, "/v/") {
        return validate_youtube_id(id);
    }
    None
}

fn validate_youtube_id(id: String) -> Option<String> {
    if id.len() == 11 && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        Some(id)
    } else {
        None
    }
}

fn extract_vimeo_id(url: &str) -> Option<String> {
    let url = url.trim();
    // Standard: vimeo.com/<id>; "player" variant: player.vimeo.com/video/<id>;
    // embed variant carries the same /video/<id> path.
    let candidate = find_after(url, "player.vimeo.com/video/")
        .or_else(|| find_after(url, "vimeo.com/video/"))
        .or_else(|| find_after(url, "vimeo.com/"));
    let candidate = candidate?;
    if !candidate.is_empty() && candidate.chars().all(|c| c.is_ascii_digit()) {
        Some(candidate)
    } else {
        None
    }
}

/// Find the substring following `marker`, truncated at the next
/// delimiter (`&`, `#`, `?`, `/`).
fn find_after(haystack: &str, marker: &str) -> Option<String> {
    let pos = haystack.find(marker)?;
    let start = pos + marker.len();
    let remaining = haystack.get(start..)?;
    if remaining.is_empty() {
        return None;
    }
    let end = remaining
        .find(|c| matches!(c, '&' | '#' | '?' | '/'))
        .unwrap_or(remaining.len());
    let segment = remaining[..end].trim();
    if segment.is_empty() {
        None
    } else {
        Some(segment.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_youtube_variants() {
        for url in [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ?t=30",
            "https://youtube.com/embed/dQw4w9WgXcQ",
            "https://youtube.com/shorts/dQw4w9WgXcQ",
        ] {
            let (platform, id) = extract_video_id(url).unwrap();
            assert_eq!(platform, Platform::Youtube);
            assert_eq!(id.as_str(), "dQw4w9WgXcQ");
        }
    }

    #[test]
    fn detects_vimeo_variants() {
        for url in [
            "https://vimeo.com/76979871",
            "https://player.vimeo.com/video/76979871",
        ] {
            let (platform, id) = extract_video_id(url).unwrap();
            assert_eq!(platform, Platform::Vimeo);
            assert_eq!(id.as_str(), "76979871");
        }
    }

    #[test]
    fn rejects_unsupported_urls() {
        assert_eq!(extract_video_id("https://example.com/video"), Err(UrlError::Unsupported));
        assert_eq!(extract_video_id("not a url"), Err(UrlError::Unsupported));
    }

    #[test]
    fn canonicalizes_to_standard_shape() {
        assert_eq!(
            canonicalize_url("https://youtu.be/dQw4w9WgXcQ?t=30").unwrap(),
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ"
        );
        assert_eq!(
            canonicalize_url("https://player.vimeo.com/video/76979871").unwrap(),
            "https://vimeo.com/76979871"
        );
    }
}
