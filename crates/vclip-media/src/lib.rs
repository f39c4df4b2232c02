//! Remote video fetch, metadata extraction, and precision-parametrized
//! scene extraction.
//!
//! This crate provides:
//! - yt-dlp wrapper for metadata extraction and source download
//! - Best-effort thumbnail download
//! - FFmpeg-backed scene-transition detection and mid-frame extraction
//! - Feature-based scene clustering tuned by a single precision dial

pub mod download;
pub mod error;
pub mod fetch;
pub mod probe;
pub mod scenes;

pub use download::{download_video, is_supported_url};
pub use error::{MediaError, MediaResult};
pub use fetch::{download_thumbnail, fetch, fetch_metadata};
pub use probe::{probe_video, VideoInfo};
pub use scenes::{extract_scenes, PrecisionConfig};
