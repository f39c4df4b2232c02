//! Shared data models for the video analysis pipeline.
//!
//! This crate provides the Serde-serializable types shared across the
//! workspace: platform-scoped video identity and metadata, extracted
//! scenes, parsed multimodal-analysis results, job/queue types, user
//! sessions and cache entries.

pub mod analysis;
pub mod cache;
pub mod ids;
pub mod job;
pub mod platform;
pub mod scene;
pub mod session;
pub mod timestamp;
pub mod url;
pub mod video;

pub use analysis::{
    default_expression_styles, default_genres, ParsedAnalysis, ANALYSIS_REASON_MIN_CHARS,
    MAX_TAGS, MIN_TAGS,
};
pub use cache::CacheEntry;
pub use ids::{JobId, SessionId, VideoId};
pub use job::{Job, JobPriority, JobStatus};
pub use platform::Platform;
pub use scene::{Scene, SceneType};
pub use session::{SessionStatus, UserSession};
pub use url::{canonicalize_url, detect_platform, extract_video_id, UrlError};
pub use video::{Video, VideoMetadata, VideoRecord};
