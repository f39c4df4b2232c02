//! Worker configuration.

use std::time::Duration;

use vclip_providers::{ImageDetail, Provider};

/// Worker configuration: pipeline concurrency, timeouts, and the default
/// analysis parameters applied when a job doesn't override them.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Job timeout for the whole 7-stage pipeline.
    pub job_timeout: Duration,
    /// Graceful shutdown timeout.
    pub shutdown_timeout: Duration,
    /// Scratch directory root for per-session workspaces.
    pub work_dir: String,
    /// Upper bound on the scene-extraction stage (transition detection
    /// plus feature extraction/clustering), past which the stage fails
    /// rather than holding a worker slot forever.
    pub scene_detection_timeout: Duration,
    /// Precision dial (1..10) used when a job doesn't specify one.
    pub default_precision: u8,
    /// Multimodal provider used when a job doesn't specify one.
    pub default_provider: Provider,
    /// Cap on the number of scene images sent in a single analysis call.
    pub max_analysis_images: usize,
    /// Detail hint attached to every image sent to the provider.
    pub analysis_image_quality: ImageDetail,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            job_timeout: Duration::from_secs(3600),
            shutdown_timeout: Duration::from_secs(30),
            work_dir: "/tmp/vclip".to_string(),
            scene_detection_timeout: Duration::from_secs(120),
            default_precision: 5,
            default_provider: Provider::Gemini,
            max_analysis_images: 10,
            analysis_image_quality: ImageDetail::Low,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            job_timeout: Duration::from_secs(
                std::env::var("WORKER_JOB_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(3600),
            ),
            shutdown_timeout: Duration::from_secs(
                std::env::var("WORKER_SHUTDOWN_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            work_dir: std::env::var("WORKER_WORK_DIR").unwrap_or_else(|_| "/tmp/vclip".to_string()),
            scene_detection_timeout: Duration::from_secs(
                std::env::var("SCENE_DETECTION_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(120),
            ),
            default_precision: std::env::var("SCENE_PRECISION_LEVEL")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(|p: u8| p.clamp(1, 10))
                .unwrap_or(5),
            default_provider: parse_provider(std::env::var("AI_PROVIDER").ok().as_deref()),
            max_analysis_images: std::env::var("MAX_ANALYSIS_IMAGES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            analysis_image_quality: parse_image_detail(std::env::var("ANALYSIS_IMAGE_QUALITY").ok().as_deref()),
        }
    }
}

fn parse_provider(value: Option<&str>) -> Provider {
    match value.map(str::to_ascii_lowercase).as_deref() {
        Some("openai") => Provider::OpenAi,
        Some("claude") => Provider::Claude,
        _ => Provider::Gemini,
    }
}

fn parse_image_detail(value: Option<&str>) -> ImageDetail {
    match value.map(str::to_ascii_lowercase).as_deref() {
        Some("high") => ImageDetail::High,
        Some("auto") => ImageDetail::Auto,
        _ => ImageDetail::Low,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_provider_name_falls_back_to_gemini() {
        assert_eq!(parse_provider(Some("bogus")), Provider::Gemini);
        assert_eq!(parse_provider(None), Provider::Gemini);
    }

    #[test]
    fn recognizes_openai_and_claude() {
        assert_eq!(parse_provider(Some("OpenAI")), Provider::OpenAi);
        assert_eq!(parse_provider(Some("claude")), Provider::Claude);
    }

    #[test]
    fn image_detail_defaults_to_low() {
        assert_eq!(parse_image_detail(None), ImageDetail::Low);
        assert_eq!(parse_image_detail(Some("bogus")), ImageDetail::Low);
        assert_eq!(parse_image_detail(Some("HIGH")), ImageDetail::High);
        assert_eq!(parse_image_detail(Some("auto")), ImageDetail::Auto);
    }
}
