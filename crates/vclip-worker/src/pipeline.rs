//! The end-to-end video analysis pipeline: the `JobRunner` the queue
//! dispatches `AnalyzeVideo` jobs to.
//!
//! Seven stages: URL validation, cache check, fetch (metadata + download +
//! best-effort thumbnail), scene extraction, multimodal analysis,
//! persistence, and a final terminal progress emit. A cache hit on the
//! analysis key short-circuits everything after the cache-check stage.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;

use vclip_models::{canonicalize_url, extract_video_id, ParsedAnalysis, Platform, VideoRecord};
use vclip_providers::{build_analysis_prompt, parse, ImagePayload, SYSTEM_PROMPT};
use vclip_queue::{JobKind, JobRunner, ProgressSender};
use vclip_session::SessionManager;
use vclip_storage::cache::{analysis_key, metadata_key, TTL_ANALYSIS, TTL_METADATA};
use vclip_storage::{TwoTierCache, VideoStore};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;

pub struct PipelineRunner {
    config: WorkerConfig,
    sessions: Arc<SessionManager>,
    store: Arc<VideoStore>,
    cache: Arc<TwoTierCache>,
    client: Client,
}

impl PipelineRunner {
    pub fn new(
        config: WorkerConfig,
        sessions: Arc<SessionManager>,
        store: Arc<VideoStore>,
        cache: Arc<TwoTierCache>,
    ) -> Self {
        Self {
            config,
            sessions,
            store,
            cache,
            client: Client::new(),
        }
    }

    async fn run_analyze_video(&self, url: &str, precision: u8, progress: &ProgressSender) -> WorkerResult<serde_json::Value> {
        let logger = JobLogger::new(progress.job_id(), "analyze_video");
        logger.log_start(url);

        progress.emit("parse_url", 2, "validating url");
        let (platform, _video_id) =
            extract_video_id(url).map_err(|e| WorkerError::InvalidUrl(e.to_string()))?;
        let canonical = canonicalize_url(url).map_err(|e| WorkerError::InvalidUrl(e.to_string()))?;
        let precision = if precision == 0 { self.config.default_precision } else { precision };

        progress.emit("cache_check", 5, "checking cache");
        if let Some(cached) = self.cache.get(&analysis_key(&canonical, precision)).await {
            if let Ok(analysis) = serde_json::from_slice::<ParsedAnalysis>(&cached) {
                if let Some(record) = self.store.get_by_url(canonical.clone()).await? {
                    logger.log_completion("served from cache");
                    progress.emit("complete", 100, "served from cache");
                    return Ok(serde_json::to_value(&record).unwrap_or_default());
                }
                // Cached analysis survived but the DB record didn't; fall
                // through and recompute rather than returning a record
                // we can't produce.
                let _ = analysis;
            }
        }

        let session = self.sessions.get_or_create_session().await?;
        if !self.sessions.start_task(&session.session_id, "analyze_video").await {
            return Err(WorkerError::job_failed("worker at capacity, retry later"));
        }

        let outcome = self
            .process(&canonical, platform, precision, &session.workspace_dir, progress, &logger)
            .await;

        self.sessions.end_task(&session.session_id, "analyze_video").await;
        self.sessions.mark_pipeline_completed(&session.session_id).await;
        self.sessions.cleanup_session(&session.session_id).await;

        match &outcome {
            Ok(_) => logger.log_completion("analysis finished"),
            Err(e) => logger.log_error(&e.to_string()),
        }

        outcome
    }

    async fn process(
        &self,
        url: &str,
        platform: Platform,
        precision: u8,
        workspace_dir: &std::path::Path,
        progress: &ProgressSender,
        logger: &JobLogger,
    ) -> WorkerResult<serde_json::Value> {
        progress.emit("fetch", 10, "fetching video metadata and source file");
        logger.log_progress("fetching video metadata and source file");
        let video_path = workspace_dir.join("source.mp4");
        let metadata = vclip_media::fetch(url, platform, &video_path).await?;
        vclip_media::download_thumbnail(&metadata, workspace_dir).await;

        progress.emit("scene_extraction", 35, "extracting scenes");
        logger.log_progress("extracting scenes");
        let scene_timeout = self.config.scene_detection_timeout;
        let (scenes, _precision_cfg) = {
            let progress = progress.clone();
            tokio::time::timeout(
                scene_timeout,
                vclip_media::extract_scenes(&video_path, workspace_dir, precision, move |pct, msg| {
                    progress.emit("scene_extraction", pct, msg);
                }),
            )
            .await
            .map_err(|_| WorkerError::SceneTimeout(scene_timeout.as_secs()))??
        };

        if scenes.is_empty() {
            return Err(WorkerError::processing_failed("no scenes extracted"));
        }

        progress.emit("ai_analysis", 80, "analyzing scenes");
        logger.log_progress("analyzing scenes");
        let provider = self.config.default_provider;
        provider.validate_config()?;

        let capped = scenes.len().min(self.config.max_analysis_images);
        let mut images = Vec::with_capacity(capped);
        for scene in &scenes[..capped] {
            images.push(ImagePayload::from_file(&scene.frame_path, self.config.analysis_image_quality).await?);
        }

        let prompt = build_analysis_prompt(&metadata, images.len());
        let (model, response_text) = provider.call(&self.client, &images, &prompt, SYSTEM_PROMPT).await?;
        let analysis = parse(&response_text, &metadata.tags, provider.name(), &model);

        dump_debug_artifacts(workspace_dir, &prompt, &response_text).await;

        if !analysis.is_well_formed() {
            logger.log_warning("analysis response fell through to minimal fallback");
        }

        progress.emit("persist", 92, "persisting result");
        logger.log_progress("persisting result");
        let thumbnail_path = scenes.first().map(|s| s.frame_path.display().to_string());
        let mut record = VideoRecord::from_analysis(&metadata, &analysis, thumbnail_path, scenes.len() as u32);
        let id = self.store.upsert(record.clone()).await?;
        record.id = Some(id);

        if let Ok(bytes) = serde_json::to_vec_pretty(&analysis) {
            let _ = tokio::fs::write(workspace_dir.join("analysis_result.json"), bytes).await;
        }

        if let Ok(bytes) = serde_json::to_vec(&analysis) {
            self.cache.set(&analysis_key(url, precision), bytes, TTL_ANALYSIS).await;
        }
        if let Ok(bytes) = serde_json::to_vec(&metadata) {
            self.cache.set(&metadata_key(url), bytes, TTL_METADATA).await;
        }

        progress.emit("complete", 100, "analysis complete");
        Ok(serde_json::to_value(&record).unwrap_or_default())
    }
}

/// Dump the last provider call to `<workspace>/debug/` for troubleshooting.
/// Best-effort: a write failure here must never fail the pipeline.
async fn dump_debug_artifacts(workspace_dir: &std::path::Path, prompt: &str, response: &str) {
    let debug_dir = workspace_dir.join("debug");
    if tokio::fs::create_dir_all(&debug_dir).await.is_err() {
        return;
    }
    let _ = tokio::fs::write(debug_dir.join("prompt.txt"), prompt).await;
    let _ = tokio::fs::write(debug_dir.join("response.txt"), response).await;
}

#[async_trait]
impl JobRunner for PipelineRunner {
    async fn run(&self, kind: &JobKind, progress: ProgressSender) -> Result<serde_json::Value, String> {
        match kind {
            JobKind::AnalyzeVideo { url, precision } => self
                .run_analyze_video(url, *precision, &progress)
                .await
                .map_err(|e| e.to_string()),
        }
    }
}
