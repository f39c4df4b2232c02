//! Transition detection and mid-frame extraction.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info, warn};
use vclip_models::{Scene, SceneType};

use crate::error::{MediaError, MediaResult};
use crate::probe::VideoInfo;

use super::precision::PrecisionConfig;

pub const DEFAULT_SCENE_THRESHOLD: f64 = 0.3;
pub const DEFAULT_MIN_SCENE_DURATION: f64 = 0.5;

/// Short-form videos (<=60s, or a tall aspect ratio) get a more sensitive
/// threshold, matching the teacher's Shorts/Reels detection in `probe.rs`.
pub fn is_short_form(info: &VideoInfo) -> bool {
    if info.duration <= 60.0 {
        return true;
    }
    if info.width == 0 {
        return false;
    }
    (info.height as f64 / info.width as f64) > 1.5
}

/// Run FFmpeg's scene filter and collect transition timestamps, independent
/// of precision. Threshold is not modulated by precision per spec.
pub async fn detect_transitions(video_path: &Path, threshold: f64) -> MediaResult<Vec<f64>> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)?;

    let filter = format!("select='gt(scene,{threshold})',showinfo");
    let output = Command::new("ffmpeg")
        .args(["-i"])
        .arg(video_path)
        .args(["-filter:v", &filter, "-f", "null", "-"])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await?;

    let stderr = String::from_utf8_lossy(&output.stderr);
    let mut timestamps: Vec<f64> = stderr
        .lines()
        .filter_map(|line| {
            let idx = line.find("pts_time:")?;
            line[idx + "pts_time:".len()..].split_whitespace().next()?.parse().ok()
        })
        .collect();

    if let Some(&first) = timestamps.first() {
        if first > 1.0 {
            timestamps.insert(0, 0.0);
        }
    } else {
        timestamps.push(0.0);
    }

    info!(count = timestamps.len(), threshold, "detected scene transitions");
    Ok(timestamps)
}

/// Extract a still frame at the midpoint of every consecutive transition
/// pair spanning at least `min_scene_duration`, emitting progress 40..70%.
pub async fn extract_midpoint_frames(
    video_path: &Path,
    mut transitions: Vec<f64>,
    output_dir: &Path,
    duration: f64,
    min_scene_duration: f64,
    precision: &PrecisionConfig,
    mut progress_cb: impl FnMut(u8, &str),
) -> MediaResult<Vec<Scene>> {
    tokio::fs::create_dir_all(output_dir).await?;

    if let Some(&last) = transitions.last() {
        if last < duration - 1.0 {
            transitions.push(duration);
        }
    }

    let total_pairs = transitions.len().saturating_sub(1);
    let mut scenes = Vec::new();

    for i in 0..total_pairs {
        let start = transitions[i];
        let end = transitions[i + 1];
        if end - start < min_scene_duration {
            continue;
        }

        if total_pairs > 0 {
            let progress = 40 + ((i * 30) / total_pairs) as u8;
            progress_cb(progress, &format!("extracting frame {}/{total_pairs}", i + 1));
        }

        let mid = (start + end) / 2.0;
        let output_path = output_dir.join(format!("scene_{i:04}.jpg"));

        let status = Command::new("ffmpeg")
            .args(["-ss", &mid.to_string(), "-i"])
            .arg(video_path)
            .args(["-frames:v", "1", "-q:v", precision.frame_quality()])
            .arg(&output_path)
            .arg("-y")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !status.status.success() {
            warn!(timestamp = mid, "frame extraction failed, skipping scene");
            continue;
        }

        if tokio::fs::try_exists(&output_path).await.unwrap_or(false) {
            scenes.push(Scene::new(mid, output_path, SceneType::Mid));
        }
    }

    debug!(count = scenes.len(), "extracted midpoint frames");
    Ok(scenes)
}

/// Copy the finalized (grouped) scene set into its own directory, updating
/// each scene's `grouped_index` so later stages can find the finalized file.
pub async fn finalize_grouped_scenes(
    scenes: Vec<Scene>,
    grouped_dir: &Path,
) -> MediaResult<Vec<(Scene, PathBuf)>> {
    tokio::fs::create_dir_all(grouped_dir).await?;

    let mut out = Vec::with_capacity(scenes.len());
    for (i, mut scene) in scenes.into_iter().enumerate() {
        let grouped_path = grouped_dir.join(format!("grouped_{i:04}.jpg"));
        if let Err(e) = tokio::fs::copy(&scene.frame_path, &grouped_path).await {
            warn!(error = %e, "failed to copy grouped scene, keeping original path");
            let fallback = scene.frame_path.clone();
            out.push((scene, fallback));
            continue;
        }
        scene.grouped_index = Some(i);
        out.push((scene, grouped_path));
    }
    Ok(out)
}
