//! A single extracted frame.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where a scene sits in the extraction pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SceneType {
    Start,
    Mid,
    End,
    Selected,
}

/// A frame extracted at a detected transition.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Scene {
    pub timestamp_seconds: f64,
    pub frame_path: PathBuf,
    pub scene_type: SceneType,
    /// Transition strength, 0..1.
    pub confidence: f64,
    /// Index into `grouped_scenes` if this frame was selected as a
    /// representative, avoiding a cyclic Scene<->Video reference.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grouped_index: Option<usize>,
}

impl Scene {
    pub fn new(timestamp_seconds: f64, frame_path: PathBuf, scene_type: SceneType) -> Self {
        Self {
            timestamp_seconds,
            frame_path,
            scene_type,
            confidence: 1.0,
            grouped_index: None,
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }
}
