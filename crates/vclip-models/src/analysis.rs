//! Parsed multimodal-analysis results.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Minimum character length for `reasoning`/`features` to count as a
/// validly-parsed (non-minimal-fallback) answer.
pub const ANALYSIS_REASON_MIN_CHARS: usize = 20;

pub const MIN_TAGS: usize = 10;
pub const MAX_TAGS: usize = 20;

/// The structured result of parsing a provider's natural-language
/// response against the A1..A7 analysis prompt.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ParsedAnalysis {
    pub genre: String,
    pub reasoning: String,
    pub features: String,
    pub tags: Vec<String>,
    pub expression_style: String,
    pub mood_tone: String,
    pub target_audience: String,

    pub model_used: String,
    pub analysis_date: DateTime<Utc>,

    /// Raw provider response, kept for debugging/replay.
    #[serde(default)]
    pub raw_response: String,
}

impl ParsedAnalysis {
    pub fn is_well_formed(&self) -> bool {
        !self.genre.is_empty() && self.reasoning.chars().count() >= ANALYSIS_REASON_MIN_CHARS
    }
}

/// Default closed genre set, used when no custom configuration is supplied.
pub fn default_genres() -> Vec<&'static str> {
    vec![
        "2D-animation",
        "3D-animation",
        "motion-graphics",
        "interview",
        "spot-ad",
        "vlog",
        "youtube-content",
        "documentary",
        "brand-film",
        "TVC",
        "music-video",
        "educational",
        "product-intro",
        "event",
        "web-drama",
        "viral",
    ]
}

/// Default closed expression-style set.
pub fn default_expression_styles() -> Vec<&'static str> {
    vec!["2D", "3D", "live-action", "hybrid", "stop-motion", "typography"]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_formed_requires_genre_and_reason_length() {
        let mut a = sample();
        assert!(a.is_well_formed());

        a.genre.clear();
        assert!(!a.is_well_formed());
    }

    fn sample() -> ParsedAnalysis {
        ParsedAnalysis {
            genre: "documentary".into(),
            reasoning: "a".repeat(30),
            features: "b".repeat(30),
            tags: vec!["a".into()],
            expression_style: "live-action".into(),
            mood_tone: "calm".into(),
            target_audience: "general".into(),
            model_used: "gemini:gemini-2.0-flash".into(),
            analysis_date: Utc::now(),
            raw_response: String::new(),
        }
    }
}
