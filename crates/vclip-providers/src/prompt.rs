//! A1..A7 analysis prompt construction.

use vclip_models::analysis::{default_expression_styles, default_genres};
use vclip_models::VideoMetadata;

pub const SYSTEM_PROMPT: &str = "You are an expert video content analyst. You will be shown a video's \
thumbnail plus a representative set of scene frames. Answer every item below, in order, \
each prefixed by its label exactly as given (A1:, A2:, ... A7:). Do not add commentary \
outside the labeled items.";

const DESCRIPTION_TRUNCATE_AT: usize = 500;

/// `duration_seconds` rendered as "M분 S초" (minutes/seconds).
fn format_duration(duration_seconds: f64) -> String {
    let total_seconds = duration_seconds.round().max(0.0) as u64;
    format!("{}분 {}초", total_seconds / 60, total_seconds % 60)
}

fn metadata_header(metadata: &VideoMetadata) -> String {
    let mut lines = vec![format!("Title: {}", metadata.title)];

    if !metadata.uploader.is_empty() {
        lines.push(format!("Uploader/channel: {}", metadata.uploader));
    }
    if metadata.duration_seconds > 0.0 {
        lines.push(format!("Duration: {}", format_duration(metadata.duration_seconds)));
    }
    if metadata.view_count > 0 {
        lines.push(format!("Views: {}", format_number_with_commas(metadata.view_count)));
    }

    lines.join("\n")
}

fn format_number_with_commas(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out.chars().rev().collect()
}

fn description_section(description: &str) -> String {
    if description.is_empty() {
        return String::new();
    }
    let truncated: String = description.chars().take(DESCRIPTION_TRUNCATE_AT).collect();
    let suffix = if description.chars().count() > DESCRIPTION_TRUNCATE_AT {
        "..."
    } else {
        ""
    };
    format!("\n\nDescription:\n{truncated}{suffix}")
}

/// Build the user-facing prompt for a video: a metadata header (uploader,
/// duration, view count, description), the image-count/thumbnail-first
/// instruction, then the labeled A1..A7 items. `platform_tags` steers A4
/// away from duplicating tags the platform already provided.
pub fn build_analysis_prompt(metadata: &VideoMetadata, image_count: usize) -> String {
    let genres = default_genres().join(", ");
    let styles = default_expression_styles().join(", ");
    let platform_tags_note = if metadata.tags.is_empty() {
        "none provided".to_string()
    } else {
        metadata.tags.join(", ")
    };

    let header = metadata_header(metadata);
    let description = description_section(&metadata.description);

    format!(
        r#"Video metadata:
{header}{description}

Analyze the {image_count} images extracted from this video. The first image is
the thumbnail; the rest are representative scenes from the video.

Answer the following items, in order. Prefix each answer with its label
exactly as shown.

A1. Genre — choose exactly one from: {genres}
A2. Reasoning — at least 200 characters explaining why this genre fits, citing what you see in the frames.
A3. Features — at least 200 characters describing visual/editing features (pacing, framing, color, composition).
A4. Tags — at least 10 comma-separated tags describing the content. Do not repeat any of these platform tags: {platform_tags_note}. Do not prefix tags with '#'.
A5. Expression style — choose exactly one from: {styles}
A6. Mood/tone — one or two words describing the overall mood.
A7. Target audience — a short phrase describing who this content is aimed at.
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use vclip_models::{Platform, VideoId};

    fn sample_metadata() -> VideoMetadata {
        VideoMetadata {
            video_id: VideoId::new("abc123"),
            platform: Platform::Youtube,
            title: "A cooking video".to_string(),
            uploader: "Chef Channel".to_string(),
            upload_date: None,
            description: "d".repeat(600),
            language: None,
            tags: vec!["shorts".to_string()],
            categories: Vec::new(),
            duration_seconds: 125.0,
            width: 1920,
            height: 1080,
            view_count: 12345,
            like_count: 0,
            comment_count: 0,
            url: "https://youtube.com/watch?v=abc123".to_string(),
            webpage_url: "https://youtube.com/watch?v=abc123".to_string(),
            thumbnail_url: None,
            subtitle_files: HashMap::new(),
        }
    }

    #[test]
    fn prompt_includes_all_seven_items() {
        let prompt = build_analysis_prompt(&sample_metadata(), 8);
        for item in ["A1.", "A2.", "A3.", "A4.", "A5.", "A6.", "A7."] {
            assert!(prompt.contains(item), "missing {item}");
        }
        assert!(prompt.contains("shorts"));
    }

    #[test]
    fn prompt_includes_header_fields() {
        let prompt = build_analysis_prompt(&sample_metadata(), 8);
        assert!(prompt.contains("Chef Channel"));
        assert!(prompt.contains("2분 5초"));
        assert!(prompt.contains("12,345"));
        assert!(prompt.contains("8 images"));
    }

    #[test]
    fn prompt_truncates_long_description() {
        let prompt = build_analysis_prompt(&sample_metadata(), 8);
        assert!(prompt.contains("ddd..."));
        assert!(!prompt.contains(&"d".repeat(501)));
    }
}
