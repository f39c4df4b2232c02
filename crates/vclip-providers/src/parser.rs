//! Four-tier response-parsing cascade: labeled -> sectional -> free-form -> minimal.

use regex::Regex;
use std::sync::OnceLock;

use vclip_models::ParsedAnalysis;

const MIN_RESPONSE_CHARS: usize = 100;
const MIN_REASON_CHARS: usize = 20;

#[derive(Debug, Default, Clone)]
struct ParsedFields {
    genre: String,
    reasoning: String,
    features: String,
    tags: Vec<String>,
    expression_style: String,
    mood_tone: String,
    target_audience: String,
}

impl ParsedFields {
    fn is_well_formed(&self) -> bool {
        !self.genre.is_empty() && self.reasoning.chars().count() >= MIN_REASON_CHARS
    }
}

/// Parse a provider's raw text response, falling through increasingly
/// lenient strategies, and merge the resulting tags with the platform's
/// own tags (deduplicated, capped at 20).
pub fn parse(response: &str, platform_tags: &[String], provider: &str, model: &str) -> ParsedAnalysis {
    let fields = if response.trim().chars().count() < MIN_RESPONSE_CHARS {
        ParsedFields::default()
    } else {
        parse_labeled(response)
            .filter(ParsedFields::is_well_formed)
            .or_else(|| parse_sectional(response).filter(ParsedFields::is_well_formed))
            .or_else(|| parse_freeform(response).filter(ParsedFields::is_well_formed))
            .unwrap_or_else(|| parse_minimal(response))
    };

    let tags = merge_tags(fields.tags, platform_tags);

    ParsedAnalysis {
        genre: fields.genre,
        reasoning: fields.reasoning,
        features: fields.features,
        tags,
        expression_style: fields.expression_style,
        mood_tone: fields.mood_tone,
        target_audience: fields.target_audience,
        model_used: format!("{provider}:{model}"),
        analysis_date: chrono::Utc::now(),
        raw_response: response.to_string(),
    }
}

fn label_regex(label: &str, next: Option<&str>) -> Regex {
    let pattern = match next {
        Some(next_label) => format!(r"(?is){label}[.\s]*[:：]?\s*(.+?)(?=\n{next_label}|{next_label}|$)"),
        None => format!(r"(?is){label}[.\s]*[:：]?\s*(.+)$"),
    };
    Regex::new(&pattern).expect("static labeled pattern is valid")
}

fn parse_labeled(response: &str) -> Option<ParsedFields> {
    static LABELS: OnceLock<Vec<(&'static str, Regex)>> = OnceLock::new();
    let labels = LABELS.get_or_init(|| {
        vec![
            ("genre", label_regex("A1", Some("A2"))),
            ("reasoning", label_regex("A2", Some("A3"))),
            ("features", label_regex("A3", Some("A4"))),
            ("tags", label_regex("A4", Some("A5"))),
            ("expression_style", label_regex("A5", Some("A6"))),
            ("mood_tone", label_regex("A6", Some("A7"))),
            ("target_audience", label_regex("A7", None)),
        ]
    });

    let mut fields = ParsedFields::default();
    let mut any_matched = false;

    for (field, re) in labels {
        if let Some(caps) = re.captures(response) {
            any_matched = true;
            let value = clean_text(caps.get(1)?.as_str());
            match *field {
                "genre" => fields.genre = first_line(&value),
                "reasoning" => fields.reasoning = value,
                "features" => fields.features = value,
                "tags" => fields.tags = split_tags(&value),
                "expression_style" => fields.expression_style = first_line(&value),
                "mood_tone" => fields.mood_tone = value,
                "target_audience" => fields.target_audience = value,
                _ => unreachable!(),
            }
        }
    }

    any_matched.then_some(fields)
}

fn parse_sectional(response: &str) -> Option<ParsedFields> {
    let sections: Vec<String> = response
        .split("\n\n")
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    if sections.len() < 4 {
        return None;
    }

    let mut fields = ParsedFields::default();
    fields.genre = first_line(&sections[0]);
    fields.reasoning = clean_text(&sections[1]);
    fields.features = clean_text(&sections[2]);
    fields.tags = split_tags(&sections[3]);
    if let Some(s) = sections.get(4) {
        fields.expression_style = first_line(s);
    }
    if let Some(s) = sections.get(5) {
        fields.mood_tone = clean_text(s);
    }
    if let Some(s) = sections.get(6) {
        fields.target_audience = clean_text(s);
    }

    Some(fields)
}

fn parse_freeform(response: &str) -> Option<ParsedFields> {
    let mut fields = ParsedFields::default();

    for keyword in ["genre", "category", "classification", "type"] {
        if let Some(pos) = response.to_lowercase().find(keyword) {
            let rest = &response[pos..];
            if let Some(line) = rest.lines().next() {
                if let Some((_, value)) = line.split_once(':') {
                    fields.genre = first_line(value);
                    break;
                }
            }
        }
    }

    for keyword in ["tags", "keywords"] {
        if let Some(pos) = response.to_lowercase().find(keyword) {
            let rest = &response[pos..];
            if let Some(line) = rest.lines().next() {
                if let Some((_, value)) = line.split_once(':') {
                    fields.tags = split_tags(value);
                    break;
                }
            }
        }
    }

    let long_lines: Vec<&str> = response.lines().map(str::trim).filter(|l| l.chars().count() > 100).collect();
    match long_lines.len() {
        0 => {}
        1 => fields.reasoning = long_lines[0].to_string(),
        _ => {
            fields.reasoning = long_lines[0].to_string();
            fields.features = long_lines[1].to_string();
        }
    }

    (!fields.genre.is_empty() || !fields.reasoning.is_empty()).then_some(fields)
}

fn parse_minimal(response: &str) -> ParsedFields {
    let mut fields = ParsedFields::default();
    if let Some(line) = response.lines().map(str::trim).find(|l| !l.is_empty()) {
        fields.genre = first_line(line);
    }
    fields.reasoning = if response.chars().count() > 500 {
        response.chars().take(500).collect::<String>() + "..."
    } else {
        response.to_string()
    };
    fields.tags = extract_keyword_tags(response);
    fields
}

/// Last-resort tag extraction for responses too garbled to label-parse:
/// count word frequency (excluding a short stopword list) and keep the
/// 10 most frequent, first-seen order breaking ties.
fn extract_keyword_tags(text: &str) -> Vec<String> {
    const STOPWORDS: [&str; 6] = ["video", "videos", "analysis", "image", "images", "content"];

    static WORD_RE: OnceLock<Regex> = OnceLock::new();
    let word_re = WORD_RE.get_or_init(|| Regex::new(r"[A-Za-z]{2,10}").expect("static word pattern is valid"));

    let mut order: Vec<String> = Vec::new();
    let mut freq: std::collections::HashMap<String, usize> = std::collections::HashMap::new();
    for word in word_re.find_iter(text).map(|m| m.as_str().to_lowercase()) {
        if STOPWORDS.contains(&word.as_str()) {
            continue;
        }
        if !freq.contains_key(&word) {
            order.push(word.clone());
        }
        *freq.entry(word).or_insert(0) += 1;
    }

    order.sort_by(|a, b| freq[b].cmp(&freq[a]));
    order.truncate(10);
    order
}

fn split_tags(text: &str) -> Vec<String> {
    const DELIMS: [char; 6] = [',', '/', '#', '\u{b7}', '|', '\n'];
    let counts: Vec<(char, usize)> = DELIMS.iter().map(|&d| (d, text.matches(d).count())).collect();
    let (best, best_count) = counts.into_iter().max_by_key(|(_, c)| *c).unwrap();

    let raw: Vec<&str> = if best_count == 0 { text.split_whitespace().collect() } else { text.split(best).collect() };

    raw.into_iter()
        .map(|t| t.trim().trim_matches(['#', '-', '*', '\u{b7}', ' ']).to_string())
        .filter(|t| t.chars().count() > 1 && t.chars().count() < 50)
        .take(20)
        .collect()
}

fn merge_tags(parsed: Vec<String>, platform_tags: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut merged = Vec::new();
    for tag in parsed.into_iter().chain(platform_tags.iter().cloned()) {
        let key = tag.to_lowercase();
        if seen.insert(key) {
            merged.push(tag);
        }
        if merged.len() == 20 {
            break;
        }
    }
    merged
}

fn clean_text(text: &str) -> String {
    let text = text.trim();
    let text = text.trim_start_matches(|c: char| c.is_ascii_digit() || c == 'A' || c == '.' || c == ':' || c.is_whitespace());
    text.trim_matches(['-', '*', '\u{b7}', ' ']).trim().to_string()
}

fn first_line(text: &str) -> String {
    let cleaned = clean_text(text);
    let line = cleaned.lines().next().unwrap_or("").trim();
    if line.chars().count() > 50 {
        line.chars().take(50).collect()
    } else {
        line.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labeled_format_parses_all_items() {
        let response = "A1: documentary\n\
A2: This video shows a long, careful exploration of a subject with detailed narration and context that exceeds twenty characters easily.\n\
A3: Steady handheld camera work, natural lighting, long takes that exceed twenty characters easily as well.\n\
A4: nature, wildlife, calm, educational, outdoors, river, forest, birds, morning, narration\n\
A5: live-action\n\
A6: calm\n\
A7: nature enthusiasts\n";

        let result = parse(response, &["travel".to_string()], "gemini", "gemini-2.5-flash");
        assert_eq!(result.genre, "documentary");
        assert!(result.tags.contains(&"travel".to_string()));
        assert!(result.tags.len() >= 10);
        assert_eq!(result.model_used, "gemini:gemini-2.5-flash");
    }

    #[test]
    fn sectional_fallback_handles_blank_line_sections() {
        let response = format!(
            "educational\n\n{}\n\n{}\n\nlearning, classroom, teacher, books, lesson, student, school, board, chalk, desks",
            "a".repeat(210),
            "b".repeat(210),
        );

        let result = parse(&response, &[], "claude", "claude-sonnet-4-20250514");
        assert_eq!(result.genre, "educational");
        assert!(result.tags.len() >= 10);
    }

    #[test]
    fn minimal_fallback_never_panics_on_garbage() {
        let result = parse("short junk", &[], "openai", "gpt-4o");
        assert_eq!(result.model_used, "openai:gpt-4o");
    }

    #[test]
    fn minimal_fallback_extracts_keyword_tags_from_garbled_response() {
        let response = "mountain mountain mountain river river forest hiking trail ridge peak summit dawn fog pine trail trail";
        let result = parse(response, &[], "gemini", "gemini-2.5-flash");
        assert!(result.tags.contains(&"mountain".to_string()));
        assert!(result.tags.contains(&"trail".to_string()));
    }

    #[test]
    fn tag_merge_dedupes_case_insensitively() {
        let merged = merge_tags(vec!["Travel".to_string(), "nature".to_string()], &["travel".to_string()]);
        assert_eq!(merged, vec!["Travel".to_string(), "nature".to_string()]);
    }
}
