//! LLM response parsing into posts and technology epochs.
//!
//! Models do not always return clean JSON. Parsing tries several recovery
//! strategies in order: the raw text, a fenced code block, and both again
//! with trailing commas removed.

use lifeline_core::generator::EpochDraft;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::LlmError;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawPosts {
    Wrapped { posts: Vec<String> },
    List(Vec<String>),
}

#[derive(Debug, Deserialize)]
struct RawEpoch {
    #[serde(default, alias = "mainstream_technologies")]
    mainstream: Vec<TechEntry>,
    #[serde(default, alias = "emerging_technologies")]
    emerging: Vec<TechEntry>,
}

/// A technology given either as a bare name or as an object with a name.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TechEntry {
    Name(String),
    Detailed { name: String },
}

impl TechEntry {
    fn into_name(self) -> String {
        match self {
            Self::Name(name) | Self::Detailed { name } => name.trim().to_owned(),
        }
    }
}

/// Parse a posts response.
///
/// Accepts `{"posts": [...]}` or a bare JSON list. When a single post was
/// requested and the model answered in plain prose, the whole text is the
/// post.
pub fn parse_posts(raw: &str, requested: u32) -> Result<Vec<String>, LlmError> {
    let posts = match try_parse::<RawPosts>(raw) {
        Ok(RawPosts::Wrapped { posts } | RawPosts::List(posts)) => posts,
        Err(e) => {
            let prose = raw.trim();
            if requested == 1 && !prose.is_empty() {
                vec![prose.to_owned()]
            } else {
                return Err(e);
            }
        }
    };

    let posts: Vec<String> = posts
        .into_iter()
        .map(|p| p.trim().to_owned())
        .filter(|p| !p.is_empty())
        .collect();
    if posts.is_empty() {
        return Err(LlmError::Parse("response contained no posts".to_owned()));
    }
    Ok(posts)
}

/// Parse a digest response. Digests are free text.
pub fn parse_digest(raw: &str) -> Result<String, LlmError> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(LlmError::Parse("empty digest".to_owned()));
    }
    Ok(text.to_owned())
}

/// Parse an epoch response into a draft.
///
/// Anything listed as both mainstream and emerging is kept as mainstream.
pub fn parse_epoch(raw: &str) -> Result<EpochDraft, LlmError> {
    let parsed: RawEpoch = try_parse(raw)?;
    let mut draft = EpochDraft {
        mainstream: parsed
            .mainstream
            .into_iter()
            .map(TechEntry::into_name)
            .filter(|n| !n.is_empty())
            .collect(),
        emerging: parsed
            .emerging
            .into_iter()
            .map(TechEntry::into_name)
            .filter(|n| !n.is_empty())
            .collect(),
    };
    draft.emerging.retain(|t| !draft.mainstream.contains(t));
    if draft.mainstream.is_empty() && draft.emerging.is_empty() {
        return Err(LlmError::Parse("epoch lists no technologies".to_owned()));
    }
    Ok(draft)
}

/// Attempt to deserialize through the recovery strategies.
fn try_parse<T: DeserializeOwned>(raw: &str) -> Result<T, LlmError> {
    let trimmed = raw.trim();

    // Strategy 1: direct parse
    if let Ok(parsed) = serde_json::from_str::<T>(trimmed) {
        return Ok(parsed);
    }

    // Strategy 2: extract from markdown code block
    let block = extract_json_from_codeblock(trimmed);
    if let Some(json_str) = block
        && let Ok(parsed) = serde_json::from_str::<T>(json_str)
    {
        return Ok(parsed);
    }

    // Strategy 3: strip trailing commas and retry
    if let Ok(parsed) = serde_json::from_str::<T>(&strip_trailing_commas(trimmed)) {
        return Ok(parsed);
    }

    // Strategy 4: code block then strip commas
    if let Some(json_str) = block {
        return serde_json::from_str::<T>(&strip_trailing_commas(json_str)).map_err(LlmError::from);
    }

    Err(LlmError::Parse(format!(
        "all parse strategies failed for: {trimmed}"
    )))
}

/// Extract the body of the first fenced code block, with or without a
/// `json` tag.
fn extract_json_from_codeblock(text: &str) -> Option<&str> {
    let fence = text.find("```")?;
    let after_fence = text.get(fence.checked_add(3)?..)?;
    // Skip the info string (e.g. `json`) up to the end of the line.
    let body_start = after_fence.find('\n').and_then(|nl| nl.checked_add(1))?;
    let body = after_fence.get(body_start..)?;
    let end = body.find("```")?;
    body.get(..end).map(str::trim)
}

/// Strip trailing commas before closing braces and brackets.
fn strip_trailing_commas(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars();
    let mut in_string = false;
    let mut escaped = false;

    while let Some(c) = chars.next() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            result.push(c);
            continue;
        }
        if c == '"' {
            in_string = true;
        } else if c == ',' {
            let rest = chars.clone().find(|n| !n.is_whitespace());
            if matches!(rest, Some('}' | ']')) {
                continue;
            }
        }
        result.push(c);
    }

    result
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn wrapped_posts() {
        let posts = parse_posts(r#"{"posts": ["one", " two "]}"#, 2).unwrap();
        assert_eq!(posts, vec!["one", "two"]);
    }

    #[test]
    fn bare_list_in_code_block() {
        let raw = "Here you go:\n```json\n[\"one\", \"two\",]\n```";
        assert_eq!(parse_posts(raw, 2).unwrap(), vec!["one", "two"]);
    }

    #[test]
    fn plain_prose_is_a_single_post() {
        let raw = "[2025 | Age 22.0] Landed in New York at dawn.";
        assert_eq!(parse_posts(raw, 1).unwrap(), vec![raw]);
        assert!(parse_posts(raw, 2).is_err());
    }

    #[test]
    fn blank_posts_are_rejected() {
        assert!(parse_posts(r#"{"posts": ["  ", ""]}"#, 1).is_err());
    }

    #[test]
    fn epoch_with_detailed_entries() {
        let raw = r#"{
            "mainstream_technologies": [{"name": "AR glasses", "adoption": 0.6}],
            "emerging_technologies": ["neural interfaces", "AR glasses"]
        }"#;
        let draft = parse_epoch(raw).unwrap();
        assert!(draft.mainstream.contains("AR glasses"));
        assert_eq!(draft.emerging.len(), 1);
        assert!(draft.emerging.contains("neural interfaces"));
    }

    #[test]
    fn empty_epoch_is_rejected() {
        assert!(parse_epoch(r#"{"mainstream": [], "emerging": []}"#).is_err());
        assert!(parse_epoch("no idea").is_err());
    }

    #[test]
    fn trailing_commas_inside_strings_survive() {
        assert_eq!(
            strip_trailing_commas(r#"{"a": "x,]", "b": [1, 2,],}"#),
            r#"{"a": "x,]", "b": [1, 2]}"#
        );
    }

    #[test]
    fn digest_is_trimmed_text() {
        assert_eq!(parse_digest("  A year of change.\n").unwrap(), "A year of change.");
        assert!(parse_digest(" ").is_err());
    }
}
