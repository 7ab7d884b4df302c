use once_cell::sync::Lazy;
use regex::Regex;

static THINK_TAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<think>[\s\S]*?</think>|<think\s*/>").unwrap());

static REASONING_TAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<reasoning>[\s\S]*?</reasoning>").unwrap());

/// Opening fence with an optional info string, then the body up to the closing fence.
static FENCED_BLOCK_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```[^\n`]*\r?\n([\s\S]*?)```").unwrap());

const FENCE: &str = "```";

/// Removes reasoning artifacts some models emit around the actual answer.
pub fn clean_llm_response(response: &str) -> String {
    let cleaned = THINK_TAG_PATTERN.replace_all(response, "");
    let cleaned = REASONING_TAG_PATTERN.replace_all(&cleaned, "");
    cleaned.trim().to_string()
}

/// Best-effort removal of markdown code fences around a payload.
///
/// A complete fenced block wins over surrounding prose. Otherwise stray
/// leading (with language tag) and trailing fence markers are dropped.
pub fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    if let Some(body) = first_fenced_block(trimmed) {
        return body;
    }

    let mut rest = trimmed;
    if let Some(stripped) = rest.strip_prefix(FENCE) {
        rest = stripped.trim_start_matches(|c: char| c.is_ascii_alphanumeric() || c == '_');
    }
    if let Some(stripped) = rest.trim_end().strip_suffix(FENCE) {
        rest = stripped;
    }
    rest.trim().to_string()
}

/// Code inside the first fenced block; an unclosed fence yields the rest of
/// the text after its info line. Unfenced text is returned trimmed.
pub fn extract_first_code_block(text: &str) -> String {
    let trimmed = text.trim();
    if let Some(body) = first_fenced_block(trimmed) {
        return body;
    }

    match trimmed.find(FENCE) {
        Some(start) => {
            let after = &trimmed[start + FENCE.len()..];
            let body = match after.find('\n') {
                Some(newline) => &after[newline + 1..],
                None => after,
            };
            body.trim().to_string()
        }
        None => trimmed.to_string(),
    }
}

fn first_fenced_block(text: &str) -> Option<String> {
    FENCED_BLOCK_PATTERN
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|body| body.as_str().trim().to_string())
}
