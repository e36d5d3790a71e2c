//! HTML to plain text for item descriptions
//!
//! `sanitize` is a pure function: the same HTML and limit always produce the
//! same text.

use html_escape::decode_html_entities;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::SENTINEL;

pub const TRUNCATION_MARKER: &str = "…";

// Create static patterns to avoid recompiling them each time
static SCRIPT_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").expect("valid script pattern"));
static STYLE_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<style\b[^>]*>.*?</style\s*>").expect("valid style pattern"));
static NOSCRIPT_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<noscript\b[^>]*>.*?</noscript\s*>").expect("valid noscript pattern")
});
static COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid comment pattern"));
static LINE_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<br\s*/?>").expect("valid br pattern"));
static BLOCK_END: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)</(p|li|div|tr|h[1-6]|section|article|header|footer|ul|ol|table|blockquote|dd|dt)\s*>",
    )
    .expect("valid block end pattern")
});
static ANY_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid tag pattern"));
static HORIZONTAL_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[ \t\r\x0B\x0C]+").expect("valid whitespace pattern"));
static BLANK_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("valid newline pattern"));

/// Lines that are shop boilerplate rather than a description of the item.
static BOILERPLATE: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)^(payment|shipping|delivery|returns?|return policy|terms(\s+(and|&)\s+conditions)?|feedback|about us|contact us)\s*:?$",
        r"(?i)\b(free|fast|international|worldwide|combined)\s+shipping\b",
        r"(?i)\bships?\s+(within|in)\s+\d+",
        r"(?i)\bitem\s+(will\s+be\s+)?shipped\b",
        r"(?i)\breturns?\s+(are\s+)?accepted\b",
        r"(?i)\b(we\s+)?(do\s+not|don't)\s+accept\s+returns\b",
        r"(?i)\bno\s+returns\b",
        r"(?i)\bseller\s+assumes\s+all\s+responsibility\b",
        r"(?i)\ball\s+rights\s+reserved\b",
        r"(?i)^(copyright|©|\(c\))\s*(©|\(c\))?\s*(\d{4}|by\b)",
        r"(?i)\bpowered\s+by\b",
        r"(?i)\btemplate\s+(by|designed)\b",
        r"(?i)\bplease\s+(leave|check)\s+(positive\s+)?feedback\b",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("valid boilerplate pattern"))
    .collect()
});

/// Convert description HTML to readable text of at most `limit` characters
/// plus `TRUNCATION_MARKER`. Returns the sentinel when nothing is left.
pub fn sanitize(html: &str, limit: usize) -> String {
    if html.trim().is_empty() {
        return SENTINEL.to_string();
    }

    let text = SCRIPT_BLOCK.replace_all(html, "");
    let text = STYLE_BLOCK.replace_all(&text, "");
    let text = NOSCRIPT_BLOCK.replace_all(&text, "");
    let text = COMMENT.replace_all(&text, "");

    let text = LINE_BREAK.replace_all(&text, "\n");
    let text = BLOCK_END.replace_all(&text, "\n");
    let text = ANY_TAG.replace_all(&text, " ");

    let text = decode_html_entities(&text);
    let text = normalize_whitespace(&text);

    let kept: Vec<&str> = text.lines().filter(|line| !is_boilerplate(line)).collect();
    let text = normalize_whitespace(&kept.join("\n"));

    if text.is_empty() {
        return SENTINEL.to_string();
    }

    truncate(&text, limit)
}

pub fn is_boilerplate(line: &str) -> bool {
    let line = line.trim();
    !line.is_empty() && BOILERPLATE.iter().any(|pattern| pattern.is_match(line))
}

/// Cut `text` to `limit` characters, appending the marker when anything was cut.
pub fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }

    let mut result: String = text.chars().take(limit).collect();
    result.truncate(result.trim_end().len());
    result.push_str(TRUNCATION_MARKER);
    result
}

fn normalize_whitespace(text: &str) -> String {
    let text = text.replace('\u{a0}', " ");
    let text = HORIZONTAL_RUN.replace_all(&text, " ");

    let lines: Vec<&str> = text.lines().map(str::trim).collect();
    let text = lines.join("\n");

    BLANK_RUN.replace_all(&text, "\n\n").trim().to_string()
}
