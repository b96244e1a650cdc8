use std::sync::LazyLock;

use regex::Regex;

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("tag regex"));
static SPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("space regex"));

const PREVIEW_CHARS: usize = 100;

/// Drops markup tags and collapses runs of whitespace.
pub fn strip_html(html: &str) -> String {
    let text = TAG_RE.replace_all(html, " ");
    SPACE_RE.replace_all(&text, " ").trim().to_owned()
}

/// Plain-text excerpt used by note listings.
pub fn preview(html: &str) -> String {
    let text = strip_html(html);
    if text.chars().count() > PREVIEW_CHARS {
        let cut: String = text.chars().take(PREVIEW_CHARS).collect();
        format!("{cut}...")
    } else {
        text
    }
}
