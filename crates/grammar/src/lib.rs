//! Offline grammar and spelling rules for note text.
//!
//! A small fixed rule set: common misspellings, doubled whitespace, missing
//! space after punctuation, and a handful of grammar slips. Positions are
//! byte offsets into the checked text.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueKind {
    Spelling,
    Spacing,
    Punctuation,
    Grammar,
}

impl IssueKind {
    pub fn as_str(self) -> &'static str {
        match self {
            IssueKind::Spelling => "spelling",
            IssueKind::Spacing => "spacing",
            IssueKind::Punctuation => "punctuation",
            IssueKind::Grammar => "grammar",
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrammarIssue {
    pub error: String,
    pub correction: String,
    #[serde(rename = "type")]
    pub kind: IssueKind,
    pub position: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GrammarStats {
    pub total: usize,
    pub spelling: usize,
    pub grammar: usize,
    pub punctuation: usize,
    pub spacing: usize,
}

struct Rule {
    pattern: Regex,
    /// Replacement template; `$1`-style groups are expanded.
    correction: &'static str,
    kind: IssueKind,
}

const RULE_TABLE: &[(&str, &str, IssueKind)] = &[
    (r"(?i)\bteh\b", "the", IssueKind::Spelling),
    (r"(?i)\brecieve\b", "receive", IssueKind::Spelling),
    (r"(?i)\boccured\b", "occurred", IssueKind::Spelling),
    (r"(?i)\bseperate\b", "separate", IssueKind::Spelling),
    (r"(?i)\bdefinately\b", "definitely", IssueKind::Spelling),
    (r"(?i)\baccomodate\b", "accommodate", IssueKind::Spelling),
    (r"\s{2,}", " ", IssueKind::Spacing),
    (r"([.!?,:;])([A-Z])", "$1 $2", IssueKind::Punctuation),
    (r"(?i)\byour welcome\b", "you're welcome", IssueKind::Grammar),
    (r"(?i)\bits okay\b", "it's okay", IssueKind::Grammar),
    (r"(?i)\bshould of\b", "should have", IssueKind::Grammar),
    (r"(?i)\bcould of\b", "could have", IssueKind::Grammar),
    (r"(?i)\bwould of\b", "would have", IssueKind::Grammar),
];

static RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    RULE_TABLE
        .iter()
        .map(|&(pattern, correction, kind)| Rule {
            pattern: Regex::new(pattern).expect("grammar rule pattern"),
            correction,
            kind,
        })
        .collect()
});

/// Every rule match in `text`, grouped by rule in table order.
pub fn check(text: &str) -> Vec<GrammarIssue> {
    let mut issues = Vec::new();
    for rule in RULES.iter() {
        for caps in rule.pattern.captures_iter(text) {
            let Some(found) = caps.get(0) else {
                continue;
            };
            let mut correction = String::new();
            caps.expand(rule.correction, &mut correction);
            issues.push(GrammarIssue {
                error: found.as_str().to_owned(),
                correction,
                kind: rule.kind,
                position: found.start(),
            });
        }
    }
    issues
}

/// Applies every rule to `text`.
pub fn correct_all(text: &str) -> String {
    RULES.iter().fold(text.to_owned(), |acc, rule| {
        rule.pattern.replace_all(&acc, rule.correction).into_owned()
    })
}

/// Wraps the first occurrence of each issue's text in a marker span,
/// working from the last issue to the first.
pub fn highlight(html: &str, issues: &[GrammarIssue]) -> String {
    let mut ordered: Vec<&GrammarIssue> = issues.iter().collect();
    ordered.sort_by(|a, b| b.position.cmp(&a.position));

    let mut result = html.to_owned();
    for issue in ordered {
        let span = format!(
            r#"<span class="grammar-error" title="{}: {}">{}</span>"#,
            issue.kind, issue.correction, issue.error
        );
        result = result.replacen(&issue.error, &span, 1);
    }
    result
}

pub fn stats(issues: &[GrammarIssue]) -> GrammarStats {
    issues.iter().fold(GrammarStats::default(), |mut stats, issue| {
        stats.total += 1;
        match issue.kind {
            IssueKind::Spelling => stats.spelling += 1,
            IssueKind::Grammar => stats.grammar += 1,
            IssueKind::Punctuation => stats.punctuation += 1,
            IssueKind::Spacing => stats.spacing += 1,
        }
        stats
    })
}

/// Replaces the first occurrence of the issue's text with its correction.
pub fn apply_correction(text: &str, issue: &GrammarIssue) -> String {
    text.replacen(&issue.error, &issue.correction, 1)
}
