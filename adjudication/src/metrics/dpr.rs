//! Dissent Preservation Rate.
//!
//! Measures which of the critic's objections survive into the synthesis. An
//! objection is a critique segment containing one of [`OBJECTION_MARKERS`];
//! it counts as preserved when enough of its key terms reappear in the
//! synthesis text.
//!
//! `dpr = preserved / objections`, `1.0` when there are no objections.
//! A low score together with an externally raised shared-agreement warning
//! flags false consensus.

use serde::{Deserialize, Serialize};

use super::text::{round4, words, KEYWORD_MIN_LEN};

pub const OBJECTION_MARKERS: &[&str] = &[
    "however",
    "incorrect",
    "wrong",
    "unverified",
    "fails",
    "hallucination",
    "no evidence",
    "questionable",
    "not supported",
    "inaccurate",
    "misleading",
    "contradicts",
    "unsupported",
    "no proof",
    "unfounded",
    "disputed",
    "lacks evidence",
    "cannot be verified",
    "not accurate",
];

const STOPWORDS: &[&str] = &[
    "would", "could", "should", "their", "there", "about", "other", "these", "those", "which",
    "where", "while", "though", "between", "because", "after", "before", "under", "since",
    "every", "being", "using", "through", "within", "during", "against", "without", "always",
    "often", "model", "models", "agent", "agents", "output", "claim", "claims", "point",
    "points", "argument", "arguments",
];

const FALSE_CONSENSUS_THRESHOLD: f64 = 0.4;
const MIN_OBJECTIONS_FOR_FLAG: usize = 2;
const MAX_TERMS: usize = 6;
const MAX_KEYWORDS: usize = 20;
const MIN_SEGMENT_CHARS: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DprResult {
    /// Fraction of objections preserved, rounded to four decimals.
    pub score: f64,
    pub total_objections: usize,
    pub preserved: usize,
    pub false_consensus: bool,
    /// Distinct key terms across all objections, capped at twenty.
    pub objection_keywords: Vec<String>,
}

/// Strip a leading `-`, `*`, `•` or `N.` list marker. `None` if the line is
/// not a list item.
fn strip_list_marker(line: &str) -> Option<&str> {
    for bullet in ['-', '*', '•'] {
        if let Some(rest) = line.strip_prefix(bullet) {
            if rest.starts_with(char::is_whitespace) {
                return Some(rest.trim_start());
            }
        }
    }
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(after_dot) = rest.strip_prefix('.') {
            if after_dot.starts_with(char::is_whitespace) {
                return Some(after_dot.trim_start());
            }
        }
    }
    None
}

/// Split after `.`, `!` or `?` when followed by whitespace.
fn split_sentences(line: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut chars = line.char_indices().peekable();
    while let Some((_, c)) = chars.next() {
        if matches!(c, '.' | '!' | '?') {
            if let Some(&(next_idx, next)) = chars.peek() {
                if next.is_whitespace() {
                    out.push(&line[start..next_idx]);
                    start = next_idx;
                }
            }
        }
    }
    out.push(&line[start..]);
    out
}

/// Sentence and list-item units of a critique.
pub fn segments(text: &str) -> Vec<String> {
    let mut units = Vec::new();
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match strip_list_marker(trimmed) {
            Some(item) => units.push(item.to_string()),
            None => units.extend(split_sentences(trimmed).into_iter().map(str::to_string)),
        }
    }
    units
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| s.chars().count() > MIN_SEGMENT_CHARS)
        .collect()
}

fn is_objection(segment: &str) -> bool {
    let lower = segment.to_lowercase();
    OBJECTION_MARKERS.iter().any(|m| lower.contains(m))
}

/// Up to six distinctive terms of a segment, in order of appearance.
pub fn key_terms(segment: &str) -> Vec<String> {
    words(segment)
        .into_iter()
        .filter(|w| w.chars().count() > KEYWORD_MIN_LEN && !STOPWORDS.contains(&w.as_str()))
        .take(MAX_TERMS)
        .collect()
}

fn required_hits(term_count: usize) -> usize {
    if term_count >= MAX_TERMS {
        2
    } else {
        ((term_count as f64 * 0.25).ceil() as usize).max(1)
    }
}

pub fn compute_dpr(critique: &str, synthesis: &str, sas_warning: bool) -> DprResult {
    let synthesis_lower = synthesis.to_lowercase();
    let objections: Vec<String> = segments(critique)
        .into_iter()
        .filter(|s| is_objection(s))
        .collect();

    if objections.is_empty() {
        return DprResult {
            score: 1.0,
            total_objections: 0,
            preserved: 0,
            false_consensus: false,
            objection_keywords: Vec::new(),
        };
    }

    let mut keywords: Vec<String> = Vec::new();
    let mut preserved = 0;
    for objection in &objections {
        let terms = key_terms(objection);
        let hits = terms
            .iter()
            .filter(|t| synthesis_lower.contains(t.as_str()))
            .count();
        if hits >= required_hits(terms.len()) {
            preserved += 1;
        }
        for term in terms {
            if !keywords.contains(&term) {
                keywords.push(term);
            }
        }
    }
    keywords.truncate(MAX_KEYWORDS);

    let total = objections.len();
    let score = round4(preserved as f64 / total as f64);
    DprResult {
        score,
        total_objections: total,
        preserved,
        false_consensus: score < FALSE_CONSENSUS_THRESHOLD
            && sas_warning
            && total >= MIN_OBJECTIONS_FOR_FLAG,
        objection_keywords: keywords,
    }
}
