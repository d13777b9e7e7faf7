//! Shared tokenization for the text metrics.

use std::collections::HashSet;

/// Minimum length (exclusive) of a word counted by the dissent score.
pub const DISSENT_MIN_LEN: usize = 3;

/// Minimum length (exclusive) of a keyword for balance, DPR and dual-run
/// comparison.
pub const KEYWORD_MIN_LEN: usize = 4;

/// Lowercased words in order of appearance, punctuation replaced by spaces.
pub fn words(text: &str) -> Vec<String> {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect();
    cleaned.split_whitespace().map(str::to_string).collect()
}

/// Distinct words longer than `min_len` characters.
pub fn word_set(text: &str, min_len: usize) -> HashSet<String> {
    words(text)
        .into_iter()
        .filter(|w| w.chars().count() > min_len)
        .collect()
}

/// `|A ∩ B| / |A ∪ B|`. Two empty sets are identical.
pub fn jaccard_similarity(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 1.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

pub fn jaccard_distance(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    1.0 - jaccard_similarity(a, b)
}

/// Round to four decimal places for stored scores.
pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_words_strip_punctuation() {
        assert_eq!(words("Hello, World! GDP-growth"), vec!["hello", "world", "gdp", "growth"]);
    }

    #[test]
    fn test_word_set_length_filter() {
        let set = word_set("the quick brown fox jumps", KEYWORD_MIN_LEN);
        assert!(set.contains("quick"));
        assert!(set.contains("brown"));
        assert!(!set.contains("fox"));
        assert!(!set.contains("the"));
    }

    #[test]
    fn test_unicode_words_kept() {
        let set = word_set("Größere Änderungen", KEYWORD_MIN_LEN);
        assert!(set.contains("größere"));
        assert!(set.contains("änderungen"));
    }

    #[test]
    fn test_jaccard_bounds() {
        let a = word_set("alpha beta gamma", 0);
        let b = word_set("alpha beta gamma", 0);
        let c = word_set("delta epsilon", 0);
        assert_eq!(jaccard_similarity(&a, &b), 1.0);
        assert_eq!(jaccard_distance(&a, &c), 1.0);
        assert_eq!(jaccard_similarity(&HashSet::new(), &HashSet::new()), 1.0);
    }

    #[test]
    fn test_round4() {
        assert_eq!(round4(2.0 / 3.0), 0.6667);
    }
}
