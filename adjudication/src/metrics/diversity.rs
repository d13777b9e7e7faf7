//! Model Diversity Index and dissent score.

use std::collections::HashMap;

use super::text::{jaccard_distance, word_set, DISSENT_MIN_LEN};

/// Brand substrings mapped to provider families. Checked in order.
const FAMILIES: &[(&str, &str)] = &[
    ("claude", "anthropic"),
    ("anthropic", "anthropic"),
    ("chatgpt", "openai"),
    ("gpt", "openai"),
    ("openai", "openai"),
    ("grok", "xai"),
    ("moonshot", "moonshot"),
    ("kimi", "moonshot"),
    ("deepseek", "deepseek"),
    ("gemini", "google"),
    ("gemma", "google"),
    ("llama", "meta"),
    ("mixtral", "mistral"),
    ("codestral", "mistral"),
    ("mistral", "mistral"),
    ("qwen", "alibaba"),
    ("sonar", "perplexity"),
    ("command-r", "cohere"),
];

/// Provider family of a model identifier. Unknown identifiers fall back to
/// their first hyphen-delimited token.
pub fn model_family(model: &str) -> String {
    let lower = model.to_lowercase();
    if let Some((_, family)) = FAMILIES.iter().find(|(marker, _)| lower.contains(marker)) {
        return (*family).to_string();
    }
    lower.split('-').next().unwrap_or(&lower).to_string()
}

/// Gini–Simpson diversity `1 − Σpᵢ²` over provider families. Zero for an
/// empty list.
pub fn model_diversity_index<S: AsRef<str>>(models: &[S]) -> f64 {
    if models.is_empty() {
        return 0.0;
    }
    let mut counts: HashMap<String, usize> = HashMap::new();
    for model in models {
        *counts.entry(model_family(model.as_ref())).or_default() += 1;
    }
    let total = models.len() as f64;
    let concentration: f64 = counts
        .values()
        .map(|&c| {
            let p = c as f64 / total;
            p * p
        })
        .sum();
    1.0 - concentration
}

/// Mean pairwise Jaccard distance between proposal word sets. Zero when
/// fewer than two texts are given.
pub fn dissent_score<S: AsRef<str>>(texts: &[S]) -> f64 {
    if texts.len() < 2 {
        return 0.0;
    }
    let sets: Vec<_> = texts
        .iter()
        .map(|t| word_set(t.as_ref(), DISSENT_MIN_LEN))
        .collect();

    let mut total = 0.0;
    let mut pairs = 0usize;
    for i in 0..sets.len() {
        for j in (i + 1)..sets.len() {
            total += jaccard_distance(&sets[i], &sets[j]);
            pairs += 1;
        }
    }
    total / pairs as f64
}
