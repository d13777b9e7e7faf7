//! Cost estimation from token counts.
//!
//! Rates are USD per million tokens, matched by case-insensitive substring
//! of the model identifier. First match wins, so more specific keys come
//! first.

const PRICE_PER_MILLION: &[(&str, f64)] = &[
    ("claude-opus", 15.0),
    ("claude-sonnet", 3.0),
    ("claude-haiku", 0.8),
    ("gpt-4o-mini", 0.6),
    ("gpt-4o", 5.0),
    ("gpt-4", 30.0),
    ("grok", 5.0),
    ("moonshot", 1.0),
    ("kimi", 1.0),
    ("deepseek", 0.5),
    ("sonar", 1.0),
];

const DEFAULT_PRICE_PER_MILLION: f64 = 2.0;

/// Estimated cost in USD of `tokens` tokens on `model`.
pub fn estimate_cost(model: &str, tokens: u64) -> f64 {
    let lower = model.to_lowercase();
    let rate = PRICE_PER_MILLION
        .iter()
        .find(|(key, _)| lower.contains(key))
        .map(|(_, rate)| *rate)
        .unwrap_or(DEFAULT_PRICE_PER_MILLION);
    tokens as f64 / 1_000_000.0 * rate
}
