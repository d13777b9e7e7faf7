//! Claim verification against a search collaborator.
//!
//! Classification is a substring match on the search response: any
//! contradiction marker wins over any confirmation marker, and a response
//! with neither is inconclusive. This is best effort only.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::Language;
use crate::prompts;
use crate::provider::ModelBinding;
use crate::types::{Proposal, Usage};

static JSON_ARRAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\[.*?\]").expect("JSON_ARRAY regex should compile"));

static LINE_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^[-*"\d.)\s]+"#).expect("LINE_PREFIX regex should compile")
});

const CONFIRM_MARKERS: &[&str] = &["true", "correct", "accurate", "confirmed"];
const CONTRADICT_MARKERS: &[&str] = &[
    "false",
    "incorrect",
    "inaccurate",
    "wrong",
    "not true",
    "fabricated",
];
const MAX_RESULT_CHARS: usize = 500;
const SUMMARY_RESULT_CHARS: usize = 200;
const MIN_FALLBACK_CLAIM_CHARS: usize = 10;
const SEARCH_FAILED: &str = "Search failed, unable to verify";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClaimStatus {
    Confirmed,
    Contradicted,
    Inconclusive,
}

impl std::fmt::Display for ClaimStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Confirmed => write!(f, "confirmed"),
            Self::Contradicted => write!(f, "contradicted"),
            Self::Inconclusive => write!(f, "inconclusive"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimCheck {
    pub claim: String,
    /// Search response, truncated.
    pub search_result: String,
    pub status: ClaimStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationReport {
    pub results: Vec<ClaimCheck>,
    /// Rendered text passed to the critic and synthesizer.
    pub summary: String,
}

impl VerificationReport {
    pub fn count(&self, status: ClaimStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }

    fn empty() -> Self {
        Self {
            results: Vec::new(),
            summary: "No verifiable factual claims extracted from proposals.".to_string(),
        }
    }

    fn from_results(results: Vec<ClaimCheck>) -> Self {
        let mut summary = format!(
            "WEB VERIFICATION REPORT: {} confirmed, {} contradicted, {} inconclusive out of {} claims checked.\n\n",
            results.iter().filter(|r| r.status == ClaimStatus::Confirmed).count(),
            results.iter().filter(|r| r.status == ClaimStatus::Contradicted).count(),
            results.iter().filter(|r| r.status == ClaimStatus::Inconclusive).count(),
            results.len()
        );
        let body = results
            .iter()
            .map(|r| {
                format!(
                    "{}: \"{}\"\n   -> {}",
                    r.status.to_string().to_uppercase(),
                    r.claim,
                    truncate(&r.search_result, SUMMARY_RESULT_CHARS)
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n");
        summary.push_str(&body);
        Self { results, summary }
    }
}

fn truncate(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Classify a search response.
pub fn classify(search_result: &str) -> ClaimStatus {
    let lower = search_result.to_lowercase();
    if CONTRADICT_MARKERS.iter().any(|m| lower.contains(m)) {
        ClaimStatus::Contradicted
    } else if CONFIRM_MARKERS.iter().any(|m| lower.contains(m)) {
        ClaimStatus::Confirmed
    } else {
        ClaimStatus::Inconclusive
    }
}

/// Claims from an extractor response: the first JSON string array if one
/// parses, otherwise one claim per sufficiently long line.
pub fn parse_claims(response: &str, max_claims: usize) -> Vec<String> {
    let from_json = JSON_ARRAY
        .find(response)
        .and_then(|m| serde_json::from_str::<Vec<String>>(m.as_str()).ok());

    let claims: Vec<String> = match from_json {
        Some(claims) => claims
            .into_iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect(),
        None => response
            .lines()
            .map(|l| LINE_PREFIX.replace(l, "").trim().to_string())
            .filter(|l| l.chars().count() > MIN_FALLBACK_CLAIM_CHARS)
            .collect(),
    };
    claims.into_iter().take(max_claims).collect()
}

/// Extract claims with `extractor`, then check each one sequentially with
/// `search`. A failed extraction yields an empty report; a failed search
/// marks that claim inconclusive.
pub async fn verify_claims(
    extractor: &ModelBinding,
    search: &ModelBinding,
    proposals: &[Proposal],
    language: Language,
    max_claims: usize,
) -> (VerificationReport, Usage) {
    let mut usage = Usage::default();
    let answered: Vec<Proposal> = proposals.iter().filter(|p| !p.is_error()).cloned().collect();

    let prompt = prompts::claim_extraction(language, &answered, max_claims);
    let claims = match extractor.call(&prompt).await {
        Ok(response) => {
            usage += response.usage();
            parse_claims(&response.content, max_claims)
        }
        Err(e) => {
            warn!(error = %e, "claim extraction failed, continuing without verification");
            return (VerificationReport::empty(), usage);
        }
    };
    if claims.is_empty() {
        return (VerificationReport::empty(), usage);
    }

    let mut results = Vec::with_capacity(claims.len());
    for claim in claims {
        let check = match search.call(&prompts::fact_check(&claim)).await {
            Ok(response) => {
                usage += response.usage();
                ClaimCheck {
                    status: classify(&response.content),
                    search_result: truncate(&response.content, MAX_RESULT_CHARS),
                    claim,
                }
            }
            Err(e) => {
                warn!(error = %e, "claim search failed");
                ClaimCheck {
                    claim,
                    search_result: SEARCH_FAILED.to_string(),
                    status: ClaimStatus::Inconclusive,
                }
            }
        };
        results.push(check);
    }

    let report = VerificationReport::from_results(results);
    info!(
        claims = report.results.len(),
        confirmed = report.count(ClaimStatus::Confirmed),
        contradicted = report.count(ClaimStatus::Contradicted),
        "claim verification complete"
    );
    (report, usage)
}
