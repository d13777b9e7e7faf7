//! Three-round cross-examination: interrogation, defense, verdict.
//!
//! [`CrossExamination`] holds the rounds completed so far and only accepts
//! them in order. Verdict cannot be entered until every proposal has a
//! defense. The persisted critique is the full transcript of all three
//! rounds, available once the examination is complete.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{info, info_span, Instrument};

use super::error::{PipelineError, PipelineResult};
use crate::config::Language;
use crate::prompts;
use crate::provider::{ModelBinding, ProviderError};
use crate::types::{Critique, Proposal, Usage};

static QUESTION_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^[ \t]*#{2,}\s*(?:questions\s+for|fragen\s+an)\s+proposal\s+(\d+)")
        .expect("QUESTION_HEADER regex should compile")
});

/// Round of a cross-examination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CrossExamPhase {
    /// Critic asks questions per proposal.
    Interrogation,
    /// Each generator answers the questions about its proposal.
    Defense,
    /// Critic scores the proposals in light of the defenses.
    Verdict,
    /// All rounds recorded.
    Complete,
}

impl CrossExamPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete)
    }

    /// The only phase reachable from this one.
    pub fn valid_transitions(self) -> &'static [CrossExamPhase] {
        match self {
            Self::Interrogation => &[Self::Defense],
            Self::Defense => &[Self::Verdict],
            Self::Verdict => &[Self::Complete],
            Self::Complete => &[],
        }
    }
}

impl std::fmt::Display for CrossExamPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Interrogation => write!(f, "interrogation"),
            Self::Defense => write!(f, "defense"),
            Self::Verdict => write!(f, "verdict"),
            Self::Complete => write!(f, "complete"),
        }
    }
}

/// A recorded phase change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseTransition {
    pub from: CrossExamPhase,
    pub to: CrossExamPhase,
    pub timestamp: DateTime<Utc>,
}

/// Error for out-of-order rounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionError {
    pub from: CrossExamPhase,
    pub to: CrossExamPhase,
    pub reason: String,
}

impl std::fmt::Display for TransitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid transition {} → {}: {}",
            self.from, self.to, self.reason
        )
    }
}

impl std::error::Error for TransitionError {}

/// One generator's answer to the critic's questions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefenseRecord {
    /// Label of the proposal being defended.
    pub model: String,
    /// Question segment routed to the defender.
    pub questions: String,
    pub defense: String,
}

/// Progress of one cross-examination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrossExamination {
    phase: CrossExamPhase,
    proposal_count: usize,
    interrogation: Option<String>,
    defenses: Vec<DefenseRecord>,
    verdict: Option<String>,
    transitions: Vec<PhaseTransition>,
}

impl CrossExamination {
    pub fn new(proposal_count: usize) -> Self {
        Self {
            phase: CrossExamPhase::Interrogation,
            proposal_count,
            interrogation: None,
            defenses: Vec::new(),
            verdict: None,
            transitions: Vec::new(),
        }
    }

    pub fn phase(&self) -> CrossExamPhase {
        self.phase
    }

    pub fn transitions(&self) -> &[PhaseTransition] {
        &self.transitions
    }

    pub fn interrogation(&self) -> Option<&str> {
        self.interrogation.as_deref()
    }

    pub fn defenses(&self) -> &[DefenseRecord] {
        &self.defenses
    }

    fn advance(&mut self, to: CrossExamPhase) -> Result<(), TransitionError> {
        if !self.phase.valid_transitions().contains(&to) {
            return Err(TransitionError {
                from: self.phase,
                to,
                reason: format!(
                    "not a valid transition (allowed: {:?})",
                    self.phase.valid_transitions()
                ),
            });
        }
        self.transitions.push(PhaseTransition {
            from: self.phase,
            to,
            timestamp: Utc::now(),
        });
        self.phase = to;
        Ok(())
    }

    /// Record round 1 and move to Defense.
    pub fn record_interrogation(&mut self, text: String) -> Result<(), TransitionError> {
        self.advance(CrossExamPhase::Defense)?;
        self.interrogation = Some(text);
        Ok(())
    }

    /// Record round 2 and move to Verdict. Requires one defense per proposal.
    pub fn record_defenses(&mut self, defenses: Vec<DefenseRecord>) -> Result<(), TransitionError> {
        if self.phase == CrossExamPhase::Defense && defenses.len() != self.proposal_count {
            return Err(TransitionError {
                from: self.phase,
                to: CrossExamPhase::Verdict,
                reason: format!(
                    "{} of {} proposals defended",
                    defenses.len(),
                    self.proposal_count
                ),
            });
        }
        self.advance(CrossExamPhase::Verdict)?;
        self.defenses = defenses;
        Ok(())
    }

    /// Record round 3 and complete.
    pub fn record_verdict(&mut self, text: String) -> Result<(), TransitionError> {
        self.advance(CrossExamPhase::Complete)?;
        self.verdict = Some(text);
        Ok(())
    }

    /// Questions and defenses per proposal, as shown to the verdict round.
    pub fn exchange_text(&self) -> String {
        self.defenses
            .iter()
            .enumerate()
            .map(|(i, d)| {
                format!(
                    "\n=== PROPOSAL {} ({}) ===\nQUESTIONS:\n{}\n\nDEFENSE:\n{}",
                    i + 1,
                    d.model,
                    d.questions,
                    d.defense
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n---\n")
    }

    /// Full three-round transcript. Only available once complete.
    pub fn transcript(&self) -> Result<String, TransitionError> {
        let (Some(interrogation), Some(verdict)) = (&self.interrogation, &self.verdict) else {
            return Err(TransitionError {
                from: self.phase,
                to: CrossExamPhase::Complete,
                reason: "transcript requested before all rounds completed".to_string(),
            });
        };
        if !self.phase.is_terminal() {
            return Err(TransitionError {
                from: self.phase,
                to: CrossExamPhase::Complete,
                reason: "transcript requested before all rounds completed".to_string(),
            });
        }

        let mut lines = vec![
            "## MULTI-TURN CROSS-EXAMINATION (3 Rounds)".to_string(),
            String::new(),
            "### Round 1: Interrogation".to_string(),
            interrogation.clone(),
            String::new(),
            "### Round 2: Generator Defenses".to_string(),
        ];
        for d in &self.defenses {
            lines.push(format!("\n**{} Defense:**\n{}", d.model, d.defense));
        }
        lines.push(String::new());
        lines.push("### Round 3: Final Verdict".to_string());
        lines.push(verdict.clone());
        Ok(lines.join("\n"))
    }
}

/// Question segment for proposal `index` (0-based), from its header up to
/// the next proposal header. Falls back to the whole interrogation when no
/// matching header exists.
pub fn extract_questions(interrogation: &str, index: usize) -> String {
    let headers: Vec<(usize, Option<usize>)> = QUESTION_HEADER
        .captures_iter(interrogation)
        .filter_map(|caps| {
            let start = caps.get(0)?.start();
            let number = caps.get(1).and_then(|m| m.as_str().parse().ok());
            Some((start, number))
        })
        .collect();

    let wanted = index + 1;
    for (pos, (start, number)) in headers.iter().enumerate() {
        if *number == Some(wanted) {
            let end = headers
                .get(pos + 1)
                .map(|(next, _)| *next)
                .unwrap_or(interrogation.len());
            return interrogation[*start..end].trim().to_string();
        }
    }
    interrogation.to_string()
}

/// Run all three rounds. Any failed call aborts the whole examination.
pub async fn cross_examine(
    critic: &ModelBinding,
    generators: &[ModelBinding],
    proposals: &[Proposal],
    language: Language,
    context: Option<&str>,
    verification: Option<&str>,
) -> PipelineResult<(Critique, Usage)> {
    if generators.is_empty() {
        return Err(crate::config::ConfigError::NoGenerators.into());
    }

    let mut exam = CrossExamination::new(proposals.len());
    let mut usage = Usage::default();
    let round_failed = |round: CrossExamPhase| {
        move |source: ProviderError| PipelineError::CriticStage { round, source }
    };

    // Round 1
    let prompt = prompts::interrogation(language, proposals, context);
    let response = critic
        .call(&prompt)
        .instrument(info_span!("interrogation", model = %critic.model))
        .await
        .map_err(round_failed(CrossExamPhase::Interrogation))?;
    usage += response.usage();
    exam.record_interrogation(response.content)?;
    info!(phase = %exam.phase(), "interrogation recorded");

    // Round 2: defense calls run concurrently, routed to the proposal's author.
    let interrogation = exam.interrogation().unwrap_or_default().to_string();
    let calls = proposals.iter().enumerate().map(|(i, proposal)| {
        let defender = &generators[i % generators.len()];
        let questions = extract_questions(&interrogation, i);
        let prompt = prompts::defense(language, &proposal.content, &questions);
        async move {
            let result = defender
                .call(&prompt)
                .instrument(info_span!("defense", proposal = i + 1, model = %defender.model))
                .await;
            (proposal.model.clone(), questions, result)
        }
    });
    let mut defenses = Vec::with_capacity(proposals.len());
    for (model, questions, result) in join_all(calls).await {
        let response = result.map_err(round_failed(CrossExamPhase::Defense))?;
        usage += response.usage();
        defenses.push(DefenseRecord {
            model,
            questions,
            defense: response.content,
        });
    }
    exam.record_defenses(defenses)?;
    info!(phase = %exam.phase(), defenses = exam.defenses().len(), "defenses recorded");

    // Round 3
    let prompt = prompts::verdict(
        language,
        proposals,
        &exam.exchange_text(),
        context,
        verification,
    );
    let response = critic
        .call(&prompt)
        .instrument(info_span!("verdict", model = %critic.model))
        .await
        .map_err(round_failed(CrossExamPhase::Verdict))?;
    usage += response.usage();
    exam.record_verdict(response.content)?;

    let transcript = exam.transcript()?;
    info!(chars = transcript.len(), "cross-examination complete");
    Ok((Critique::new(critic.label(), transcript), usage))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defense(model: &str) -> DefenseRecord {
        DefenseRecord {
            model: model.to_string(),
            questions: "Q?".to_string(),
            defense: format!("{} defends", model),
        }
    }

    #[test]
    fn test_rounds_in_order() {
        let mut exam = CrossExamination::new(2);
        assert_eq!(exam.phase(), CrossExamPhase::Interrogation);
        exam.record_interrogation("questions".into()).unwrap();
        exam.record_defenses(vec![defense("a"), defense("b")]).unwrap();
        exam.record_verdict("verdict".into()).unwrap();
        assert_eq!(exam.phase(), CrossExamPhase::Complete);
        assert_eq!(exam.transitions().len(), 3);
    }

    #[test]
    fn test_verdict_before_defense_rejected() {
        let mut exam = CrossExamination::new(1);
        exam.record_interrogation("q".into()).unwrap();
        let err = exam.record_verdict("v".into()).unwrap_err();
        assert_eq!(err.from, CrossExamPhase::Defense);
        assert_eq!(err.to, CrossExamPhase::Complete);
    }

    #[test]
    fn test_incomplete_defenses_rejected() {
        let mut exam = CrossExamination::new(3);
        exam.record_interrogation("q".into()).unwrap();
        let err = exam.record_defenses(vec![defense("a")]).unwrap_err();
        assert!(err.reason.contains("1 of 3"));
        assert_eq!(exam.phase(), CrossExamPhase::Defense);
    }

    #[test]
    fn test_skip_interrogation_rejected() {
        let mut exam = CrossExamination::new(1);
        assert!(exam.record_defenses(vec![defense("a")]).is_err());
    }

    #[test]
    fn test_transcript_requires_completion() {
        let mut exam = CrossExamination::new(1);
        exam.record_interrogation("q".into()).unwrap();
        assert!(exam.transcript().is_err());
    }

    #[test]
    fn test_transcript_layout() {
        let mut exam = CrossExamination::new(2);
        exam.record_interrogation("ASKED".into()).unwrap();
        exam.record_defenses(vec![defense("grok-3"), defense("kimi-k2")]).unwrap();
        exam.record_verdict("JUDGED".into()).unwrap();
        let text = exam.transcript().unwrap();

        let r1 = text.find("### Round 1: Interrogation").unwrap();
        let asked = text.find("ASKED").unwrap();
        let r2 = text.find("### Round 2: Generator Defenses").unwrap();
        let d1 = text.find("**grok-3 Defense:**").unwrap();
        let d2 = text.find("**kimi-k2 Defense:**").unwrap();
        let r3 = text.find("### Round 3: Final Verdict").unwrap();
        let judged = text.find("JUDGED").unwrap();
        assert!(r1 < asked && asked < r2 && r2 < d1 && d1 < d2 && d2 < r3 && r3 < judged);
    }

    #[test]
    fn test_extract_questions_by_header() {
        let text = "Intro line\n\
                    ## Questions for Proposal 1 (grok-3)\n1. Source?\n\n\
                    ## Questions for Proposal 2 (kimi-k2)\n1. Why B?\n\n\
                    ## Questions for Proposal 3 (claude)\n1. Which study?";
        let q2 = extract_questions(text, 1);
        assert!(q2.starts_with("## Questions for Proposal 2"));
        assert!(q2.contains("Why B?"));
        assert!(!q2.contains("Source?"));
        assert!(!q2.contains("Which study?"));

        let q3 = extract_questions(text, 2);
        assert!(q3.ends_with("Which study?"));
    }

    #[test]
    fn test_extract_questions_german_headers() {
        let text = "## Fragen an Proposal 1 (a)\n1. Quelle?\n## Fragen an Proposal 2 (b)\n1. Warum?";
        assert_eq!(extract_questions(text, 0), "## Fragen an Proposal 1 (a)\n1. Quelle?");
    }

    #[test]
    fn test_extract_questions_fallback_whole_text() {
        let text = "Proposal one: where is your source? Proposal two: why?";
        assert_eq!(extract_questions(text, 1), text);
        let partial = "## Questions for Proposal 1 (a)\n1. Only one section";
        assert_eq!(extract_questions(partial, 2), partial);
    }
}
