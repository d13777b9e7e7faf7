//! Pipeline stage tests against scripted providers: fan-out failure
//! handling, cross-examination routing and dual-run synthesis.

mod common;

use std::time::Duration;

use adjudication::config::Language;
use adjudication::pipeline::{
    cross_examine, fan_out, synthesize, verify_claims, ClaimStatus, CrossExamPhase, PipelineError,
    Stage,
};
use adjudication::types::{Critique, Proposal, ERROR_MARKER};

use common::{bind, ScriptedProvider};

// ── Generator fan-out ──────────────────────────────────────────────

#[tokio::test]
async fn test_one_failed_generator_keeps_its_slot() {
    let generators = vec![
        bind(&ScriptedProvider::fixed("xai", "Answer one"), "grok-3"),
        bind(&ScriptedProvider::failing("moonshot"), "moonshot-v1-32k"),
        bind(&ScriptedProvider::fixed("anthropic", "Answer three"), "claude-sonnet"),
    ];

    let out = fan_out(&generators, "Is it safe?", Language::En, None)
        .await
        .unwrap();

    assert_eq!(out.proposals.len(), 3);
    assert_eq!(out.failed_count(), 1);
    assert_eq!(out.proposals[0].content, "Answer one");
    assert!(out.proposals[1].content.starts_with(ERROR_MARKER));
    assert!(out.proposals[1].content.contains("moonshot failed"));
    assert_eq!(out.proposals[1].model, "moonshot-v1-32k");
    assert_eq!(out.proposals[2].content, "Answer three");
    // Failed calls contribute no usage.
    assert_eq!(out.usage.tokens, 200);
}

#[tokio::test(start_paused = true)]
async fn test_proposals_follow_generator_order_not_completion_order() {
    let first = ScriptedProvider::slow("xai", "Slowest answer", Duration::from_secs(30));
    let second = ScriptedProvider::slow("moonshot", "Middle answer", Duration::from_secs(10));
    let third = ScriptedProvider::slow("anthropic", "Fastest answer", Duration::from_secs(1));
    let generators = vec![
        bind(&first, "grok-3"),
        bind(&second, "kimi-k2"),
        bind(&third, "claude-sonnet"),
    ];

    let started = tokio::time::Instant::now();
    let out = fan_out(&generators, "Is it safe?", Language::En, None)
        .await
        .unwrap();

    // Concurrent: total wait is the slowest call, not the sum.
    assert!(started.elapsed() < Duration::from_secs(41));
    let models: Vec<&str> = out.proposals.iter().map(|p| p.model.as_str()).collect();
    assert_eq!(models, vec!["grok-3", "kimi-k2", "claude-sonnet"]);
    assert_eq!(out.proposals[0].content, "Slowest answer");
    assert_eq!(out.proposals[2].content, "Fastest answer");
}

#[tokio::test]
async fn test_all_generators_failed() {
    let generators = vec![
        bind(&ScriptedProvider::failing("xai"), "grok-3"),
        bind(&ScriptedProvider::failing("moonshot"), "moonshot-v1-32k"),
        bind(&ScriptedProvider::failing("anthropic"), "claude-sonnet"),
    ];

    let err = fan_out(&generators, "Is it safe?", Language::En, None)
        .await
        .unwrap_err();

    match err {
        PipelineError::AllGeneratorsFailed { count, first } => {
            assert_eq!(count, 3);
            assert_eq!(first.provider(), "xai");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_model_label_strips_vendor_prefix() {
    let generators = vec![bind(
        &ScriptedProvider::fixed("openrouter", "ok"),
        "moonshotai/kimi-k2",
    )];
    let out = fan_out(&generators, "q", Language::De, None).await.unwrap();
    assert_eq!(out.proposals[0].model, "kimi-k2");
}

// ── Cross-examination ─────────────────────────────────────────────

const INTERROGATION: &str = "## Questions for Proposal 1 (alpha)\n1. Where does the 40% figure come from?\n\n## Questions for Proposal 2 (beta)\n1. Which study shows the reversal?";

#[tokio::test]
async fn test_defense_routed_to_author() {
    let critic = ScriptedProvider::new("critic", |n, _| {
        Ok(match n {
            0 => INTERROGATION.to_string(),
            _ => "Proposal 1 holds up best.".to_string(),
        })
    });
    let gen_a = ScriptedProvider::fixed("a", "I withdraw the 40% figure.");
    let gen_b = ScriptedProvider::fixed("b", "The study is real: Smith 2019.");
    let generators = vec![bind(&gen_a, "alpha"), bind(&gen_b, "beta")];
    let proposals = vec![
        Proposal::new("alpha", "Costs fall by 40%."),
        Proposal::new("beta", "The trend reversed."),
    ];

    let (critique, usage) = cross_examine(
        &bind(&critic, "critic-model"),
        &generators,
        &proposals,
        Language::En,
        None,
        None,
    )
    .await
    .unwrap();

    // Interrogation, verdict and two defenses.
    assert_eq!(critic.call_count(), 2);
    assert_eq!(usage.tokens, 400);

    let a_prompts = gen_a.prompts();
    assert_eq!(a_prompts.len(), 1);
    assert!(a_prompts[0].contains("Where does the 40% figure come from?"));
    assert!(!a_prompts[0].contains("Which study shows the reversal?"));
    assert!(a_prompts[0].contains("Costs fall by 40%."));

    let b_prompts = gen_b.prompts();
    assert!(b_prompts[0].contains("Which study shows the reversal?"));
    assert!(!b_prompts[0].contains("Where does the 40% figure come from?"));

    // The verdict round sees both defenses.
    let verdict_prompt = &critic.prompts()[1];
    assert!(verdict_prompt.contains("I withdraw the 40% figure."));
    assert!(verdict_prompt.contains("Smith 2019"));

    let transcript = &critique.content;
    let r1 = transcript.find("### Round 1: Interrogation").unwrap();
    let r2 = transcript.find("### Round 2: Generator Defenses").unwrap();
    let r3 = transcript.find("### Round 3: Final Verdict").unwrap();
    assert!(r1 < r2 && r2 < r3);
    let alpha = transcript.find("**alpha Defense:**").unwrap();
    let beta = transcript.find("**beta Defense:**").unwrap();
    assert!(r2 < alpha && alpha < beta && beta < r3);
    assert!(transcript.ends_with("Proposal 1 holds up best."));
    assert_eq!(critique.model, "critic-model");
}

#[tokio::test]
async fn test_defense_falls_back_to_full_interrogation() {
    let critic = ScriptedProvider::new("critic", |n, _| {
        Ok(if n == 0 {
            "Everyone: justify your numbers.".to_string()
        } else {
            "verdict".to_string()
        })
    });
    let gen = ScriptedProvider::fixed("g", "defended");
    let proposals = vec![Proposal::new("g1", "x"), Proposal::new("g2", "y")];

    cross_examine(
        &bind(&critic, "c"),
        &[bind(&gen, "g1")],
        &proposals,
        Language::En,
        None,
        None,
    )
    .await
    .unwrap();

    // One generator answers both defenses when there are fewer generators.
    let prompts = gen.prompts();
    assert_eq!(prompts.len(), 2);
    assert!(prompts
        .iter()
        .all(|p| p.contains("Everyone: justify your numbers.")));
}

#[tokio::test]
async fn test_failed_defense_aborts_examination() {
    let critic = ScriptedProvider::fixed("critic", INTERROGATION);
    let generators = vec![
        bind(&ScriptedProvider::fixed("a", "fine"), "alpha"),
        bind(&ScriptedProvider::failing("b"), "beta"),
    ];
    let proposals = vec![Proposal::new("alpha", "x"), Proposal::new("beta", "y")];

    let err = cross_examine(
        &bind(&critic, "c"),
        &generators,
        &proposals,
        Language::En,
        None,
        None,
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::CriticStage {
            round: CrossExamPhase::Defense,
            ..
        }
    ));
    // No verdict call after a failed defense.
    assert_eq!(critic.call_count(), 1);
}

// ── Synthesis ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_dual_run_divergence_keeps_alternate() {
    let primary = ScriptedProvider::fixed("anthropic", "Adopt incremental migration strategy");
    let alternate = ScriptedProvider::fixed("openai", "Rewrite everything immediately from scratch");
    let proposals = vec![Proposal::new("grok-3", "migrate slowly")];
    let critique = Critique::new("c", "fine");

    let outcome = synthesize(
        &bind(&primary, "claude-sonnet"),
        Some(&bind(&alternate, "gpt-4o")),
        &proposals,
        &critique,
        Language::En,
        None,
        None,
    )
    .await
    .unwrap();

    assert_eq!(outcome.synthesis.content, "Adopt incremental migration strategy");
    let verification = outcome.verification.unwrap();
    assert!(verification.diverged);
    assert!(!verification.verified);
    assert_eq!(verification.alt_model.as_deref(), Some("gpt-4o"));
    assert_eq!(
        verification.alt_synthesis.as_deref(),
        Some("Rewrite everything immediately from scratch")
    );
    assert_eq!(outcome.usage.tokens, 200);
}

#[tokio::test]
async fn test_alt_synthesizer_failure_is_reported() {
    let primary = ScriptedProvider::fixed("anthropic", "answer");
    let alternate = ScriptedProvider::failing("openai");

    let err = synthesize(
        &bind(&primary, "claude-sonnet"),
        Some(&bind(&alternate, "gpt-4o")),
        &[Proposal::new("m", "p")],
        &Critique::new("c", "fine"),
        Language::En,
        None,
        None,
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Stage {
            stage: Stage::AltSynthesizer,
            ..
        }
    ));
}

// ── Claim verification ────────────────────────────────────────────

#[tokio::test]
async fn test_claims_checked_and_classified() {
    let extractor = ScriptedProvider::fixed(
        "anthropic",
        r#"["Paris is the capital of France", "The moon is made of cheese"]"#,
    );
    let search = ScriptedProvider::new("perplexity", |_, prompt| {
        Ok(if prompt.contains("cheese") {
            "This is false.".to_string()
        } else {
            "Confirmed by every atlas.".to_string()
        })
    });
    let proposals = vec![
        Proposal::new("grok-3", "Paris is the capital of France."),
        Proposal::failed("moonshot", "kimi", "timeout"),
    ];

    let (report, usage) = verify_claims(
        &bind(&extractor, "claude-sonnet"),
        &bind(&search, "sonar"),
        &proposals,
        Language::En,
        7,
    )
    .await;

    assert_eq!(report.results.len(), 2);
    assert_eq!(report.results[0].status, ClaimStatus::Confirmed);
    assert_eq!(report.results[1].status, ClaimStatus::Contradicted);
    assert_eq!(report.count(ClaimStatus::Contradicted), 1);
    assert_eq!(usage.tokens, 300);
    // Failed slots are not sent for extraction.
    assert!(!extractor.prompts()[0].contains(ERROR_MARKER));
}

#[tokio::test]
async fn test_failed_search_is_inconclusive() {
    let extractor = ScriptedProvider::fixed("anthropic", r#"["Water boils at 100 degrees"]"#);
    let search = ScriptedProvider::failing("perplexity");

    let (report, _) = verify_claims(
        &bind(&extractor, "claude-sonnet"),
        &bind(&search, "sonar"),
        &[Proposal::new("m", "Water boils at 100 degrees")],
        Language::En,
        7,
    )
    .await;

    assert_eq!(report.results.len(), 1);
    assert_eq!(report.results[0].status, ClaimStatus::Inconclusive);
    assert!(report.summary.contains("0 confirmed, 0 contradicted, 1 inconclusive"));
}

#[tokio::test]
async fn test_failed_extraction_yields_empty_report() {
    let extractor = ScriptedProvider::failing("anthropic");
    let search = ScriptedProvider::fixed("perplexity", "true");

    let (report, usage) = verify_claims(
        &bind(&extractor, "claude-sonnet"),
        &bind(&search, "sonar"),
        &[Proposal::new("m", "anything")],
        Language::En,
        7,
    )
    .await;

    assert!(report.results.is_empty());
    assert_eq!(search.call_count(), 0);
    assert_eq!(usage.tokens, 0);
}
