//! Plain-text rendering of blocks for the terminal.

use std::fmt::Write;

use adjudication::metrics::Metrics;
use adjudication::Block;

const RULE: &str = "────────────────────────────────────────────────────────────";
const LIST_QUESTION_CHARS: usize = 70;

fn truncate(text: &str, max: usize) -> String {
    let line = text.lines().next().unwrap_or_default();
    if line.chars().count() <= max && !text.contains('\n') {
        return line.to_string();
    }
    let mut out: String = line.chars().take(max.saturating_sub(3)).collect();
    out.push_str("...");
    out
}

fn percent(value: f64) -> String {
    format!("{:.0}%", value * 100.0)
}

pub fn metrics_summary(metrics: &Metrics) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Tokens: {}  Cost: ${:.4}  Duration: {:.1}s",
        metrics.total_tokens, metrics.total_cost_usd, metrics.duration_seconds
    );
    let _ = write!(out, "Model diversity: {:.2}", metrics.model_diversity_index);
    if let Some(dissent) = metrics.dissent_score {
        let _ = write!(out, "  Dissent: {:.2}", dissent);
    }
    out.push('\n');

    if let Some(dpr) = &metrics.dpr {
        let _ = write!(
            out,
            "Dissent preserved: {} ({}/{} objections)",
            percent(dpr.score),
            dpr.preserved,
            dpr.total_objections
        );
        if dpr.false_consensus {
            out.push_str("  [possible false consensus]");
        }
        out.push('\n');
    }

    if let Some(balance) = &metrics.synthesis_balance {
        let shares = balance
            .shares
            .iter()
            .enumerate()
            .map(|(i, s)| format!("P{} {}", i + 1, percent(*s)))
            .collect::<Vec<_>>()
            .join(", ");
        let _ = write!(out, "Synthesis balance: {:.2} ({})", balance.score, shares);
        if let Some(idx) = balance.dominated_by {
            if balance.warning {
                let _ = write!(out, "  [dominated by proposal {}]", idx + 1);
            } else {
                let _ = write!(out, "  [proposal {} dominates, justified]", idx + 1);
            }
        }
        out.push('\n');
    }

    if let Some(v) = &metrics.synthesis_verification {
        let _ = write!(out, "Dual-run similarity: {:.2}", v.similarity);
        if v.verified {
            out.push_str("  [verified]");
        } else {
            let alt = v.alt_model.as_deref().unwrap_or("alternate");
            let _ = write!(out, "  [diverged from {}]", alt);
        }
        out.push('\n');
    }
    out
}

/// Full block: question, every proposal, critique, synthesis, metrics.
pub fn block(block: &Block) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{RULE}");
    let _ = writeln!(
        out,
        "{}  {}  (v{})",
        block.id,
        block.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
        block.version
    );
    let _ = writeln!(out, "Question: {}", block.question);
    if let Some(refs) = &block.context_refs {
        let _ = writeln!(out, "Context: {}", refs.join(", "));
    }
    let _ = writeln!(out, "{RULE}");

    for (i, p) in block.proposals.iter().enumerate() {
        let _ = writeln!(out, "\n## Proposal {} ({})\n{}", i + 1, p.model, p.content);
    }
    let _ = writeln!(
        out,
        "\n## Critique ({})\n{}",
        block.critique.model, block.critique.content
    );
    let _ = writeln!(
        out,
        "\n## Synthesis ({})\n{}",
        block.synthesis.model, block.synthesis.content
    );
    let _ = writeln!(out, "\n{RULE}");
    out.push_str(&metrics_summary(&block.metadata));
    out
}

/// One line per block.
pub fn list(blocks: &[Block]) -> String {
    if blocks.is_empty() {
        return "No blocks yet.\n".to_string();
    }
    let mut out = String::new();
    for b in blocks {
        let _ = writeln!(
            out,
            "{}  {}  MDI {:.2}  {}",
            b.id,
            b.timestamp.format("%Y-%m-%d %H:%M"),
            b.metadata.model_diversity_index,
            truncate(&b.question, LIST_QUESTION_CHARS)
        );
    }
    out
}
