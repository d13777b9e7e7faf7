//! Prompt templates for every pipeline stage, in English and German.
//!
//! Everything in these templates is an instruction to a language model. The
//! pipeline never checks that a response honours them: scores, confidence
//! caps, the disagreement section and the disclaimer are all best effort.
//!
//! The one structural contract the code relies on is the per-proposal header
//! in the interrogation round (`## Questions for Proposal N`), which defense
//! routing parses.

use crate::config::Language;
use crate::types::Proposal;

/// Prompt version. Bump on any template content change.
pub const PROMPT_VERSION: &str = "1.3.0";

/// Proposals as numbered, model-attributed sections.
pub fn render_proposals(proposals: &[Proposal]) -> String {
    proposals
        .iter()
        .enumerate()
        .map(|(i, p)| format!("\n=== PROPOSAL {} ({}) ===\n{}", i + 1, p.model, p.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn context_section(lang: Language, context: Option<&str>) -> String {
    match context {
        Some(text) if !text.trim().is_empty() => match lang {
            Language::En => format!("PRIOR CONTEXT (earlier blocks):\n{}\n", text),
            Language::De => format!("VORHERIGER KONTEXT (frühere Blöcke):\n{}\n", text),
        },
        _ => String::new(),
    }
}

/// Wrap a verification summary for inclusion in critic and synthesizer prompts.
pub fn verification_section(summary: Option<&str>) -> String {
    match summary {
        Some(text) if !text.trim().is_empty() => format!(
            "\n=== WEB VERIFICATION RESULTS ===\n{}\n=== END VERIFICATION ===\n",
            text
        ),
        _ => String::new(),
    }
}

pub fn generator(lang: Language, question: &str, context: Option<&str>) -> String {
    let ctx = context_section(lang, context);
    match lang {
        Language::En => format!(
            "You are an independent analyst. Give a concrete, committed answer to the question below.

{ctx}
RULES:
- Take a position. \"It depends\" is only acceptable with the concrete conditions spelled out.
- Use numbers where you can, and say where they come from.
- State what could go wrong with your answer.
- At most 500 words.

QUESTION: {question}"
        ),
        Language::De => format!(
            "Du bist ein unabhängiger Analyst. Gib eine konkrete, festgelegte Antwort auf die folgende Frage.

{ctx}
REGELN:
- Bezieh Position. \"Kommt drauf an\" nur mit ausformulierten Bedingungen.
- Nenne Zahlen, wo möglich, und woher sie stammen.
- Sag, was an deiner Antwort schiefgehen kann.
- Maximal 500 Wörter.

FRAGE: {question}"
        ),
    }
}

pub fn critic(
    lang: Language,
    proposals: &[Proposal],
    context: Option<&str>,
    verification: Option<&str>,
) -> String {
    let ctx = context_section(lang, context);
    let body = render_proposals(proposals);
    let verification = verification_section(verification);
    match lang {
        Language::En => format!(
            "You are a red-team analyst and fact-checker. Find every weakness in the proposals below.

{ctx}
SCORING:
- Give each proposal a score from 1 to 10.

FACTS:
- Check every specific figure, date, statistic and citation.
- Mark anything you cannot confirm independently as \"UNVERIFIED: <claim>\".
- Look for citations to studies or reports that may not exist.

LOGIC:
- Point out contradictions, false assumptions and conclusions that do not follow.
- Name missing perspectives.

DISAGREEMENT:
- Where the proposals contradict each other, say so explicitly. Disagreement is signal.
- Where they all agree, consider whether they share a bias.

Be hard but fair.
{verification}
PROPOSALS:
{body}"
        ),
        Language::De => format!(
            "Du bist Red-Team-Analyst und Faktenprüfer. Finde jede Schwäche in den folgenden Proposals.

{ctx}
BEWERTUNG:
- Gib jedem Proposal einen Score von 1 bis 10.

FAKTEN:
- Prüfe jede konkrete Zahl, jedes Datum, jede Statistik und jedes Zitat.
- Markiere alles, was du nicht unabhängig bestätigen kannst, als \"UNVERIFIZIERT: <Behauptung>\".
- Achte auf Zitate von Studien oder Berichten, die es vielleicht nicht gibt.

LOGIK:
- Zeige Widersprüche, falsche Annahmen und nicht schlüssige Folgerungen auf.
- Benenne fehlende Perspektiven.

DISSENS:
- Wo sich die Proposals widersprechen, sag es ausdrücklich. Dissens ist Signal.
- Wo alle übereinstimmen, prüfe ob ein gemeinsamer Bias vorliegt.

Sei hart, aber fair.
{verification}
PROPOSALS:
{body}"
        ),
    }
}

/// Header introducing the questions for proposal `number` (1-based).
pub fn interrogation_header(lang: Language, number: usize, model: &str) -> String {
    match lang {
        Language::En => format!("## Questions for Proposal {} ({})", number, model),
        Language::De => format!("## Fragen an Proposal {} ({})", number, model),
    }
}

pub fn interrogation(lang: Language, proposals: &[Proposal], context: Option<&str>) -> String {
    let ctx = context_section(lang, context);
    let body = render_proposals(proposals);
    let layout = proposals
        .iter()
        .enumerate()
        .map(|(i, p)| format!("{}\n1. ...\n2. ...", interrogation_header(lang, i + 1, &p.model)))
        .collect::<Vec<_>>()
        .join("\n\n");
    match lang {
        Language::En => format!(
            "You are a red-team analyst opening a cross-examination. Ask pointed questions that expose the weak spots of each proposal.

{ctx}
For EACH proposal ask 2-3 specific questions that:
- demand the source of unverified figures,
- probe gaps between premises and conclusion,
- test whether cited studies or events actually exist,
- challenge hidden assumptions.

Use exactly this layout, one section per proposal:

{layout}

No softball questions.

PROPOSALS:
{body}"
        ),
        Language::De => format!(
            "Du bist Red-Team-Analyst und eröffnest ein Kreuzverhör. Stelle gezielte Fragen, die die Schwachstellen jedes Proposals offenlegen.

{ctx}
Stelle für JEDES Proposal 2-3 konkrete Fragen, die:
- nach der Quelle unbelegter Zahlen fragen,
- Lücken zwischen Prämissen und Schluss aufdecken,
- prüfen, ob zitierte Studien oder Ereignisse wirklich existieren,
- versteckte Annahmen hinterfragen.

Verwende genau dieses Layout, ein Abschnitt pro Proposal:

{layout}

Keine Softball-Fragen.

PROPOSALS:
{body}"
        ),
    }
}

pub fn defense(lang: Language, proposal: &str, questions: &str) -> String {
    match lang {
        Language::En => format!(
            "Earlier you wrote the proposal below. A red-team critic has questioned it. Answer honestly.

RULES:
- If you cannot verify a claim, say so plainly and withdraw it.
- If you made a mistake, admit it and correct it.
- If a citation was invented, say that it was invented.
- Do not double down on claims you are unsure of.

YOUR PROPOSAL:
{proposal}

THE CRITIC'S QUESTIONS:
{questions}

Answer every question directly, admitting or defending each flagged point."
        ),
        Language::De => format!(
            "Du hast zuvor das folgende Proposal geschrieben. Ein Red-Team-Kritiker hat es hinterfragt. Antworte ehrlich.

REGELN:
- Wenn du eine Behauptung nicht verifizieren kannst, sag das klar und zieh sie zurück.
- Wenn du einen Fehler gemacht hast, gib ihn zu und korrigiere ihn.
- Wenn ein Zitat erfunden war, sag dass es erfunden war.
- Beharre nicht auf Behauptungen, bei denen du unsicher bist.

DEIN PROPOSAL:
{proposal}

FRAGEN DES KRITIKERS:
{questions}

Beantworte jede Frage direkt und gib jeden markierten Punkt zu oder verteidige ihn."
        ),
    }
}

pub fn verdict(
    lang: Language,
    proposals: &[Proposal],
    cross_examination: &str,
    context: Option<&str>,
    verification: Option<&str>,
) -> String {
    let ctx = context_section(lang, context);
    let body = render_proposals(proposals);
    let verification = verification_section(verification);
    match lang {
        Language::En => format!(
            "You are the red-team critic delivering the final verdict of a cross-examination. You have read the proposals, asked your questions and received each generator's defense.

Weigh in particular:
- generators that admitted errors or invented sources (this is valuable honesty),
- generators that kept defending claims they could not support (a red flag),
- which claims survived questioning and which collapsed.

{ctx}
ORIGINAL PROPOSALS:
{body}

QUESTIONS AND DEFENSES:
{cross_examination}
{verification}
Write the final critique. Score each proposal from 1 to 10. Reward claims that survived. Penalise proposals that made unverifiable claims and did not retract them."
        ),
        Language::De => format!(
            "Du bist der Red-Team-Kritiker und fällst das endgültige Urteil eines Kreuzverhörs. Du hast die Proposals gelesen, deine Fragen gestellt und die Verteidigung jedes Generators erhalten.

Gewichte besonders:
- Generatoren, die Fehler oder erfundene Quellen zugegeben haben (wertvolle Ehrlichkeit),
- Generatoren, die unbelegbare Behauptungen weiter verteidigt haben (Warnsignal),
- welche Behauptungen die Befragung überstanden haben und welche nicht.

{ctx}
ORIGINAL-PROPOSALS:
{body}

FRAGEN UND VERTEIDIGUNGEN:
{cross_examination}
{verification}
Schreibe die finale Kritik. Bewerte jedes Proposal von 1 bis 10. Belohne Behauptungen, die standgehalten haben. Bestrafe Proposals, die unbelegbare Behauptungen aufgestellt und nicht zurückgezogen haben."
        ),
    }
}

pub fn synthesizer(
    lang: Language,
    proposals: &[Proposal],
    critique: &str,
    context: Option<&str>,
    verification: Option<&str>,
) -> String {
    let ctx = context_section(lang, context);
    let body = render_proposals(proposals);
    let verification = verification_section(verification);
    let count = proposals.len();
    match lang {
        Language::En => format!(
            "You are the synthesizer. Combine the {count} proposals and the critique into one answer.

{ctx}
OBLIGATIONS:
- Address every proposal by its number (Proposal 1 .. Proposal {count}); say what you kept from it and what you dropped.
- Include a section titled \"Where the models disagreed\" that names the disagreements and how you resolved them.
- Address the critic's objections. Do not drop a valid objection silently.
- Give a clear recommendation.
- End with \"Confidence: X%\" where X is below 100. If all proposals agree but the critic flagged a shared bias, stay at or below 70%. If the question is subjective or value-laden, stay at or below 60%.
- Close with a one-line disclaimer that this is an adjudicated model synthesis, not verified truth.
- At most 800 words.
{verification}
PROPOSALS:
{body}

CRITIQUE:
{critique}"
        ),
        Language::De => format!(
            "Du bist der Synthesizer. Kombiniere die {count} Proposals und die Kritik zu einer Antwort.

{ctx}
PFLICHTEN:
- Geh auf jedes Proposal mit seiner Nummer ein (Proposal 1 .. Proposal {count}); sag, was du übernommen und was du verworfen hast.
- Füge einen Abschnitt \"Wo die Modelle uneinig waren\" ein, der die Differenzen nennt und wie du sie aufgelöst hast.
- Geh auf die Einwände des Kritikers ein. Lass keinen berechtigten Einwand stillschweigend fallen.
- Gib eine klare Empfehlung.
- Schließe mit \"Confidence: X%\", wobei X unter 100 liegt. Wenn alle Proposals übereinstimmen, der Kritiker aber einen gemeinsamen Bias markiert hat, höchstens 70%. Bei subjektiven oder wertbezogenen Fragen höchstens 60%.
- Ende mit einem einzeiligen Hinweis, dass dies eine adjudizierte Modell-Synthese ist und keine verifizierte Wahrheit.
- Maximal 800 Wörter.
{verification}
PROPOSALS:
{body}

KRITIK:
{critique}"
        ),
    }
}

pub fn claim_extraction(lang: Language, proposals: &[Proposal], max_claims: usize) -> String {
    let body = render_proposals(proposals);
    match lang {
        Language::En => format!(
            "List the most important factual claims made in the proposals below, at most {max_claims}. Prefer:
- specific numbers, percentages and statistics,
- dates and historical events,
- named studies, papers or reports,
- legal or regulatory statements.

Reply with a JSON array of strings and nothing else, for example:
[\"Water boils at 100 C at sea level\", \"The treaty was signed in 1992\"]

PROPOSALS:
{body}"
        ),
        Language::De => format!(
            "Liste die wichtigsten faktischen Behauptungen aus den folgenden Proposals auf, höchstens {max_claims}. Bevorzuge:
- konkrete Zahlen, Prozente und Statistiken,
- Daten und historische Ereignisse,
- benannte Studien, Papers oder Berichte,
- rechtliche oder regulatorische Aussagen.

Antworte nur mit einem JSON-Array von Strings, zum Beispiel:
[\"Wasser siedet auf Meereshöhe bei 100 C\", \"Der Vertrag wurde 1992 unterzeichnet\"]

PROPOSALS:
{body}"
        ),
    }
}

/// Search prompt for one claim. The search collaborator is always asked in
/// English so the classifier's marker words apply.
pub fn fact_check(claim: &str) -> String {
    format!(
        "Fact-check this claim. Is it true, false, or uncertain? Give a short answer with sources where possible.\n\nClaim: \"{}\"",
        claim
    )
}

/// One completed run of a deep analysis, as shown to the meta-synthesizer.
pub struct RunDigest<'a> {
    pub number: usize,
    pub constellation: &'a str,
    pub synthesis: &'a str,
}

pub fn meta_synthesis(lang: Language, runs: &[RunDigest<'_>]) -> String {
    let count = runs.len();
    let body = runs
        .iter()
        .map(|r| {
            format!(
                "\n=== RUN {}: {} ===\n{}\n",
                r.number, r.constellation, r.synthesis
            )
        })
        .collect::<Vec<_>>()
        .join("\n---\n");
    match lang {
        Language::En => format!(
            "You are the meta-synthesizer. You have the results of {count} independent runs with rotated roles: in each run different models generated and criticised.

Report:
1. Convergence: what every run agrees on.
2. Divergence: where runs disagree, and what that suggests about model bias.
3. Critic effect: whether changing the critic changed the outcome.
4. Final recommendation across all runs.
5. Meta-confidence from 0 to 99%.

RUNS:
{body}"
        ),
        Language::De => format!(
            "Du bist der Meta-Synthesizer. Dir liegen {count} unabhängige Durchläufe mit rotierten Rollen vor: in jedem Durchlauf haben andere Modelle generiert und kritisiert.

Berichte:
1. Konvergenz: worin alle Durchläufe übereinstimmen.
2. Divergenz: wo sie sich widersprechen und was das über Modell-Bias sagt.
3. Critic-Effekt: ob der Wechsel des Kritikers das Ergebnis verändert hat.
4. Finale Empfehlung über alle Durchläufe.
5. Meta-Confidence von 0 bis 99%.

DURCHLÄUFE:
{body}"
        ),
    }
}
