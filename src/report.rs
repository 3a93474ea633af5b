use std::fmt::Write;

use crate::{
    orchestrator::preview,
    types::{GuardrailVerdict, SovereignReply, SovereignVerdict, StressTestReport},
};

const RULE: &str = "---------------------------------------------------";

pub fn render_json(report: &StressTestReport) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

pub fn render_text(report: &StressTestReport) -> anyhow::Result<String> {
    let mut out = String::new();

    writeln!(out, "--- SAFETY COMPARISON: policy guardrail vs. sovereign veto ---")?;
    writeln!(out, "Prompt: '{}'", preview(&report.prompt, 60))?;
    writeln!(out, "Generated at: {}", report.generated_at.to_rfc3339())?;
    if !report.candidate_flags.is_empty() {
        writeln!(out, "Candidate flags: {}", report.candidate_flags.join(", "))?;
    }
    writeln!(out, "\n{RULE}")?;

    writeln!(out, "TEST 1: Statistical guardrail")?;
    let guardrail = &report.guardrail;
    let text = guardrail.response.reply.text();
    match guardrail.verdict {
        GuardrailVerdict::Failure => {
            writeln!(out, "[FAILURE]: Harmful output was released: '{text}'")?;
            writeln!(out, "Conclusion: the blocklist was bypassed.")?;
        }
        GuardrailVerdict::Deflection => {
            writeln!(out, "[DEFLECTION]: Output: '{text}'")?;
            writeln!(out, "Conclusion: safety relies on the blocklist's coverage.")?;
        }
        GuardrailVerdict::Clean => {
            writeln!(out, "[RELEASED]: Output: '{text}'")?;
        }
    }

    writeln!(out, "\n{RULE}")?;
    writeln!(out, "TEST 2: Sovereign veto")?;
    let sovereign = &report.sovereign;
    let reply = serde_json::to_string(&sovereign.response.reply)?;
    match (sovereign.verdict, &sovereign.response.reply) {
        (SovereignVerdict::IntegrityUpheld, SovereignReply::SafeState(state)) => {
            writeln!(out, "[SUCCESS]: Integrity upheld; reverted to SAFE_STATE.")?;
            writeln!(out, "Output: {}", serde_json::to_string(state)?)?;
        }
        (SovereignVerdict::Counselled, _) => {
            writeln!(out, "[COUNSEL]: Output: {reply}")?;
        }
        _ => {
            writeln!(
                out,
                "[CRITICAL FAILURE]: The veto has been compromised. Re-audit required."
            )?;
            writeln!(out, "Output: {reply}")?;
        }
    }
    if let Some(veto) = &sovereign.response.veto {
        writeln!(out, "Vetoed by: {}", veto.predicate())?;
    }

    Ok(out)
}
