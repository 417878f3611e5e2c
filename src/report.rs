//! Console rendering for both probes.
//!
//! Everything renders to `String` so the binaries just print and tests can
//! assert on exact text.

use std::error::Error;

use crate::burst::BurstOutcome;
use crate::classify::Tally;
use crate::config::{ProbeConfig, ProviderMarkers};
use crate::dispatch::CompletionResponse;

const RULE_WIDTH: usize = 60;

pub fn rule() -> String {
    "=".repeat(RULE_WIDTH)
}

pub fn banner(title: &str) -> String {
    format!("{rule}\n{title}\n{rule}", rule = rule())
}

pub fn single_banner(config: &ProbeConfig) -> String {
    banner(&format!(
        "Testing LLM Proxy - {} ({} + {} Fallback)",
        config.model, config.providers.primary_label, config.providers.secondary_label
    ))
}

pub fn render_single_success(response: &CompletionResponse) -> String {
    let completion = &response.completion;
    let mut lines = vec![
        String::new(),
        "✓ SUCCESS!".to_string(),
        String::new(),
        format!("Model: {}", completion.model),
        format!("ID: {}", completion.id),
        String::new(),
        "--- Response ---".to_string(),
    ];

    match completion.first_message() {
        Some(message) => {
            lines.push(format!("Role: {}", message.role));
            if let Some(content) = message.content.as_deref().filter(|c| !c.is_empty()) {
                lines.push(format!("Content: {content}"));
            }
            if let Some(reasoning) = message.reasoning_text() {
                lines.push(format!("Reasoning: {reasoning}"));
            }
        }
        None => lines.push("Role: (no choices)".to_string()),
    }

    lines.push(String::new());
    lines.push("--- Full Response Object ---".to_string());
    lines.push(
        serde_json::to_string_pretty(&response.raw).unwrap_or_else(|_| response.raw.to_string()),
    );

    lines.push(String::new());
    lines.push("--- Usage ---".to_string());
    match completion.usage {
        Some(usage) => {
            lines.push(format!("Prompt tokens: {}", usage.prompt_tokens));
            lines.push(format!("Completion tokens: {}", usage.completion_tokens));
            lines.push(format!("Total tokens: {}", usage.total_tokens));
        }
        None => lines.push("Usage: not reported".to_string()),
    }

    lines.join("\n")
}

/// Headline for a failed single probe.
pub fn render_single_failure(err: &dyn Error) -> String {
    format!("\n✗ ERROR: {err}")
}

/// Full cause chain of an error, outermost first.
pub fn render_error_trace(err: &(dyn Error + 'static)) -> String {
    let mut lines = vec!["Diagnostic trace:".to_string()];
    let mut current: Option<&(dyn Error + 'static)> = Some(err);
    let mut depth = 0;
    while let Some(e) = current {
        lines.push(format!("  {depth}: {e}"));
        current = e.source();
        depth += 1;
    }
    lines.push(format!("Debug: {err:?}"));
    lines.join("\n")
}

pub fn render_burst_header(config: &ProbeConfig) -> String {
    let burst = &config.burst;
    format!(
        "{}\n\nSending {} requests in parallel to exceed {}/min limit...\n",
        banner(&format!("Testing Fallback: {} PARALLEL requests", burst.requests)),
        burst.requests,
        burst.primary_rate_limit_per_minute
    )
}

pub fn render_outcome(outcome: &BurstOutcome) -> String {
    let mut line = format!(
        "{} Request {:2}: {:30} ({:.2}s)",
        outcome.status.symbol(),
        outcome.seq,
        outcome.model,
        outcome.elapsed.as_secs_f64()
    );
    if let Some(error) = &outcome.error {
        line.push_str(&format!("\n   Error: {error}"));
    }
    line
}

pub fn render_outcomes(outcomes: &[BurstOutcome]) -> String {
    outcomes
        .iter()
        .map(render_outcome)
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn render_summary(tally: &Tally, markers: &ProviderMarkers) -> String {
    let rows = [
        (format!("{} responses:", markers.primary_label), tally.primary),
        (format!("{} responses:", markers.secondary_label), tally.secondary),
        ("Errors:".to_string(), tally.errors),
    ];
    let width = rows
        .iter()
        .map(|(label, _)| label.chars().count())
        .max()
        .unwrap_or(0)
        + 1;

    let mut lines = vec![String::new(), rule(), "Summary:".to_string(), rule()];
    lines.extend(
        rows.iter()
            .map(|(label, count)| format!("{label:<width$}{count}")),
    );
    lines.push(String::new());
    lines.push(render_verdict(tally, markers));
    lines.join("\n")
}

pub fn render_verdict(tally: &Tally, markers: &ProviderMarkers) -> String {
    if tally.fallback_working() {
        format!("✓✓✓ Fallback to {} IS WORKING! ✓✓✓", markers.secondary_label)
    } else {
        format!("⚠ No {} responses detected", markers.secondary_label)
    }
}
