//! Vertical card display for verdicts and recorded evidence.

use std::fmt::Write;

use ecomguard_core::{AiVerdict, Submission};
use ecomguard_wizard::WizardStep;

const STEPS: [WizardStep; 3] = [WizardStep::Identify, WizardStep::Capture, WizardStep::Done];

/// Progress dots, e.g. `○ ● ○  capture`.
pub fn progress(step: WizardStep) -> String {
    let dots: Vec<&str> = STEPS
        .iter()
        .map(|s| if *s == step { "●" } else { "○" })
        .collect();
    format!("{}  {}", dots.join(" "), step)
}

/// The AI check result as shown over the captured photo.
pub fn verdict_card(verdict: &AiVerdict) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== {} ===", verdict.label());
    if verdict.failed {
        let _ = writeln!(out, "  {:<14} {}", "score", "n/a");
    } else {
        let _ = writeln!(out, "  {:<14} {}%", "score", verdict.confidence);
    }
    if !verdict.explanation.is_empty() {
        let _ = writeln!(out, "  {:<14} {}", "analysis", verdict.explanation);
    }
    out
}

/// Confirmation shown after the evidence is secured.
pub fn submission_card(submission: &Submission) -> String {
    let meta = &submission.metadata;
    let mut out = String::new();
    let _ = writeln!(out, "=== Evidence Secured! ===");
    let _ = writeln!(
        out,
        "Order {} has been registered.",
        submission.tracking_number
    );
    let _ = writeln!(out);

    row(&mut out, "order id", Some(&submission.order_id));
    row(&mut out, "seller", Some(submission.seller_id.as_str()));
    row(
        &mut out,
        "recorded at",
        Some(&submission.submitted_at.to_rfc3339()),
    );
    row(&mut out, "device", meta.device.as_deref());
    row(&mut out, "location", meta.location.as_deref());
    row(&mut out, "fps", meta.fps.map(|f| f.to_string()).as_deref());
    row(&mut out, "quality", meta.quality.as_deref());
    row(
        &mut out,
        "ai verified",
        Some(if meta.ai_verified { "yes" } else { "no" }),
    );
    row(
        &mut out,
        "ai score",
        meta.ai_score.map(|s| format!("{s}%")).as_deref(),
    );
    out
}

/// Rows with no value are skipped.
fn row(out: &mut String, key: &str, value: Option<&str>) {
    if let Some(v) = value {
        let _ = writeln!(out, "  {key:<14} {v}");
    }
}
