//! Appeal letter ("legal template") for disputing a marketplace claim.
//!
//! Rendered as Markdown from a committed [`Submission`] so the seller can
//! attach it to a complaint or return dispute.

use std::fmt::Write;

use crate::evidence::Submission;

/// Render the appeal document for a committed submission.
pub fn render_appeal(submission: &Submission) -> String {
    let meta = &submission.metadata;
    let mut out = String::new();

    let _ = writeln!(out, "# Packing Evidence Appeal");
    let _ = writeln!(out);
    let _ = writeln!(out, "**Tracking number:** {}", submission.tracking_number);
    let _ = writeln!(out, "**Order reference:** {}", submission.order_id);
    let _ = writeln!(out, "**Seller:** {}", submission.seller_id);
    let _ = writeln!(
        out,
        "**Evidence recorded:** {}",
        submission.submitted_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "To the marketplace dispute team,");
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "I dispute the claim filed against shipment {}. A photograph of the \
         packed parcel was recorded before hand-over to the courier and is \
         stored with the order reference above.",
        submission.tracking_number
    );
    let _ = writeln!(out);

    let _ = writeln!(out, "## Capture details");
    let _ = writeln!(out);
    let _ = writeln!(out, "- Device: {}", or_unrecorded(meta.device.as_deref()));
    let _ = writeln!(out, "- Location: {}", or_unrecorded(meta.location.as_deref()));
    let _ = writeln!(out, "- Quality: {}", or_unrecorded(meta.quality.as_deref()));
    if let Some(fps) = meta.fps {
        let _ = writeln!(out, "- Frame rate: {fps} fps");
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "## Authenticity check");
    let _ = writeln!(out);
    match submission.verdict.as_ref().and_then(|v| v.usable()) {
        Some(v) if !v.is_likely_ai => {
            let _ = writeln!(
                out,
                "An automated image check judged the photo to be a genuine \
                 camera capture (confidence {}%).",
                v.confidence
            );
            let _ = writeln!(out);
            let _ = writeln!(out, "> {}", v.explanation);
        }
        Some(v) => {
            let _ = writeln!(
                out,
                "An automated image check flagged the photo for review \
                 (confidence {}%). The original capture is available on request.",
                v.confidence
            );
        }
        None => {
            let _ = writeln!(
                out,
                "No automated authenticity result is attached to this evidence."
            );
        }
    }
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "I request that the claim be reviewed against this evidence."
    );

    out
}

fn or_unrecorded(value: Option<&str>) -> &str {
    value.unwrap_or("not recorded")
}
