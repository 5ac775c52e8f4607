//! AI authenticity verdict for a captured packing photo.

use serde::{Deserialize, Serialize};

/// Upper bound of the confidence scale reported by the judgment model.
pub const MAX_CONFIDENCE: u8 = 100;

/// Result of asking the judgment model whether a photo looks machine-generated.
///
/// One verdict is produced per captured image and replaced wholesale on
/// recapture. A verdict with `failed = true` means the check could not be
/// completed; it is advisory only and never blocks submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiVerdict {
    pub is_likely_ai: bool,
    /// 0–100.
    pub confidence: u8,
    pub explanation: String,
    pub failed: bool,
}

impl AiVerdict {
    /// A completed verdict. Confidence outside 0–100 is clamped.
    pub fn new(is_likely_ai: bool, confidence: i64, explanation: impl Into<String>) -> Self {
        Self {
            is_likely_ai,
            confidence: confidence.clamp(0, MAX_CONFIDENCE as i64) as u8,
            explanation: explanation.into(),
            failed: false,
        }
    }

    /// The degraded verdict used whenever the check cannot be completed.
    pub fn degraded(reason: impl Into<String>) -> Self {
        Self {
            is_likely_ai: false,
            confidence: 0,
            explanation: reason.into(),
            failed: true,
        }
    }

    /// `Some(self)` unless the check failed.
    pub fn usable(&self) -> Option<&Self> {
        (!self.failed).then_some(self)
    }

    /// Short status label shown next to the photo.
    pub fn label(&self) -> &'static str {
        match (self.failed, self.is_likely_ai) {
            (true, _) => "AI Check Unavailable",
            (false, true) => "AI Detected",
            (false, false) => "AI Verified Real",
        }
    }
}
