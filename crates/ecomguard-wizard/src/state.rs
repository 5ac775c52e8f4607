//! Wizard step state and its transitions.
//!
//! Every operation here is synchronous and side-effect free; the session
//! performs the external calls and feeds their results back in.

use std::fmt;

use chrono::Utc;
use ecomguard_core::{
    AiVerdict, CaptureContext, CaptureId, CapturedImage, EvidenceMetadata, NewEvidence, NewOrder,
    Submission, UserId,
};

use crate::WizardError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WizardStep {
    /// Enter or scan the tracking number.
    #[default]
    Identify,
    /// Take the packing photo; the AI check runs in the background.
    Capture,
    /// Evidence recorded.
    Done,
}

impl WizardStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Identify => "identify",
            Self::Capture => "capture",
            Self::Done => "done",
        }
    }

    /// 1-based position shown in the progress dots.
    pub fn number(&self) -> u8 {
        match self {
            Self::Identify => 1,
            Self::Capture => 2,
            Self::Done => 3,
        }
    }
}

impl fmt::Display for WizardStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything needed to perform the two writes of a submission, captured
/// at the moment the submission started.
#[derive(Debug, Clone)]
pub struct SubmitPlan {
    pub order: NewOrder,
    pub uploader: UserId,
    pub media_url: String,
    pub metadata: EvidenceMetadata,
    pub verdict: Option<AiVerdict>,
}

impl SubmitPlan {
    pub fn evidence_for(&self, order_id: &str) -> NewEvidence {
        NewEvidence::packing(
            order_id,
            self.uploader.clone(),
            self.media_url.clone(),
            self.metadata.clone(),
        )
    }
}

/// The in-progress record of one wizard session.
#[derive(Debug, Clone)]
pub struct WizardState {
    step: WizardStep,
    tracking_id: String,
    captured_image: Option<CapturedImage>,
    verdict: Option<AiVerdict>,
    analyzing: bool,
    submitting: bool,
    legal_generating: bool,
    /// Capture the image and verdict belong to; `None` when no photo is held.
    current_capture: Option<CaptureId>,
    /// Next id to hand out. Never reset, so ids stay unique for the session.
    next_capture: CaptureId,
    submission: Option<Submission>,
}

impl Default for WizardState {
    fn default() -> Self {
        Self {
            step: WizardStep::Identify,
            tracking_id: String::new(),
            captured_image: None,
            verdict: None,
            analyzing: false,
            submitting: false,
            legal_generating: false,
            current_capture: None,
            next_capture: CaptureId::first(),
            submission: None,
        }
    }
}

impl WizardState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn tracking_id(&self) -> &str {
        &self.tracking_id
    }

    pub fn captured_image(&self) -> Option<&CapturedImage> {
        self.captured_image.as_ref()
    }

    pub fn verdict(&self) -> Option<&AiVerdict> {
        self.verdict.as_ref()
    }

    pub fn is_analyzing(&self) -> bool {
        self.analyzing
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn is_legal_generating(&self) -> bool {
        self.legal_generating
    }

    pub fn current_capture(&self) -> Option<CaptureId> {
        self.current_capture
    }

    pub fn submission(&self) -> Option<&Submission> {
        self.submission.as_ref()
    }

    /// Whether the forward button of the Identify step is enabled.
    pub fn can_advance(&self) -> bool {
        self.step == WizardStep::Identify && !self.tracking_id.is_empty()
    }

    fn require_step(&self, op: &'static str, step: WizardStep) -> Result<(), WizardError> {
        if self.step == step {
            Ok(())
        } else {
            Err(WizardError::InvalidStep {
                op,
                step: self.step,
            })
        }
    }

    pub fn set_tracking_id(&mut self, text: impl Into<String>) -> Result<(), WizardError> {
        self.require_step("editing the tracking number", WizardStep::Identify)?;
        self.tracking_id = text.into();
        Ok(())
    }

    pub fn advance_to_capture(&mut self) -> Result<(), WizardError> {
        self.require_step("continuing to capture", WizardStep::Identify)?;
        if self.tracking_id.is_empty() {
            return Err(WizardError::MissingTrackingId);
        }
        self.step = WizardStep::Capture;
        Ok(())
    }

    /// Store a new photo and mark it as being analysed. Any verdict for a
    /// previous photo is dropped; the returned id tags the analysis task.
    pub fn capture_image(&mut self, image: CapturedImage) -> Result<CaptureId, WizardError> {
        self.require_step("capturing a photo", WizardStep::Capture)?;
        if self.submitting {
            return Err(WizardError::SubmitInProgress);
        }
        let id = self.next_capture;
        self.next_capture = id.next();
        self.current_capture = Some(id);
        self.captured_image = Some(image);
        self.verdict = None;
        self.analyzing = true;
        Ok(id)
    }

    /// Apply a finished verdict. Returns `false` (state untouched) when `id`
    /// is no longer the current capture.
    pub fn apply_verdict(&mut self, id: CaptureId, verdict: AiVerdict) -> bool {
        if self.current_capture != Some(id) {
            return false;
        }
        self.verdict = Some(verdict);
        self.analyzing = false;
        true
    }

    /// Capture → Identify, discarding the photo and its verdict.
    pub fn back(&mut self) -> Result<(), WizardError> {
        self.require_step("going back", WizardStep::Capture)?;
        if self.submitting {
            return Err(WizardError::SubmitInProgress);
        }
        self.step = WizardStep::Identify;
        self.clear_capture();
        Ok(())
    }

    fn clear_capture(&mut self) {
        self.captured_image = None;
        self.verdict = None;
        self.analyzing = false;
        self.current_capture = None;
    }

    /// Validate and mark the submission as started.
    ///
    /// Refused while the current photo is still being analysed, so the stored
    /// metadata always reflects the verdict shown for that photo.
    pub fn begin_submit(
        &mut self,
        identity: Option<UserId>,
        context: &CaptureContext,
    ) -> Result<SubmitPlan, WizardError> {
        if self.submitting {
            return Err(WizardError::SubmitInProgress);
        }
        if self.tracking_id.is_empty() {
            return Err(WizardError::MissingTrackingId);
        }
        let seller = identity.ok_or(WizardError::MissingIdentity)?;
        let image = self
            .captured_image
            .as_ref()
            .ok_or(WizardError::MissingImage)?;
        self.require_step("submitting", WizardStep::Capture)?;
        if self.analyzing {
            return Err(WizardError::AnalysisInProgress);
        }

        let plan = SubmitPlan {
            order: NewOrder::shipped(seller.clone(), self.tracking_id.clone()),
            uploader: seller,
            media_url: image.to_data_url(),
            metadata: EvidenceMetadata::new(context, self.verdict.as_ref()),
            verdict: self.verdict.clone(),
        };
        self.submitting = true;
        Ok(plan)
    }

    /// Both writes succeeded: move to Done.
    pub fn complete_submit(&mut self, plan: SubmitPlan, order_id: String) -> Submission {
        let submission = Submission {
            order_id,
            tracking_number: plan.order.tracking_number,
            seller_id: plan.order.seller_id,
            metadata: plan.metadata,
            verdict: plan.verdict,
            submitted_at: Utc::now(),
        };
        self.submitting = false;
        self.step = WizardStep::Done;
        self.submission = Some(submission.clone());
        submission
    }

    /// A write failed: stay in Capture so the user can retry.
    pub fn fail_submit(&mut self) {
        self.submitting = false;
    }

    /// Clear everything and start over at Identify.
    pub fn reset_for_next_item(&mut self) -> Result<(), WizardError> {
        if self.submitting {
            return Err(WizardError::SubmitInProgress);
        }
        *self = Self {
            next_capture: self.next_capture,
            ..Self::default()
        };
        Ok(())
    }

    /// Mark appeal generation as started and hand back the submission it is
    /// generated from.
    pub fn begin_legal(&mut self) -> Result<Submission, WizardError> {
        self.require_step("generating an appeal", WizardStep::Done)?;
        if self.legal_generating {
            return Err(WizardError::LegalInProgress);
        }
        let submission = self.submission.clone().ok_or(WizardError::InvalidStep {
            op: "generating an appeal",
            step: self.step,
        })?;
        self.legal_generating = true;
        Ok(submission)
    }

    pub fn finish_legal(&mut self) {
        self.legal_generating = false;
    }
}
