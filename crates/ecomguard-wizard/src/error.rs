use ecomguard_core::ImageError;
use ecomguard_store::StoreError;
use thiserror::Error;

use crate::state::WizardStep;

#[derive(Debug, Error)]
pub enum WizardError {
    #[error("enter a tracking number first")]
    MissingTrackingId,

    #[error("please sign in before submitting evidence")]
    MissingIdentity,

    #[error("take a packing photo first")]
    MissingImage,

    #[error(transparent)]
    Image(#[from] ImageError),

    #[error("{op} is not available in the {step} step")]
    InvalidStep { op: &'static str, step: WizardStep },

    #[error("a submission is already in progress")]
    SubmitInProgress,

    #[error("wait for the AI check to finish before submitting")]
    AnalysisInProgress,

    #[error("failed to save evidence: {0}")]
    Persistence(#[source] StoreError),

    #[error(
        "order {order_id} was created but its evidence could not be saved: {source}; submit again to retry"
    )]
    OrphanedOrder {
        order_id: String,
        #[source]
        source: StoreError,
    },

    #[error("an appeal document is already being generated")]
    LegalInProgress,
}

impl WizardError {
    /// Input problems reported inline; no external call was made.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::MissingTrackingId | Self::MissingIdentity | Self::MissingImage | Self::Image(_)
        )
    }
}
