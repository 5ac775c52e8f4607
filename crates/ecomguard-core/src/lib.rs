pub mod appeal;
pub mod evidence;
pub mod image;
pub mod verdict;

pub use appeal::render_appeal;
pub use evidence::{
    CaptureContext, EvidenceMetadata, NewEvidence, NewOrder, Order, Submission, UserId,
    EVIDENCE_TYPE_PACKING, ORDER_STATUS_SHIPPED,
};
pub use image::{CaptureId, CapturedImage, ImageError};
pub use verdict::AiVerdict;
