//! Order and evidence rows exchanged with the persistence backend.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::verdict::AiVerdict;

/// Order status written when packing evidence is recorded.
pub const ORDER_STATUS_SHIPPED: &str = "shipped";

/// Evidence type for packing photos.
pub const EVIDENCE_TYPE_PACKING: &str = "packing";

/// Authenticated user id as issued by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Insert payload for the `orders` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOrder {
    pub seller_id: UserId,
    pub tracking_number: String,
    pub status: String,
}

impl NewOrder {
    pub fn shipped(seller_id: UserId, tracking_number: impl Into<String>) -> Self {
        Self {
            seller_id,
            tracking_number: tracking_number.into(),
            status: ORDER_STATUS_SHIPPED.to_string(),
        }
    }
}

/// An order row as returned by the backend after insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub seller_id: UserId,
    pub tracking_number: String,
    pub status: String,
    /// ISO 8601 timestamp string, when the backend returns one.
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Where and how the packing photo was taken.
///
/// All fields are optional; unknown values are stored as `null` rather than
/// placeholder text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureContext {
    pub device: Option<String>,
    pub location: Option<String>,
    pub fps: Option<u32>,
    pub quality: Option<String>,
}

/// The `metadata` JSON bag stored on each evidence row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceMetadata {
    pub device: Option<String>,
    pub location: Option<String>,
    pub fps: Option<u32>,
    pub quality: Option<String>,
    /// True only when a completed verdict judged the photo as not AI-generated.
    pub ai_verified: bool,
    /// Verdict confidence; absent when no completed verdict exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_score: Option<u8>,
}

impl EvidenceMetadata {
    /// Build the metadata bag from the capture context and the verdict (if
    /// any) at submission time. A failed verdict counts as no verdict.
    pub fn new(context: &CaptureContext, verdict: Option<&AiVerdict>) -> Self {
        let usable = verdict.and_then(AiVerdict::usable);
        Self {
            device: context.device.clone(),
            location: context.location.clone(),
            fps: context.fps,
            quality: context.quality.clone(),
            ai_verified: usable.is_some_and(|v| !v.is_likely_ai),
            ai_score: usable.map(|v| v.confidence),
        }
    }
}

/// Insert payload for the `evidences` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEvidence {
    pub order_id: String,
    pub uploader_id: UserId,
    #[serde(rename = "type")]
    pub kind: String,
    pub media_url: String,
    pub metadata: EvidenceMetadata,
}

impl NewEvidence {
    pub fn packing(
        order_id: impl Into<String>,
        uploader_id: UserId,
        media_url: impl Into<String>,
        metadata: EvidenceMetadata,
    ) -> Self {
        Self {
            order_id: order_id.into(),
            uploader_id,
            kind: EVIDENCE_TYPE_PACKING.to_string(),
            media_url: media_url.into(),
            metadata,
        }
    }
}

/// What was committed by a successful submission.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub order_id: String,
    pub tracking_number: String,
    pub seller_id: UserId,
    pub metadata: EvidenceMetadata,
    pub verdict: Option<AiVerdict>,
    pub submitted_at: DateTime<Utc>,
}
