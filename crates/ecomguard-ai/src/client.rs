use std::sync::Arc;

use async_trait::async_trait;
use ecomguard_core::{AiVerdict, CapturedImage};
use tracing::{info, warn};

use crate::gemini::{GeminiConfig, GeminiJudge, JudgeError};
use crate::prompt::{INSTRUCTION_PROMPT, parse_verdict};

/// The external judgment model: takes an image and an instruction prompt and
/// returns the model's raw text reply.
#[async_trait]
pub trait Judge: Send + Sync {
    async fn judge(&self, image: &CapturedImage, prompt: &str) -> Result<String, JudgeError>;
}

/// Normalises judgment-model replies into [`AiVerdict`]s.
///
/// [`analyze`](Self::analyze) never fails: a missing credential, transport
/// error, timeout or unparseable reply all yield [`AiVerdict::degraded`].
/// Each call makes at most one request; there is no retry.
#[derive(Clone)]
pub struct VerdictClient {
    judge: Option<Arc<dyn Judge>>,
}

impl VerdictClient {
    /// Client backed by Gemini. Without an API key the client is created
    /// disabled and every verdict is degraded.
    pub fn from_config(config: &GeminiConfig) -> Result<Self, JudgeError> {
        if config.credential().is_none() {
            warn!("no Gemini API key configured; AI checks are disabled");
            return Ok(Self::disabled());
        }
        Ok(Self::with_judge(Arc::new(GeminiJudge::new(config)?)))
    }

    pub fn with_judge(judge: Arc<dyn Judge>) -> Self {
        Self { judge: Some(judge) }
    }

    pub fn disabled() -> Self {
        Self { judge: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.judge.is_some()
    }

    /// Judge whether `image` looks AI-generated.
    pub async fn analyze(&self, image: &CapturedImage) -> AiVerdict {
        let Some(judge) = &self.judge else {
            return AiVerdict::degraded(JudgeError::MissingCredential.to_string());
        };

        let text = match judge.judge(image, INSTRUCTION_PROMPT).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "image judgment failed");
                return AiVerdict::degraded(format!("Failed to analyse image: {e}"));
            }
        };

        match parse_verdict(&text) {
            Ok(verdict) => {
                info!(
                    is_likely_ai = verdict.is_likely_ai,
                    confidence = verdict.confidence,
                    "image judged"
                );
                verdict
            }
            Err(e) => {
                warn!(error = %e, "could not parse judgment reply");
                AiVerdict::degraded(format!("Failed to analyse image: {e}"))
            }
        }
    }
}
