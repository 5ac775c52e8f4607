//! AI authenticity check: asks a generative model whether a packing photo
//! looks machine-generated and normalises the reply into an [`AiVerdict`].
//!
//! [`AiVerdict`]: ecomguard_core::AiVerdict

mod client;
mod gemini;
mod prompt;

pub use client::{Judge, VerdictClient};
pub use gemini::{
    DEFAULT_ENDPOINT, DEFAULT_MODEL, DEFAULT_TIMEOUT, GeminiConfig, GeminiJudge, JudgeError,
};
pub use prompt::{INSTRUCTION_PROMPT, ParseError, extract_json_object, parse_verdict};
