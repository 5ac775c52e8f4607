use ecomguard_core::AiVerdict;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

// ── Prompt template ──

pub const INSTRUCTION_PROMPT: &str = "\
Analyze this image of a shipping package/parcel.
Determine if this image is likely to be real (human-captured) or AI-generated.
Look for common AI artifacts like:
1. Warped or nonsensical text on labels.
2. Inconsistent lighting or shadows.
3. Overly smooth textures or \"plastic\" look.
4. Distorted hands or background elements.
5. Inconsistent geometry of the box/parcel.

Return your analysis in JSON format:
{
  \"isAI\": boolean,
  \"confidence\": number (0-100),
  \"reasoning\": \"Brief explanation of your findings in Indonesian language\"
}";

// ── Reply parsing ──

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("no JSON object found in model reply: {preview}")]
    NoObject { preview: String },
    #[error("model reply has no judgment object (isAI/confidence): {preview}")]
    NoJudgment { preview: String },
}

#[derive(Deserialize)]
struct RawJudgment {
    #[serde(rename = "isAI", alias = "is_ai", alias = "isAi")]
    is_ai: bool,
    confidence: f64,
    #[serde(default, alias = "analysis", alias = "explanation")]
    reasoning: String,
}

/// Return the first well-formed JSON object embedded in `text`.
///
/// Models often wrap JSON in markdown fences or surround it with prose, so
/// each `{` is tried as the start of an object until one parses completely.
pub fn extract_json_object(text: &str) -> Option<Map<String, Value>> {
    objects(text).next()
}

fn objects(text: &str) -> impl Iterator<Item = Map<String, Value>> + '_ {
    text.match_indices('{').filter_map(|(start, _)| {
        let mut stream = serde_json::Deserializer::from_str(&text[start..]).into_iter::<Value>();
        match stream.next() {
            Some(Ok(Value::Object(map))) => Some(map),
            _ => None,
        }
    })
}

/// Parse a model reply into a verdict.
///
/// Uses the first embedded object that carries the judgment fields, so an
/// unrelated object quoted earlier in the reply does not shadow the answer.
pub fn parse_verdict(text: &str) -> Result<AiVerdict, ParseError> {
    let mut saw_object = false;
    for map in objects(text) {
        saw_object = true;
        if let Ok(raw) = serde_json::from_value::<RawJudgment>(Value::Object(map)) {
            return Ok(AiVerdict::new(
                raw.is_ai,
                raw.confidence.round() as i64,
                raw.reasoning,
            ));
        }
    }

    let preview: String = text.chars().take(200).collect();
    if saw_object {
        Err(ParseError::NoJudgment { preview })
    } else {
        Err(ParseError::NoObject { preview })
    }
}
