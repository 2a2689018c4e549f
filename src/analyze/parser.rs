// src/analyze/parser.rs
//! Lenient recovery of the analysis object from free-form model output.
//!
//! Two attempts, first success wins:
//! 1) the body of the first ```` ```json ```` fence (up to the next ```` ``` ````, or end of text),
//! 2) the whole answer decoded as JSON.
//!
//! If neither yields a JSON object, `parse` returns [`ParsedAnalysis::Fallback`] so one bad
//! answer never aborts a batch. Callers branch on the tag.

use serde_json::Value;
use thiserror::Error;

use super::AnalysisPayload;

const FENCE_OPEN: &str = "```json";
const FENCE_CLOSE: &str = "```";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("no JSON object found in model output")]
    NoJsonObject,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParsedAnalysis {
    Parsed(AnalysisPayload),
    /// Nothing interpretable; the payload is all-empty.
    Fallback,
}

impl ParsedAnalysis {
    pub fn is_fallback(&self) -> bool {
        matches!(self, ParsedAnalysis::Fallback)
    }

    pub fn into_payload(self) -> AnalysisPayload {
        match self {
            ParsedAnalysis::Parsed(p) => p,
            ParsedAnalysis::Fallback => AnalysisPayload::default(),
        }
    }
}

pub fn parse(raw: &str) -> ParsedAnalysis {
    match try_parse(raw) {
        Ok(p) => ParsedAnalysis::Parsed(p),
        Err(_) => ParsedAnalysis::Fallback,
    }
}

pub fn try_parse(raw: &str) -> Result<AnalysisPayload, ParseError> {
    fenced_block(raw)
        .and_then(decode_object)
        .or_else(|| decode_object(raw))
        .ok_or(ParseError::NoJsonObject)
}

fn fenced_block(raw: &str) -> Option<&str> {
    let start = raw.find(FENCE_OPEN)? + FENCE_OPEN.len();
    let rest = &raw[start..];
    let end = rest.find(FENCE_CLOSE).unwrap_or(rest.len());
    Some(&rest[..end])
}

fn decode_object(s: &str) -> Option<AnalysisPayload> {
    match serde_json::from_str::<Value>(s).ok()? {
        Value::Object(m) => Some(AnalysisPayload::from_object(m)),
        _ => None,
    }
}
