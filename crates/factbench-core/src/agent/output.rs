//! Extraction of the structured payload an agent prints at the end of its output.
//!
//! Agents write arbitrary progress text followed by a JSON object of the form
//! `{"prompt": ..., "response": ...}`. Parsing follows a fixed order:
//!
//! 1. locate the last payload marker (`{\n  "prompt"`, then `{"prompt"`)
//! 2. strict: parse everything from the marker as one JSON object
//! 3. fallback: regex-extract the `"response"` string literal and decode it
//!
//! Stage 3 runs only when stage 2 cannot parse the text at all; a well-formed
//! object without a `response` string is reported as such.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

const PRETTY_MARKER: &str = "{\n  \"prompt\"";
const COMPACT_MARKER: &str = "{\"prompt\"";

static RESPONSE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""response":\s*"((?:[^"\\]|\\.)*)"\s*\}"#).expect("valid regex")
});

/// Why a located payload did not yield a response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    #[error("No 'response' field in JSON output")]
    MissingResponseField,

    #[error("Failed to parse JSON response: {0}")]
    Unparseable(String),
}

/// The payload text (marker to end of output), if any marker is present.
pub fn extract_payload(stdout: &str) -> Option<&str> {
    stdout
        .rfind(PRETTY_MARKER)
        .or_else(|| stdout.rfind(COMPACT_MARKER))
        .map(|start| &stdout[start..])
}

/// Decode the agent's response from a located payload.
pub fn parse_payload(payload: &str) -> Result<String, PayloadError> {
    let strict_error = match serde_json::from_str::<serde_json::Value>(payload) {
        Ok(value) => {
            return value
                .get("response")
                .and_then(|r| r.as_str())
                .map(str::to_string)
                .ok_or(PayloadError::MissingResponseField);
        }
        Err(e) => e,
    };

    let Some(literal) = RESPONSE_RE.captures(payload).and_then(|c| c.get(1)) else {
        return Err(PayloadError::Unparseable(strict_error.to_string()));
    };

    serde_json::from_str::<String>(&format!("\"{}\"", literal.as_str()))
        .map_err(|_| PayloadError::Unparseable(strict_error.to_string()))
}

/// Locate and decode the response in raw agent output.
///
/// `Ok(None)` means no payload marker was found.
pub fn parse_agent_output(stdout: &str) -> Result<Option<String>, PayloadError> {
    extract_payload(stdout).map(parse_payload).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_pretty_payload_after_noise() {
        let stdout = "cloning repo...\nindexing 42 files\n{\n  \"prompt\": \"q\",\n  \"response\": \"The cache is LRU.\\nSee lru.rs\"\n}\n";
        assert_eq!(
            parse_agent_output(stdout).unwrap(),
            Some("The cache is LRU.\nSee lru.rs".to_string())
        );
    }

    #[test]
    fn test_last_marker_wins() {
        let stdout = "{\"prompt\": \"old\", \"response\": \"first\"}\nretrying\n{\"prompt\": \"new\", \"response\": \"second\"}";
        assert_eq!(parse_agent_output(stdout).unwrap(), Some("second".to_string()));
    }

    #[test]
    fn test_pretty_marker_preferred_over_later_compact() {
        let stdout = "{\n  \"prompt\": \"p\",\n  \"response\": \"pretty\"\n}\n{\"prompt\" broken";
        assert_eq!(parse_agent_output(stdout).unwrap(), Some("pretty".to_string()));
    }

    #[test]
    fn test_no_marker_is_none() {
        assert_eq!(parse_agent_output("Error: ENOENT ask.ts").unwrap(), None);
        assert_eq!(parse_agent_output("").unwrap(), None);
    }

    #[test]
    fn test_missing_response_field() {
        let stdout = "{\"prompt\": \"q\", \"answer\": \"x\"}";
        assert_eq!(
            parse_agent_output(stdout),
            Err(PayloadError::MissingResponseField)
        );
    }

    #[test]
    fn test_non_string_response_is_missing() {
        let stdout = "{\"prompt\": \"q\", \"response\": null}";
        assert_eq!(
            parse_agent_output(stdout),
            Err(PayloadError::MissingResponseField)
        );
    }

    #[test]
    fn test_fallback_recovers_response_from_trailing_garbage() {
        let stdout = "{\"prompt\": \"q\", \"response\": \"uses \\\"quoted\\\" names\\t ok\"}\n[done in 3.2s]";
        assert_eq!(
            parse_agent_output(stdout).unwrap(),
            Some("uses \"quoted\" names\t ok".to_string())
        );
    }

    #[test]
    fn test_fallback_failure_reports_strict_error() {
        let stdout = "{\"prompt\": \"q\", \"response\": \"never closed";
        match parse_agent_output(stdout) {
            Err(PayloadError::Unparseable(msg)) => assert!(!msg.is_empty()),
            other => panic!("expected Unparseable, got {other:?}"),
        }
    }
}
