//! Response body resolution and error classification

use reqwest::StatusCode;
use serde_json::{Value, json};

use super::normalize::{Envelope, Normalized, normalize};

/// Message of the synthetic envelope built for an unparsable JSON body
pub const INVALID_JSON_MESSAGE: &str = "Invalid JSON response from server";

/// Envelope error codes that mean the session is no longer valid
pub const SESSION_ERROR_CODES: [&str; 2] = ["SESSION_EXPIRED", "INVALID_SESSION"];

/// Turn a raw response body into JSON.
///
/// Never fails: bodies that cannot be read as JSON become a synthetic
/// `{ success, message }` envelope.
pub fn resolve_body(status: StatusCode, content_type: Option<&str>, bytes: &[u8]) -> Value {
    let declares_json = content_type
        .map(|ct| ct.to_ascii_lowercase().contains("application/json"))
        .unwrap_or(false);

    if declares_json {
        return serde_json::from_slice(bytes)
            .unwrap_or_else(|_| json!({ "success": false, "message": INVALID_JSON_MESSAGE }));
    }

    let text = String::from_utf8_lossy(bytes);
    let trimmed = text.trim();
    if (trimmed.starts_with('{') || trimmed.starts_with('['))
        && let Ok(value) = serde_json::from_str(trimmed)
    {
        return value;
    }

    let ok = status.is_success();
    let message = if ok {
        "Success".to_string()
    } else if !text.is_empty() {
        text.to_string()
    } else {
        status_text(status).to_string()
    };
    json!({ "success": ok, "message": message })
}

/// Reason phrase for a status code, empty for unknown codes
pub fn status_text(status: StatusCode) -> &'static str {
    status.canonical_reason().unwrap_or("")
}

/// Outcome of classifying a resolved response
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    /// Usable result, already normalized
    Success(Normalized),

    /// The session is gone; the caller must tear it down
    SessionExpired { body: Value },

    /// Ordinary failure to be surfaced to the user
    Failure {
        status: u16,
        status_text: String,
        message: String,
        body: Value,
    },
}

/// Decide between success, session teardown and ordinary failure
pub fn classify(status: StatusCode, body: Value) -> Classification {
    let normalized = normalize(&body);
    let envelope = normalized.envelope();

    if is_session_error(status, &envelope) {
        return Classification::SessionExpired { body };
    }

    if !status.is_success() || envelope.is_failure() {
        return Classification::Failure {
            status: status.as_u16(),
            status_text: status_text(status).to_string(),
            message: failure_message(status, &envelope),
            body,
        };
    }

    Classification::Success(normalized)
}

/// 401, or a 2xx envelope reporting `success: false` with a session error code
pub fn is_session_error(status: StatusCode, envelope: &Envelope<'_>) -> bool {
    if status == StatusCode::UNAUTHORIZED {
        return true;
    }
    status.is_success()
        && envelope.is_failure()
        && envelope
            .error
            .is_some_and(|code| SESSION_ERROR_CODES.contains(&code))
}

fn failure_message(status: StatusCode, envelope: &Envelope<'_>) -> String {
    envelope
        .message
        .filter(|m| !m.is_empty())
        .or(envelope.error.filter(|e| !e.is_empty()))
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {}: {}", status.as_u16(), status_text(status)))
}
