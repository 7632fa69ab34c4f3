//! # Intent Parser
//!
//! Turns the raw text returned by the language model into a validated intent.
//! The model is asked for a bare JSON object but regularly wraps it in code
//! fences or prefixes it with commentary, so parsing is tolerant of both:
//! fences are stripped, decoding starts at the first `{`, and anything after
//! the first complete object is ignored.
//!
//! Timestamps without an offset are taken as UTC.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::sync::OnceLock;

/// Reply used for chat responses that carry no message
pub const DEFAULT_CHAT_REPLY: &str = "Okay 👍";

/// Layouts with an offset that RFC 3339 rejects (`+0500`, space separator)
const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z"];

/// Offset-less timestamp layouts
const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// A validated request to create a reminder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderIntent {
    pub text: String,
    pub datetime: DateTime<Utc>,
}

/// What the language model decided the user wants
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedResponse {
    Reminder(ReminderIntent),
    /// Plain conversational reply to pass straight back to the user
    Chat(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// The response could not be decoded as the expected JSON object
    #[error("malformed JSON in model response: {0}")]
    MalformedJson(String),

    /// Decoded, but the reminder has no usable instant or no text
    #[error("invalid reminder: {0}")]
    InvalidDateTime(String),
}

impl ParseError {
    /// What the user is told when their message could not be turned into an intent
    pub fn user_reply(&self) -> &'static str {
        match self {
            ParseError::MalformedJson(_) => {
                "⚠️ The AI answered in a format I couldn't read, try rephrasing."
            }
            ParseError::InvalidDateTime(_) => {
                "⚠️ I couldn't work out when to remind you. Please be more specific."
            }
        }
    }
}

/// Top-level shape of the model's answer. Fields stay untyped so a decoded
/// object with a wrongly typed field is a validation failure, not a decode one.
#[derive(Debug, Deserialize)]
struct RawResponse {
    action: Option<Value>,
    message: Option<Value>,
    reminder: Option<Value>,
}

fn fence_pattern() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| Regex::new(r"(?i)```(?:json)?").expect("fence pattern is valid"))
}

/// Parse a raw model response
pub fn parse(raw: &str) -> Result<ParsedResponse, ParseError> {
    let cleaned = fence_pattern().replace_all(raw, "");
    let start = cleaned
        .find('{')
        .ok_or_else(|| ParseError::MalformedJson("no JSON object found".to_string()))?;

    let response = serde_json::Deserializer::from_str(&cleaned[start..])
        .into_iter::<RawResponse>()
        .next()
        .ok_or_else(|| ParseError::MalformedJson("empty response".to_string()))?
        .map_err(|e| ParseError::MalformedJson(e.to_string()))?;

    let is_reminder = response
        .action
        .as_ref()
        .and_then(Value::as_str)
        .is_some_and(|action| action.trim().eq_ignore_ascii_case("reminder"));

    if is_reminder {
        return validate_reminder(response.reminder).map(ParsedResponse::Reminder);
    }

    let message = response
        .message
        .as_ref()
        .and_then(Value::as_str)
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| DEFAULT_CHAT_REPLY.to_string());
    Ok(ParsedResponse::Chat(message))
}

fn validate_reminder(reminder: Option<Value>) -> Result<ReminderIntent, ParseError> {
    let reminder = reminder
        .filter(|r| !r.is_null())
        .ok_or_else(|| ParseError::InvalidDateTime("reminder details missing".to_string()))?;
    let details = reminder.as_object().ok_or_else(|| {
        ParseError::InvalidDateTime(format!("reminder details are not an object: {reminder}"))
    })?;

    let raw_datetime = match details.get("datetime") {
        None | Some(Value::Null) => {
            return Err(ParseError::InvalidDateTime("datetime missing".to_string()))
        }
        Some(Value::String(d)) => d.trim(),
        Some(other) => {
            return Err(ParseError::InvalidDateTime(format!(
                "datetime is not a string: {other}"
            )))
        }
    };
    if raw_datetime.is_empty() {
        return Err(ParseError::InvalidDateTime("datetime missing".to_string()));
    }

    let datetime = parse_datetime(raw_datetime)
        .ok_or_else(|| ParseError::InvalidDateTime(format!("unparseable datetime {raw_datetime:?}")))?;

    let text = details
        .get("text")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ParseError::InvalidDateTime("reminder text is missing or empty".to_string()))?;

    Ok(ReminderIntent {
        text: text.to_string(),
        datetime,
    })
}

/// Parse an absolute instant; offset-less values are UTC, bare dates are UTC midnight
pub fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Some(dt) = OFFSET_FORMATS
        .iter()
        .find_map(|format| DateTime::parse_from_str(value, format).ok())
    {
        return Some(dt.with_timezone(&Utc));
    }

    if let Some(naive) = NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
    {
        return Some(Utc.from_utc_datetime(&naive));
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}
