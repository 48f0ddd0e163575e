//! Event extraction adapter: prompt construction plus response validation
//! around a single LLM round trip.
//!
//! All natural-language understanding is delegated to the model. This module
//! sanitizes the input, gives the model the timezone context it needs to
//! resolve relative dates, tolerates the usual markdown artifacts in the
//! reply, and validates the returned JSON against the event contract. One
//! call per request, no retries; any failure is terminal.

use crate::openai::CompletionClient;
use crate::schema::{EventRecord, ParsedEvents};
use chrono::Utc;
use chrono_tz::Tz;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

const REQUIRED_FIELDS: [&str; 3] = ["title", "date", "time"];

#[derive(Debug, Error)]
pub enum ExtractError {
    /// The caller-supplied timezone is not a known IANA name. Surfaced as a
    /// client error rather than silently falling back to UTC.
    #[error("unknown timezone: {0}")]
    InvalidTimezone(String),
    /// LLM call failure, unparsable reply, or missing required fields.
    #[error("{0}")]
    ExtractionFailed(String),
}

/// Extraction adapter orchestrating the prompt build and reply validation.
pub struct EventExtractor {
    client: Arc<dyn CompletionClient>,
}

impl EventExtractor {
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        Self { client }
    }

    /// Extract structured events from free-form text via one LLM call.
    ///
    /// Returns a bare event when exactly one was produced and the input has
    /// no blank-line paragraph break, an array otherwise. See
    /// [`ParsedEvents`] for why that asymmetry is preserved.
    pub async fn extract(&self, text: &str, timezone: &str) -> Result<ParsedEvents, ExtractError> {
        let text = trim_non_alphanumeric(text);

        let tz: Tz = timezone
            .parse()
            .map_err(|_| ExtractError::InvalidTimezone(timezone.to_string()))?;
        let current_date = Utc::now().with_timezone(&tz).format("%Y-%m-%d").to_string();

        let prompt = build_prompt(text, timezone, &current_date);

        let response = self
            .client
            .complete(&prompt)
            .await
            .map_err(|e| ExtractError::ExtractionFailed(format!("LLM request failed: {e}")))?;

        debug!("Raw LLM response length: {} chars", response.len());

        let cleaned = strip_code_fences(&response);
        let events = parse_events(&cleaned)?;
        validate_events(&events)?;

        let mut records = Vec::with_capacity(events.len());
        for event in events {
            let record: EventRecord = serde_json::from_value(event).map_err(|e| {
                ExtractError::ExtractionFailed(format!("Malformed event object: {e}"))
            })?;
            records.push(record);
        }

        // Single event with no paragraph break collapses to a bare object.
        // Observed legacy shape; the handler re-wraps it for the wire.
        if records.len() == 1 && !text.contains("\n\n") {
            return Ok(ParsedEvents::Single(records.remove(0)));
        }
        Ok(ParsedEvents::Multiple(records))
    }
}

/// Trim leading/trailing characters that are not letters or digits (any
/// script). Internal whitespace and punctuation stay untouched.
fn trim_non_alphanumeric(text: &str) -> &str {
    text.trim_matches(|c: char| !c.is_alphanumeric())
}

/// Build the deterministic extraction prompt. Everything the model needs to
/// resolve relative dates (timezone, current date) is stated explicitly.
fn build_prompt(text: &str, timezone: &str, current_date: &str) -> String {
    format!(
        "You are a expert in calendar information. Extract event information from the \
         following text. There may be multiple events. Format the response as a JSON array \
         where each event has these fields:\n\
         - title: The event title\n\
         - description: Event description if available\n\
         - date: Date in YYYY-MM-DD format, if there are multiple times, duplicate the event \
         (it means this event will happen more than once)\n\
         - time: Time in HH:MM-HH:MM format in local timezone, if there are multiple times, \
         duplicate the event (it means this event will happen more than once)\n\
         - location: Location if available\n\
         \n\
         Input timezone: {timezone}\n\
         Current date in {timezone}: {current_date}\n\
         \n\
         Text: {text}\n"
    )
}

/// Best-effort removal of markdown artifacts from the model reply: every
/// literal fence delimiter and `json` language tag goes, nothing else.
/// Brittle string surgery by intent; kept isolated so a provider-side
/// structured-output mode could replace it without touching validation.
fn strip_code_fences(response: &str) -> String {
    response.replace("```", "").replace("json", "").trim().to_string()
}

/// Parse the cleaned reply as JSON and normalize to an array of objects.
fn parse_events(cleaned: &str) -> Result<Vec<Value>, ExtractError> {
    let value: Value = serde_json::from_str(cleaned).map_err(|_| {
        ExtractError::ExtractionFailed(format!("Failed to parse LLM response as JSON: {cleaned}"))
    })?;

    match value {
        Value::Array(events) => Ok(events),
        single => Ok(vec![single]),
    }
}

/// Require title, date and time on every event. All-or-nothing: one bad
/// event fails the whole batch.
fn validate_events(events: &[Value]) -> Result<(), ExtractError> {
    for event in events {
        let missing: Vec<&str> = REQUIRED_FIELDS
            .iter()
            .filter(|field| event.get(**field).is_none())
            .copied()
            .collect();
        if !missing.is_empty() {
            return Err(ExtractError::ExtractionFailed(format!(
                "Missing required fields in event: {}",
                missing.join(", ")
            )));
        }
    }
    Ok(())
}
