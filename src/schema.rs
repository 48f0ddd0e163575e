//! Wire types for the parse-event endpoint.

use serde::{Deserialize, Serialize};

/// One extracted calendar event. Lives only for the duration of a single
/// request/response cycle; nothing is persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventRecord {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// `YYYY-MM-DD`
    pub date: String,
    /// `HH:MM-HH:MM`, 24-hour, local to the request timezone.
    pub time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// Adapter output. A single event with no paragraph break in the input is
/// returned bare rather than as a one-element array; the handler re-wraps it
/// so the wire contract is always `{"events": [...]}`. Legacy shape, kept
/// deliberately.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParsedEvents {
    Single(EventRecord),
    Multiple(Vec<EventRecord>),
}

impl ParsedEvents {
    pub fn into_vec(self) -> Vec<EventRecord> {
        match self {
            ParsedEvents::Single(event) => vec![event],
            ParsedEvents::Multiple(events) => events,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ParsedEvents::Single(_) => 1,
            ParsedEvents::Multiple(events) => events.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
