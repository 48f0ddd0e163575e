//! Calendar event extraction service.
//!
//! One HTTP endpoint turns free-form text into structured calendar events by
//! way of a single LLM completion round trip. The crate does no date or time
//! parsing of its own; it builds the extraction prompt and validates the
//! shape of whatever the model sends back.

pub mod extractor;
pub mod openai;
pub mod schema;
pub mod server;
